use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use anyhow::{bail, ensure, Context, Result};
use png::{ColorType, Decoder, Transformations};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// A decoded RGBA image, row-major, four bytes per pixel.
#[derive(Debug, Clone)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Image {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Self::decode(BufReader::new(file))
            .with_context(|| format!("Failed to read image {}", path.display()))
    }

    pub fn decode<R: Read + Seek>(mut reader: R) -> Result<Self> {
        let mut header = [0u8; 8];
        if reader.read_exact(&mut header).is_err() || header != PNG_SIGNATURE {
            bail!("not a png file");
        }
        reader.seek(SeekFrom::Start(0))?;

        let mut decoder = Decoder::new(reader);
        // We send 8 bit channels only
        decoder.set_transformations(Transformations::STRIP_16);
        let mut reader = decoder.read_info().context("Failed to decode png header")?;

        let color_type = reader.info().color_type;
        if color_type != ColorType::Rgba {
            bail!("png color type is {color_type:?}, not RGBA");
        }

        let mut pixels = vec![0; reader.output_buffer_size()];
        let frame = reader
            .next_frame(&mut pixels)
            .context("Failed to decode png image data")?;
        pixels.truncate(frame.buffer_size());

        Self::from_rgba(frame.width, frame.height, pixels)
    }

    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        ensure!(
            pixels.len() as u64 == width as u64 * height as u64 * 4,
            "{width}x{height} RGBA image needs {} bytes, got {}",
            width as u64 * height as u64 * 4,
            pixels.len()
        );
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Color of the pixel at `(x, y)`, alpha dropped.
    pub fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let index = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[index],
            self.pixels[index + 1],
            self.pixels[index + 2],
        ]
    }
}
