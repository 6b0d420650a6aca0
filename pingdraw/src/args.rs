use std::path::PathBuf;

use clap::Parser;
use pingdraw_common::DEFAULT_FPS;

#[derive(Debug, Parser)]
#[clap(about = "Draws a PNG onto the IPv6 ping canvas")]
pub struct Args {
    /// Horizontal offset of the image on the canvas
    #[clap(short = 'x', default_value = "0", allow_negative_numbers = true)]
    pub offset_x: i32,

    /// Vertical offset of the image on the canvas
    #[clap(short = 'y', default_value = "0", allow_negative_numbers = true)]
    pub offset_y: i32,

    /// Full frames per second; 0 disables pacing
    #[clap(short = 'f', default_value_t = DEFAULT_FPS, allow_negative_numbers = true)]
    pub fps: i32,

    /// RGBA PNG to draw
    pub image: PathBuf,
}
