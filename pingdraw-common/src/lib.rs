#![no_std]

use core::net::Ipv6Addr;

pub const CANVAS_WIDTH: u16 = 160;
pub const CANVAS_HEIGHT: u16 = 120;

/// Leading words of every canvas address, `2001:4c08:2028::/48`. The
/// remaining five words carry `x:y:r:g:b`.
pub const CANVAS_PREFIX: [u16; 3] = [0x2001, 0x4c08, 0x2028];

/// Number of interlace passes a full frame is split into.
pub const SCAN: u32 = 2;
pub const DEFAULT_FPS: i32 = 20;

pub const ICMP6_TYPE_ECHO_REQUEST: u8 = 128;
pub const ICMP6_ECHO_SEQUENCE: u16 = 1;

pub const ICMP6_TYPE_OFFSET: usize = 0;
pub const ICMP6_CODE_OFFSET: usize = 1;
pub const ICMP6_CHECKSUM_OFFSET: usize = 2;
pub const ICMP6_IDENTIFIER_OFFSET: usize = 4;
pub const ICMP6_SEQUENCE_OFFSET: usize = 6;
pub const ICMP6_HDR_LEN: usize = 8;

/// Header plus 12 bytes of zero padding.
pub const PULSE_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasPixel {
    pub x: u16,
    pub y: u16,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl CanvasPixel {
    pub const fn new(x: u16, y: u16, r: u8, g: u8, b: u8) -> Self {
        Self { x, y, r, g, b }
    }

    pub fn to_addr(self) -> Ipv6Addr {
        encode_pixel(self.x, self.y, self.r, self.g, self.b)
    }
}

/// Packs the decimal digits of `value` into nibbles, least significant digit
/// in the lowest nibble. Only values up to 9999 fit.
pub const fn bcd(mut value: u16) -> u16 {
    let mut bcd = 0;
    let mut shift = 0;
    while value != 0 {
        bcd |= (value % 10) << shift;
        value /= 10;
        shift += 4;
    }
    bcd
}

/// Inverse of [`bcd`]. Returns `None` if any nibble is not a decimal digit.
pub const fn bcd_to_dec(mut bcd: u16) -> Option<u16> {
    let mut value = 0;
    let mut scale = 1;
    while bcd != 0 {
        let digit = bcd & 0xf;
        if digit > 9 {
            return None;
        }
        value += digit * scale;
        bcd >>= 4;
        scale *= 10;
    }
    Some(value)
}

/// Builds the destination address that paints pixel `(x, y)` with `(r, g, b)`.
///
/// `x` and `y` must be at most 9999, which every on-canvas coordinate is.
pub fn encode_pixel(x: u16, y: u16, r: u8, g: u8, b: u8) -> Ipv6Addr {
    debug_assert!(x <= 9999 && y <= 9999);
    let [p0, p1, p2] = CANVAS_PREFIX;
    Ipv6Addr::new(
        p0,
        p1,
        p2,
        bcd(x),
        bcd(y),
        r as u16,
        g as u16,
        b as u16,
    )
}

/// Recovers the pixel encoded in a canvas address, if it is one.
pub fn decode_pixel(addr: Ipv6Addr) -> Option<CanvasPixel> {
    let segments = addr.segments();
    if segments[..3] != CANVAS_PREFIX {
        return None;
    }

    let x = bcd_to_dec(segments[3])?;
    let y = bcd_to_dec(segments[4])?;
    let r = u8::try_from(segments[5]).ok()?;
    let g = u8::try_from(segments[6]).ok()?;
    let b = u8::try_from(segments[7]).ok()?;

    Some(CanvasPixel { x, y, r, g, b })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcd_packs_decimal_digits() {
        assert_eq!(bcd(0), 0);
        assert_eq!(bcd(7), 0x7);
        assert_eq!(bcd(42), 0x42);
        assert_eq!(bcd(159), 0x159);
        assert_eq!(bcd(9999), 0x9999);
    }

    #[test]
    fn bcd_digits_read_back_as_decimal() {
        for n in 0..=9999u16 {
            let packed = bcd(n);
            let mut digits = packed;
            let mut decoded = 0u32;
            let mut scale = 1u32;
            while digits != 0 {
                let digit = (digits & 0xf) as u32;
                assert!(digit <= 9, "nibble {digit:x} of {packed:x} is not decimal");
                decoded += digit * scale;
                scale *= 10;
                digits >>= 4;
            }
            assert_eq!(decoded, n as u32);
            assert_eq!(bcd_to_dec(packed), Some(n));
        }
    }

    #[test]
    fn bcd_to_dec_rejects_hex_nibbles() {
        assert_eq!(bcd_to_dec(0x1a), None);
        assert_eq!(bcd_to_dec(0xf000), None);
    }

    #[test]
    fn encodes_fields_into_low_words() {
        let addr = encode_pixel(159, 119, 255, 16, 1);
        assert_eq!(
            addr,
            "2001:4c08:2028:159:119:ff:10:1".parse::<Ipv6Addr>().unwrap()
        );

        let addr = encode_pixel(0, 0, 255, 0, 0);
        assert_eq!(addr, "2001:4c08:2028:0:0:ff:0:0".parse::<Ipv6Addr>().unwrap());
    }

    #[test]
    fn fields_do_not_alias() {
        let tuples = [
            CanvasPixel::new(0, 0, 0, 0, 1),
            CanvasPixel::new(0, 0, 0, 1, 0),
            CanvasPixel::new(0, 0, 1, 0, 0),
            CanvasPixel::new(0, 1, 0, 0, 0),
            CanvasPixel::new(1, 0, 0, 0, 0),
            CanvasPixel::new(10, 0, 0, 0, 0),
            CanvasPixel::new(16, 0, 0, 0, 0),
            CanvasPixel::new(159, 119, 255, 255, 255),
            CanvasPixel::new(119, 159, 255, 255, 255),
        ];

        for (i, a) in tuples.iter().enumerate() {
            assert_eq!(decode_pixel(a.to_addr()), Some(*a));
            for b in &tuples[i + 1..] {
                assert_ne!(a.to_addr(), b.to_addr(), "{a:?} and {b:?} collide");
            }
        }
    }

    #[test]
    fn decode_rejects_foreign_addresses() {
        assert_eq!(decode_pixel(Ipv6Addr::LOCALHOST), None);
        assert_eq!(
            decode_pixel("2001:4c08:2028:a:0:0:0:0".parse().unwrap()),
            None
        );
        assert_eq!(
            decode_pixel("2001:4c08:2028:1:1:100:0:0".parse().unwrap()),
            None
        );
    }
}
