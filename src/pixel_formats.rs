//! Module for pixel formats.
//!
//! A CgBI file stores its pixels as `B, G, R, A` with the alpha already
//! multiplied into the color channels. The decoder turns that into one of the
//! two standard layouts here, which is what PNG encoders expect:
//!
//! * [`RGBA8`] for 8-bit images, and for 1, 2, and 4 bit grayscale images
//!   (which get scaled up to 8 bits and copied into all color channels).
//! * [`RGBA16_BE`] for 16-bit images.
//!
//! ## Bit depth scaling
//! To *increase* bit depth with integers you use the current bit pattern as
//! the top bits of the new value, and then copy that bit pattern down however
//! many times is required to fill in all newly added bits. A 2-bit `0b01`
//! becomes `0b0101_0101`, a 4-bit `0b0011` becomes `0b0011_0011`, and so on.

#![allow(non_camel_case_types)]

use bytemuck::{Pod, Zeroable};

/// An 8-bits per channel RGBA pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Zeroable, Pod)]
#[repr(C)]
pub struct RGBA8 {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: u8,
}
impl RGBA8 {
  /// An opaque gray pixel.
  #[inline]
  #[must_use]
  pub const fn opaque_gray(y: u8) -> Self {
    Self { r: y, g: y, b: y, a: u8::MAX }
  }
}

/// A 16-bits per channel RGBA pixel.
///
/// The data is stored as a two-byte array (big-endian) to keep the type's
/// overall alignment at only 1, and so that the raster bytes are exactly what
/// a PNG encoder wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Zeroable, Pod)]
#[repr(C)]
pub struct RGBA16_BE {
  pub r: [u8; 2],
  pub g: [u8; 2],
  pub b: [u8; 2],
  pub a: [u8; 2],
}
impl RGBA16_BE {
  #[inline]
  #[must_use]
  pub const fn from_channels(r: u16, g: u16, b: u16, a: u16) -> Self {
    Self { r: r.to_be_bytes(), g: g.to_be_bytes(), b: b.to_be_bytes(), a: a.to_be_bytes() }
  }

  /// The channels as native integers, in `[r, g, b, a]` order.
  #[inline]
  #[must_use]
  pub const fn to_channels(self) -> [u16; 4] {
    [
      u16::from_be_bytes(self.r),
      u16::from_be_bytes(self.g),
      u16::from_be_bytes(self.b),
      u16::from_be_bytes(self.a),
    ]
  }
}

/// Reverses alpha premultiplication on one channel value.
///
/// `max` is the largest channel value of the bit depth in use. Alpha of zero
/// yields zero, and the result is clamped at `max` for malformed input where
/// the channel exceeds alpha.
#[inline]
#[must_use]
pub const fn unpremultiply_channel(c: u32, a: u32, max: u32) -> u32 {
  if a == 0 {
    0
  } else {
    let v = (c * max + a / 2) / a;
    if v > max {
      max
    } else {
      v
    }
  }
}

#[test]
fn test_rgba16_channels() {
  let p = RGBA16_BE::from_channels(0x0102, 0x0304, 0x0506, 0xFFFF);
  assert_eq!(bytemuck::bytes_of(&p), &[1, 2, 3, 4, 5, 6, 0xFF, 0xFF]);
  assert_eq!(p.to_channels(), [0x0102, 0x0304, 0x0506, 0xFFFF]);
}

#[test]
fn test_unpremultiply_channel() {
  assert_eq!(unpremultiply_channel(0, 0, 255), 0);
  assert_eq!(unpremultiply_channel(200, 0, 255), 0);
  assert_eq!(unpremultiply_channel(128, 255, 255), 128);
  assert_eq!(unpremultiply_channel(64, 128, 255), 128);
  assert_eq!(unpremultiply_channel(200, 100, 255), 255);
  assert_eq!(unpremultiply_channel(0x8000, 0xFFFF, 0xFFFF), 0x8000);
}
