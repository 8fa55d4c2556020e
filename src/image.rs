#![forbid(unsafe_code)]

//! Provides heap-allocated image types.

use alloc::vec::Vec;

use bytemuck::Pod;

use crate::{
  pixel_formats::{unpremultiply_channel, RGBA16_BE, RGBA8},
  PngError,
};

/// Converts an `(x,y)` position within a given `width` 2D space into a linear
/// index.
#[inline]
#[must_use]
pub const fn xy_width_to_index(x: u32, y: u32, width: u32) -> usize {
  (y as usize) * (width as usize) + (x as usize)
}

/// A direct-color image.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
pub struct Bitmap<P> {
  pub width: u32,
  pub height: u32,
  pub pixels: Vec<P>,
}
impl<P: Clone + Default> Bitmap<P> {
  /// Makes a new image with every pixel set to the default value.
  ///
  /// ## Failure
  /// * The pixel count overflows, or the allocation fails.
  pub fn try_new(width: u32, height: u32) -> Result<Self, PngError> {
    let pixel_count =
      (width as usize).checked_mul(height as usize).ok_or(PngError::CheckedMath)?;
    let mut pixels: Vec<P> = Vec::new();
    pixels.try_reserve(pixel_count)?;
    pixels.resize(pixel_count, P::default());
    Ok(Self { width, height, pixels })
  }
}
impl<P> Bitmap<P> {
  /// Gets the pixel at the position, or `None` if the position is out of
  /// bounds.
  #[inline]
  #[must_use]
  pub fn get(&self, x: u32, y: u32) -> Option<&P> {
    if x < self.width && y < self.height {
      self.pixels.get(xy_width_to_index(x, y, self.width))
    } else {
      None
    }
  }

  /// Gets the pixel at the position, or `None` if the position is out of
  /// bounds.
  #[inline]
  #[must_use]
  pub fn get_mut(&mut self, x: u32, y: u32) -> Option<&mut P> {
    if x < self.width && y < self.height {
      let i = xy_width_to_index(x, y, self.width);
      self.pixels.get_mut(i)
    } else {
      None
    }
  }
}

/// Byte-level access to a raster, independent of its pixel type.
///
/// Interlace merging is written once against this trait, so it works the same
/// for any pixel layout.
pub trait RasterLayout {
  /// Width in pixels.
  fn width(&self) -> u32;
  /// Height in pixels.
  fn height(&self) -> u32;
  /// Bytes per pixel.
  fn bytes_per_pixel(&self) -> usize;
  /// Bytes per row.
  fn stride(&self) -> usize {
    self.bytes_per_pixel() * self.width() as usize
  }
  /// All raster bytes, rows top to bottom.
  fn raster_bytes(&self) -> &[u8];
  /// All raster bytes, mutably.
  fn raster_bytes_mut(&mut self) -> &mut [u8];

  /// The bytes of the pixel at `(x, y)`.
  ///
  /// ## Panics
  /// * If the position is out of bounds.
  fn pixel_bytes_at(&self, x: u32, y: u32) -> &[u8] {
    let bpp = self.bytes_per_pixel();
    let i = (y as usize) * self.stride() + (x as usize) * bpp;
    &self.raster_bytes()[i..i + bpp]
  }

  /// Overwrites the pixel at `(x, y)`.
  ///
  /// ## Panics
  /// * If the position is out of bounds, or `bytes` is not exactly one pixel.
  fn write_pixel_bytes_at(&mut self, x: u32, y: u32, bytes: &[u8]) {
    let bpp = self.bytes_per_pixel();
    let i = (y as usize) * self.stride() + (x as usize) * bpp;
    self.raster_bytes_mut()[i..i + bpp].copy_from_slice(bytes);
  }
}

impl<P: Pod> RasterLayout for Bitmap<P> {
  #[inline]
  fn width(&self) -> u32 {
    self.width
  }
  #[inline]
  fn height(&self) -> u32 {
    self.height
  }
  #[inline]
  fn bytes_per_pixel(&self) -> usize {
    core::mem::size_of::<P>()
  }
  #[inline]
  fn raster_bytes(&self) -> &[u8] {
    bytemuck::cast_slice(&self.pixels)
  }
  #[inline]
  fn raster_bytes_mut(&mut self) -> &mut [u8] {
    bytemuck::cast_slice_mut(&mut self.pixels)
  }
}

/// A fully decoded image, in one of the standard layouts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DecodedImage {
  /// 8 bits per channel (also used for expanded 1, 2, and 4 bit images).
  Rgba8(Bitmap<RGBA8>),
  /// 16 bits per channel.
  Rgba16(Bitmap<RGBA16_BE>),
}
impl DecodedImage {
  /// Width in pixels.
  #[inline]
  #[must_use]
  pub fn width(&self) -> u32 {
    match self {
      Self::Rgba8(b) => b.width,
      Self::Rgba16(b) => b.width,
    }
  }

  /// Height in pixels.
  #[inline]
  #[must_use]
  pub fn height(&self) -> u32 {
    match self {
      Self::Rgba8(b) => b.height,
      Self::Rgba16(b) => b.height,
    }
  }

  /// Bits per channel of the layout, 8 or 16.
  #[inline]
  #[must_use]
  pub fn bits_per_channel(&self) -> u8 {
    match self {
      Self::Rgba8(_) => 8,
      Self::Rgba16(_) => 16,
    }
  }

  /// The raster bytes in `RGBA` order, 16-bit channels big-endian.
  #[inline]
  #[must_use]
  pub fn as_bytes(&self) -> &[u8] {
    match self {
      Self::Rgba8(b) => b.raster_bytes(),
      Self::Rgba16(b) => b.raster_bytes(),
    }
  }

  /// Divides the color channels of every pixel by its alpha.
  ///
  /// CgBI stores premultiplied color, most other consumers expect straight
  /// alpha.
  pub fn unpremultiply_alpha(&mut self) {
    match self {
      Self::Rgba8(b) => b.pixels.iter_mut().for_each(|p| {
        let a = u32::from(p.a);
        p.r = unpremultiply_channel(u32::from(p.r), a, 0xFF) as u8;
        p.g = unpremultiply_channel(u32::from(p.g), a, 0xFF) as u8;
        p.b = unpremultiply_channel(u32::from(p.b), a, 0xFF) as u8;
      }),
      Self::Rgba16(b) => b.pixels.iter_mut().for_each(|p| {
        let [r, g, bl, a] = p.to_channels().map(u32::from);
        *p = RGBA16_BE::from_channels(
          unpremultiply_channel(r, a, 0xFFFF) as u16,
          unpremultiply_channel(g, a, 0xFFFF) as u16,
          unpremultiply_channel(bl, a, 0xFFFF) as u16,
          a as u16,
        );
      }),
    }
  }
}

#[test]
fn test_raster_layout_rgba8() {
  let mut b: Bitmap<RGBA8> = Bitmap::try_new(3, 2).unwrap();
  assert_eq!(b.bytes_per_pixel(), 4);
  assert_eq!(b.stride(), 12);
  b.write_pixel_bytes_at(2, 1, &[1, 2, 3, 4]);
  assert_eq!(b.pixel_bytes_at(2, 1), &[1, 2, 3, 4]);
  assert_eq!(b.get(2, 1), Some(&RGBA8 { r: 1, g: 2, b: 3, a: 4 }));
  assert_eq!(&b.raster_bytes()[20..24], &[1, 2, 3, 4]);
  assert!(b.get(3, 0).is_none());
}

#[test]
fn test_raster_layout_rgba16() {
  let mut b: Bitmap<RGBA16_BE> = Bitmap::try_new(2, 2).unwrap();
  assert_eq!(b.bytes_per_pixel(), 8);
  assert_eq!(b.stride(), 16);
  b.write_pixel_bytes_at(1, 1, &[0, 1, 0, 2, 0, 3, 0, 4]);
  assert_eq!(b.get(1, 1).unwrap().to_channels(), [1, 2, 3, 4]);
}

#[test]
fn test_unpremultiply_image() {
  let mut img = DecodedImage::Rgba8(Bitmap {
    width: 2,
    height: 1,
    pixels: alloc::vec![RGBA8 { r: 64, g: 32, b: 0, a: 128 }, RGBA8 { r: 9, g: 9, b: 9, a: 0 }],
  });
  img.unpremultiply_alpha();
  assert_eq!(img.as_bytes(), &[128, 64, 0, 128, 0, 0, 0, 0]);
}
