use super::*;

use bitfrob::u8_replicate_bits;

/// How CgBI scanline bytes turn into output pixels.
///
/// CgBI files in the wild are almost all 8-bit BGRA. The other paths are the
/// ones the format's converters agree on; everything else is rejected rather
/// than guessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CgbiPixelLayout {
  /// 1, 2, or 4 bit grayscale, expanded to opaque [`RGBA8`].
  PackedGray(u8),
  /// `B, G, R, A` bytes, swapped into [`RGBA8`].
  Bgra8,
  /// `B, G, R, A` big-endian pairs, swapped into [`RGBA16_BE`].
  Bgra16,
}
impl CgbiPixelLayout {
  pub(crate) fn for_header(header: &IHDR) -> Result<Self, PngError> {
    Ok(match (header.color_type, header.bit_depth) {
      (PngColorType::Y, depth @ (1 | 2 | 4)) => Self::PackedGray(depth),
      (PngColorType::RGBA, 8) => Self::Bgra8,
      (PngColorType::RGBA, 16) => Self::Bgra16,
      (color_type, bit_depth) => {
        return Err(PngError::UnsupportedConfiguration {
          bit_depth,
          color_type: color_type as u8,
        })
      }
    })
  }

  /// Makes a blank raster of the layout's output type.
  pub(crate) fn allocate(self, width: u32, height: u32) -> Result<DecodedImage, PngError> {
    Ok(match self {
      Self::PackedGray(_) | Self::Bgra8 => DecodedImage::Rgba8(Bitmap::try_new(width, height)?),
      Self::Bgra16 => DecodedImage::Rgba16(Bitmap::try_new(width, height)?),
    })
  }
}

/// Inflated image data, handed out one filtered line at a time.
#[derive(Debug, Clone)]
pub(crate) struct ScanlineSource<'d>(&'d [u8]);
impl<'d> ScanlineSource<'d> {
  #[inline]
  pub(crate) const fn new(inflated: &'d [u8]) -> Self {
    Self(inflated)
  }

  /// Fills `line` completely, or gives `false` if there aren't enough bytes.
  #[inline]
  pub(crate) fn read_line(&mut self, line: &mut [u8]) -> bool {
    if self.0.len() < line.len() {
      self.0 = &[];
      false
    } else {
      let (head, rest) = self.0.split_at(line.len());
      line.copy_from_slice(head);
      self.0 = rest;
      true
    }
  }

  #[inline]
  pub(crate) const fn remaining(&self) -> usize {
    self.0.len()
  }
}

/// Makes sure `available` inflated bytes hold every line the header calls
/// for.
///
/// ## Failure
/// * [`PngError::InsufficientPixelData`] naming the first line that isn't
///   all there.
pub(crate) fn check_line_coverage(header: &IHDR, available: usize) -> Result<(), PngError> {
  let mut left = available;
  for pass in header.passes() {
    let (width, height) = pass.reduced_dimensions(header.width, header.height);
    if width == 0 || height == 0 {
      continue;
    }
    let row_size = header.bytes_per_filterline(width).ok_or(PngError::CheckedMath)?;
    let rows_here = left / row_size;
    if rows_here < height as usize {
      return Err(PngError::InsufficientPixelData { pass: pass.number, row: rows_here as u32 });
    }
    left -= row_size * height as usize;
  }
  Ok(())
}

/// Reads one whole reduced image (or the full image, when not interlaced)
/// out of the scanline source.
///
/// A pass with a zero width or height has no bytes in the stream, not even
/// filter bytes. You get an empty raster back and nothing is read.
pub(crate) fn read_image_pass(
  header: &IHDR, layout: CgbiPixelLayout, source: &mut ScanlineSource<'_>, pass: Adam7Pass,
) -> Result<DecodedImage, PngError> {
  let (width, height) = pass.reduced_dimensions(header.width, header.height);
  if width == 0 || height == 0 {
    return layout.allocate(0, 0);
  }
  let mut image = layout.allocate(width, height)?;

  let bpp = header.filter_bytes_per_pixel();
  let row_size = header.bytes_per_filterline(width).ok_or(PngError::CheckedMath)?;
  // current and previous line, each with the filter byte at [0].
  let mut cur: Vec<u8> = Vec::new();
  cur.try_reserve_exact(row_size)?;
  cur.resize(row_size, 0);
  let mut prev: Vec<u8> = cur.clone();

  for y in 0..height {
    if !source.read_line(&mut cur) {
      return Err(PngError::InsufficientPixelData { pass: pass.number, row: y });
    }
    let (filter_type, line) = cur.split_at_mut(1);
    unfilter_line(filter_type[0], bpp, &prev[1..], line)?;
    unpack_line(layout, line, width, y, &mut image)?;
    // The current line for y is the previous line for y+1.
    core::mem::swap(&mut cur, &mut prev);
  }
  Ok(image)
}

/// Converts one unfiltered line into output pixels on row `y`.
///
/// For the BGRA layouts the red and blue channels of `line` are swapped in
/// place.
pub(crate) fn unpack_line(
  layout: CgbiPixelLayout, line: &mut [u8], width: u32, y: u32, image: &mut DecodedImage,
) -> Result<(), PngError> {
  let width = width as usize;
  let row_start = y as usize * width;
  match (layout, image) {
    (CgbiPixelLayout::PackedGray(depth), DecodedImage::Rgba8(bitmap)) => {
      let row = &mut bitmap.pixels[row_start..row_start + width];
      let pixels_per_byte = 8 / usize::from(depth);
      let mask = (1_u8 << depth) - 1;
      for (x, px) in row.iter_mut().enumerate() {
        let byte = line[x / pixels_per_byte];
        // the high bits are the leftmost pixel
        let shift = 8 - depth * (1 + (x % pixels_per_byte) as u8);
        let sample = (byte >> shift) & mask;
        *px = RGBA8::opaque_gray(u8_replicate_bits(u32::from(depth), sample));
      }
    }
    (CgbiPixelLayout::Bgra8, DecodedImage::Rgba8(bitmap)) => {
      let line = &mut line[..width * 4];
      line.chunks_exact_mut(4).for_each(|bgra| bgra.swap(0, 2));
      let row = &mut bitmap.pixels[row_start..row_start + width];
      bytemuck::cast_slice_mut::<RGBA8, u8>(row).copy_from_slice(line);
    }
    (CgbiPixelLayout::Bgra16, DecodedImage::Rgba16(bitmap)) => {
      let row = &mut bitmap.pixels[row_start..row_start + width];
      for (px, bgra) in row.iter_mut().zip(line.chunks_exact(8)) {
        *px = RGBA16_BE {
          r: [bgra[4], bgra[5]],
          g: [bgra[2], bgra[3]],
          b: [bgra[0], bgra[1]],
          a: [bgra[6], bgra[7]],
        };
      }
    }
    _ => return Err(PngError::LayoutMismatch),
  }
  Ok(())
}

#[cfg(test)]
fn header(width: u32, height: u32, bit_depth: u8, color_type: PngColorType) -> IHDR {
  IHDR { width, height, bit_depth, color_type, is_interlaced: false }
}

#[test]
fn test_layout_for_header() {
  use PngColorType::*;
  assert_eq!(CgbiPixelLayout::for_header(&header(1, 1, 1, Y)), Ok(CgbiPixelLayout::PackedGray(1)));
  assert_eq!(CgbiPixelLayout::for_header(&header(1, 1, 4, Y)), Ok(CgbiPixelLayout::PackedGray(4)));
  assert_eq!(CgbiPixelLayout::for_header(&header(1, 1, 8, RGBA)), Ok(CgbiPixelLayout::Bgra8));
  assert_eq!(CgbiPixelLayout::for_header(&header(1, 1, 16, RGBA)), Ok(CgbiPixelLayout::Bgra16));
  for (depth, ct) in [(8, Y), (16, Y), (8, RGB), (16, RGB), (2, Index), (8, Index), (8, YA)] {
    assert_eq!(
      CgbiPixelLayout::for_header(&header(1, 1, depth, ct)),
      Err(PngError::UnsupportedConfiguration { bit_depth: depth, color_type: ct as u8 })
    );
  }
}

#[test]
fn test_unpack_packed_gray() {
  // 1-bit: 0b1010_0000 over 3 pixels
  let mut img = CgbiPixelLayout::PackedGray(1).allocate(3, 1).unwrap();
  unpack_line(CgbiPixelLayout::PackedGray(1), &mut [0b1010_0000], 3, 0, &mut img).unwrap();
  assert_eq!(img.as_bytes(), &[255, 255, 255, 255, 0, 0, 0, 255, 255, 255, 255, 255]);

  // 2-bit: 0b00_01_10_11 -> 0x00, 0x55, 0xAA, 0xFF
  let mut img = CgbiPixelLayout::PackedGray(2).allocate(4, 1).unwrap();
  unpack_line(CgbiPixelLayout::PackedGray(2), &mut [0b00_01_10_11], 4, 0, &mut img).unwrap();
  let grays: Vec<u8> = img.as_bytes().chunks_exact(4).map(|p| p[0]).collect();
  assert_eq!(grays, [0x00, 0x55, 0xAA, 0xFF]);

  // 4-bit over a partial trailing byte, second row
  let mut img = CgbiPixelLayout::PackedGray(4).allocate(3, 2).unwrap();
  unpack_line(CgbiPixelLayout::PackedGray(4), &mut [0x1E, 0x7F], 3, 1, &mut img).unwrap();
  let grays: Vec<u8> = img.as_bytes()[12..].chunks_exact(4).map(|p| p[0]).collect();
  assert_eq!(grays, [0x11, 0xEE, 0x77]);
  assert!(img.as_bytes()[12..].chunks_exact(4).all(|p| p[3] == 255));
}

#[test]
fn test_unpack_bgra8_swaps() {
  let mut img = CgbiPixelLayout::Bgra8.allocate(2, 1).unwrap();
  let mut line = [1, 2, 3, 4, 5, 6, 7, 8];
  unpack_line(CgbiPixelLayout::Bgra8, &mut line, 2, 0, &mut img).unwrap();
  assert_eq!(img.as_bytes(), &[3, 2, 1, 4, 7, 6, 5, 8]);
  assert_eq!(line, [3, 2, 1, 4, 7, 6, 5, 8]);
}

#[test]
fn test_unpack_bgra16_swaps() {
  let mut img = CgbiPixelLayout::Bgra16.allocate(1, 1).unwrap();
  let mut line = [0xB1, 0xB2, 0x61, 0x62, 0xA1, 0xA2, 0xFF, 0xFE];
  unpack_line(CgbiPixelLayout::Bgra16, &mut line, 1, 0, &mut img).unwrap();
  assert_eq!(img.as_bytes(), &[0xA1, 0xA2, 0x61, 0x62, 0xB1, 0xB2, 0xFF, 0xFE]);
}

#[test]
fn test_read_image_pass_rows() {
  let h = header(2, 2, 8, PngColorType::RGBA);
  // row 0: None, row 1: Up (adds row 0 back in)
  let data = [
    0, 10, 20, 30, 255, 40, 50, 60, 255, //
    2, 1, 1, 1, 0, 1, 1, 1, 0,
  ];
  let mut src = ScanlineSource::new(&data);
  let img = read_image_pass(&h, CgbiPixelLayout::Bgra8, &mut src, Adam7Pass::FULL_IMAGE).unwrap();
  assert_eq!(src.remaining(), 0);
  assert_eq!(
    img.as_bytes(),
    &[30, 20, 10, 255, 60, 50, 40, 255, 31, 21, 11, 255, 61, 51, 41, 255]
  );
}

#[test]
fn test_read_image_pass_short_and_empty() {
  let h = header(2, 2, 8, PngColorType::RGBA);
  let data = [0_u8; 9 + 4];
  let mut src = ScanlineSource::new(&data);
  assert_eq!(
    read_image_pass(&h, CgbiPixelLayout::Bgra8, &mut src, Adam7Pass::FULL_IMAGE),
    Err(PngError::InsufficientPixelData { pass: 0, row: 1 })
  );

  // pass 2 of a 2x2 image is empty: nothing gets read.
  let data = [5_u8; 4];
  let mut src = ScanlineSource::new(&data);
  let img = read_image_pass(&h, CgbiPixelLayout::Bgra8, &mut src, ADAM7_PASSES[1]).unwrap();
  assert_eq!((img.width(), img.height()), (0, 0));
  assert_eq!(src.remaining(), 4);
}

#[test]
fn test_read_image_pass_bad_filter() {
  let h = header(1, 1, 8, PngColorType::RGBA);
  let data = [5_u8, 0, 0, 0, 0];
  let mut src = ScanlineSource::new(&data);
  assert_eq!(
    read_image_pass(&h, CgbiPixelLayout::Bgra8, &mut src, Adam7Pass::FULL_IMAGE),
    Err(PngError::BadFilterType(5))
  );
}

#[test]
fn test_check_line_coverage() {
  let h = header(2, 2, 8, PngColorType::RGBA);
  assert_eq!(check_line_coverage(&h, 18), Ok(()));
  assert_eq!(check_line_coverage(&h, 100), Ok(()));
  assert_eq!(check_line_coverage(&h, 17), Err(PngError::InsufficientPixelData { pass: 0, row: 1 }));
  assert_eq!(check_line_coverage(&h, 0), Err(PngError::InsufficientPixelData { pass: 0, row: 0 }));

  // 8x8 interlaced: pass 1 and pass 2 are both a single pixel
  let h = IHDR { is_interlaced: true, ..header(8, 8, 8, PngColorType::RGBA) };
  assert_eq!(check_line_coverage(&h, 5), Err(PngError::InsufficientPixelData { pass: 2, row: 0 }));
  assert_eq!(check_line_coverage(&h, h.filtered_data_len().unwrap()), Ok(()));

  // a header far too big for the data never needs a raster to find that out
  let h = header(17_000, 17_000, 8, PngColorType::RGBA);
  assert_eq!(check_line_coverage(&h, 10), Err(PngError::InsufficientPixelData { pass: 0, row: 0 }));
}
