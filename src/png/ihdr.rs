use super::*;

/// The types of color that PNG supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PngColorType {
  /// Greyscale
  Y = 0,
  /// Red, Green, Blue
  RGB = 2,
  /// Index into a palette.
  Index = 3,
  /// Greyscale + Alpha
  YA = 4,
  /// Red, Green, Blue, Alpha
  ///
  /// In a CgBI file this is actually stored as Blue, Green, Red, Alpha.
  RGBA = 6,
}
impl PngColorType {
  /// The number of channels in this type of color.
  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> usize {
    match self {
      Self::Y => 1,
      Self::RGB => 3,
      Self::Index => 1,
      Self::YA => 2,
      Self::RGBA => 4,
    }
  }

  /// If the bit depth is allowed with this color type.
  #[inline]
  #[must_use]
  pub const fn allows_bit_depth(self, bit_depth: u8) -> bool {
    match self {
      Self::Y => matches!(bit_depth, 1 | 2 | 4 | 8 | 16),
      Self::Index => matches!(bit_depth, 1 | 2 | 4 | 8),
      Self::RGB | Self::YA | Self::RGBA => matches!(bit_depth, 8 | 16),
    }
  }
}
impl TryFrom<u8> for PngColorType {
  type Error = ();
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => PngColorType::Y,
      2 => PngColorType::RGB,
      3 => PngColorType::Index,
      4 => PngColorType::YA,
      6 => PngColorType::RGBA,
      _ => return Err(()),
    })
  }
}

/// Image Header
///
/// Once parsed this never changes for the rest of the decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IHDR {
  /// width in pixels
  pub width: u32,
  /// height in pixels
  pub height: u32,
  /// bits per channel
  pub bit_depth: u8,
  /// pixel color type
  pub color_type: PngColorType,
  /// if the image data is stored with Adam7 interlacing.
  pub is_interlaced: bool,
}
impl IHDR {
  /// Bits per pixel: the bit depth times the channel count.
  #[inline]
  #[must_use]
  pub const fn bits_per_pixel(&self) -> usize {
    (self.bit_depth as usize) * self.color_type.channel_count()
  }

  /// Bytes per pixel for filtering, rounded up, so never less than 1.
  #[inline]
  #[must_use]
  pub const fn filter_bytes_per_pixel(&self) -> usize {
    (self.bits_per_pixel() + 7) / 8
  }

  /// Bytes in one filtered line of an image `width` pixels wide, including
  /// the leading filter type byte.
  ///
  /// `None` if that doesn't fit in a `usize`.
  #[inline]
  #[must_use]
  pub fn bytes_per_filterline(&self, width: u32) -> Option<usize> {
    // When pixels are less than 8 bits it's possible to end up with partial
    // bytes on the end, so we must round up.
    let bits = self.bits_per_pixel().checked_mul(usize::try_from(width).ok()?)?;
    (bits / 8 + usize::from(bits % 8 != 0)).checked_add(1)
  }

  /// Total filtered bytes the image data should inflate to.
  ///
  /// Interlaced images add up all 7 reduced images, skipping the empty ones.
  pub fn filtered_data_len(&self) -> Result<usize, PngError> {
    let mut total = 0_usize;
    for pass in self.passes() {
      let (w, h) = pass.reduced_dimensions(self.width, self.height);
      if w == 0 || h == 0 {
        continue;
      }
      let this_image = self
        .bytes_per_filterline(w)
        .and_then(|line| line.checked_mul(h as usize))
        .ok_or(PngError::CheckedMath)?;
      total = total.checked_add(this_image).ok_or(PngError::CheckedMath)?;
    }
    Ok(total)
  }

  /// The reduced images that make up the image data, in stream order.
  #[inline]
  #[must_use]
  pub fn passes(&self) -> &'static [Adam7Pass] {
    if self.is_interlaced {
      &ADAM7_PASSES
    } else {
      &[Adam7Pass::FULL_IMAGE]
    }
  }
}
impl TryFrom<&PngRawChunk<'_>> for IHDR {
  type Error = PngError;
  fn try_from(chunk: &PngRawChunk<'_>) -> Result<Self, Self::Error> {
    match chunk.data {
      [w0, w1, w2, w3, h0, h1, h2, h3, bit_depth, color_type, compression_method, filter_method, interlace_method] =>
      {
        let width = u32::from_be_bytes([*w0, *w1, *w2, *w3]);
        let height = u32::from_be_bytes([*h0, *h1, *h2, *h3]);
        // PNG caps dimensions at 2^31-1.
        if width == 0 || height == 0 || width > i32::MAX as u32 || height > i32::MAX as u32 {
          return Err(PngError::InvalidDimension { width, height });
        }
        let bad_depth =
          PngError::InvalidColorDepth { bit_depth: *bit_depth, color_type: *color_type };
        let color_type = match PngColorType::try_from(*color_type) {
          Ok(ct) if ct.allows_bit_depth(*bit_depth) => ct,
          _ => return Err(bad_depth),
        };
        if *compression_method != 0 || *filter_method != 0 {
          return Err(PngError::UnsupportedMethod {
            compression: *compression_method,
            filter: *filter_method,
          });
        }
        let is_interlaced = match interlace_method {
          0 => false,
          1 => true,
          other => return Err(PngError::UnsupportedInterlace(*other)),
        };
        Ok(Self { width, height, bit_depth: *bit_depth, color_type, is_interlaced })
      }
      other => Err(PngError::InvalidIhdrLength(other.len() as u32)),
    }
  }
}

#[cfg(test)]
fn ihdr_chunk(data: &[u8]) -> Result<IHDR, PngError> {
  IHDR::try_from(&PngRawChunk { chunk_ty: ChunkType::IHDR, data, declared_crc: 0 })
}

#[test]
fn test_ihdr_parse_ok() {
  let ihdr = ihdr_chunk(&[0, 0, 1, 0, 0, 0, 0, 3, 8, 6, 0, 0, 1]).unwrap();
  assert_eq!(
    ihdr,
    IHDR {
      width: 256,
      height: 3,
      bit_depth: 8,
      color_type: PngColorType::RGBA,
      is_interlaced: true
    }
  );
  assert_eq!(ihdr.bits_per_pixel(), 32);
  assert_eq!(ihdr.filter_bytes_per_pixel(), 4);
  assert_eq!(ihdr.bytes_per_filterline(5), Some(21));
}

#[test]
fn test_ihdr_color_depth_table() {
  let legal: &[(u8, &[u8])] = &[
    (0, &[1, 2, 4, 8, 16]),
    (2, &[8, 16]),
    (3, &[1, 2, 4, 8]),
    (4, &[8, 16]),
    (6, &[8, 16]),
  ];
  for color_type in 0..=7_u8 {
    for bit_depth in [1_u8, 2, 3, 4, 8, 16, 32] {
      let res = ihdr_chunk(&[0, 0, 0, 1, 0, 0, 0, 1, bit_depth, color_type, 0, 0, 0]);
      let expect_ok = legal
        .iter()
        .any(|(ct, depths)| *ct == color_type && depths.contains(&bit_depth));
      if expect_ok {
        assert!(res.is_ok(), "ct {color_type} depth {bit_depth}");
      } else {
        assert_eq!(res, Err(PngError::InvalidColorDepth { bit_depth, color_type }));
      }
    }
  }
}

#[test]
fn test_ihdr_bits_per_pixel() {
  for (ct, depth, bpp) in [(0, 1, 1), (0, 16, 16), (2, 8, 24), (3, 4, 4), (4, 16, 32), (6, 16, 64)]
  {
    let ihdr = ihdr_chunk(&[0, 0, 0, 1, 0, 0, 0, 1, depth, ct, 0, 0, 0]).unwrap();
    assert_eq!(ihdr.bits_per_pixel(), bpp);
  }
}

#[test]
fn test_ihdr_errors() {
  assert_eq!(ihdr_chunk(&[0; 12]), Err(PngError::InvalidIhdrLength(12)));
  assert_eq!(ihdr_chunk(&[0; 14]), Err(PngError::InvalidIhdrLength(14)));
  assert_eq!(
    ihdr_chunk(&[0, 0, 0, 0, 0, 0, 0, 1, 8, 6, 0, 0, 0]),
    Err(PngError::InvalidDimension { width: 0, height: 1 })
  );
  assert_eq!(
    ihdr_chunk(&[0, 0, 0, 1, 0, 0, 0, 0, 8, 6, 0, 0, 0]),
    Err(PngError::InvalidDimension { width: 1, height: 0 })
  );
  assert_eq!(
    ihdr_chunk(&[0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 1, 0, 0]),
    Err(PngError::UnsupportedMethod { compression: 1, filter: 0 })
  );
  assert_eq!(
    ihdr_chunk(&[0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 0, 1, 0]),
    Err(PngError::UnsupportedMethod { compression: 0, filter: 1 })
  );
  assert_eq!(
    ihdr_chunk(&[0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 0, 0, 2]),
    Err(PngError::UnsupportedInterlace(2))
  );
}

#[test]
fn test_filtered_data_len() {
  let mut ihdr = ihdr_chunk(&[0, 0, 0, 2, 0, 0, 0, 2, 8, 6, 0, 0, 0]).unwrap();
  assert_eq!(ihdr.filtered_data_len(), Ok(2 * (1 + 8)));
  // 2x2 interlaced: pass 1 is 1x1, pass 6 is 1x1, pass 7 is 2x1, the rest
  // are empty.
  ihdr.is_interlaced = true;
  assert_eq!(ihdr.filtered_data_len(), Ok((1 + 4) + (1 + 4) + (1 + 8)));
}

#[test]
fn test_bytes_per_filterline_limits() {
  let mut ihdr = ihdr_chunk(&[0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 0]).unwrap();
  assert_eq!(ihdr.bytes_per_filterline(1), Some(2));
  assert_eq!(ihdr.bytes_per_filterline(8), Some(2));
  assert_eq!(ihdr.bytes_per_filterline(9), Some(3));
  // 64 bits per pixel at the widest a u32 allows
  ihdr.bit_depth = 16;
  ihdr.color_type = PngColorType::RGBA;
  let widest = ihdr.bytes_per_filterline(u32::MAX);
  #[cfg(target_pointer_width = "64")]
  assert_eq!(widest, Some(1 + 8 * (u32::MAX as usize)));
  #[cfg(target_pointer_width = "32")]
  assert_eq!(widest, None);
}
