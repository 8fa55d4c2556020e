use super::*;

/// Decodes ordinary (non-CgBI) PNG files.
///
/// [`decode_with`] only handles the CgBI variant itself. Anything else is
/// passed along to one of these, with the complete original file bytes.
///
/// Any `FnMut(&[u8]) -> Result<DecodedImage, PngError>` closure works as a
/// standard decoder, which is handy without the `std` feature.
pub trait StandardPngDecoder {
  /// Decodes a complete PNG file, starting from the signature.
  fn decode_standard(&mut self, png: &[u8]) -> Result<DecodedImage, PngError>;
}
impl<F> StandardPngDecoder for F
where
  F: FnMut(&[u8]) -> Result<DecodedImage, PngError>,
{
  #[inline]
  fn decode_standard(&mut self, png: &[u8]) -> Result<DecodedImage, PngError> {
    self(png)
  }
}

/// Standard decoding through the `png` crate.
///
/// Every color type and depth is expanded into [`RGBA8`] or (for 16-bit
/// images) [`RGBA16_BE`].
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PngCrateDecoder;
#[cfg(feature = "std")]
impl StandardPngDecoder for PngCrateDecoder {
  fn decode_standard(&mut self, png: &[u8]) -> Result<DecodedImage, PngError> {
    let mut decoder = ::png::Decoder::new(png);
    decoder.set_transformations(::png::Transformations::EXPAND);
    let mut reader = decoder.read_info()?;
    let mut buf: Vec<u8> = Vec::new();
    buf.try_reserve_exact(reader.output_buffer_size())?;
    buf.resize(reader.output_buffer_size(), 0);
    let info = reader.next_frame(&mut buf)?;
    let bytes = &buf[..info.buffer_size()];
    debug!(
      "standard PNG: {}x{} {:?} {:?}",
      info.width, info.height, info.color_type, info.bit_depth
    );
    let channels = info.color_type.samples();
    match info.bit_depth {
      ::png::BitDepth::Sixteen => {
        let mut image: Bitmap<RGBA16_BE> = Bitmap::try_new(info.width, info.height)?;
        for (px, src) in image.pixels.iter_mut().zip(bytes.chunks_exact(channels * 2)) {
          let sample = |i: usize| [src[i * 2], src[i * 2 + 1]];
          *px = match channels {
            1 => RGBA16_BE { r: sample(0), g: sample(0), b: sample(0), a: [0xFF, 0xFF] },
            2 => RGBA16_BE { r: sample(0), g: sample(0), b: sample(0), a: sample(1) },
            3 => RGBA16_BE { r: sample(0), g: sample(1), b: sample(2), a: [0xFF, 0xFF] },
            _ => RGBA16_BE { r: sample(0), g: sample(1), b: sample(2), a: sample(3) },
          };
        }
        Ok(DecodedImage::Rgba16(image))
      }
      ::png::BitDepth::Eight => {
        let mut image: Bitmap<RGBA8> = Bitmap::try_new(info.width, info.height)?;
        for (px, src) in image.pixels.iter_mut().zip(bytes.chunks_exact(channels)) {
          *px = match *src {
            [y] => RGBA8::opaque_gray(y),
            [y, a] => RGBA8 { r: y, g: y, b: y, a },
            [r, g, b] => RGBA8 { r, g, b, a: 0xFF },
            [r, g, b, a, ..] => RGBA8 { r, g, b, a },
            [] => RGBA8::default(),
          };
        }
        Ok(DecodedImage::Rgba8(image))
      }
      // EXPAND always brings low depths up to 8 bits
      other => Err(PngError::Standard(alloc::format!("unexpected output bit depth {other:?}"))),
    }
  }
}

#[cfg(feature = "std")]
impl DecodedImage {
  /// Encodes the image as a standard RGBA PNG.
  ///
  /// Decoding the output with any PNG decoder gives back exactly the same
  /// pixels, at the same bit depth.
  pub fn to_png_bytes(&self) -> Result<Vec<u8>, PngError> {
    let mut out = Vec::new();
    let mut encoder = ::png::Encoder::new(&mut out, self.width(), self.height());
    encoder.set_color(::png::ColorType::Rgba);
    encoder.set_depth(match self {
      Self::Rgba8(_) => ::png::BitDepth::Eight,
      Self::Rgba16(_) => ::png::BitDepth::Sixteen,
    });
    let mut writer = encoder.write_header()?;
    writer.write_image_data(self.as_bytes())?;
    writer.finish()?;
    Ok(out)
  }
}

#[test]
fn test_closure_as_standard_decoder() {
  let mut calls = 0;
  let mut fake = |png: &[u8]| -> Result<DecodedImage, PngError> {
    calls += 1;
    assert_eq!(&png[..8], &PNG_SIGNATURE);
    Ok(DecodedImage::Rgba8(Bitmap::try_new(1, 1)?))
  };
  let img = fake.decode_standard(&PNG_SIGNATURE).unwrap();
  assert_eq!((img.width(), img.height()), (1, 1));
  drop(fake);
  assert_eq!(calls, 1);
}

#[cfg(feature = "std")]
#[test]
fn test_png_crate_gray_and_rgb() {
  // 2x1 8-bit grayscale
  let mut png_bytes = Vec::new();
  {
    let mut encoder = ::png::Encoder::new(&mut png_bytes, 2, 1);
    encoder.set_color(::png::ColorType::Grayscale);
    encoder.set_depth(::png::BitDepth::Eight);
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(&[7, 200]).unwrap();
  }
  let img = PngCrateDecoder.decode_standard(&png_bytes).unwrap();
  assert_eq!(img.as_bytes(), &[7, 7, 7, 255, 200, 200, 200, 255]);

  // 1x1 16-bit RGB
  let mut png_bytes = Vec::new();
  {
    let mut encoder = ::png::Encoder::new(&mut png_bytes, 1, 1);
    encoder.set_color(::png::ColorType::Rgb);
    encoder.set_depth(::png::BitDepth::Sixteen);
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(&[1, 2, 3, 4, 5, 6]).unwrap();
  }
  let img = PngCrateDecoder.decode_standard(&png_bytes).unwrap();
  assert_eq!(img.bits_per_channel(), 16);
  assert_eq!(img.as_bytes(), &[1, 2, 3, 4, 5, 6, 0xFF, 0xFF]);
}

#[cfg(feature = "std")]
#[test]
fn test_to_png_bytes_keeps_depth() {
  let img = DecodedImage::Rgba16(Bitmap {
    width: 1,
    height: 2,
    pixels: alloc::vec![
      RGBA16_BE::from_channels(1, 2, 3, 4),
      RGBA16_BE::from_channels(0xFFFF, 0x8000, 0, 0x1234),
    ],
  });
  let png_bytes = img.to_png_bytes().unwrap();
  assert_eq!(PngCrateDecoder.decode_standard(&png_bytes).unwrap(), img);
}
