use cgbi::{
  image::DecodedImage,
  png::{decode, decode_with, DecodeOptions, PngCrateDecoder},
  PngError,
};

use super::{cgbi_file, ihdr_data, push_chunk};

fn encode(
  width: u32, height: u32, color: png::ColorType, depth: png::BitDepth, data: &[u8],
  palette: Option<&[u8]>,
) -> Vec<u8> {
  let mut out = Vec::new();
  {
    let mut encoder = png::Encoder::new(&mut out, width, height);
    encoder.set_color(color);
    encoder.set_depth(depth);
    if let Some(palette) = palette {
      encoder.set_palette(palette.to_vec());
    }
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(data).unwrap();
  }
  out
}

#[test]
fn test_standard_files_expand_to_rgba() {
  use png::{BitDepth::*, ColorType::*};
  let cases: Vec<(Vec<u8>, u8, Vec<u8>)> = vec![
    (encode(2, 1, Grayscale, Eight, &[0, 99], None), 8, vec![0, 0, 0, 255, 99, 99, 99, 255]),
    (
      encode(4, 1, Grayscale, Two, &[0b00_01_10_11], None),
      8,
      vec![0, 0, 0, 255, 85, 85, 85, 255, 170, 170, 170, 255, 255, 255, 255, 255],
    ),
    (encode(1, 1, GrayscaleAlpha, Eight, &[40, 50], None), 8, vec![40, 40, 40, 50]),
    (encode(1, 1, Rgb, Eight, &[1, 2, 3], None), 8, vec![1, 2, 3, 255]),
    (encode(1, 1, Rgba, Eight, &[1, 2, 3, 4], None), 8, vec![1, 2, 3, 4]),
    (
      encode(2, 1, Indexed, Eight, &[1, 0], Some(&[10, 20, 30, 40, 50, 60][..])),
      8,
      vec![40, 50, 60, 255, 10, 20, 30, 255],
    ),
    (encode(1, 1, Grayscale, Sixteen, &[0x12, 0x34], None), 16, vec![
      0x12, 0x34, 0x12, 0x34, 0x12, 0x34, 0xFF, 0xFF,
    ]),
    (encode(1, 1, Rgba, Sixteen, &[1, 2, 3, 4, 5, 6, 7, 8], None), 16, vec![
      1, 2, 3, 4, 5, 6, 7, 8,
    ]),
  ];
  for (n, (file, bits, expected)) in cases.into_iter().enumerate() {
    let decoded = decode(&file).unwrap();
    assert!(!decoded.is_cgbi, "case {n}");
    assert_eq!(decoded.header, None, "case {n}");
    assert_eq!(decoded.image.bits_per_channel(), bits, "case {n}");
    assert_eq!(decoded.image.as_bytes(), expected, "case {n}");
  }
}

#[test]
fn test_standard_decoder_gets_whole_file() {
  let file = encode(1, 1, png::ColorType::Rgba, png::BitDepth::Eight, &[9, 8, 7, 6], None);
  let mut seen = Vec::new();
  let mut spy = |bytes: &[u8]| -> Result<DecodedImage, PngError> {
    seen = bytes.to_vec();
    PngCrateDecoder.decode_standard(bytes)
  };
  use cgbi::png::StandardPngDecoder;
  let decoded = decode_with(&file, &DecodeOptions::default(), &mut spy).unwrap();
  assert_eq!(decoded.image.as_bytes(), &[9, 8, 7, 6]);
  assert_eq!(seen, file);
}

#[test]
fn test_standard_decoder_errors_pass_through() {
  let file = encode(1, 1, png::ColorType::Rgba, png::BitDepth::Eight, &[9, 8, 7, 6], None);
  let mut refuse =
    |_: &[u8]| -> Result<DecodedImage, PngError> { Err(PngError::Standard("no thanks".into())) };
  assert_eq!(
    decode_with(&file, &DecodeOptions::default(), &mut refuse),
    Err(PngError::Standard("no thanks".into()))
  );

  // a standard file that frames fine but has a broken zlib stream
  let mut bad = cgbi::png::PNG_SIGNATURE.to_vec();
  push_chunk(&mut bad, b"IHDR", &ihdr_data(1, 1, 8, 6, 0));
  push_chunk(&mut bad, b"IDAT", &[0xFF; 8]);
  push_chunk(&mut bad, b"IEND", &[]);
  assert!(matches!(decode(&bad), Err(PngError::Standard(_))));
}

#[test]
fn test_standard_files_skip_unpremultiply() {
  let file = encode(1, 1, png::ColorType::Rgba, png::BitDepth::Eight, &[64, 32, 0, 128], None);
  let opts = DecodeOptions::default().with_unpremultiply_alpha(true);
  let decoded = decode_with(&file, &opts, &mut PngCrateDecoder).unwrap();
  assert_eq!(decoded.image.as_bytes(), &[64, 32, 0, 128]);
}

#[test]
fn test_cgbi_and_standard_agree() {
  let rgba: Vec<u8> = (0..6 * 4_u8).map(|i| i.wrapping_mul(37)).collect();
  let standard = encode(3, 2, png::ColorType::Rgba, png::BitDepth::Eight, &rgba, None);
  let mut filtered = Vec::new();
  for row in rgba.chunks_exact(3 * 4) {
    filtered.push(0);
    for px in row.chunks_exact(4) {
      filtered.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
    }
  }
  let cgbi_bytes = cgbi_file(&ihdr_data(3, 2, 8, 6, 0), &filtered);
  let a = decode(&standard).unwrap();
  let b = decode(&cgbi_bytes).unwrap();
  assert!(!a.is_cgbi && b.is_cgbi);
  assert_eq!(a.image, b.image);
}
