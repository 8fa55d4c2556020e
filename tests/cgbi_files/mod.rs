use cgbi::{
  png::{
    decode, decode_with, read_png_chunks, ChunkListing, ChunkType, DecodeOptions, DecodeStage,
    PngColorType, PngCrateDecoder, ADAM7_PASSES, IHDR,
  },
  ChunkField, PngError,
};

use super::{cgbi_file, ihdr_data, push_chunk, rand_bytes, raw_deflate, CGBI_MARKER_DATA};

/// Filter type 0 lines of BGRA bytes, from pixels given as RGBA.
fn bgra8_lines(width: usize, rgba: &[[u8; 4]]) -> Vec<u8> {
  let mut out = Vec::new();
  for row in rgba.chunks_exact(width) {
    out.push(0);
    for [r, g, b, a] in row.iter().copied() {
      out.extend_from_slice(&[b, g, r, a]);
    }
  }
  out
}

/// The filtered stream of an interlaced image, every line filter type 0.
fn interlaced_lines(
  width: u32, height: u32, stored_pixel: impl Fn(u32, u32) -> Vec<u8>,
) -> Vec<u8> {
  let mut out = Vec::new();
  for pass in ADAM7_PASSES {
    let (w, h) = pass.reduced_dimensions(width, height);
    if w == 0 || h == 0 {
      continue;
    }
    for y in 0..h {
      out.push(0);
      for x in 0..w {
        let (fx, fy) = pass.full_pos(x, y);
        out.extend(stored_pixel(fx, fy));
      }
    }
  }
  out
}

fn rgba_at(x: u32, y: u32) -> [u8; 4] {
  [(x * 40) as u8, (y * 30) as u8, 7, (255 - x - y) as u8]
}

#[test]
fn test_decode_rgba8_swaps_channels() {
  let rgba = [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255], [30, 20, 10, 128]];
  let file = cgbi_file(&ihdr_data(2, 2, 8, 6, 0), &bgra8_lines(2, &rgba));
  let decoded = decode(&file).unwrap();
  assert!(decoded.is_cgbi);
  assert_eq!(
    decoded.header,
    Some(IHDR {
      width: 2,
      height: 2,
      bit_depth: 8,
      color_type: PngColorType::RGBA,
      is_interlaced: false
    })
  );
  assert_eq!(decoded.image.bits_per_channel(), 8);
  assert_eq!(decoded.image.as_bytes(), rgba.concat());
}

#[test]
fn test_decode_filtered_lines() {
  // 3x2, row 0 uses Sub and row 1 uses Paeth.
  let (width, height) = (3_u32, 2_u32);
  let stored: Vec<[u8; 4]> = (0..height)
    .flat_map(|y| (0..width).map(move |x| rgba_at(x, y)))
    .map(|[r, g, b, a]| [b, g, r, a])
    .collect();
  let raw: Vec<u8> = stored.concat();
  let stride = width as usize * 4;
  let paeth = |a: u8, b: u8, c: u8| {
    let p = i32::from(a) + i32::from(b) - i32::from(c);
    let (pa, pb, pc) =
      ((p - i32::from(a)).abs(), (p - i32::from(b)).abs(), (p - i32::from(c)).abs());
    if pa <= pb && pa <= pc {
      a
    } else if pb <= pc {
      b
    } else {
      c
    }
  };
  let mut filtered = vec![1];
  for i in 0..stride {
    let left = if i >= 4 { raw[i - 4] } else { 0 };
    filtered.push(raw[i].wrapping_sub(left));
  }
  filtered.push(4);
  for i in 0..stride {
    let left = if i >= 4 { raw[stride + i - 4] } else { 0 };
    let up_left = if i >= 4 { raw[i - 4] } else { 0 };
    filtered.push(raw[stride + i].wrapping_sub(paeth(left, raw[i], up_left)));
  }
  let file = cgbi_file(&ihdr_data(width, height, 8, 6, 0), &filtered);
  let decoded = decode(&file).unwrap();
  let expected: Vec<u8> =
    (0..height).flat_map(|y| (0..width).flat_map(move |x| rgba_at(x, y))).collect();
  assert_eq!(decoded.image.as_bytes(), expected);
}

#[test]
fn test_decode_interlaced_matches_progressive() {
  for (width, height) in [(1, 1), (2, 2), (5, 3), (8, 8), (9, 11)] {
    let bgra = |x, y| {
      let [r, g, b, a] = rgba_at(x, y);
      vec![b, g, r, a]
    };
    let interlaced =
      cgbi_file(&ihdr_data(width, height, 8, 6, 1), &interlaced_lines(width, height, bgra));
    let mut progressive_lines = Vec::new();
    for y in 0..height {
      progressive_lines.push(0);
      for x in 0..width {
        progressive_lines.extend(bgra(x, y));
      }
    }
    let progressive = cgbi_file(&ihdr_data(width, height, 8, 6, 0), &progressive_lines);

    let a = decode(&interlaced).unwrap();
    let b = decode(&progressive).unwrap();
    assert!(a.header.unwrap().is_interlaced);
    assert_eq!(a.image, b.image, "{width}x{height}");
    let expected: Vec<u8> =
      (0..height).flat_map(|y| (0..width).flat_map(move |x| rgba_at(x, y))).collect();
    assert_eq!(a.image.as_bytes(), expected, "{width}x{height}");
  }
}

#[test]
fn test_decode_low_depth_grayscale() {
  let (width, height) = (5_u32, 2_u32);
  for depth in [1_u8, 2, 4] {
    let max = (1_u8 << depth) - 1;
    let sample = |x: u32, y: u32| ((x + 2 * y) % (u32::from(max) + 1)) as u8;
    let line_bytes = (width as usize * usize::from(depth) + 7) / 8;
    let mut filtered = Vec::new();
    for y in 0..height {
      filtered.push(0);
      let mut line = vec![0_u8; line_bytes];
      for x in 0..width {
        let bit = x as usize * usize::from(depth);
        line[bit / 8] |= sample(x, y) << (8 - usize::from(depth) - bit % 8);
      }
      filtered.extend(line);
    }
    let file = cgbi_file(&ihdr_data(width, height, depth, 0, 0), &filtered);
    let decoded = decode(&file).unwrap();
    assert_eq!(decoded.image.bits_per_channel(), 8);
    let expected: Vec<u8> = (0..height)
      .flat_map(|y| (0..width).map(move |x| (x, y)))
      .flat_map(|(x, y)| {
        let v = sample(x, y) * (255 / max);
        [v, v, v, 255]
      })
      .collect();
    assert_eq!(decoded.image.as_bytes(), expected, "depth {depth}");
  }
}

#[test]
fn test_decode_rgba16() {
  let filtered = [
    0, //
    1, 2, 3, 4, 5, 6, 7, 8, // B G R A
    0xF0, 0x0F, 0xE0, 0x0E, 0xD0, 0x0D, 0xFF, 0xFF,
  ];
  let file = cgbi_file(&ihdr_data(2, 1, 16, 6, 0), &filtered);
  let decoded = decode(&file).unwrap();
  assert_eq!(decoded.image.bits_per_channel(), 16);
  assert_eq!(
    decoded.image.as_bytes(),
    &[5, 6, 3, 4, 1, 2, 7, 8, 0xD0, 0x0D, 0xE0, 0x0E, 0xF0, 0x0F, 0xFF, 0xFF]
  );
}

#[test]
fn test_decode_rgba16_interlaced() {
  let (width, height) = (3_u32, 5_u32);
  let stored = |x: u32, y: u32| {
    let [r, g, b, a] = rgba_at(x, y);
    vec![b, 1, g, 2, r, 3, a, 4]
  };
  let file =
    cgbi_file(&ihdr_data(width, height, 16, 6, 1), &interlaced_lines(width, height, stored));
  let decoded = decode(&file).unwrap();
  let expected: Vec<u8> = (0..height)
    .flat_map(|y| (0..width).map(move |x| rgba_at(x, y)))
    .flat_map(|[r, g, b, a]| [r, 3, g, 2, b, 1, a, 4])
    .collect();
  assert_eq!(decoded.image.as_bytes(), expected);
}

#[test]
fn test_decode_split_data_and_extra_chunks() {
  let rgba = [[1, 2, 3, 4], [5, 6, 7, 8], [9, 10, 11, 12], [13, 14, 15, 16]];
  let compressed = raw_deflate(&bgra8_lines(2, &rgba));
  let (first, rest) = compressed.split_at(compressed.len() / 2);
  let mut file = cgbi::png::PNG_SIGNATURE.to_vec();
  push_chunk(&mut file, b"CgBI", &CGBI_MARKER_DATA);
  push_chunk(&mut file, &[0; 4], b"blank");
  push_chunk(&mut file, b"IHDR", &ihdr_data(2, 2, 8, 6, 0));
  push_chunk(&mut file, b"sRGB", &[0]);
  push_chunk(&mut file, b"IDAT", first);
  push_chunk(&mut file, b"tEXt", b"between\0data");
  push_chunk(&mut file, b"CgBI", &CGBI_MARKER_DATA);
  push_chunk(&mut file, b"IDAT", rest);
  push_chunk(&mut file, b"IEND", &[]);
  // nothing after IEND is looked at
  file.extend_from_slice(b"trailing garbage");

  let chunks = read_png_chunks(&file).unwrap();
  assert_eq!(chunks.len(), 8);
  assert!(chunks.iter().all(|c| !c.chunk_ty().is_blank()));

  let decoded = decode(&file).unwrap();
  assert_eq!(decoded.image.as_bytes(), rgba.concat());
}

#[test]
fn test_decode_ignores_excess_image_data() {
  let rgba = [[1, 2, 3, 4]];
  let mut filtered = bgra8_lines(1, &rgba);
  filtered.extend_from_slice(&[0; 64]);
  let decoded = decode(&cgbi_file(&ihdr_data(1, 1, 8, 6, 0), &filtered)).unwrap();
  assert_eq!(decoded.image.as_bytes(), &[1, 2, 3, 4]);
}

#[test]
fn test_unpremultiply_option() {
  let file = cgbi_file(&ihdr_data(1, 1, 8, 6, 0), &[0, 0, 32, 64, 128]);
  let plain = decode(&file).unwrap();
  assert_eq!(plain.image.as_bytes(), &[64, 32, 0, 128]);
  let opts = DecodeOptions::default().with_unpremultiply_alpha(true);
  let fixed = decode_with(&file, &opts, &mut PngCrateDecoder).unwrap();
  assert_eq!(fixed.image.as_bytes(), &[128, 64, 0, 128]);
}

#[test]
fn test_round_trip_through_standard_png() {
  let rgba = [[255, 0, 0, 255], [0, 255, 0, 200], [0, 0, 255, 100], [30, 20, 10, 0]];
  let file = cgbi_file(&ihdr_data(2, 2, 8, 6, 0), &bgra8_lines(2, &rgba));
  let decoded = decode(&file).unwrap();
  let standard = decoded.image.to_png_bytes().unwrap();
  let again = decode(&standard).unwrap();
  assert!(!again.is_cgbi);
  assert_eq!(again.header, None);
  assert_eq!(again.image, decoded.image);
}

#[test]
fn test_signature_errors() {
  assert_eq!(decode(b"\x89PN"), Err(PngError::UnexpectedEndOfFile));
  assert_eq!(decode(b"GIF89a-not-a-png"), Err(PngError::NotAPngFile));
  assert_eq!(
    decode(&cgbi::png::PNG_SIGNATURE),
    Err(PngError::TruncatedInput { field: ChunkField::Length, needed: 4, available: 0 })
  );
}

#[test]
fn test_truncated_file() {
  let file = cgbi_file(&ihdr_data(1, 1, 8, 6, 0), &[0, 1, 2, 3, 4]);
  // drops IEND (12 bytes) and half of the IDAT CRC
  let cut = &file[..file.len() - 14];
  assert_eq!(
    decode(cut),
    Err(PngError::TruncatedInput { field: ChunkField::Crc, needed: 4, available: 2 })
  );
  // no IEND at all
  let cut = &file[..file.len() - 12];
  assert_eq!(
    decode(cut),
    Err(PngError::TruncatedInput { field: ChunkField::Length, needed: 4, available: 0 })
  );
}

#[test]
fn test_checksum_mismatch() {
  let mut file = cgbi_file(&ihdr_data(1, 1, 8, 6, 0), &[0, 1, 2, 3, 4]);
  // signature, then the 16 byte marker chunk, then IHDR's length and type
  file[8 + 16 + 8 + 1] ^= 0x01;
  match decode(&file) {
    Err(PngError::ChecksumMismatch { chunk_ty, declared, actual }) => {
      assert_eq!(chunk_ty, ChunkType::IHDR);
      assert_ne!(declared, actual);
    }
    other => panic!("{other:?}"),
  }
}

#[test]
fn test_chunk_order_violation() {
  let mut file = cgbi::png::PNG_SIGNATURE.to_vec();
  push_chunk(&mut file, b"CgBI", &CGBI_MARKER_DATA);
  push_chunk(&mut file, b"IDAT", &raw_deflate(&[0, 1, 2, 3, 4]));
  push_chunk(&mut file, b"IHDR", &ihdr_data(1, 1, 8, 6, 0));
  push_chunk(&mut file, b"IEND", &[]);
  assert_eq!(
    decode(&file),
    Err(PngError::ChunkOrderViolation { chunk_ty: ChunkType::IDAT, stage: DecodeStage::Start })
  );

  // IEND straight after IHDR
  let mut file = cgbi::png::PNG_SIGNATURE.to_vec();
  push_chunk(&mut file, b"CgBI", &CGBI_MARKER_DATA);
  push_chunk(&mut file, b"IHDR", &ihdr_data(1, 1, 8, 6, 0));
  push_chunk(&mut file, b"IEND", &[]);
  assert_eq!(
    decode(&file),
    Err(PngError::ChunkOrderViolation { chunk_ty: ChunkType::IEND, stage: DecodeStage::SeenIHDR })
  );
}

#[test]
fn test_header_errors() {
  assert_eq!(
    decode(&cgbi_file(&ihdr_data(1, 1, 8, 6, 2), &[0, 1, 2, 3, 4])),
    Err(PngError::UnsupportedInterlace(2))
  );
  assert_eq!(
    decode(&cgbi_file(&ihdr_data(0, 1, 8, 6, 0), &[])),
    Err(PngError::InvalidDimension { width: 0, height: 1 })
  );
  assert_eq!(
    decode(&cgbi_file(&ihdr_data(1, 1, 8, 6, 0)[..12], &[])),
    Err(PngError::InvalidIhdrLength(12))
  );
  assert_eq!(
    decode(&cgbi_file(&ihdr_data(1, 1, 8, 2, 0), &[0, 1, 2, 3])),
    Err(PngError::UnsupportedConfiguration { bit_depth: 8, color_type: 2 })
  );
  assert_eq!(
    decode(&cgbi_file(&ihdr_data(1, 1, 2, 3, 0), &[0, 0])),
    Err(PngError::UnsupportedConfiguration { bit_depth: 2, color_type: 3 })
  );
}

#[test]
fn test_dimension_limits() {
  let file = cgbi_file(&ihdr_data(1, 2, 8, 6, 0), &[0; 10]);
  let opts = DecodeOptions::default().with_max_height(1);
  assert_eq!(
    decode_with(&file, &opts, &mut PngCrateDecoder),
    Err(PngError::DimensionsTooLarge { width: 1, height: 2 })
  );
  assert!(decode_with(&file, &DecodeOptions::default(), &mut PngCrateDecoder).is_ok());
  // the default limits
  let file = cgbi_file(&ihdr_data(17_001, 1, 8, 6, 0), &[]);
  assert_eq!(decode(&file), Err(PngError::DimensionsTooLarge { width: 17_001, height: 1 }));
}

#[test]
fn test_pixel_data_errors() {
  assert_eq!(
    decode(&cgbi_file(&ihdr_data(1, 1, 8, 6, 0), &[5, 0, 0, 0, 0])),
    Err(PngError::BadFilterType(5))
  );
  // one line of two
  assert_eq!(
    decode(&cgbi_file(&ihdr_data(2, 2, 8, 6, 0), &[0; 9])),
    Err(PngError::InsufficientPixelData { pass: 0, row: 1 })
  );
  // 8x8 interlaced, only pass 1 (a single pixel) is present
  assert_eq!(
    decode(&cgbi_file(&ihdr_data(8, 8, 8, 6, 1), &[0; 5])),
    Err(PngError::InsufficientPixelData { pass: 2, row: 0 })
  );
  // a tiny file whose header promises far more than its data holds
  let file = cgbi_file(&ihdr_data(17_000, 17_000, 8, 6, 0), &[0; 10]);
  assert!(file.len() < 100);
  assert_eq!(decode(&file), Err(PngError::InsufficientPixelData { pass: 0, row: 0 }));
  // not a deflate stream at all
  let mut file = cgbi::png::PNG_SIGNATURE.to_vec();
  push_chunk(&mut file, b"CgBI", &CGBI_MARKER_DATA);
  push_chunk(&mut file, b"IHDR", &ihdr_data(1, 1, 8, 6, 0));
  push_chunk(&mut file, b"IDAT", &[0xFF; 16]);
  push_chunk(&mut file, b"IEND", &[]);
  assert!(matches!(decode(&file), Err(PngError::Decompression(_))));
}

#[test]
fn test_chunk_listing() {
  let file = cgbi_file(&ihdr_data(1, 1, 8, 6, 0), &[0, 1, 2, 3, 4]);
  let chunks = read_png_chunks(&file).unwrap();
  let types: Vec<ChunkType> = chunks.iter().map(|c| c.chunk_ty()).collect();
  assert_eq!(types, [ChunkType::CgBI, ChunkType::IHDR, ChunkType::IDAT, ChunkType::IEND]);
  let listing = ChunkListing(&chunks).to_string();
  assert!(listing.starts_with(
    "-----------\nchunk #0\nlength: 4\ntype: CgBI\ndata (20 bytes): 50 00 20 06\n-----------\nchunk #1\nlength: 13\ntype: IHDR\ndata (20 bytes): 00 00 00 01 00 00 00 01 08 06 00 00 00\n"
  ));
  assert!(listing.ends_with("chunk #3\nlength: 0\ntype: IEND\ndata (20 bytes):\n"));
}

#[test]
fn test_decode_random_bytes_no_panics() {
  for _ in 0..20 {
    let _ = decode(&rand_bytes(1024));

    let mut v = cgbi::png::PNG_SIGNATURE.to_vec();
    v.extend(rand_bytes(1024));
    let _ = decode(&v);

    // well framed, with random image data
    let mut v = cgbi::png::PNG_SIGNATURE.to_vec();
    push_chunk(&mut v, b"CgBI", &CGBI_MARKER_DATA);
    push_chunk(&mut v, b"IHDR", &ihdr_data(7, 5, 8, 6, 1));
    push_chunk(&mut v, b"IDAT", &rand_bytes(256));
    push_chunk(&mut v, b"IEND", &[]);
    let _ = decode(&v);

    // valid deflate of random filtered lines
    let _ = decode(&cgbi_file(&ihdr_data(7, 5, 4, 0, 1), &rand_bytes(64)));
  }
}
