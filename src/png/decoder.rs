use super::*;

use alloc::boxed::Box;

use miniz_oxide::inflate::{
  core::{decompress, inflate_flags, DecompressorOxide},
  TINFLStatus,
};

/// Settings for one decode.
///
/// The dimension limits are checked as soon as the header is read, before
/// anything is inflated or allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodeOptions {
  /// Largest image width accepted.
  pub max_width: u32,
  /// Largest image height accepted.
  pub max_height: u32,
  /// Divide CgBI color channels by alpha after decoding.
  ///
  /// Off by default, so a decode gives back the stored premultiplied values.
  /// Standard PNG files are never touched by this.
  pub unpremultiply_alpha: bool,
}
impl Default for DecodeOptions {
  #[inline]
  fn default() -> Self {
    Self { max_width: 17_000, max_height: 17_000, unpremultiply_alpha: false }
  }
}
impl DecodeOptions {
  #[inline]
  #[must_use]
  pub const fn with_max_width(self, max_width: u32) -> Self {
    Self { max_width, ..self }
  }
  #[inline]
  #[must_use]
  pub const fn with_max_height(self, max_height: u32) -> Self {
    Self { max_height, ..self }
  }
  #[inline]
  #[must_use]
  pub const fn with_unpremultiply_alpha(self, unpremultiply_alpha: bool) -> Self {
    Self { unpremultiply_alpha, ..self }
  }
}

/// How far through the critical chunks a CgBI decode got.
///
/// Errors about chunk order report the stage they happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DecodeStage {
  /// Nothing after the `CgBI` marker yet.
  Start,
  /// The header has been read.
  SeenIHDR,
  /// At least one image data chunk has been read.
  SeenIDAT,
  /// The end chunk has been read and the image is decoded.
  SeenIEND,
}

/// What a chunk means to the stage machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkRole {
  Header,
  Data,
  End,
  /// Everything else, including a second `CgBI` marker.
  Ignored,
}
impl From<ChunkType> for ChunkRole {
  #[inline]
  fn from(chunk_ty: ChunkType) -> Self {
    match chunk_ty {
      ChunkType::IHDR => Self::Header,
      ChunkType::IDAT => Self::Data,
      ChunkType::IEND => Self::End,
      _ => Self::Ignored,
    }
  }
}

/// Decoder state, each stage holding only what it has gathered so far.
#[derive(Debug)]
enum DecoderState {
  Start,
  SeenIhdr(IHDR),
  SeenIdat { header: IHDR, compressed: Vec<u8> },
  SeenIend { header: IHDR, image: DecodedImage },
}
impl DecoderState {
  #[inline]
  const fn stage(&self) -> DecodeStage {
    match self {
      Self::Start => DecodeStage::Start,
      Self::SeenIhdr(_) => DecodeStage::SeenIHDR,
      Self::SeenIdat { .. } => DecodeStage::SeenIDAT,
      Self::SeenIend { .. } => DecodeStage::SeenIEND,
    }
  }

  /// Feeds one chunk through the stage machine.
  fn consume(self, chunk: &PngRawChunk<'_>, options: &DecodeOptions) -> Result<Self, PngError> {
    let chunk_ty = chunk.chunk_ty;
    match (self, ChunkRole::from(chunk_ty)) {
      (state, ChunkRole::Ignored) => {
        if state.stage() == DecodeStage::SeenIDAT {
          warn!("ancillary chunk {chunk_ty} after image data, ignoring it");
        } else {
          trace!("ignoring chunk {chunk_ty}");
        }
        Ok(state)
      }
      (Self::Start, ChunkRole::Header) => {
        let header = IHDR::try_from(chunk)?;
        if header.width > options.max_width || header.height > options.max_height {
          return Err(PngError::DimensionsTooLarge { width: header.width, height: header.height });
        }
        debug!("{header:?}");
        Ok(Self::SeenIhdr(header))
      }
      (Self::SeenIhdr(header), ChunkRole::Data) => {
        let mut compressed = Vec::new();
        compressed.try_reserve(chunk.data.len())?;
        compressed.extend_from_slice(chunk.data);
        Ok(Self::SeenIdat { header, compressed })
      }
      (Self::SeenIdat { header, mut compressed }, ChunkRole::Data) => {
        compressed.try_reserve(chunk.data.len())?;
        compressed.extend_from_slice(chunk.data);
        Ok(Self::SeenIdat { header, compressed })
      }
      (Self::SeenIdat { header, compressed }, ChunkRole::End) => {
        let image = decode_image_data(&header, &compressed)?;
        Ok(Self::SeenIend { header, image })
      }
      (state, _) => Err(PngError::ChunkOrderViolation { chunk_ty, stage: state.stage() }),
    }
  }
}

/// Inflates CgBI image data, which is a raw deflate stream with no zlib
/// wrapper (and so no Adler-32 to check).
///
/// Output stops at `expected` bytes. The buffer grows as the stream actually
/// produces data, so a header that promises a huge image can't make us
/// allocate for it up front. A stream that ends early gives back whatever it
/// did produce.
fn inflate_raw(compressed: &[u8], expected: usize) -> Result<Vec<u8>, PngError> {
  const INFLATE_CHUNK: usize = 32 * 1024;
  let mut filtered: Vec<u8> = Vec::new();
  let first_len = compressed.len().saturating_mul(4).max(INFLATE_CHUNK).min(expected);
  filtered.try_reserve_exact(first_len)?;
  filtered.resize(first_len, 0);
  let mut decomp = Box::<DecompressorOxide>::default();
  let mut in_pos = 0;
  let mut out_pos = 0;
  loop {
    let (status, in_consumed, out_consumed) = decompress(
      &mut decomp,
      &compressed[in_pos..],
      &mut filtered,
      out_pos,
      inflate_flags::TINFL_FLAG_USING_NON_WRAPPING_OUTPUT_BUF,
    );
    in_pos += in_consumed;
    out_pos += out_consumed;
    match status {
      TINFLStatus::Done => break,
      TINFLStatus::HasMoreOutput if filtered.len() >= expected => {
        debug!("stopped inflating at {expected} bytes");
        break;
      }
      TINFLStatus::HasMoreOutput => {
        // double each time, but never past what the header needs
        let grow_by = filtered.len().max(INFLATE_CHUNK);
        let new_len = filtered.len().saturating_add(grow_by).min(expected);
        filtered.try_reserve_exact(new_len - filtered.len())?;
        filtered.resize(new_len, 0);
      }
      TINFLStatus::FailedCannotMakeProgress | TINFLStatus::NeedsMoreInput => {
        debug!("image data ended after {out_pos} of {expected} bytes");
        break;
      }
      status => return Err(PngError::Decompression(status)),
    }
  }
  filtered.truncate(out_pos);
  Ok(filtered)
}

/// Turns the collected image data into the final raster.
fn decode_image_data(header: &IHDR, compressed: &[u8]) -> Result<DecodedImage, PngError> {
  let layout = CgbiPixelLayout::for_header(header)?;
  let expected = header.filtered_data_len()?;
  let filtered = inflate_raw(compressed, expected)?;
  debug!("inflated {} bytes into {}", compressed.len(), filtered.len());
  // Nothing sized by the header gets allocated until the data is known to
  // cover every line.
  check_line_coverage(header, filtered.len())?;
  let mut source = ScanlineSource::new(&filtered);
  let image = if header.is_interlaced {
    let mut full = layout.allocate(header.width, header.height)?;
    for pass in ADAM7_PASSES {
      let reduced = read_image_pass(header, layout, &mut source, pass)?;
      debug!("pass {}: {}x{}", pass.number, reduced.width(), reduced.height());
      merge_decoded_pass(&mut full, &reduced, pass)?;
    }
    full
  } else {
    read_image_pass(header, layout, &mut source, Adam7Pass::FULL_IMAGE)?
  };
  if source.remaining() > 0 {
    warn!("{} bytes of image data left over", source.remaining());
  }
  Ok(image)
}

/// Scatters a decoded pass into the full image.
///
/// ## Failure
/// * [`PngError::LayoutMismatch`] if the two images have different pixel
///   layouts.
pub fn merge_decoded_pass(
  full: &mut DecodedImage, reduced: &DecodedImage, pass: Adam7Pass,
) -> Result<(), PngError> {
  match (full, reduced) {
    (DecodedImage::Rgba8(dst), DecodedImage::Rgba8(src)) => merge_pass_into(dst, src, pass),
    (DecodedImage::Rgba16(dst), DecodedImage::Rgba16(src)) => merge_pass_into(dst, src, pass),
    _ => return Err(PngError::LayoutMismatch),
  }
  Ok(())
}

/// The result of decoding a file that might or might not be CgBI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPng {
  /// If the file started with the `CgBI` marker chunk.
  pub is_cgbi: bool,
  /// The parsed header of a CgBI file.
  ///
  /// Standard files are decoded by someone else, so this is `None` for them.
  pub header: Option<IHDR>,
  /// The pixels.
  pub image: DecodedImage,
}

/// Decodes PNG bytes, handing standard (non-CgBI) files off to `standard`.
///
/// A file is CgBI when its first chunk is the `CgBI` marker. Otherwise the
/// full input bytes, signature and all, go to `standard` untouched.
///
/// ## Failure
/// Any error from reading the chunks, from the CgBI decode, or from
/// `standard`. There's no partial image.
pub fn decode_with<D: StandardPngDecoder + ?Sized>(
  bytes: &[u8], options: &DecodeOptions, standard: &mut D,
) -> Result<DecodedPng, PngError> {
  let chunks = read_png_chunks(bytes)?;
  decode_chunk_list(bytes, &chunks, options, standard)
}

/// Everything [`decode_with`] does once the chunks are read.
fn decode_chunk_list<D: StandardPngDecoder + ?Sized>(
  bytes: &[u8], chunks: &[PngRawChunk<'_>], options: &DecodeOptions, standard: &mut D,
) -> Result<DecodedPng, PngError> {
  let (first, rest) = chunks.split_first().ok_or(PngError::NoChunksFound)?;
  if first.chunk_ty != ChunkType::CgBI {
    debug!("first chunk is {}, not CgBI, using the standard decoder", first.chunk_ty);
    let image = standard.decode_standard(bytes)?;
    return Ok(DecodedPng { is_cgbi: false, header: None, image });
  }
  debug!("CgBI file with {} chunks", chunks.len());

  let mut state = DecoderState::Start;
  for chunk in rest {
    state = state.consume(chunk, options)?;
  }
  match state {
    DecoderState::SeenIend { header, mut image } => {
      if options.unpremultiply_alpha {
        image.unpremultiply_alpha();
      }
      Ok(DecodedPng { is_cgbi: true, header: Some(header), image })
    }
    other => Err(PngError::MissingIendChunk { stage: other.stage() }),
  }
}

/// Decodes PNG bytes with the default options, using the `png` crate for
/// standard files.
#[cfg(feature = "std")]
#[inline]
pub fn decode(bytes: &[u8]) -> Result<DecodedPng, PngError> {
  decode_with(bytes, &DecodeOptions::default(), &mut PngCrateDecoder)
}

#[cfg(test)]
fn chunk(chunk_ty: ChunkType, data: &[u8]) -> PngRawChunk<'_> {
  PngRawChunk { chunk_ty, data, declared_crc: chunk_crc(chunk_ty, data) }
}

#[test]
fn test_stage_machine_order_violations() {
  let opts = DecodeOptions::default();
  let ihdr_data = [0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 0, 0, 0];
  let ihdr = chunk(ChunkType::IHDR, &ihdr_data);
  let idat = chunk(ChunkType::IDAT, &[]);
  let iend = chunk(ChunkType::IEND, &[]);

  let err = DecoderState::Start.consume(&idat, &opts).unwrap_err();
  assert_eq!(
    err,
    PngError::ChunkOrderViolation { chunk_ty: ChunkType::IDAT, stage: DecodeStage::Start }
  );
  let err = DecoderState::Start.consume(&iend, &opts).unwrap_err();
  assert_eq!(
    err,
    PngError::ChunkOrderViolation { chunk_ty: ChunkType::IEND, stage: DecodeStage::Start }
  );

  let state = DecoderState::Start.consume(&ihdr, &opts).unwrap();
  assert_eq!(state.stage(), DecodeStage::SeenIHDR);
  let err = state.consume(&ihdr, &opts).unwrap_err();
  assert_eq!(
    err,
    PngError::ChunkOrderViolation { chunk_ty: ChunkType::IHDR, stage: DecodeStage::SeenIHDR }
  );

  let state = DecoderState::Start.consume(&ihdr, &opts).unwrap();
  let err = state.consume(&iend, &opts).unwrap_err();
  assert_eq!(
    err,
    PngError::ChunkOrderViolation { chunk_ty: ChunkType::IEND, stage: DecodeStage::SeenIHDR }
  );

  let state = DecoderState::Start.consume(&ihdr, &opts).unwrap();
  let state = state.consume(&idat, &opts).unwrap();
  let state = state.consume(&idat, &opts).unwrap();
  assert_eq!(state.stage(), DecodeStage::SeenIDAT);
  let err = state.consume(&ihdr, &opts).unwrap_err();
  assert_eq!(
    err,
    PngError::ChunkOrderViolation { chunk_ty: ChunkType::IHDR, stage: DecodeStage::SeenIDAT }
  );
}

#[test]
fn test_stage_machine_ignores_other_chunks() {
  let opts = DecodeOptions::default();
  let text = chunk(ChunkType(*b"tEXt"), b"hello");
  let marker = chunk(ChunkType::CgBI, &[0x50, 0x00, 0x20, 0x06]);
  let state = DecoderState::Start.consume(&text, &opts).unwrap();
  let state = state.consume(&marker, &opts).unwrap();
  assert_eq!(state.stage(), DecodeStage::Start);
}

#[test]
fn test_stage_machine_collects_idat() {
  let opts = DecodeOptions::default();
  let ihdr_data = [0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 0, 0, 0];
  let state = DecoderState::Start.consume(&chunk(ChunkType::IHDR, &ihdr_data), &opts).unwrap();
  let state = state.consume(&chunk(ChunkType::IDAT, &[1, 2]), &opts).unwrap();
  let state = state.consume(&chunk(ChunkType(*b"zzZz"), &[9]), &opts).unwrap();
  let state = state.consume(&chunk(ChunkType::IDAT, &[3]), &opts).unwrap();
  match state {
    DecoderState::SeenIdat { compressed, .. } => assert_eq!(compressed, [1, 2, 3]),
    other => panic!("{other:?}"),
  }
}

#[test]
fn test_dimension_limits() {
  let ihdr_data = [0, 0, 0, 200, 0, 0, 0, 100, 8, 6, 0, 0, 0];
  let ihdr = chunk(ChunkType::IHDR, &ihdr_data);
  let opts = DecodeOptions::default().with_max_width(199);
  assert_eq!(
    DecoderState::Start.consume(&ihdr, &opts).unwrap_err(),
    PngError::DimensionsTooLarge { width: 200, height: 100 }
  );
  let opts = DecodeOptions::default().with_max_width(200).with_max_height(99);
  assert!(DecoderState::Start.consume(&ihdr, &opts).is_err());
  let opts = DecodeOptions::default().with_max_width(200).with_max_height(100);
  assert!(DecoderState::Start.consume(&ihdr, &opts).is_ok());
}

#[test]
fn test_inflate_raw_limits() {
  let raw: Vec<u8> = (0..100_u8).collect();
  let compressed = miniz_oxide::deflate::compress_to_vec(&raw, 6);
  assert_eq!(inflate_raw(&compressed, 100).unwrap(), raw);
  // too much output is cut at the limit
  assert_eq!(inflate_raw(&compressed, 40).unwrap(), &raw[..40]);
  // not enough input gives a short result instead of an error
  let short = inflate_raw(&compressed[..compressed.len() / 2], 100).unwrap();
  assert!(short.len() < 100);
  assert_eq!(short, &raw[..short.len()]);
  // garbage
  assert!(matches!(inflate_raw(&[0xFF; 16], 100), Err(PngError::Decompression(_))));
}

#[test]
fn test_merge_decoded_pass_mismatch() {
  let mut full = CgbiPixelLayout::Bgra8.allocate(4, 4).unwrap();
  let reduced = CgbiPixelLayout::Bgra16.allocate(1, 1).unwrap();
  assert_eq!(
    merge_decoded_pass(&mut full, &reduced, ADAM7_PASSES[0]),
    Err(PngError::LayoutMismatch)
  );
}

#[test]
fn test_inflate_raw_grows_with_the_stream() {
  // a header promising 17000x17000 RGBA8, backed by ten filtered bytes
  let expected = 17_000 * (1 + 17_000 * 4);
  let compressed = miniz_oxide::deflate::compress_to_vec(&[0; 10], 6);
  let filtered = inflate_raw(&compressed, expected).unwrap();
  assert_eq!(filtered, [0; 10]);
  assert!(filtered.capacity() < 1024 * 1024, "capacity {}", filtered.capacity());

  let header = IHDR {
    width: 17_000,
    height: 17_000,
    bit_depth: 8,
    color_type: PngColorType::RGBA,
    is_interlaced: false,
  };
  assert_eq!(header.filtered_data_len(), Ok(expected));
  assert_eq!(
    decode_image_data(&header, &compressed),
    Err(PngError::InsufficientPixelData { pass: 0, row: 0 })
  );

  // output bigger than the first buffer still comes out whole
  let raw: Vec<u8> = (0..200_000_u32).map(|i| (i % 251) as u8).collect();
  let compressed = miniz_oxide::deflate::compress_to_vec(&raw, 6);
  assert_eq!(inflate_raw(&compressed, raw.len()).unwrap(), raw);
  assert_eq!(inflate_raw(&compressed, 70_000).unwrap(), &raw[..70_000]);
}

#[test]
fn test_chunk_lists_without_an_end() {
  let opts = DecodeOptions::default();
  let mut never_called =
    |_: &[u8]| -> Result<DecodedImage, PngError> { panic!("standard decoder") };
  assert_eq!(
    decode_chunk_list(&[], &[], &opts, &mut never_called),
    Err(PngError::NoChunksFound)
  );

  let ihdr_data = [0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 0, 0, 0];
  let marker = chunk(ChunkType::CgBI, &[0x50, 0x00, 0x20, 0x06]);
  let ihdr = chunk(ChunkType::IHDR, &ihdr_data);
  let idat = chunk(ChunkType::IDAT, &[3, 0]);
  assert_eq!(
    decode_chunk_list(&[], &[marker, ihdr, idat], &opts, &mut never_called),
    Err(PngError::MissingIendChunk { stage: DecodeStage::SeenIDAT })
  );
  assert_eq!(
    decode_chunk_list(&[], &[marker, ihdr], &opts, &mut never_called),
    Err(PngError::MissingIendChunk { stage: DecodeStage::SeenIHDR })
  );
  assert_eq!(
    decode_chunk_list(&[], &[marker], &opts, &mut never_called),
    Err(PngError::MissingIendChunk { stage: DecodeStage::Start })
  );
}
