use alloc::string::String;
use core::fmt;

use crate::png::{ChunkType, DecodeStage};

/// The part of a chunk that was being read when the input ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChunkField {
  /// The 4-byte big-endian data length.
  Length,
  /// The 4-byte chunk type tag.
  Type,
  /// The `length` bytes of chunk data.
  Data,
  /// The 4-byte big-endian CRC.
  Crc,
}

/// An error from decoding a PNG or CgBI data stream.
///
/// Every error is fatal to the decode that produced it. There's no partial
/// image on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PngError {
  /// The first 8 bytes aren't the PNG signature.
  NotAPngFile,

  /// The input ended inside the 8-byte PNG signature.
  UnexpectedEndOfFile,

  /// The input ended inside a chunk.
  ///
  /// When `available` is 0 the input ended cleanly on a field boundary,
  /// otherwise the field itself was cut short.
  TruncatedInput {
    /// The field being read.
    field: ChunkField,
    /// How many bytes the field needed.
    needed: usize,
    /// How many bytes were left.
    available: usize,
  },

  /// A chunk's declared CRC doesn't match the CRC of its type and data.
  ChecksumMismatch {
    /// The chunk with the bad CRC.
    chunk_ty: ChunkType,
    /// The CRC stored in the file.
    declared: u32,
    /// The CRC computed from the chunk bytes.
    actual: u32,
  },

  /// The chunk list was empty.
  NoChunksFound,

  /// A critical chunk appeared somewhere it isn't allowed.
  ChunkOrderViolation {
    /// The chunk that was out of order.
    chunk_ty: ChunkType,
    /// What the decoder had seen before it.
    stage: DecodeStage,
  },

  /// The chunks ran out before `IEND` was processed.
  MissingIendChunk {
    /// How far the decoder got.
    stage: DecodeStage,
  },

  /// The `IHDR` chunk didn't have exactly 13 data bytes.
  InvalidIhdrLength(u32),

  /// The `IHDR` width or height is zero (or larger than PNG allows).
  InvalidDimension {
    #[allow(missing_docs)]
    width: u32,
    #[allow(missing_docs)]
    height: u32,
  },

  /// The bit depth isn't legal for the color type.
  InvalidColorDepth {
    #[allow(missing_docs)]
    bit_depth: u8,
    #[allow(missing_docs)]
    color_type: u8,
  },

  /// The compression method or filter method isn't 0.
  UnsupportedMethod {
    #[allow(missing_docs)]
    compression: u8,
    #[allow(missing_docs)]
    filter: u8,
  },

  /// The interlace method isn't 0 (none) or 1 (Adam7).
  UnsupportedInterlace(u8),

  /// The header is legal PNG, but CgBI pixel reconstruction doesn't handle
  /// this depth and color type combination.
  UnsupportedConfiguration {
    #[allow(missing_docs)]
    bit_depth: u8,
    #[allow(missing_docs)]
    color_type: u8,
  },

  /// The image is larger than the [`DecodeOptions`](crate::png::DecodeOptions)
  /// limits allow.
  DimensionsTooLarge {
    #[allow(missing_docs)]
    width: u32,
    #[allow(missing_docs)]
    height: u32,
  },

  /// The inflated image data ran out before the last scanline.
  InsufficientPixelData {
    /// The Adam7 pass (1 through 7), or 0 for a non-interlaced image.
    pass: usize,
    /// The scanline within that pass.
    row: u32,
  },

  /// A scanline started with a filter type other than 0 through 4.
  BadFilterType(u8),

  /// The compressed image data isn't a valid DEFLATE stream.
  Decompression(miniz_oxide::inflate::TINFLStatus),

  /// A size computation overflowed.
  CheckedMath,

  /// The allocator couldn't give us enough space.
  Alloc,

  /// A decoded pass didn't have the same pixel layout as the destination
  /// image.
  LayoutMismatch,

  /// The standard PNG codec failed.
  Standard(String),
}

impl fmt::Display for PngError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NotAPngFile => write!(f, "not a PNG file"),
      Self::UnexpectedEndOfFile => write!(f, "unexpected end of file in the PNG signature"),
      Self::TruncatedInput { field, needed, available: 0 } => {
        write!(f, "input ended before chunk {field:?} ({needed} bytes)")
      }
      Self::TruncatedInput { field, needed, available } => {
        write!(f, "chunk {field:?} truncated: needed {needed} bytes, got {available}")
      }
      Self::ChecksumMismatch { chunk_ty, declared, actual } => write!(
        f,
        "invalid checksum for chunk {chunk_ty}: declared {declared:#010X}, computed {actual:#010X}"
      ),
      Self::NoChunksFound => write!(f, "no chunks found"),
      Self::ChunkOrderViolation { chunk_ty, stage } => {
        write!(f, "chunk {chunk_ty} out of order (after {stage:?})")
      }
      Self::MissingIendChunk { stage } => write!(f, "no IEND chunk (stopped at {stage:?})"),
      Self::InvalidIhdrLength(len) => write!(f, "invalid IHDR length: got {len}, expected 13"),
      Self::InvalidDimension { width, height } => {
        write!(f, "invalid image dimensions {width}x{height}")
      }
      Self::InvalidColorDepth { bit_depth, color_type } => {
        write!(f, "invalid bit depth {bit_depth} for color type {color_type}")
      }
      Self::UnsupportedMethod { compression, filter } => write!(
        f,
        "unsupported compression method {compression} / filter method {filter}, expected 0 / 0"
      ),
      Self::UnsupportedInterlace(method) => {
        write!(f, "invalid interlace method {method}, expected 0 or 1")
      }
      Self::UnsupportedConfiguration { bit_depth, color_type } => write!(
        f,
        "CgBI data with bit depth {bit_depth} and color type {color_type} is not supported"
      ),
      Self::DimensionsTooLarge { width, height } => {
        write!(f, "image dimensions {width}x{height} exceed the decode limits")
      }
      Self::InsufficientPixelData { pass, row } => {
        write!(f, "not enough pixel data (pass {pass}, row {row})")
      }
      Self::BadFilterType(ty) => write!(f, "bad filter type {ty}"),
      Self::Decompression(status) => write!(f, "image data inflate failed: {status:?}"),
      Self::CheckedMath => write!(f, "image size computation overflowed"),
      Self::Alloc => write!(f, "allocation failed"),
      Self::LayoutMismatch => write!(f, "pass and destination pixel layouts differ"),
      Self::Standard(msg) => write!(f, "standard PNG codec: {msg}"),
    }
  }
}

#[cfg(feature = "std")]
impl std::error::Error for PngError {}

#[cfg(feature = "std")]
impl From<::png::DecodingError> for PngError {
  #[inline]
  fn from(e: ::png::DecodingError) -> Self {
    use alloc::string::ToString;
    Self::Standard(e.to_string())
  }
}

#[cfg(feature = "std")]
impl From<::png::EncodingError> for PngError {
  #[inline]
  fn from(e: ::png::EncodingError) -> Self {
    use alloc::string::ToString;
    Self::Standard(e.to_string())
  }
}

impl From<alloc::collections::TryReserveError> for PngError {
  #[inline]
  fn from(_: alloc::collections::TryReserveError) -> Self {
    Self::Alloc
  }
}
