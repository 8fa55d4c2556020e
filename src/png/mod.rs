//! Decoding for Apple's CgBI PNG variant.
//!
//! Xcode's `pngcrush` rewrites the PNG files it puts into iOS app bundles.
//! The output still starts with the PNG signature and still uses chunks, but
//! it isn't a PNG that normal decoders can read:
//! * The first chunk is an extra `CgBI` marker chunk.
//! * The image data is a raw deflate stream, with no zlib header and no
//!   Adler-32 checksum.
//! * 8-bit color pixels are stored as `B, G, R, A` instead of `R, G, B, A`.
//! * The color channels are premultiplied by alpha.
//!
//! ## Automated Decoding
//! If you just want pixels, call [`decode`] (or [`decode_with`] for control
//! over limits, alpha handling, and which decoder handles standard files).
//! Files without the marker chunk are passed on to a standard PNG decoder, so
//! you can feed it anything out of an app bundle and get back an image.
//!
//! ```no_run
//! # fn main() -> Result<(), cgbi::PngError> {
//! let bytes: &[u8] = unimplemented!("data from somewhere");
//! let decoded = cgbi::png::decode(bytes)?;
//! let fixed: Vec<u8> = decoded.image.to_png_bytes()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Decoding Step By Step
//! The pieces of the decoder are also public:
//! * [`read_png_chunks`] frames the chunks (checking each CRC) up to `IEND`.
//! * [`IHDR`] parses and validates the header chunk.
//! * [`unfilter_line`] reverses the scanline filters.
//! * [`ADAM7_PASSES`] and [`merge_pass_into`] handle interlacing.
//!
//! The CgBI decode always works the same way. The image data chunks are
//! collected into one buffer, inflated in one go, and then read back one
//! reduced image at a time (just one "image" when not interlaced). Each
//! filtered line is unfiltered against the line before it, and then unpacked
//! into the output pixel format.

use core::fmt::{Debug, Display, Write};

use alloc::vec::Vec;

use log::{debug, trace, warn};

use crate::{
  image::{Bitmap, DecodedImage, RasterLayout},
  pixel_formats::{RGBA16_BE, RGBA8},
  ChunkField, PngError,
};

mod crc32;
pub use crc32::*;

mod raw_chunk;
pub use raw_chunk::*;

mod ihdr;
pub use ihdr::*;

mod interlace;
pub use interlace::*;

mod unfilter;
pub use unfilter::*;

mod pass_reader;
pub(crate) use pass_reader::*;

mod decoder;
pub use decoder::*;

mod standard;
pub use standard::*;

/// The first eight bytes of every PNG file, CgBI or not.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];
