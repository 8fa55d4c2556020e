#![no_std]
#![cfg_attr(docs_rs, feature(doc_cfg))]
//#![warn(missing_docs)]

//! A crate for decoding Apple's CgBI PNG files.
//!
//! iOS app bundles are full of PNG files that have been "optimized" into a
//! form only Apple's own image loaders understand. This crate decodes them
//! into ordinary RGBA pixels, and (with the `std` feature) can write them back
//! out as PNG files that anything can read.
//!
//! Most people want [`png::decode`]. See the [`png`] module for the details.
//!
//! ## Features
//! * `std` (default): `std::error::Error` for [`PngError`], plus the `png`
//!   crate for decoding non-CgBI files and for re-encoding.
//!
//! Without `std` the crate only needs `alloc`, and you provide your own
//! [`StandardPngDecoder`](png::StandardPngDecoder) for non-CgBI files.

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

mod error;
pub use error::*;

pub mod pixel_formats;
pub use pixel_formats::*;

pub mod image;

pub mod png;
