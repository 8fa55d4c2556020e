#![allow(bad_style)]

use cgbi::png::{chunk_crc, ChunkType, PNG_SIGNATURE};

mod cgbi_files;
mod standard_files;

fn rand_bytes(count: usize) -> Vec<u8> {
  let mut buffer = vec![0; count];
  getrandom::getrandom(&mut buffer).unwrap();
  buffer
}

/// The marker data pngcrush writes; the decoder never looks at it.
const CGBI_MARKER_DATA: [u8; 4] = [0x50, 0x00, 0x20, 0x06];

fn push_chunk(out: &mut Vec<u8>, ty: &[u8; 4], data: &[u8]) {
  out.extend_from_slice(&(data.len() as u32).to_be_bytes());
  out.extend_from_slice(ty);
  out.extend_from_slice(data);
  out.extend_from_slice(&chunk_crc(ChunkType(*ty), data).to_be_bytes());
}

fn ihdr_data(width: u32, height: u32, bit_depth: u8, color_type: u8, interlace: u8) -> Vec<u8> {
  let mut v = Vec::new();
  v.extend_from_slice(&width.to_be_bytes());
  v.extend_from_slice(&height.to_be_bytes());
  v.extend_from_slice(&[bit_depth, color_type, 0, 0, interlace]);
  v
}

/// Raw deflate, the way CgBI stores image data.
fn raw_deflate(filtered: &[u8]) -> Vec<u8> {
  miniz_oxide::deflate::compress_to_vec(filtered, 6)
}

/// Builds a whole CgBI file: signature, marker, header, one data chunk, end.
fn cgbi_file(ihdr: &[u8], filtered: &[u8]) -> Vec<u8> {
  let mut out = PNG_SIGNATURE.to_vec();
  push_chunk(&mut out, b"CgBI", &CGBI_MARKER_DATA);
  push_chunk(&mut out, b"IHDR", ihdr);
  push_chunk(&mut out, b"IDAT", &raw_deflate(filtered));
  push_chunk(&mut out, b"IEND", &[]);
  out
}
