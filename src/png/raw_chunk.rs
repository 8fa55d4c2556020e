use super::*;

/// A chunk's 4-byte type tag.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ChunkType(pub [u8; 4]);
#[allow(nonstandard_style)]
impl ChunkType {
  /// Apple's marker chunk, the first chunk of every CgBI file.
  pub const CgBI: Self = Self(*b"CgBI");
  pub const IHDR: Self = Self(*b"IHDR");
  pub const IDAT: Self = Self(*b"IDAT");
  pub const IEND: Self = Self(*b"IEND");

  /// If the tag is all zero bytes, which names no chunk type at all.
  #[inline]
  #[must_use]
  pub const fn is_blank(self) -> bool {
    matches!(self.0, [0, 0, 0, 0])
  }

  /// Critical chunks have an uppercase first letter.
  #[inline]
  #[must_use]
  pub const fn is_critical(self) -> bool {
    self.0[0].is_ascii_uppercase()
  }
}
impl Debug for ChunkType {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.write_char('"')?;
    Display::fmt(self, f)?;
    f.write_char('"')
  }
}
impl Display for ChunkType {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    for ch in self.0.iter().copied().map(|u| u as char) {
      f.write_char(ch)?;
    }
    Ok(())
  }
}

/// One chunk framed out of the PNG bytes.
///
/// The CRC has already been checked by the time you have one of these.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PngRawChunk<'b> {
  pub(crate) chunk_ty: ChunkType,
  pub(crate) data: &'b [u8],
  pub(crate) declared_crc: u32,
}
impl Debug for PngRawChunk<'_> {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("PngRawChunk")
      .field("chunk_ty", &self.chunk_ty)
      .field("data", &(&self.data[..self.data.len().min(12)], self.data.len()))
      .field("declared_crc", &self.declared_crc)
      .finish()
  }
}
impl<'b> PngRawChunk<'b> {
  #[inline]
  #[must_use]
  pub const fn chunk_ty(&self) -> ChunkType {
    self.chunk_ty
  }
  #[inline]
  #[must_use]
  pub const fn data(&self) -> &'b [u8] {
    self.data
  }
  /// The declared data length. Always equal to `data().len()`.
  #[inline]
  #[must_use]
  pub const fn length(&self) -> u32 {
    self.data.len() as u32
  }
  #[inline]
  #[must_use]
  pub const fn declared_crc(&self) -> u32 {
    self.declared_crc
  }
}

/// Reads successive chunks out of PNG bytes, checking each chunk's CRC.
///
/// Once a read fails the reader is left empty, so it can't hand out data from
/// a stream it has already found to be broken.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PngRawChunkIter<'b>(pub(crate) &'b [u8]);
impl<'b> PngRawChunkIter<'b> {
  /// Pass the full PNG bytes, it will check and remove the PNG signature.
  ///
  /// ## Failure
  /// * [`PngError::UnexpectedEndOfFile`] if there's less than 8 bytes.
  /// * [`PngError::NotAPngFile`] if the 8 bytes aren't the PNG signature.
  #[inline]
  pub fn new(bytes: &'b [u8]) -> Result<Self, PngError> {
    match bytes {
      [a, b, c, d, e, f, g, h, rest @ ..] => {
        if [*a, *b, *c, *d, *e, *f, *g, *h] == PNG_SIGNATURE {
          Ok(Self(rest))
        } else {
          Err(PngError::NotAPngFile)
        }
      }
      _ => Err(PngError::UnexpectedEndOfFile),
    }
  }

  /// Bytes not yet read.
  #[inline]
  #[must_use]
  pub const fn remaining(&self) -> usize {
    self.0.len()
  }

  fn take(&mut self, count: usize, field: ChunkField) -> Result<&'b [u8], PngError> {
    if self.0.len() >= count {
      let (head, rest) = self.0.split_at(count);
      self.0 = rest;
      Ok(head)
    } else {
      let available = self.0.len();
      self.0 = &[];
      Err(PngError::TruncatedInput { field, needed: count, available })
    }
  }

  fn take_array(&mut self, field: ChunkField) -> Result<[u8; 4], PngError> {
    let bytes = self.take(4, field)?;
    Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
  }

  /// Reads one chunk: length, type, data, and CRC.
  ///
  /// ## Failure
  /// * [`PngError::TruncatedInput`] if any field is cut short.
  /// * [`PngError::ChecksumMismatch`] if the declared CRC is wrong.
  pub fn read_chunk(&mut self) -> Result<PngRawChunk<'b>, PngError> {
    let chunk_len = u32::from_be_bytes(self.take_array(ChunkField::Length)?);
    let chunk_ty = ChunkType(self.take_array(ChunkField::Type)?);
    let data = self.take(chunk_len as usize, ChunkField::Data)?;
    let declared_crc = u32::from_be_bytes(self.take_array(ChunkField::Crc)?);
    let actual = chunk_crc(chunk_ty, data);
    if actual != declared_crc {
      self.0 = &[];
      return Err(PngError::ChecksumMismatch { chunk_ty, declared: declared_crc, actual });
    }
    trace!("chunk {chunk_ty}: {chunk_len} bytes");
    Ok(PngRawChunk { chunk_ty, data, declared_crc })
  }
}
impl<'b> Iterator for PngRawChunkIter<'b> {
  type Item = Result<PngRawChunk<'b>, PngError>;
  /// Gives `None` once the bytes are used up on a chunk boundary.
  #[inline]
  fn next(&mut self) -> Option<Self::Item> {
    if self.0.is_empty() {
      None
    } else {
      Some(self.read_chunk())
    }
  }
}

/// Reads every chunk up to and including `IEND`.
///
/// Anything after `IEND` is never looked at. Chunks with a blank type tag are
/// dropped from the list.
///
/// ## Failure
/// * The signature is missing or wrong.
/// * Any chunk fails to read, including running out of input before `IEND`.
pub fn read_png_chunks(bytes: &[u8]) -> Result<Vec<PngRawChunk<'_>>, PngError> {
  let mut it = PngRawChunkIter::new(bytes)?;
  let mut chunks = Vec::new();
  loop {
    let chunk = it.read_chunk()?;
    let chunk_ty = chunk.chunk_ty;
    if chunk_ty.is_blank() {
      warn!("dropping a chunk with a blank type tag ({} bytes)", chunk.data.len());
    } else {
      chunks.push(chunk);
    }
    if chunk_ty == ChunkType::IEND {
      return Ok(chunks);
    }
  }
}

/// Formats a chunk list for people to read: one block per chunk with its
/// index, type, length, and up to the first 20 data bytes in hex.
#[derive(Clone, Copy)]
pub struct ChunkListing<'a, 'b>(pub &'a [PngRawChunk<'b>]);
impl Display for ChunkListing<'_, '_> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    for (n, chunk) in self.0.iter().enumerate() {
      writeln!(f, "-----------")?;
      writeln!(f, "chunk #{n}")?;
      writeln!(f, "length: {}", chunk.length())?;
      writeln!(f, "type: {}", chunk.chunk_ty)?;
      write!(f, "data (20 bytes):")?;
      for byte in &chunk.data[..chunk.data.len().min(20)] {
        write!(f, " {byte:02x}")?;
      }
      writeln!(f)?;
    }
    Ok(())
  }
}

#[cfg(test)]
fn framed(chunk_ty: ChunkType, data: &[u8]) -> Vec<u8> {
  let mut v = Vec::new();
  v.extend_from_slice(&(data.len() as u32).to_be_bytes());
  v.extend_from_slice(&chunk_ty.0);
  v.extend_from_slice(data);
  v.extend_from_slice(&chunk_crc(chunk_ty, data).to_be_bytes());
  v
}

#[test]
fn test_read_chunk_fields() {
  let bytes = framed(ChunkType(*b"tEXt"), b"abc");
  let mut it = PngRawChunkIter(&bytes);
  let chunk = it.read_chunk().unwrap();
  assert_eq!(chunk.chunk_ty(), ChunkType(*b"tEXt"));
  assert_eq!(chunk.data(), b"abc");
  assert_eq!(chunk.length(), 3);
  assert_eq!(chunk.declared_crc(), chunk_crc(ChunkType(*b"tEXt"), b"abc"));
  assert_eq!(it.remaining(), 0);
  assert!(it.next().is_none());
}

#[test]
fn test_read_chunk_truncation_points() {
  let bytes = framed(ChunkType::IDAT, &[1, 2, 3, 4, 5]);
  let cases = [
    (2, ChunkField::Length, 4, 2),
    (4, ChunkField::Type, 4, 0),
    (6, ChunkField::Type, 4, 2),
    (10, ChunkField::Data, 5, 2),
    (13, ChunkField::Crc, 4, 0),
    (16, ChunkField::Crc, 4, 3),
  ];
  for (len, field, needed, available) in cases {
    let mut it = PngRawChunkIter(&bytes[..len]);
    assert_eq!(
      it.read_chunk(),
      Err(PngError::TruncatedInput { field, needed, available }),
      "cut at {len}"
    );
    assert_eq!(it.remaining(), 0);
  }
}

#[test]
fn test_read_chunk_crc_flip() {
  let good = framed(ChunkType::IHDR, &[0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 0, 0, 0]);
  // every single bit of the type and data is covered
  for byte in 4..good.len() - 4 {
    for bit in 0..8 {
      let mut bad = good.clone();
      bad[byte] ^= 1 << bit;
      let mut it = PngRawChunkIter(&bad);
      assert!(
        matches!(it.read_chunk(), Err(PngError::ChecksumMismatch { .. })),
        "byte {byte} bit {bit}"
      );
      assert_eq!(it.remaining(), 0);
    }
  }
}

#[test]
fn test_read_png_chunks_stops_at_iend() {
  let mut bytes = PNG_SIGNATURE.to_vec();
  bytes.extend(framed(ChunkType::CgBI, &[0x50, 0, 0x20, 6]));
  bytes.extend(framed(ChunkType([0; 4]), &[]));
  bytes.extend(framed(ChunkType::IEND, &[]));
  bytes.extend(framed(ChunkType::IDAT, &[9]));
  let chunks = read_png_chunks(&bytes).unwrap();
  let types: Vec<ChunkType> = chunks.iter().map(|c| c.chunk_ty).collect();
  assert_eq!(types, [ChunkType::CgBI, ChunkType::IEND]);

  assert_eq!(PngRawChunkIter::new(&PNG_SIGNATURE[..7]), Err(PngError::UnexpectedEndOfFile));
  assert_eq!(PngRawChunkIter::new(b"\x89PNG\r\n\x1a\x0b"), Err(PngError::NotAPngFile));
}
