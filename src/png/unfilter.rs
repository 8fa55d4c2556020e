use super::*;

/// The per-scanline filter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PngFilterType {
  None = 0,
  Sub = 1,
  Up = 2,
  Average = 3,
  Paeth = 4,
}
impl TryFrom<u8> for PngFilterType {
  type Error = PngError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::None,
      1 => Self::Sub,
      2 => Self::Up,
      3 => Self::Average,
      4 => Self::Paeth,
      other => return Err(PngError::BadFilterType(other)),
    })
  }
}

#[inline]
#[must_use]
pub(crate) const fn paeth_predict(a: u8, b: u8, c: u8) -> u8 {
  let a_ = a as i32;
  let b_ = b as i32;
  let c_ = c as i32;
  let p: i32 = a_ + b_ - c_;
  let pa = (p - a_).abs();
  let pb = (p - b_).abs();
  let pc = (p - c_).abs();
  // The PNG spec is extremely specific that you shall not, under any
  // circumstances, alter the order of evaluation of this expression's tests.
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

/// Reverses the filter on one scanline, in place.
///
/// * `filter_type` is the line's leading byte.
/// * `bpp` is the filter's bytes per pixel (at least 1).
/// * `prev` is the previous *reconstructed* line, all zeroes for the first
///   line of an image. It must be the same length as `cur`.
///
/// ## Failure
/// * [`PngError::BadFilterType`] for any type outside 0 through 4. The line is
///   left unchanged.
pub fn unfilter_line(
  filter_type: u8, bpp: usize, prev: &[u8], cur: &mut [u8],
) -> Result<(), PngError> {
  debug_assert_eq!(prev.len(), cur.len());
  debug_assert!(bpp > 0);
  let bpp = bpp.min(cur.len());
  match PngFilterType::try_from(filter_type)? {
    PngFilterType::None => (),
    PngFilterType::Sub => {
      for i in bpp..cur.len() {
        cur[i] = cur[i].wrapping_add(cur[i - bpp]);
      }
    }
    PngFilterType::Up => {
      cur.iter_mut().zip(prev.iter().copied()).for_each(|(p, b)| *p = p.wrapping_add(b));
    }
    PngFilterType::Average => {
      // the first pixel has no left neighbor, so `a` is 0 there.
      cur[..bpp].iter_mut().zip(prev.iter().copied()).for_each(|(p, b)| *p = p.wrapping_add(b / 2));
      for i in bpp..cur.len() {
        let a = u32::from(cur[i - bpp]);
        let b = u32::from(prev[i]);
        cur[i] = cur[i].wrapping_add(((a + b) / 2) as u8);
      }
    }
    PngFilterType::Paeth => {
      // the first pixel has no left or up-left neighbor.
      cur[..bpp]
        .iter_mut()
        .zip(prev.iter().copied())
        .for_each(|(p, b)| *p = p.wrapping_add(paeth_predict(0, b, 0)));
      for i in bpp..cur.len() {
        let predicted = paeth_predict(cur[i - bpp], prev[i], prev[i - bpp]);
        cur[i] = cur[i].wrapping_add(predicted);
      }
    }
  }
  Ok(())
}

/// Applies a filter to a raw line. The inverse of [`unfilter_line`].
#[cfg(test)]
pub(crate) fn filter_line(
  filter_type: PngFilterType, bpp: usize, prev: &[u8], raw: &[u8],
) -> Vec<u8> {
  let left = |i: usize| if i >= bpp { raw[i - bpp] } else { 0 };
  let up_left = |i: usize| if i >= bpp { prev[i - bpp] } else { 0 };
  (0..raw.len())
    .map(|i| {
      let predicted = match filter_type {
        PngFilterType::None => 0,
        PngFilterType::Sub => left(i),
        PngFilterType::Up => prev[i],
        PngFilterType::Average => ((u32::from(left(i)) + u32::from(prev[i])) / 2) as u8,
        PngFilterType::Paeth => paeth_predict(left(i), prev[i], up_left(i)),
      };
      raw[i].wrapping_sub(predicted)
    })
    .collect()
}

#[test]
fn test_paeth_predict_tie_order() {
  // all equal distances: left wins
  assert_eq!(paeth_predict(7, 7, 7), 7);
  // p = 10 + 20 - 10 = 20, pb = 0
  assert_eq!(paeth_predict(10, 20, 10), 20);
  // p = 10 + 20 - 20 = 10, pa = 0
  assert_eq!(paeth_predict(10, 20, 20), 10);
  // p = 50 + 60 - 100 = 10, pa = 40, pb = 50, pc = 90
  assert_eq!(paeth_predict(50, 60, 100), 50);
  // p = 100 + 10 - 90 = 20, pa = 80, pb = 10, pc = 70
  assert_eq!(paeth_predict(100, 10, 90), 10);
  // p = 5 + 5 - 3 = 7: pa = 2, pb = 2, pc = 4, tie between left and up
  assert_eq!(paeth_predict(5, 5, 3), 5);
  // p = 0 + 10 - 5 = 5: pa = 5, pb = 5, pc = 0
  assert_eq!(paeth_predict(0, 10, 5), 5);
}

#[test]
fn test_unfilter_each_type() {
  let prev = [10_u8, 20, 30, 40, 50, 60];

  let mut cur = [1_u8, 2, 3, 4, 5, 6];
  unfilter_line(0, 2, &prev, &mut cur).unwrap();
  assert_eq!(cur, [1, 2, 3, 4, 5, 6]);

  let mut cur = [1_u8, 2, 3, 4, 5, 6];
  unfilter_line(1, 2, &prev, &mut cur).unwrap();
  assert_eq!(cur, [1, 2, 4, 6, 9, 12]);

  let mut cur = [1_u8, 2, 3, 4, 250, 6];
  unfilter_line(2, 2, &prev, &mut cur).unwrap();
  assert_eq!(cur, [11, 22, 33, 44, 44, 66]);

  let mut cur = [1_u8, 2, 3, 4, 5, 6];
  unfilter_line(3, 2, &prev, &mut cur).unwrap();
  // first pixel: prev/2; then (left + up)/2 using reconstructed left
  // [1+5, 2+10, 3+(6+30)/2, 4+(12+40)/2, 5+(21+50)/2, 6+(30+60)/2]
  assert_eq!(cur, [6, 12, 21, 30, 40, 51]);

  let mut cur = [0_u8; 6];
  unfilter_line(4, 2, &[0; 6], &mut cur).unwrap();
  assert_eq!(cur, [0; 6]);
}

#[test]
fn test_unfilter_average_wraps() {
  let prev = [255_u8, 255];
  let mut cur = [200_u8, 200];
  unfilter_line(3, 1, &prev, &mut cur).unwrap();
  // 200 + 127 wraps to 71, then 200 + (71 + 255) / 2 = 200 + 163 wraps to 107
  assert_eq!(cur, [71, 107]);
}

#[test]
fn test_unfilter_bad_type() {
  let mut cur = [9_u8, 9, 9];
  assert_eq!(unfilter_line(5, 1, &[0; 3], &mut cur), Err(PngError::BadFilterType(5)));
  assert_eq!(unfilter_line(255, 1, &[0; 3], &mut cur), Err(PngError::BadFilterType(255)));
  assert_eq!(cur, [9, 9, 9]);
}

#[test]
fn test_filter_unfilter_is_identity() {
  // a few lines of bytes with enough variety to hit every Paeth branch,
  // including the first row (prev all zero) and first column (a = c = 0).
  let lines: [[u8; 12]; 4] = [
    [0, 255, 17, 128, 3, 99, 200, 1, 54, 54, 250, 7],
    [255, 0, 18, 127, 9, 98, 10, 220, 53, 55, 5, 249],
    [128, 128, 128, 128, 0, 0, 0, 0, 255, 255, 255, 255],
    [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
  ];
  for filter_type in [
    PngFilterType::None,
    PngFilterType::Sub,
    PngFilterType::Up,
    PngFilterType::Average,
    PngFilterType::Paeth,
  ] {
    for bpp in [1, 2, 3, 4, 6, 8] {
      let mut prev = [0_u8; 12];
      for raw in lines.iter() {
        let filtered = filter_line(filter_type, bpp, &prev, raw);
        let mut cur = [0_u8; 12];
        cur.copy_from_slice(&filtered);
        unfilter_line(filter_type as u8, bpp, &prev, &mut cur).unwrap();
        assert_eq!(&cur, raw, "{filter_type:?} bpp {bpp}");
        prev = cur;
      }
    }
  }
}
