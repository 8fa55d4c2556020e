use super::*;

/// Where one reduced image's pixels land in the full image.
///
/// ```text
/// 1 6 4 6 2 6 4 6
/// 7 7 7 7 7 7 7 7
/// 5 6 5 6 5 6 5 6
/// 7 7 7 7 7 7 7 7
/// 3 6 4 6 3 6 4 6
/// 7 7 7 7 7 7 7 7
/// 5 6 5 6 5 6 5 6
/// 7 7 7 7 7 7 7 7
/// ```
///
/// Reduced pixel `(x, y)` goes to full pixel
/// `(x * x_factor + x_offset, y * y_factor + y_offset)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Adam7Pass {
  /// 1 through 7, or 0 for a non-interlaced image.
  pub number: usize,
  pub x_factor: u32,
  pub y_factor: u32,
  pub x_offset: u32,
  pub y_offset: u32,
}

/// The seven Adam7 passes, in stream order.
pub const ADAM7_PASSES: [Adam7Pass; 7] = [
  Adam7Pass { number: 1, x_factor: 8, y_factor: 8, x_offset: 0, y_offset: 0 },
  Adam7Pass { number: 2, x_factor: 8, y_factor: 8, x_offset: 4, y_offset: 0 },
  Adam7Pass { number: 3, x_factor: 4, y_factor: 8, x_offset: 0, y_offset: 4 },
  Adam7Pass { number: 4, x_factor: 4, y_factor: 4, x_offset: 2, y_offset: 0 },
  Adam7Pass { number: 5, x_factor: 2, y_factor: 4, x_offset: 0, y_offset: 2 },
  Adam7Pass { number: 6, x_factor: 2, y_factor: 2, x_offset: 1, y_offset: 0 },
  Adam7Pass { number: 7, x_factor: 1, y_factor: 2, x_offset: 0, y_offset: 1 },
];

impl Adam7Pass {
  /// A non-interlaced image is a single "pass" that covers everything.
  pub const FULL_IMAGE: Self =
    Self { number: 0, x_factor: 1, y_factor: 1, x_offset: 0, y_offset: 0 };

  /// The size of this pass's reduced image, given the full image size.
  ///
  /// Either value can be 0 for small images, in which case the pass has no
  /// data at all (not even filter bytes).
  #[inline]
  #[must_use]
  pub const fn reduced_dimensions(&self, full_width: u32, full_height: u32) -> (u32, u32) {
    const fn reduce(full: u32, factor: u32, offset: u32) -> u32 {
      if full <= offset {
        0
      } else {
        (full - offset + factor - 1) / factor
      }
    }
    (
      reduce(full_width, self.x_factor, self.x_offset),
      reduce(full_height, self.y_factor, self.y_offset),
    )
  }

  /// Converts a reduced image location into the full image location.
  #[inline]
  #[must_use]
  pub const fn full_pos(&self, reduced_x: u32, reduced_y: u32) -> (u32, u32) {
    (reduced_x * self.x_factor + self.x_offset, reduced_y * self.y_factor + self.y_offset)
  }
}

/// Scatters one reduced image's pixels into the full-size destination.
///
/// Both rasters must use the same pixel layout, and `dst` must be the full
/// image that `src` is a pass of.
pub fn merge_pass_into<R: RasterLayout + ?Sized>(dst: &mut R, src: &R, pass: Adam7Pass) {
  let bytes_per_pixel = dst.bytes_per_pixel();
  debug_assert_eq!(bytes_per_pixel, src.bytes_per_pixel());
  let stride = dst.stride();
  let src_pix = src.raster_bytes();
  let dst_pix = dst.raster_bytes_mut();
  let x_step = pass.x_factor as usize * bytes_per_pixel;
  let mut s = 0;
  for y in 0..src.height() as usize {
    let d_base = (y * pass.y_factor as usize + pass.y_offset as usize) * stride
      + (pass.x_offset as usize) * bytes_per_pixel;
    for x in 0..src.width() as usize {
      let d = d_base + x * x_step;
      dst_pix[d..d + bytes_per_pixel].copy_from_slice(&src_pix[s..s + bytes_per_pixel]);
      s += bytes_per_pixel;
    }
  }
}

#[cfg(test)]
fn reduced_image_dimensions(full_width: u32, full_height: u32) -> [(u32, u32); 8] {
  let mut out = [(full_width, full_height); 8];
  for pass in ADAM7_PASSES {
    out[pass.number] = pass.reduced_dimensions(full_width, full_height);
  }
  out
}

#[test]
fn test_reduced_image_dimensions() {
  assert_eq!(reduced_image_dimensions(0, 0), [(0, 0); 8]);
  // one
  for (w, ex) in (1..=8).zip([1, 1, 1, 1, 1, 1, 1, 1]) {
    assert_eq!(reduced_image_dimensions(w, 0)[1].0, ex, "failed w:{w}");
  }
  // two
  for (w, ex) in (1..=8).zip([0, 0, 0, 0, 1, 1, 1, 1]) {
    assert_eq!(reduced_image_dimensions(w, 0)[2].0, ex, "failed w:{w}");
  }
  // three
  for (h, ex) in (1..=8).zip([0, 0, 0, 0, 1, 1, 1, 1]) {
    assert_eq!(reduced_image_dimensions(0, h)[3].1, ex, "failed h: {h}");
  }
  // four
  for (w, ex) in (1..=8).zip([0, 0, 1, 1, 1, 1, 2, 2]) {
    assert_eq!(reduced_image_dimensions(w, 0)[4].0, ex, "failed w: {w}");
  }
  // five
  for (h, ex) in (1..=8).zip([0, 0, 1, 1, 1, 1, 2, 2]) {
    assert_eq!(reduced_image_dimensions(0, h)[5].1, ex, "failed h: {h}");
  }
  // six
  for (w, ex) in (1..=8).zip([0, 1, 1, 2, 2, 3, 3, 4]) {
    assert_eq!(reduced_image_dimensions(w, 0)[6].0, ex, "failed w: {w}");
  }
  // seven
  for (h, ex) in (1..=8).zip([0, 1, 1, 2, 2, 3, 3, 4]) {
    assert_eq!(reduced_image_dimensions(0, h)[7].1, ex, "failed h: {h}");
  }
  //
  assert_eq!(
    reduced_image_dimensions(8, 8),
    [
      (8, 8), // zeroth
      (1, 1), // one
      (1, 1), // two
      (2, 1), // three
      (2, 2), // four
      (4, 2), // five
      (4, 4), // six
      (8, 4), // seven
    ]
  );
}

#[test]
fn test_adam7_passes_partition_the_image() {
  for full_width in 1..=19_u32 {
    for full_height in 1..=19_u32 {
      let mut hits = alloc::vec![0_u8; (full_width * full_height) as usize];
      for pass in ADAM7_PASSES {
        let (w, h) = pass.reduced_dimensions(full_width, full_height);
        for y in 0..h {
          for x in 0..w {
            let (fx, fy) = pass.full_pos(x, y);
            assert!(fx < full_width && fy < full_height, "pass {} out of bounds", pass.number);
            hits[(fy * full_width + fx) as usize] += 1;
          }
        }
      }
      assert!(hits.iter().all(|&n| n == 1), "{full_width}x{full_height}: {hits:?}");
    }
  }
}

#[test]
fn test_merge_pass_into_each_layout() {
  use crate::pixel_formats::{RGBA16_BE, RGBA8};
  // tag every source pixel with its pass number so we can see where it went.
  let (full_w, full_h) = (5, 3);
  let mut dst8: Bitmap<RGBA8> = Bitmap::try_new(full_w, full_h).unwrap();
  let mut dst16: Bitmap<RGBA16_BE> = Bitmap::try_new(full_w, full_h).unwrap();
  for pass in ADAM7_PASSES {
    let (w, h) = pass.reduced_dimensions(full_w, full_h);
    if w == 0 || h == 0 {
      continue;
    }
    let mut src8: Bitmap<RGBA8> = Bitmap::try_new(w, h).unwrap();
    let mut src16: Bitmap<RGBA16_BE> = Bitmap::try_new(w, h).unwrap();
    for y in 0..h {
      for x in 0..w {
        let tag = pass.number as u8;
        *src8.get_mut(x, y).unwrap() = RGBA8 { r: tag, g: x as u8, b: y as u8, a: 255 };
        *src16.get_mut(x, y).unwrap() =
          RGBA16_BE::from_channels(u16::from(tag) << 8, x as u16, y as u16, 0xFFFF);
      }
    }
    merge_pass_into(&mut dst8, &src8, pass);
    merge_pass_into(&mut dst16, &src16, pass);
  }
  let expected_tags: [[u8; 5]; 3] = [[1, 6, 4, 6, 2], [7, 7, 7, 7, 7], [5, 6, 5, 6, 5]];
  for y in 0..full_h {
    for x in 0..full_w {
      let tag = expected_tags[y as usize][x as usize];
      assert_eq!(dst8.get(x, y).unwrap().r, tag, "rgba8 at ({x},{y})");
      assert_eq!(dst16.get(x, y).unwrap().to_channels()[0], u16::from(tag) << 8);
    }
  }
  // pass 6 covers (1,0) and (3,0) as its reduced x = 0 and 1
  assert_eq!(dst8.get(3, 0).unwrap().g, 1);
}
