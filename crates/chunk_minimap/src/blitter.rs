//! Wrap-around drawing API for surfaces.
//!
//! [`Blitter`] draws rectangles into a [`Surface`] addressed toroidally: a
//! rectangle that runs off one edge continues on the opposite edge.

use crate::surface::Surface;

/// A rectangular region with a signed origin.
///
/// The origin may lie anywhere; it is folded onto the surface when drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
  pub x: i64,
  pub y: i64,
  pub width: u32,
  pub height: u32,
}

impl Rect {
  /// Creates a new rectangle.
  #[inline]
  pub const fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  /// Clamps the extent so a rectangle never covers a wrapped pixel twice.
  fn clamped(&self, bound_width: u32, bound_height: u32) -> Self {
    Self {
      width: self.width.min(bound_width),
      height: self.height.min(bound_height),
      ..*self
    }
  }
}

/// Drawing API for wrap-addressed surfaces.
pub struct Blitter<'a, T> {
  surface: &'a mut Surface<T>,
}

impl<'a, T> Blitter<'a, T> {
  /// Creates a new blitter for the given surface.
  pub fn new(surface: &'a mut Surface<T>) -> Self {
    Self { surface }
  }

  /// Fills a rectangle with a closure that receives rect-local offsets.
  ///
  /// For each pixel in `rect`, calls `f(dx, dy)` with `dx < rect.width` and
  /// `dy < rect.height`, writing the result at the wrapped position.
  pub fn blit<F>(&mut self, rect: Rect, mut f: F)
  where
    F: FnMut(u32, u32) -> T,
  {
    let rect = rect.clamped(self.surface.width(), self.surface.height());
    for dy in 0..rect.height {
      let y = rect.y + dy as i64;
      for dx in 0..rect.width {
        let x = rect.x + dx as i64;
        self.surface.set_wrapped(x, y, f(dx, dy));
      }
    }
  }

  /// Fills a rectangle with a solid value.
  pub fn fill(&mut self, rect: Rect, value: T)
  where
    T: Clone,
  {
    self.blit(rect, |_, _| value.clone());
  }

  /// Writes a single wrapped pixel.
  #[inline]
  pub fn plot(&mut self, x: i64, y: i64, value: T) {
    self.surface.set_wrapped(x, y, value);
  }
}
