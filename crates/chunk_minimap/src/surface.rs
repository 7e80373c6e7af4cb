//! Wrap-addressed 2D buffers.
//!
//! A [`Surface`] is a generic 2D buffer. The minimap raster is an
//! [`RgbaSurface`] addressed toroidally: [`Surface::set_wrapped`] and
//! [`Surface::get_wrapped`] take signed coordinates and fold them back into
//! the buffer with `rem_euclid`.

use std::ops::{Index, IndexMut};

/// A 2D buffer of elements.
///
/// Data is stored in row-major order (y * width + x).
#[derive(Clone, Debug)]
pub struct Surface<T> {
  data: Box<[T]>,
  width: u32,
  height: u32,
}

impl<T: Clone + Default> Surface<T> {
  /// Creates a new surface filled with the default value.
  pub fn new(width: u32, height: u32) -> Self {
    Self::filled(width, height, T::default())
  }
}

impl<T: Clone> Surface<T> {
  /// Creates a new surface filled with the given value.
  pub fn filled(width: u32, height: u32, value: T) -> Self {
    let len = (width as usize) * (height as usize);
    Self {
      data: vec![value; len].into_boxed_slice(),
      width,
      height,
    }
  }

  /// Overwrites every element with `value`.
  pub fn fill(&mut self, value: T) {
    self.data.fill(value);
  }
}

impl<T> Surface<T> {
  /// Returns the width of the surface.
  #[inline]
  pub fn width(&self) -> u32 {
    self.width
  }

  /// Returns the height of the surface.
  #[inline]
  pub fn height(&self) -> u32 {
    self.height
  }

  /// Converts (x, y) to a linear index, or `None` if out of bounds.
  #[inline]
  fn index_of(&self, x: u32, y: u32) -> Option<usize> {
    if x < self.width && y < self.height {
      Some((y as usize) * (self.width as usize) + (x as usize))
    } else {
      None
    }
  }

  /// Folds signed coordinates onto the buffer.
  #[inline]
  fn wrapped_index(&self, x: i64, y: i64) -> usize {
    let wx = x.rem_euclid(self.width as i64) as usize;
    let wy = y.rem_euclid(self.height as i64) as usize;
    wy * (self.width as usize) + wx
  }

  /// Returns a reference to the element at (x, y), or `None` if out of
  /// bounds.
  #[inline]
  pub fn get(&self, x: u32, y: u32) -> Option<&T> {
    self.index_of(x, y).map(|i| &self.data[i])
  }

  /// Sets the element at (x, y). Returns `false` if out of bounds.
  #[inline]
  pub fn set(&mut self, x: u32, y: u32, value: T) -> bool {
    if let Some(i) = self.index_of(x, y) {
      self.data[i] = value;
      true
    } else {
      false
    }
  }

  /// Returns the element at (x, y) after wrapping both coordinates.
  #[inline]
  pub fn get_wrapped(&self, x: i64, y: i64) -> &T {
    &self.data[self.wrapped_index(x, y)]
  }

  /// Sets the element at (x, y) after wrapping both coordinates.
  #[inline]
  pub fn set_wrapped(&mut self, x: i64, y: i64, value: T) {
    let i = self.wrapped_index(x, y);
    self.data[i] = value;
  }

  /// Returns an iterator over all elements in row-major order.
  pub fn iter(&self) -> impl Iterator<Item = &T> {
    self.data.iter()
  }
}

impl<T> Index<(u32, u32)> for Surface<T> {
  type Output = T;

  #[inline]
  fn index(&self, (x, y): (u32, u32)) -> &Self::Output {
    let i = (y as usize) * (self.width as usize) + (x as usize);
    &self.data[i]
  }
}

impl<T> IndexMut<(u32, u32)> for Surface<T> {
  #[inline]
  fn index_mut(&mut self, (x, y): (u32, u32)) -> &mut Self::Output {
    let i = (y as usize) * (self.width as usize) + (x as usize);
    &mut self.data[i]
  }
}

/// RGBA pixel with 8 bits per channel.
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash)]
pub struct Rgba {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: u8,
}

impl Rgba {
  /// Creates a new RGBA pixel.
  #[inline]
  pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
    Self { r, g, b, a }
  }

  /// Creates an opaque RGB pixel (alpha = 255).
  #[inline]
  pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
    Self { r, g, b, a: 255 }
  }

  /// Returns true if the pixel is fully transparent.
  #[inline]
  pub const fn is_transparent(self) -> bool {
    self.a == 0
  }

  /// Transparent black.
  pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

  /// Opaque white.
  pub const WHITE: Self = Self::rgb(255, 255, 255);
}

/// A surface containing RGBA pixels, suitable for GPU upload.
pub type RgbaSurface = Surface<Rgba>;

impl RgbaSurface {
  /// Returns the pixel data as a byte slice (for GPU upload).
  #[inline]
  pub fn as_bytes(&self) -> &[u8] {
    let ptr = self.data.as_ptr() as *const u8;
    let len = self.data.len() * std::mem::size_of::<Rgba>();
    // SAFETY: Rgba is repr(C) with four u8 fields and no padding.
    unsafe { std::slice::from_raw_parts(ptr, len) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn surface_index_calculation() {
    let surface: Surface<u8> = Surface::filled(10, 5, 0);
    assert_eq!(surface.index_of(0, 0), Some(0));
    assert_eq!(surface.index_of(3, 2), Some(23)); // 2 * 10 + 3
    assert_eq!(surface.index_of(9, 4), Some(49));
    assert_eq!(surface.index_of(10, 0), None);
  }

  #[test]
  fn wrapped_access_folds_negative_coordinates() {
    let mut surface: Surface<u8> = Surface::filled(8, 8, 0);
    surface.set_wrapped(-1, -1, 7);
    assert_eq!(surface.get(7, 7), Some(&7));
    assert_eq!(*surface.get_wrapped(15, 15), 7);

    surface.set_wrapped(8, 9, 3);
    assert_eq!(surface[(0, 1)], 3);
  }

  #[test]
  fn rgba_surface_as_bytes() {
    let mut surface = RgbaSurface::new(2, 1);
    surface.set(0, 0, Rgba::rgb(255, 0, 0));
    surface.set(1, 0, Rgba::new(0, 255, 0, 10));

    let bytes = surface.as_bytes();
    assert_eq!(bytes.len(), 8);
    assert_eq!(&bytes[0..4], &[255, 0, 0, 255]);
    assert_eq!(&bytes[4..8], &[0, 255, 0, 10]);
  }

  #[test]
  fn rgba_size() {
    assert_eq!(std::mem::size_of::<Rgba>(), 4);
  }
}
