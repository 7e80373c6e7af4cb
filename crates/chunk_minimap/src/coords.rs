//! Coordinate types and spatial constants.
//!
//! Defines the coordinate system for the world:
//! - [`BlockPos`]: Absolute block column (i64 for unbounded worlds)
//! - [`ChunkPos`]: Chunk grid position (i32)
//! - [`LocalPos`]: Column within a chunk (u8)
//! - [`ChunkRect`]: Inclusive rectangle of chunk positions
//!
//! X increases to the east, Z increases to the south. The minimap maps X to
//! pixel columns and Z to pixel rows.

use std::ops::RangeInclusive;

/// Number of block columns along one chunk edge.
///
/// This is also the minimap tile size: one pixel per block column.
pub const CHUNK_SIZE: u32 = 16;

/// World axis on the horizontal plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
  X,
  Z,
}

/// Position in the chunk grid.
///
/// Each chunk spans [`CHUNK_SIZE`] block columns in each dimension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
  pub x: i32,
  pub z: i32,
}

impl ChunkPos {
  /// Creates a new chunk position.
  pub const fn new(x: i32, z: i32) -> Self {
    Self { x, z }
  }

  /// Returns the component along `axis`.
  #[inline]
  pub const fn along(self, axis: Axis) -> i32 {
    match axis {
      Axis::X => self.x,
      Axis::Z => self.z,
    }
  }

  /// Returns the four cardinal neighbours (east, west, south, north).
  pub const fn neighbors(self) -> [ChunkPos; 4] {
    [
      ChunkPos::new(self.x + 1, self.z),
      ChunkPos::new(self.x - 1, self.z),
      ChunkPos::new(self.x, self.z + 1),
      ChunkPos::new(self.x, self.z - 1),
    ]
  }
}

/// Absolute block column in the world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockPos {
  pub x: i64,
  pub z: i64,
}

impl BlockPos {
  /// Creates a new block position.
  pub const fn new(x: i64, z: i64) -> Self {
    Self { x, z }
  }

  /// Block column containing a continuous world-space position.
  pub fn from_world(x: f32, z: f32) -> Self {
    Self::new(x.floor() as i64, z.floor() as i64)
  }

  /// Convert to chunk position and local offset.
  ///
  /// Uses floor division for correct negative coordinate handling.
  /// For example, block -1 maps to chunk -1 with local offset 15.
  pub fn to_chunk_and_local(self) -> (ChunkPos, LocalPos) {
    let chunk_size = CHUNK_SIZE as i64;

    let cx = self.x.div_euclid(chunk_size) as i32;
    let cz = self.z.div_euclid(chunk_size) as i32;

    let lx = self.x.rem_euclid(chunk_size) as u8;
    let lz = self.z.rem_euclid(chunk_size) as u8;

    (ChunkPos::new(cx, cz), LocalPos::new(lx, lz))
  }

  /// Chunk containing this block column.
  pub fn chunk(self) -> ChunkPos {
    self.to_chunk_and_local().0
  }
}

/// Column within a chunk (0 to CHUNK_SIZE-1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalPos {
  pub x: u8,
  pub z: u8,
}

impl LocalPos {
  /// Creates a new local position.
  pub const fn new(x: u8, z: u8) -> Self {
    Self { x, z }
  }
}

/// Inclusive axis-aligned rectangle of chunk positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkRect {
  pub min: ChunkPos,
  pub max: ChunkPos,
}

impl ChunkRect {
  /// Creates a rectangle from inclusive corners.
  pub const fn new(min: ChunkPos, max: ChunkPos) -> Self {
    Self { min, max }
  }

  /// Square window `[center - range, center + range]` on both axes.
  pub const fn square(center: ChunkPos, range: i32) -> Self {
    Self {
      min: ChunkPos::new(center.x - range, center.z - range),
      max: ChunkPos::new(center.x + range, center.z + range),
    }
  }

  /// Returns true if `pos` is inside the rectangle.
  #[inline]
  pub fn contains(&self, pos: ChunkPos) -> bool {
    pos.x >= self.min.x && pos.x <= self.max.x && pos.z >= self.min.z && pos.z <= self.max.z
  }

  /// Inclusive coordinate range along `axis`.
  pub fn range(&self, axis: Axis) -> RangeInclusive<i32> {
    self.min.along(axis)..=self.max.along(axis)
  }

  /// Number of positions in the rectangle (0 if inverted).
  pub fn len(&self) -> usize {
    let w = (self.max.x - self.min.x + 1).max(0) as usize;
    let h = (self.max.z - self.min.z + 1).max(0) as usize;
    w * h
  }

  /// Returns true if the rectangle holds no positions.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Iterates positions x-major (all z for the first x, then the next x).
  pub fn positions(&self) -> impl Iterator<Item = ChunkPos> + use<> {
    let z_range = self.min.z..=self.max.z;
    (self.min.x..=self.max.x).flat_map(move |x| z_range.clone().map(move |z| ChunkPos::new(x, z)))
  }

  /// Returns the intersection of two rectangles, or None if they don't
  /// overlap.
  pub fn intersection(&self, other: &ChunkRect) -> Option<ChunkRect> {
    let min = ChunkPos::new(self.min.x.max(other.min.x), self.min.z.max(other.min.z));
    let max = ChunkPos::new(self.max.x.min(other.max.x), self.max.z.min(other.max.z));
    if min.x <= max.x && min.z <= max.z {
      Some(ChunkRect { min, max })
    } else {
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn negative_blocks_floor_into_previous_chunk() {
    let (chunk, local) = BlockPos::new(-1, -17).to_chunk_and_local();
    assert_eq!(chunk, ChunkPos::new(-1, -2));
    assert_eq!(local, LocalPos::new(15, 15));

    let (chunk, local) = BlockPos::new(16, 0).to_chunk_and_local();
    assert_eq!(chunk, ChunkPos::new(1, 0));
    assert_eq!(local, LocalPos::new(0, 0));
  }

  #[test]
  fn from_world_floors_fractional_positions() {
    assert_eq!(BlockPos::from_world(-0.5, 3.9), BlockPos::new(-1, 3));
    assert_eq!(BlockPos::from_world(-0.5, 3.9).chunk(), ChunkPos::new(-1, 0));
  }

  #[test]
  fn square_enumerates_x_major() {
    let rect = ChunkRect::square(ChunkPos::new(0, 0), 1);
    let positions: Vec<_> = rect.positions().collect();
    assert_eq!(positions.len(), 9);
    assert_eq!(rect.len(), 9);
    assert_eq!(positions[0], ChunkPos::new(-1, -1));
    assert_eq!(positions[1], ChunkPos::new(-1, 0));
    assert_eq!(positions[3], ChunkPos::new(0, -1));
    assert_eq!(positions[8], ChunkPos::new(1, 1));
  }

  #[test]
  fn rect_intersection() {
    let a = ChunkRect::square(ChunkPos::new(0, 0), 2);
    let b = ChunkRect::square(ChunkPos::new(4, 0), 2);
    let i = a.intersection(&b).unwrap();
    assert_eq!(i.min, ChunkPos::new(2, -2));
    assert_eq!(i.max, ChunkPos::new(2, 2));
    assert!(a.intersection(&ChunkRect::square(ChunkPos::new(10, 0), 2)).is_none());
  }

  #[test]
  fn neighbors_are_cardinal() {
    let n = ChunkPos::new(3, -4).neighbors();
    assert!(n.contains(&ChunkPos::new(4, -4)));
    assert!(n.contains(&ChunkPos::new(2, -4)));
    assert!(n.contains(&ChunkPos::new(3, -3)));
    assert!(n.contains(&ChunkPos::new(3, -5)));
  }
}
