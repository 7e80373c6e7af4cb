//! Chunk - a 16×16 column of world data as held by the cache.
//!
//! The per-block payload is opaque to this crate apart from the topmost
//! exposed block of each column, which is all the minimap needs.

use bitflags::bitflags;

use crate::block::{BlockColors, BlockId};
use crate::coords::{CHUNK_SIZE, ChunkPos};
use crate::surface::{Rgba, Surface};

bitflags! {
  /// Lifecycle state of a cached chunk.
  #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
  pub struct ChunkFlags: u8 {
    /// The payload was read from the store for this chunk's coordinate.
    const VALID = 1 << 0;
    /// The chunk's tile is currently composited into the minimap.
    const ON_MINIMAP = 1 << 1;
    /// Render geometry is out of date (neighbour loaded, setting toggled).
    const DIRTY = 1 << 2;
  }
}

/// Per-column minimap colors for one tile; `None` leaves the pixel
/// transparent.
pub type TileColors = Surface<Option<Rgba>>;

/// Chunk data as returned by a [`ChunkStore`](crate::store::ChunkStore).
#[derive(Clone, Debug)]
pub struct ChunkPayload {
  /// Topmost exposed block per column, indexed `(x, z)`.
  pub top_blocks: Surface<BlockId>,
  /// Opaque block data for the geometry collaborator.
  pub data: Vec<u8>,
}

impl ChunkPayload {
  /// Creates a payload of air columns with no block data.
  pub fn empty() -> Self {
    Self {
      top_blocks: Surface::new(CHUNK_SIZE, CHUNK_SIZE),
      data: Vec::new(),
    }
  }

  /// Creates a payload whose every column is topped by `block`.
  pub fn uniform(block: BlockId) -> Self {
    Self {
      top_blocks: Surface::filled(CHUNK_SIZE, CHUNK_SIZE, block),
      data: Vec::new(),
    }
  }

  /// Resolves the column colors for compositing.
  pub fn tile_colors(&self, colors: &BlockColors) -> TileColors {
    let mut tile = TileColors::new(CHUNK_SIZE, CHUNK_SIZE);
    for z in 0..CHUNK_SIZE {
      for x in 0..CHUNK_SIZE {
        let block = self.top_blocks.get(x, z).copied().unwrap_or_default();
        tile[(x, z)] = colors.resolve(block);
      }
    }
    tile
  }
}

/// A chunk held by the [`ChunkCache`](crate::cache::ChunkCache).
#[derive(Clone, Debug)]
pub struct Chunk {
  /// Coordinate the payload was loaded for. Must equal the cache key.
  pos: ChunkPos,
  /// Data read from the store.
  pub payload: ChunkPayload,
  /// Lifecycle flags.
  pub flags: ChunkFlags,
}

impl Chunk {
  /// Creates a freshly loaded, valid chunk.
  pub fn loaded(pos: ChunkPos, payload: ChunkPayload) -> Self {
    Self {
      pos,
      payload,
      flags: ChunkFlags::VALID,
    }
  }

  /// Returns the coordinate this chunk was loaded for.
  pub fn pos(&self) -> ChunkPos {
    self.pos
  }

  /// Returns true if the payload is valid for the stored coordinate.
  pub fn is_valid(&self) -> bool {
    self.flags.contains(ChunkFlags::VALID)
  }

  /// Returns true if the chunk's tile is on the minimap.
  pub fn is_on_minimap(&self) -> bool {
    self.flags.contains(ChunkFlags::ON_MINIMAP)
  }

  /// Returns true if the chunk needs re-rendering.
  pub fn is_dirty(&self) -> bool {
    self.flags.contains(ChunkFlags::DIRTY)
  }

  /// Marks the chunk for re-rendering.
  pub fn mark_dirty(&mut self) {
    self.flags.insert(ChunkFlags::DIRTY);
  }

  /// Overrides the stored coordinate.
  ///
  /// Only used to simulate stale entries in tests.
  #[cfg(test)]
  pub(crate) fn set_pos(&mut self, pos: ChunkPos) {
    self.pos = pos;
  }
}
