//! Chunk cache keyed by chunk coordinate.
//!
//! Holds every chunk inside the load window. Entries whose stored
//! coordinate disagrees with their key are stale: lookups ignore them and
//! the window tracker schedules them for discard and refetch.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use bevy::prelude::*;

use crate::chunk::{Chunk, ChunkFlags};
use crate::coords::{Axis, ChunkPos};
use crate::minimap::MinimapCompositor;

/// Cache state of a coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Residency {
  /// Nothing cached.
  Missing,
  /// An entry exists but is invalid or was loaded for another coordinate.
  Stale,
  /// A valid chunk is cached.
  Valid { on_minimap: bool },
}

#[derive(Default)]
pub struct ChunkCache {
  chunks: HashMap<ChunkPos, Chunk>,
}

impl ChunkCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns the valid chunk cached at `pos`.
  pub fn get(&self, pos: ChunkPos) -> Option<&Chunk> {
    self
      .chunks
      .get(&pos)
      .filter(|chunk| chunk.is_valid() && chunk.pos() == pos)
  }

  /// Mutable variant of [`get`](Self::get).
  pub fn get_mut(&mut self, pos: ChunkPos) -> Option<&mut Chunk> {
    self
      .chunks
      .get_mut(&pos)
      .filter(|chunk| chunk.is_valid() && chunk.pos() == pos)
  }

  /// Inserts `chunk` under its own coordinate, returning the entry it
  /// replaced.
  pub fn put(&mut self, chunk: Chunk) -> Option<Chunk> {
    self.chunks.insert(chunk.pos(), chunk)
  }

  /// Classifies the entry at `pos`.
  ///
  /// A key mismatch is logged and reported as [`Residency::Stale`].
  pub fn check(&self, pos: ChunkPos) -> Residency {
    let Some(chunk) = self.chunks.get(&pos) else {
      return Residency::Missing;
    };
    if chunk.pos() != pos {
      warn!(
        "Cached chunk at {:?} holds data for {:?}; discarding",
        pos,
        chunk.pos()
      );
      return Residency::Stale;
    }
    if !chunk.is_valid() {
      return Residency::Stale;
    }
    Residency::Valid {
      on_minimap: chunk.is_on_minimap(),
    }
  }

  /// Returns true if any entry, valid or not, is stored at `pos`.
  pub fn contains_key(&self, pos: ChunkPos) -> bool {
    self.chunks.contains_key(&pos)
  }

  /// Returns true if a valid chunk is cached at `pos`.
  pub fn is_valid(&self, pos: ChunkPos) -> bool {
    self.get(pos).is_some()
  }

  /// Removes the entry at `pos`, erasing its tile if it is on the minimap.
  ///
  /// Markers anchored in chunks that are still resident get their glyphs
  /// restored over the erased tile.
  pub fn evict(&mut self, pos: ChunkPos, minimap: &mut MinimapCompositor) -> Option<Chunk> {
    let chunk = self.chunks.remove(&pos)?;
    if chunk.is_on_minimap() {
      minimap.erase_tile(pos);
      minimap.redraw_markers_in_if(pos, |block| self.is_valid(block.chunk()));
    }
    Some(chunk)
  }

  /// Evicts every entry.
  pub fn clear_all(&mut self, minimap: &mut MinimapCompositor) {
    for (pos, chunk) in self.chunks.drain() {
      if chunk.is_on_minimap() {
        minimap.erase_tile(pos);
      }
    }
  }

  /// Marks a valid chunk dirty. Returns false if none is cached.
  pub fn mark_dirty(&mut self, pos: ChunkPos) -> bool {
    match self.get_mut(pos) {
      Some(chunk) => {
        chunk.mark_dirty();
        true
      }
      None => false,
    }
  }

  pub fn mark_all_dirty(&mut self) {
    for chunk in self.chunks.values_mut() {
      chunk.mark_dirty();
    }
  }

  /// Sets or clears the on-minimap flag of the entry at `pos`.
  pub fn set_on_minimap(&mut self, pos: ChunkPos, on_minimap: bool) {
    if let Some(chunk) = self.chunks.get_mut(&pos) {
      chunk.flags.set(ChunkFlags::ON_MINIMAP, on_minimap);
    }
  }

  /// Clears the dirty flag on every chunk, returning the positions that
  /// had it, sorted.
  pub fn take_dirty(&mut self) -> Vec<ChunkPos> {
    let mut dirty: Vec<_> = self
      .chunks
      .iter_mut()
      .filter(|(_, chunk)| chunk.is_dirty())
      .map(|(pos, chunk)| {
        chunk.flags.remove(ChunkFlags::DIRTY);
        *pos
      })
      .collect();
    dirty.sort();
    dirty
  }

  /// Clears the on-minimap flag of entries in a trimmed strip.
  pub fn clear_minimap_flags(&mut self, axis: Axis, range: RangeInclusive<i32>) {
    for (pos, chunk) in self.chunks.iter_mut() {
      if range.contains(&pos.along(axis)) {
        chunk.flags.remove(ChunkFlags::ON_MINIMAP);
      }
    }
  }

  /// Iterates the keys of all entries.
  pub fn positions(&self) -> impl Iterator<Item = ChunkPos> + '_ {
    self.chunks.keys().copied()
  }

  pub fn len(&self) -> usize {
    self.chunks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.chunks.is_empty()
  }

  /// Stores `chunk` under `key` regardless of its own coordinate.
  #[cfg(test)]
  pub(crate) fn insert_raw(&mut self, key: ChunkPos, chunk: Chunk) {
    self.chunks.insert(key, chunk);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::chunk::ChunkPayload;
  use crate::coords::BlockPos;
  use crate::minimap::MarkerKind;
  use crate::surface::Rgba;

  fn loaded(x: i32, z: i32) -> Chunk {
    Chunk::loaded(ChunkPos::new(x, z), ChunkPayload::empty())
  }

  #[test]
  fn stale_entries_are_hidden_from_lookups() {
    let mut cache = ChunkCache::new();
    cache.put(loaded(1, 1));
    assert_eq!(cache.check(ChunkPos::new(1, 1)), Residency::Valid { on_minimap: false });

    // Entry keyed at (2, 2) but holding (9, 9)'s data.
    let mut stale = loaded(2, 2);
    stale.set_pos(ChunkPos::new(9, 9));
    cache.insert_raw(ChunkPos::new(2, 2), stale);

    assert!(cache.get(ChunkPos::new(2, 2)).is_none());
    assert!(!cache.is_valid(ChunkPos::new(2, 2)));
    assert!(cache.contains_key(ChunkPos::new(2, 2)));
    assert_eq!(cache.check(ChunkPos::new(2, 2)), Residency::Stale);
    assert_eq!(cache.check(ChunkPos::new(3, 3)), Residency::Missing);
  }

  #[test]
  fn evict_erases_tiles_on_the_minimap() {
    let mut minimap = MinimapCompositor::new(256);
    let mut cache = ChunkCache::new();
    let tile = crate::chunk::TileColors::filled(16, 16, Some(Rgba::WHITE));

    minimap.draw_tile(ChunkPos::new(0, 0), &tile);
    minimap.draw_tile(ChunkPos::new(1, 0), &tile);
    cache.put(loaded(0, 0));
    cache.put(loaded(1, 0));
    cache.set_on_minimap(ChunkPos::new(0, 0), true);

    assert!(cache.evict(ChunkPos::new(0, 0), &mut minimap).is_some());
    assert_eq!(minimap.surface()[(0, 0)], Rgba::TRANSPARENT);

    // Not flagged, so its pixels are left alone.
    assert!(cache.evict(ChunkPos::new(1, 0), &mut minimap).is_some());
    assert_eq!(minimap.surface()[(16, 0)], Rgba::WHITE);

    assert!(cache.evict(ChunkPos::new(5, 5), &mut minimap).is_none());
    assert!(cache.is_empty());
  }

  #[test]
  fn evict_keeps_glyphs_of_resident_markers() {
    let mut minimap = MinimapCompositor::new(256);
    let mut cache = ChunkCache::new();
    let tile = crate::chunk::TileColors::filled(16, 16, Some(Rgba::WHITE));
    let yellow = MarkerKind::Player.style().color;

    for x in 0..2 {
      minimap.draw_tile(ChunkPos::new(x, 0), &tile);
      cache.put(loaded(x, 0));
      cache.set_on_minimap(ChunkPos::new(x, 0), true);
    }
    // Arm reaches from block 7 to 23, across both tiles.
    let player = BlockPos::new(15, 8);
    minimap.set_marker(MarkerKind::Player, player);
    minimap.draw_marker(player, MarkerKind::Player.style());

    cache.evict(ChunkPos::new(1, 0), &mut minimap);
    assert_eq!(minimap.surface()[(20, 8)], yellow);
    assert_eq!(minimap.surface()[(20, 0)], Rgba::TRANSPARENT);

    // Its own chunk gone, the marker is no longer restored.
    cache.evict(ChunkPos::new(0, 0), &mut minimap);
    assert_eq!(minimap.surface()[(15, 8)], Rgba::TRANSPARENT);
    assert_eq!(minimap.surface()[(10, 8)], Rgba::TRANSPARENT);
  }

  #[test]
  fn take_dirty_clears_flags() {
    let mut cache = ChunkCache::new();
    cache.put(loaded(0, 0));
    cache.put(loaded(0, 1));
    cache.put(loaded(4, 4));

    assert!(cache.mark_dirty(ChunkPos::new(0, 1)));
    assert!(cache.mark_dirty(ChunkPos::new(0, 0)));
    assert!(!cache.mark_dirty(ChunkPos::new(7, 7)));

    assert_eq!(
      cache.take_dirty(),
      vec![ChunkPos::new(0, 0), ChunkPos::new(0, 1)]
    );
    assert!(cache.take_dirty().is_empty());

    cache.mark_all_dirty();
    assert_eq!(cache.take_dirty().len(), 3);
  }

  #[test]
  fn clear_minimap_flags_only_touches_strip() {
    let mut cache = ChunkCache::new();
    for x in 0..4 {
      cache.put(loaded(x, 0));
      cache.set_on_minimap(ChunkPos::new(x, 0), true);
    }

    cache.clear_minimap_flags(Axis::X, 1..=2);

    let on: Vec<_> = (0..4)
      .map(|x| cache.check(ChunkPos::new(x, 0)))
      .collect();
    assert_eq!(on[0], Residency::Valid { on_minimap: true });
    assert_eq!(on[1], Residency::Valid { on_minimap: false });
    assert_eq!(on[2], Residency::Valid { on_minimap: false });
    assert_eq!(on[3], Residency::Valid { on_minimap: true });
  }
}
