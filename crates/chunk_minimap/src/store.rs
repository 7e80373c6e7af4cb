//! Chunk store - where chunk payloads come from.
//!
//! The [`ChunkStore`] trait is the seam to world-file parsing, which this
//! crate treats as opaque. [`MemoryStore`] backs demos and tests.

use std::collections::HashMap;

use crate::chunk::ChunkPayload;
use crate::coords::ChunkPos;
use crate::error::StoreError;

/// Source of chunk payloads.
pub trait ChunkStore {
  /// Reads the chunk at `pos`.
  ///
  /// Returns `Ok(None)` when the world has no data there. Errors are
  /// treated as absent by the caller and are not retried.
  fn load(&self, pos: ChunkPos) -> Result<Option<ChunkPayload>, StoreError>;
}

impl<F> ChunkStore for F
where
  F: Fn(ChunkPos) -> Result<Option<ChunkPayload>, StoreError>,
{
  fn load(&self, pos: ChunkPos) -> Result<Option<ChunkPayload>, StoreError> {
    self(pos)
  }
}

/// In-memory chunk store.
#[derive(Default)]
pub struct MemoryStore {
  chunks: HashMap<ChunkPos, ChunkPayload>,
}

impl MemoryStore {
  /// Creates an empty store.
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts (or replaces) the payload at `pos`.
  pub fn insert(&mut self, pos: ChunkPos, payload: ChunkPayload) {
    self.chunks.insert(pos, payload);
  }

  /// Returns the number of stored chunks.
  pub fn len(&self) -> usize {
    self.chunks.len()
  }

  /// Returns true if the store holds no chunks.
  pub fn is_empty(&self) -> bool {
    self.chunks.is_empty()
  }
}

impl ChunkStore for MemoryStore {
  fn load(&self, pos: ChunkPos) -> Result<Option<ChunkPayload>, StoreError> {
    Ok(self.chunks.get(&pos).cloned())
  }
}
