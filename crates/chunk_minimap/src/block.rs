//! Block ids and their minimap colors.

use std::collections::HashMap;

use bevy::prelude::Resource;

use crate::surface::Rgba;

/// Block type index as stored by the world format.
///
/// Id 0 is air: columns whose topmost exposed block is air draw nothing.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u16);

impl BlockId {
  pub const AIR: Self = Self(0);
}

/// Built-in block ids.
pub mod ids {
  use super::BlockId;
  pub const AIR: BlockId = BlockId(0);
  pub const STONE: BlockId = BlockId(1);
  pub const GRASS: BlockId = BlockId(2);
  pub const DIRT: BlockId = BlockId(3);
  pub const WATER: BlockId = BlockId(9);
  pub const SAND: BlockId = BlockId(12);
  pub const LEAVES: BlockId = BlockId(18);
  pub const SNOW: BlockId = BlockId(78);
}

/// Maps block ids to representative minimap colors.
///
/// Unregistered non-air ids resolve to [`BlockColors::UNKNOWN`] so that
/// newer world data still shows up on the map.
#[derive(Resource, Clone, Debug)]
pub struct BlockColors {
  colors: HashMap<BlockId, Rgba>,
}

impl BlockColors {
  /// Magenta, easy to spot on the map.
  pub const UNKNOWN: Rgba = Rgba::rgb(255, 0, 255);

  /// Creates an empty registry.
  pub fn empty() -> Self {
    Self {
      colors: HashMap::new(),
    }
  }

  /// Registers (or replaces) the color for `id`.
  pub fn insert(&mut self, id: BlockId, color: Rgba) -> &mut Self {
    self.colors.insert(id, color);
    self
  }

  /// Resolves the color for a column's topmost exposed block.
  ///
  /// Returns `None` for air.
  pub fn resolve(&self, id: BlockId) -> Option<Rgba> {
    if id == BlockId::AIR {
      return None;
    }
    Some(self.colors.get(&id).copied().unwrap_or(Self::UNKNOWN))
  }

  /// Returns the number of registered ids.
  #[must_use]
  pub fn len(&self) -> usize {
    self.colors.len()
  }

  /// Returns true if no ids are registered.
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.colors.is_empty()
  }
}

impl Default for BlockColors {
  fn default() -> Self {
    let mut colors = Self::empty();
    colors
      .insert(ids::STONE, Rgba::rgb(128, 128, 128))
      .insert(ids::GRASS, Rgba::rgb(96, 152, 60))
      .insert(ids::DIRT, Rgba::rgb(134, 96, 67))
      .insert(ids::WATER, Rgba::rgb(38, 92, 255))
      .insert(ids::SAND, Rgba::rgb(219, 211, 160))
      .insert(ids::LEAVES, Rgba::rgb(40, 110, 30))
      .insert(ids::SNOW, Rgba::rgb(240, 251, 251));
    colors
  }
}
