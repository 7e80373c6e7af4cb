//! Runtime configuration for chunk streaming and the minimap.
//!
//! Loaded from TOML; every key is optional and falls back to the defaults
//! below.

use std::path::Path;
use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::coords::CHUNK_SIZE;
use crate::error::ConfigError;

/// Streaming ranges, budgets and minimap trim parameters.
#[derive(Resource, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
  /// Half-width of the square of chunks kept loaded around the camera.
  pub load_range: i32,
  /// Selectable render ranges, in chunks.
  pub render_ranges: Vec<i32>,
  /// Index into `render_ranges`.
  pub render_range_index: usize,
  /// Selectable highlight ranges, in chunks.
  pub highlight_ranges: Vec<i32>,
  /// Index into `highlight_ranges`.
  pub highlight_range_index: usize,
  /// Edge length of the square minimap raster, in pixels.
  pub minimap_dim: u32,
  /// Chunks of accumulated drift that trigger a trim.
  pub trim_threshold: i32,
  /// Distance behind the camera, in chunks, at which strips are trimmed.
  pub trim_distance: i32,
  /// Time budget for steady-state queue draining, in milliseconds.
  pub load_budget_ms: u64,
  /// Initial-load progress is reported every this many chunks.
  pub progress_interval: usize,
}

impl Default for StreamingConfig {
  fn default() -> Self {
    Self {
      load_range: 8,
      render_ranges: vec![3, 4, 5, 6, 7, 8],
      render_range_index: 2,
      highlight_ranges: vec![2, 3, 4, 5, 6, 7, 8],
      highlight_range_index: 1,
      minimap_dim: 2048,
      trim_threshold: 10,
      trim_distance: 64,
      load_budget_ms: 100,
      progress_interval: 5,
    }
  }
}

impl StreamingConfig {
  /// Reads and validates a TOML config file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config = Self::from_toml(&contents)?;
    info!("Loaded streaming config from {}", path.as_ref().display());
    Ok(config)
  }

  /// Parses and validates a TOML document.
  pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
    let config: Self = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
  }

  /// Steady-state drain budget.
  pub fn load_budget(&self) -> Duration {
    Duration::from_millis(self.load_budget_ms)
  }

  /// Minimap period in chunks: coordinates this far apart share pixels.
  pub fn minimap_period(&self) -> i32 {
    (self.minimap_dim / CHUNK_SIZE) as i32
  }

  /// Currently selected render range (clamped to the preset table).
  pub fn render_range(&self) -> i32 {
    pick(&self.render_ranges, self.render_range_index)
  }

  /// Currently selected highlight range (clamped to the preset table).
  pub fn highlight_range(&self) -> i32 {
    pick(&self.highlight_ranges, self.highlight_range_index)
  }

  /// Checks the invariants the tracker and compositor rely on.
  ///
  /// Trimmed strips must stay clear of the load window both directly and
  /// through wrap-around, otherwise trimming would erase live tiles.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::Invalid(msg));

    if self.load_range < 0 {
      return invalid(format!("load_range must be >= 0, got {}", self.load_range));
    }
    if self.render_ranges.is_empty() || self.render_ranges.iter().any(|&r| r < 0) {
      return invalid("render_ranges must be non-empty and non-negative".into());
    }
    if self.highlight_ranges.is_empty() || self.highlight_ranges.iter().any(|&r| r < 0) {
      return invalid("highlight_ranges must be non-empty and non-negative".into());
    }
    if let Some(&r) = self.render_ranges.iter().find(|&&r| r > self.load_range) {
      return invalid(format!(
        "render range {r} exceeds load_range {}",
        self.load_range
      ));
    }
    if let Some(&r) = self.highlight_ranges.iter().find(|&&r| r > self.load_range) {
      return invalid(format!(
        "highlight range {r} exceeds load_range {}",
        self.load_range
      ));
    }
    if self.minimap_dim == 0 || self.minimap_dim % CHUNK_SIZE != 0 {
      return invalid(format!(
        "minimap_dim must be a positive multiple of {CHUNK_SIZE}, got {}",
        self.minimap_dim
      ));
    }
    if self.progress_interval == 0 {
      return invalid("progress_interval must be > 0".into());
    }

    let period = self.minimap_period();
    if self.trim_threshold <= 0 || self.trim_threshold >= period {
      return invalid(format!(
        "trim_threshold must be in 1..{period}, got {}",
        self.trim_threshold
      ));
    }
    if self.trim_distance <= self.load_range + self.trim_threshold {
      return invalid(format!(
        "trim_distance ({}) must exceed load_range + trim_threshold ({})",
        self.trim_distance,
        self.load_range + self.trim_threshold
      ));
    }
    if self.trim_distance + self.trim_threshold + self.load_range > period {
      return invalid(format!(
        "trim strip at distance {} wraps into the load window (period {period} chunks)",
        self.trim_distance
      ));
    }
    Ok(())
  }
}

fn pick(table: &[i32], index: usize) -> i32 {
  table
    .get(index.min(table.len().saturating_sub(1)))
    .copied()
    .unwrap_or(0)
}
