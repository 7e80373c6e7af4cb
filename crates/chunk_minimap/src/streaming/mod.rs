//! Streaming chunk management.
//!
//! This module provides the infrastructure for streaming an unbounded world
//! around the camera:
//! - [`ChunkWindowTracker`]: Computes which chunks enter and leave the window
//! - [`ChunkLoadQueue`]: Pending loads, drained under a time budget
//! - [`ChunkStreamer`]: Owns the tracker, queue, cache and minimap and keeps
//!   them consistent

mod queue;
mod window;

use std::time::Duration;

use bevy::prelude::*;

pub use queue::{
  ChunkLoadQueue, Clock, DrainMode, DrainReport, LoadOutcome, LoadProgress, LoadRequest,
  ManualClock, WallClock,
};
pub use window::{ChunkWindowTracker, Drift, TrimStrip, WindowDelta, WindowState};

use crate::block::BlockColors;
use crate::cache::{ChunkCache, Residency};
use crate::chunk::{Chunk, ChunkFlags, ChunkPayload};
use crate::config::StreamingConfig;
use crate::coords::{BlockPos, ChunkPos, ChunkRect};
use crate::error::ConfigError;
use crate::highlight::HighlightMode;
use crate::minimap::{MarkerKind, MinimapCompositor, MinimapTexture};
use crate::store::ChunkStore;

/// User-adjustable display toggles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamingSettings {
  pub render_range_index: usize,
  pub highlight_range_index: usize,
  pub highlight: HighlightMode,
}

/// Owns the streaming state for one world.
///
/// Drive it with [`update`](Self::update) whenever the camera may have
/// moved and [`drain`](Self::drain) once per tick.
#[derive(Resource)]
pub struct ChunkStreamer {
  config: StreamingConfig,
  settings: StreamingSettings,
  tracker: ChunkWindowTracker,
  queue: ChunkLoadQueue,
  cache: ChunkCache,
  minimap: MinimapCompositor,
  colors: BlockColors,
  store: Box<dyn ChunkStore + Send + Sync>,
  initial_loading: bool,
}

impl ChunkStreamer {
  /// Creates a streamer reading from `store`.
  ///
  /// Fails if `config` does not pass [`StreamingConfig::validate`].
  pub fn new(
    config: StreamingConfig,
    store: impl ChunkStore + Send + Sync + 'static,
  ) -> Result<Self, ConfigError> {
    config.validate()?;
    let mut tracker = ChunkWindowTracker::new(
      config.load_range,
      config.trim_threshold,
      config.trim_distance,
      config.minimap_period(),
    );
    tracker.set_render_range(config.render_range());
    tracker.set_highlight_range(config.highlight_range());

    Ok(Self {
      settings: StreamingSettings {
        render_range_index: config.render_range_index,
        highlight_range_index: config.highlight_range_index,
        highlight: HighlightMode::default(),
      },
      tracker,
      queue: ChunkLoadQueue::new(config.progress_interval),
      cache: ChunkCache::new(),
      minimap: MinimapCompositor::new(config.minimap_dim),
      colors: BlockColors::default(),
      store: Box::new(store),
      initial_loading: false,
      config,
    })
  }

  /// Replaces the block color table. Existing tiles keep their colors until
  /// redrawn.
  pub fn with_colors(mut self, colors: BlockColors) -> Self {
    self.colors = colors;
    self
  }

  /// Moves the window to `current` and applies the resulting delta.
  pub fn update(&mut self, current: ChunkPos) -> WindowDelta {
    let delta = self.tracker.update(current, &self.cache, &self.queue);
    if delta.initial {
      self.queue.clear();
      self.cache.clear_all(&mut self.minimap);
      self.minimap.clear();
      self.initial_loading = true;
      info!(
        "Starting initial load of {} chunks around {:?}",
        delta.to_load.len(),
        current
      );
    } else {
      for &pos in &delta.to_evict {
        self.queue.cancel(pos);
        self.cache.evict(pos, &mut self.minimap);
      }
    }

    for &pos in &delta.to_redraw {
      self.redraw_tile(pos);
    }
    for &pos in &delta.to_load {
      self.queue.enqueue(pos);
    }
    for strip in &delta.trims {
      debug!(
        "Trimming minimap {:?} strip {:?} at {:?}",
        strip.axis, strip.range, current
      );
      self.minimap.trim_strip(strip.axis, strip.range.clone());
      self.cache.clear_minimap_flags(strip.axis, strip.range.clone());
    }
    delta
  }

  /// Drains the load queue.
  pub fn drain(&mut self, clock: &impl Clock) -> DrainReport {
    self.drain_with_progress(clock, |_| {})
  }

  /// Drains the load queue, reporting initial-load progress.
  ///
  /// During the initial load everything is drained regardless of budget;
  /// afterwards draining stops once the configured budget is spent.
  pub fn drain_with_progress(
    &mut self,
    clock: &impl Clock,
    progress: impl FnMut(LoadProgress),
  ) -> DrainReport {
    let mode = if self.initial_loading {
      DrainMode::Initial
    } else {
      DrainMode::Steady
    };
    let budget = self.config.load_budget();
    let initial = self.initial_loading;

    let Self {
      queue,
      cache,
      minimap,
      colors,
      store,
      ..
    } = self;
    let report = queue.drain(
      clock,
      budget,
      mode,
      |req| load_into(req.pos, &**store, cache, minimap, colors, initial),
      progress,
    );

    if initial && report.remaining == 0 {
      self.initial_loading = false;
      if report.processed > 0 {
        info!(
          "Initial load finished: {} loaded, {} missing, {} failed in {:?}",
          report.loaded, report.missing, report.failed, report.elapsed
        );
      }
    } else if report.out_of_budget {
      debug!(
        "Load budget spent after {} chunks; {} still queued",
        report.processed, report.remaining
      );
    }
    report
  }

  /// Current window, or `None` before the first update.
  pub fn current_window(&self) -> Option<WindowState> {
    self.tracker.window()
  }

  /// Returns true if a valid chunk is cached at `pos`.
  pub fn is_resident(&self, pos: ChunkPos) -> bool {
    self.cache.is_valid(pos)
  }

  /// Returns true while the initial load has not been fully drained.
  pub fn is_initial_loading(&self) -> bool {
    self.initial_loading
  }

  /// Evicts and re-enqueues the chunks of `rect` inside the load window.
  ///
  /// Returns the number of chunks newly queued; chunks already pending are
  /// not counted.
  pub fn request_immediate_reload(&mut self, rect: ChunkRect) -> usize {
    let Some(window) = self.tracker.window() else {
      return 0;
    };
    let Some(rect) = rect.intersection(&window.load_rect()) else {
      return 0;
    };
    let mut queued = 0;
    for pos in rect.positions() {
      self.cache.evict(pos, &mut self.minimap);
      if self.queue.enqueue(pos) {
        queued += 1;
      }
    }
    queued
  }

  /// Switches to another world.
  ///
  /// Pending loads, cached chunks, the raster and markers are discarded; the
  /// next [`update`](Self::update) starts a fresh initial load.
  pub fn switch_world(&mut self, store: impl ChunkStore + Send + Sync + 'static) {
    self.store = Box::new(store);
    self.queue.clear();
    self.cache.clear_all(&mut self.minimap);
    self.minimap.clear();
    self.minimap.clear_markers();
    self.tracker.reset();
    self.initial_loading = false;
    info!("Switched world; streaming state cleared");
  }

  /// Forgets the window after a camera teleport. The raster is cleared and
  /// the next update restarts the initial load.
  pub fn relocate(&mut self) {
    self.tracker.reset();
    self.minimap.clear();
  }

  pub fn minimap_texture(&self) -> MinimapTexture<'_> {
    self.minimap.texture()
  }

  /// Returns the raster if it changed since the last call.
  pub fn take_minimap_upload(&mut self) -> Option<MinimapTexture<'_>> {
    if self.minimap.take_upload() {
      Some(self.minimap.texture())
    } else {
      None
    }
  }

  /// Places a marker, drawing it now if its chunk is resident.
  pub fn set_marker(&mut self, kind: MarkerKind, block: BlockPos) {
    if let Some(previous) = self.minimap.marker(kind) {
      self.minimap.clear_marker(kind);
      self.redraw_under_marker(previous);
    }
    self.minimap.set_marker(kind, block);
    if self.cache.is_valid(block.chunk()) {
      self.minimap.draw_marker(block, kind.style());
    }
  }

  /// Removes a marker and restores the tiles it covered.
  pub fn clear_marker(&mut self, kind: MarkerKind) {
    if let Some(block) = self.minimap.clear_marker(kind) {
      self.redraw_under_marker(block);
    }
  }

  pub fn marker(&self, kind: MarkerKind) -> Option<BlockPos> {
    self.minimap.marker(kind)
  }

  pub fn settings(&self) -> StreamingSettings {
    self.settings
  }

  pub fn config(&self) -> &StreamingConfig {
    &self.config
  }

  pub fn highlight(&self) -> HighlightMode {
    self.settings.highlight
  }

  /// Highlight color at `elapsed`, or `None` when highlighting is off.
  pub fn highlight_color(&self, elapsed: Duration) -> Option<[f32; 4]> {
    self.settings.highlight.color_at(elapsed)
  }

  /// Sets the highlight mode. Switching highlighting on or off marks every
  /// cached chunk dirty.
  pub fn set_highlight(&mut self, mode: HighlightMode) {
    let was_off = self.settings.highlight == HighlightMode::Off;
    self.settings.highlight = mode;
    if was_off != (mode == HighlightMode::Off) {
      self.cache.mark_all_dirty();
    }
  }

  /// Advances to the next highlight mode and returns it.
  pub fn cycle_highlight(&mut self) -> HighlightMode {
    let next = self.settings.highlight.next();
    self.set_highlight(next);
    next
  }

  /// Selects a render range preset, clamping `index`. Returns the range.
  pub fn select_render_range(&mut self, index: usize) -> i32 {
    let index = index.min(self.config.render_ranges.len().saturating_sub(1));
    self.settings.render_range_index = index;
    self.config.render_range_index = index;
    let range = self.config.render_range();
    self.tracker.set_render_range(range);
    range
  }

  /// Selects a highlight range preset, clamping `index`. Returns the range.
  pub fn select_highlight_range(&mut self, index: usize) -> i32 {
    let index = index.min(self.config.highlight_ranges.len().saturating_sub(1));
    self.settings.highlight_range_index = index;
    self.config.highlight_range_index = index;
    let range = self.config.highlight_range();
    self.tracker.set_highlight_range(range);
    range
  }

  /// Takes the chunks whose render geometry must be rebuilt.
  pub fn take_dirty(&mut self) -> Vec<ChunkPos> {
    self.cache.take_dirty()
  }

  /// Number of queued loads.
  pub fn pending_loads(&self) -> usize {
    self.queue.len()
  }

  pub fn cache(&self) -> &ChunkCache {
    &self.cache
  }

  pub fn queue(&self) -> &ChunkLoadQueue {
    &self.queue
  }

  pub fn drift(&self) -> Drift {
    self.tracker.drift()
  }

  /// Recomposites the tile of a cached chunk and the markers over it.
  fn redraw_tile(&mut self, pos: ChunkPos) {
    let Some(chunk) = self.cache.get_mut(pos) else {
      return;
    };
    let tile = chunk.payload.tile_colors(&self.colors);
    chunk.flags.insert(ChunkFlags::ON_MINIMAP);
    self.minimap.draw_tile(pos, &tile);
    self.minimap.redraw_markers_in(pos);
  }

  fn redraw_under_marker(&mut self, block: BlockPos) {
    for pos in MinimapCompositor::marker_footprint(block) {
      self.redraw_tile(pos);
    }
  }
}

/// Loads one chunk into the cache and composites its tile.
fn load_into(
  pos: ChunkPos,
  store: &(dyn ChunkStore + Send + Sync),
  cache: &mut ChunkCache,
  minimap: &mut MinimapCompositor,
  colors: &BlockColors,
  initial: bool,
) -> LoadOutcome {
  match cache.check(pos) {
    Residency::Valid { .. } => return LoadOutcome::Skipped,
    Residency::Stale => {
      cache.evict(pos, minimap);
    }
    Residency::Missing => {}
  }

  let (payload, outcome) = match store.load(pos) {
    Ok(Some(payload)) => (payload, LoadOutcome::Loaded),
    Ok(None) => (ChunkPayload::empty(), LoadOutcome::Missing),
    Err(err) => {
      warn!("Failed to load chunk {:?}: {}", pos, err);
      (ChunkPayload::empty(), LoadOutcome::Failed)
    }
  };

  minimap.draw_tile(pos, &payload.tile_colors(colors));
  let mut chunk = Chunk::loaded(pos, payload);
  chunk.flags.insert(ChunkFlags::ON_MINIMAP);
  cache.put(chunk);

  if !initial {
    for neighbor in pos.neighbors() {
      cache.mark_dirty(neighbor);
    }
  }
  minimap.redraw_markers_in(pos);
  outcome
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::ids;
  use crate::error::StoreError;
  use crate::store::MemoryStore;
  use crate::surface::Rgba;

  fn small_config() -> StreamingConfig {
    StreamingConfig {
      load_range: 2,
      render_ranges: vec![1, 2],
      highlight_ranges: vec![1, 2],
      ..Default::default()
    }
  }

  fn grass_world() -> impl ChunkStore + Send + Sync + 'static {
    |_pos: ChunkPos| -> Result<Option<ChunkPayload>, StoreError> {
      Ok(Some(ChunkPayload::uniform(ids::GRASS)))
    }
  }

  fn streamer() -> ChunkStreamer {
    ChunkStreamer::new(small_config(), grass_world()).unwrap()
  }

  #[test]
  fn initial_load_fills_window() {
    let mut streamer = streamer();
    let delta = streamer.update(ChunkPos::new(0, 0));
    assert!(delta.initial);
    assert_eq!(streamer.pending_loads(), 25);
    assert!(streamer.is_initial_loading());

    let mut progress = Vec::new();
    let report = streamer.drain_with_progress(&ManualClock::new(), |p| progress.push(p));
    assert_eq!(report.loaded, 25);
    assert_eq!(progress.last(), Some(&LoadProgress { done: 25, total: 25 }));
    assert_eq!(progress.len(), 5);
    assert!(!streamer.is_initial_loading());

    for pos in ChunkRect::square(ChunkPos::new(0, 0), 2).positions() {
      assert!(streamer.is_resident(pos));
    }
    // Neighbours are not dirtied during the initial load.
    assert!(streamer.take_dirty().is_empty());
    let grass = BlockColors::default().resolve(ids::GRASS);
    assert_eq!(Some(streamer.minimap_texture().surface[(0, 0)]), grass);
  }

  #[test]
  fn steady_loads_dirty_neighbours() {
    let mut streamer = streamer();
    streamer.update(ChunkPos::new(0, 0));
    streamer.drain(&ManualClock::new());

    streamer.update(ChunkPos::new(1, 0));
    assert_eq!(streamer.pending_loads(), 5);
    assert!(!streamer.is_resident(ChunkPos::new(-2, 0)));

    let report = streamer.drain(&ManualClock::new());
    assert_eq!(report.loaded, 5);
    let dirty = streamer.take_dirty();
    assert!(dirty.contains(&ChunkPos::new(2, 0)));
    assert!(!dirty.contains(&ChunkPos::new(0, 0)));
  }

  #[test]
  fn evicted_tiles_are_erased() {
    let mut streamer = streamer();
    streamer.update(ChunkPos::new(0, 0));
    streamer.drain(&ManualClock::new());

    let (x, y) = streamer.minimap.tile_origin(ChunkPos::new(-2, 0));
    streamer.update(ChunkPos::new(1, 0));
    assert_eq!(streamer.minimap_texture().surface[(x, y)], Rgba::TRANSPARENT);
  }

  #[test]
  fn store_failures_are_counted_and_not_retried() {
    let store = |pos: ChunkPos| -> Result<Option<ChunkPayload>, StoreError> {
      match pos.x {
        0 => Err(StoreError::Corrupt("truncated".into())),
        1 => Ok(None),
        _ => Ok(Some(ChunkPayload::uniform(ids::STONE))),
      }
    };
    let mut streamer = ChunkStreamer::new(small_config(), store).unwrap();
    streamer.update(ChunkPos::new(0, 0));
    let report = streamer.drain(&ManualClock::new());

    assert_eq!(report.failed, 5);
    assert_eq!(report.missing, 5);
    assert_eq!(report.loaded, 15);
    assert_eq!(streamer.pending_loads(), 0);
    assert!(streamer.is_resident(ChunkPos::new(0, 0)));
    assert!(streamer.update(ChunkPos::new(0, 0)).is_empty());
  }

  #[test]
  fn immediate_reload_is_clipped_to_window() {
    let mut streamer = streamer();
    assert_eq!(
      streamer.request_immediate_reload(ChunkRect::square(ChunkPos::new(0, 0), 1)),
      0
    );

    streamer.update(ChunkPos::new(0, 0));
    streamer.drain(&ManualClock::new());

    let queued = streamer.request_immediate_reload(ChunkRect::new(
      ChunkPos::new(1, 1),
      ChunkPos::new(10, 10),
    ));
    assert_eq!(queued, 4);
    assert!(!streamer.is_resident(ChunkPos::new(2, 2)));
    streamer.drain(&ManualClock::new());
    assert!(streamer.is_resident(ChunkPos::new(2, 2)));
  }

  #[test]
  fn immediate_reload_counts_only_new_requests() {
    let mut streamer = streamer();
    streamer.update(ChunkPos::new(0, 0));
    streamer.drain(&ManualClock::new());

    let rect = ChunkRect::new(ChunkPos::new(0, 0), ChunkPos::new(1, 1));
    assert_eq!(streamer.request_immediate_reload(rect), 4);
    assert_eq!(streamer.pending_loads(), 4);

    // Overlaps the four still pending.
    let wider = ChunkRect::new(ChunkPos::new(0, 0), ChunkPos::new(2, 1));
    assert_eq!(streamer.request_immediate_reload(wider), 2);
    assert_eq!(streamer.pending_loads(), 6);
  }

  #[test]
  fn invalid_config_is_rejected_at_construction() {
    let zero_threshold = StreamingConfig {
      trim_threshold: 0,
      ..small_config()
    };
    assert!(matches!(
      ChunkStreamer::new(zero_threshold, grass_world()),
      Err(ConfigError::Invalid(_))
    ));

    // Strips at 5..=14 behind the camera would cut into a range-8 window.
    let overlapping = StreamingConfig {
      load_range: 8,
      trim_distance: 5,
      ..Default::default()
    };
    assert!(matches!(
      ChunkStreamer::new(overlapping, grass_world()),
      Err(ConfigError::Invalid(_))
    ));
  }

  #[test]
  fn switch_world_restarts_initial_load() {
    let mut streamer = streamer();
    streamer.set_marker(MarkerKind::Spawn, BlockPos::new(0, 0));
    streamer.update(ChunkPos::new(0, 0));
    streamer.drain(&ManualClock::new());

    streamer.switch_world(MemoryStore::new());
    assert!(streamer.current_window().is_none());
    assert!(streamer.cache().is_empty());
    assert_eq!(streamer.marker(MarkerKind::Spawn), None);
    assert!(streamer.minimap_texture().surface.iter().all(|p| p.is_transparent()));

    assert!(streamer.update(ChunkPos::new(5, 5)).initial);
    let report = streamer.drain(&ManualClock::new());
    assert_eq!(report.missing, 25);
  }

  #[test]
  fn relocate_clears_and_reloads() {
    let mut streamer = streamer();
    streamer.update(ChunkPos::new(0, 0));
    streamer.drain(&ManualClock::new());

    streamer.relocate();
    let delta = streamer.update(ChunkPos::new(100, 100));
    assert!(delta.initial);
    assert!(!streamer.is_resident(ChunkPos::new(0, 0)));
    assert_eq!(streamer.pending_loads(), 25);
  }

  #[test]
  fn markers_follow_tile_loads() {
    let mut streamer = streamer();
    let spawn = BlockPos::new(8, 8);
    streamer.set_marker(MarkerKind::Spawn, spawn);
    let red = MarkerKind::Spawn.style().color;

    // Not drawn until its chunk is resident.
    assert_ne!(streamer.minimap_texture().surface[(8, 8)], red);

    streamer.update(ChunkPos::new(0, 0));
    streamer.drain(&ManualClock::new());
    assert_eq!(streamer.minimap_texture().surface[(8, 8)], red);
    assert_eq!(streamer.minimap_texture().surface[(16, 8)], red);

    streamer.clear_marker(MarkerKind::Spawn);
    assert_ne!(streamer.minimap_texture().surface[(8, 8)], red);
    assert_ne!(streamer.minimap_texture().surface[(16, 8)], red);
  }

  #[test]
  fn highlight_toggle_marks_everything_dirty() {
    let mut streamer = streamer();
    streamer.update(ChunkPos::new(0, 0));
    streamer.drain(&ManualClock::new());

    assert_eq!(streamer.cycle_highlight(), HighlightMode::White);
    assert!(streamer.take_dirty().is_empty());

    assert_eq!(streamer.cycle_highlight(), HighlightMode::Off);
    assert_eq!(streamer.take_dirty().len(), 25);
    assert_eq!(streamer.highlight_color(Duration::from_millis(10)), None);

    assert_eq!(streamer.cycle_highlight(), HighlightMode::Disco);
    assert_eq!(streamer.take_dirty().len(), 25);
  }

  #[test]
  fn range_selection_clamps() {
    let mut streamer = ChunkStreamer::new(StreamingConfig::default(), grass_world()).unwrap();
    assert_eq!(streamer.select_render_range(0), 3);
    assert_eq!(streamer.select_render_range(42), 8);
    assert_eq!(streamer.settings().render_range_index, 5);
    assert_eq!(streamer.select_highlight_range(42), 8);

    streamer.update(ChunkPos::new(0, 0));
    streamer.select_render_range(1);
    let window = streamer.current_window().unwrap();
    assert_eq!(window.render_range, 4);
    assert_eq!(window.render_rect().len(), 9 * 9);
    assert_eq!(window.effective_highlight_range(), 4);
  }

  #[test]
  fn custom_palette_colors_tiles() {
    let mut colors = BlockColors::empty();
    colors.insert(ids::GRASS, Rgba::WHITE);
    let mut streamer = streamer().with_colors(colors);
    streamer.update(ChunkPos::new(0, 0));
    streamer.drain(&ManualClock::new());
    assert_eq!(streamer.minimap_texture().surface[(3, 3)], Rgba::WHITE);
  }
}
