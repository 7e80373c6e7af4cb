//! Streaming window for chunk management.
//!
//! Tracks a square window of chunks centred on the camera. Each update
//! compares the new centre with the previous one and produces the edge
//! strips that left the window (to evict) and entered it (to load), plus
//! minimap trim strips once enough drift has accumulated.
//!
//! Moves are handled per axis: an X move of `dx` swaps `|dx|` columns
//! spanning the window's Z range, a Z move swaps rows spanning the X range.
//! A diagonal move produces both, with the shared corner reported once.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use crate::cache::{ChunkCache, Residency};
use crate::coords::{Axis, ChunkPos, ChunkRect};
use crate::streaming::queue::ChunkLoadQueue;

/// Current window geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowState {
  /// Chunk containing the camera.
  pub center: ChunkPos,
  pub load_range: i32,
  pub render_range: i32,
  pub highlight_range: i32,
}

impl WindowState {
  /// Highlight range, capped by the render range.
  pub fn effective_highlight_range(&self) -> i32 {
    self.highlight_range.min(self.render_range)
  }

  /// Chunks that must be resident.
  pub fn load_rect(&self) -> ChunkRect {
    ChunkRect::square(self.center, self.load_range)
  }

  /// Chunks that are drawn.
  pub fn render_rect(&self) -> ChunkRect {
    ChunkRect::square(self.center, self.render_range)
  }
}

/// A band of chunk coordinates along one axis whose minimap pixels must be
/// cleared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrimStrip {
  pub axis: Axis,
  pub range: RangeInclusive<i32>,
}

/// Changes to apply after a window update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowDelta {
  /// Chunks to fetch, in load order.
  pub to_load: Vec<ChunkPos>,
  /// Chunks (cached or pending) that left the window or are stale.
  pub to_evict: Vec<ChunkPos>,
  /// Valid chunks whose tiles are missing from the minimap.
  pub to_redraw: Vec<ChunkPos>,
  pub trims: Vec<TrimStrip>,
  /// True for the first update after creation or [`reset`](ChunkWindowTracker::reset).
  pub initial: bool,
}

impl WindowDelta {
  pub fn is_empty(&self) -> bool {
    self.to_load.is_empty()
      && self.to_evict.is_empty()
      && self.to_redraw.is_empty()
      && self.trims.is_empty()
  }
}

/// Signed accumulated movement since the last trim, in chunks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Drift {
  pub x: i32,
  pub z: i32,
}

impl Drift {
  pub fn along(&self, axis: Axis) -> i32 {
    match axis {
      Axis::X => self.x,
      Axis::Z => self.z,
    }
  }

  fn along_mut(&mut self, axis: Axis) -> &mut i32 {
    match axis {
      Axis::X => &mut self.x,
      Axis::Z => &mut self.z,
    }
  }
}

/// Positions in insertion order, each at most once.
#[derive(Default)]
struct OrderedSet {
  seen: HashSet<ChunkPos>,
  items: Vec<ChunkPos>,
}

impl OrderedSet {
  fn push(&mut self, pos: ChunkPos) {
    if self.seen.insert(pos) {
      self.items.push(pos);
    }
  }
}

/// Computes window deltas as the camera moves.
pub struct ChunkWindowTracker {
  load_range: i32,
  render_range: i32,
  highlight_range: i32,
  trim_threshold: i32,
  trim_distance: i32,
  period: i32,
  center: Option<ChunkPos>,
  drift: Drift,
}

impl ChunkWindowTracker {
  /// Creates a tracker with no window.
  ///
  /// `period` is the minimap period in chunks.
  ///
  /// # Panics
  ///
  /// Panics if a trimmed strip could overlap the load window, directly or
  /// through wrap-around. [`StreamingConfig::validate`](crate::StreamingConfig::validate)
  /// rejects the same parameters.
  pub fn new(load_range: i32, trim_threshold: i32, trim_distance: i32, period: i32) -> Self {
    assert!(trim_threshold > 0, "trim threshold must be positive");
    assert!(
      trim_distance > load_range + trim_threshold,
      "trim strips would overlap the load window"
    );
    assert!(
      trim_distance + trim_threshold + load_range <= period,
      "trim strips would wrap into the load window"
    );
    Self {
      load_range,
      render_range: load_range,
      highlight_range: load_range,
      trim_threshold,
      trim_distance,
      period,
      center: None,
      drift: Drift::default(),
    }
  }

  pub fn set_render_range(&mut self, range: i32) {
    self.render_range = range;
  }

  pub fn set_highlight_range(&mut self, range: i32) {
    self.highlight_range = range;
  }

  pub fn load_range(&self) -> i32 {
    self.load_range
  }

  pub fn drift(&self) -> Drift {
    self.drift
  }

  /// Current window, or `None` before the first update.
  pub fn window(&self) -> Option<WindowState> {
    self.center.map(|center| WindowState {
      center,
      load_range: self.load_range,
      render_range: self.render_range,
      highlight_range: self.highlight_range,
    })
  }

  /// Forgets the window; the next update starts from scratch.
  pub fn reset(&mut self) {
    self.center = None;
    self.drift = Drift::default();
  }

  /// Moves the window to `current`.
  ///
  /// The first call returns the whole square as loads and is flagged
  /// [`initial`](WindowDelta::initial). Later calls return only the edge
  /// strips that changed, filtered against what `cache` and `queue`
  /// already hold.
  pub fn update(
    &mut self,
    current: ChunkPos,
    cache: &ChunkCache,
    queue: &ChunkLoadQueue,
  ) -> WindowDelta {
    let Some(old) = self.center else {
      self.center = Some(current);
      self.drift = Drift::default();
      return WindowDelta {
        to_load: ChunkRect::square(current, self.load_range)
          .positions()
          .collect(),
        initial: true,
        ..Default::default()
      };
    };

    if old == current {
      return WindowDelta::default();
    }

    let old_rect = ChunkRect::square(old, self.load_range);
    let new_rect = ChunkRect::square(current, self.load_range);

    let mut evict = OrderedSet::default();
    let mut load = OrderedSet::default();
    for axis in [Axis::X, Axis::Z] {
      let d = current.along(axis) - old.along(axis);
      if d == 0 {
        continue;
      }
      for pos in self.trailing(&old_rect, axis, d) {
        if cache.contains_key(pos) || queue.contains(pos) {
          evict.push(pos);
        }
      }
      for pos in self.leading(&new_rect, axis, d) {
        load.push(pos);
      }
    }

    let mut delta = WindowDelta::default();
    for pos in load.items {
      match cache.check(pos) {
        Residency::Valid { on_minimap: true } => {}
        Residency::Valid { on_minimap: false } => delta.to_redraw.push(pos),
        Residency::Stale => {
          evict.push(pos);
          delta.to_load.push(pos);
        }
        Residency::Missing => {
          if !queue.contains(pos) {
            delta.to_load.push(pos);
          }
        }
      }
    }
    delta.to_evict = evict.items;

    for axis in [Axis::X, Axis::Z] {
      let d = current.along(axis) - old.along(axis);
      self.accumulate_drift(axis, d, current.along(axis), &mut delta.trims);
    }

    self.center = Some(current);
    delta
  }

  /// Edge of `rect` left behind by a move of `d` along `axis`.
  fn trailing(&self, rect: &ChunkRect, axis: Axis, d: i32) -> impl Iterator<Item = ChunkPos> + use<> {
    let width = d.abs().min(2 * self.load_range + 1);
    let (lo, hi) = rect.range(axis).into_inner();
    let band = if d > 0 {
      lo..=lo + width - 1
    } else {
      hi - width + 1..=hi
    };
    band_rect(rect, axis, band).positions()
  }

  /// Edge of `rect` entered by a move of `d` along `axis`.
  fn leading(&self, rect: &ChunkRect, axis: Axis, d: i32) -> impl Iterator<Item = ChunkPos> + use<> {
    let width = d.abs().min(2 * self.load_range + 1);
    let (lo, hi) = rect.range(axis).into_inner();
    let band = if d > 0 {
      hi - width + 1..=hi
    } else {
      lo..=lo + width - 1
    };
    band_rect(rect, axis, band).positions()
  }

  /// Adds `d` to the drift along `axis` and emits a trim strip for every
  /// full threshold crossed.
  ///
  /// Strips start `trim_distance` chunks behind `center` and step a further
  /// threshold back each. Only as many strips as fit between that distance
  /// and the far side of the load window are emitted; the remaining drift
  /// is folded below the threshold.
  fn accumulate_drift(&mut self, axis: Axis, d: i32, center: i32, trims: &mut Vec<TrimStrip>) {
    let t = self.trim_threshold;
    let drift = self.drift.along_mut(axis);
    *drift += d;
    if drift.abs() < t {
      return;
    }

    let crossings = drift.abs() / t;
    let max_strips = ((self.period - self.load_range - self.trim_distance) / t).max(1);
    let sign = drift.signum();
    for k in 0..crossings.min(max_strips) {
      let near = self.trim_distance + k * t;
      let far = near + t - 1;
      let range = if sign > 0 {
        center - far..=center - near
      } else {
        center + near..=center + far
      };
      trims.push(TrimStrip { axis, range });
    }
    *drift -= sign * crossings * t;
  }
}

/// Sub-rectangle of `rect` restricted to `band` along `axis`.
fn band_rect(rect: &ChunkRect, axis: Axis, band: RangeInclusive<i32>) -> ChunkRect {
  let (lo, hi) = (*band.start(), *band.end());
  match axis {
    Axis::X => ChunkRect::new(ChunkPos::new(lo, rect.min.z), ChunkPos::new(hi, rect.max.z)),
    Axis::Z => ChunkRect::new(ChunkPos::new(rect.min.x, lo), ChunkPos::new(rect.max.x, hi)),
  }
}
