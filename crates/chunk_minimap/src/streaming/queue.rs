//! FIFO queue of pending chunk loads, drained under a time budget.
//!
//! The queue is the continuation state of streaming: a steady-state drain
//! stops once its budget is spent and leaves the rest for the next tick.
//! The initial load around a fresh window ignores the budget.

use std::cell::Cell;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use bevy::prelude::*;
// WASM compat: std::time::Instant panics on wasm32
use web_time::Instant;

use crate::coords::{ChunkPos, ChunkRect};

/// A pending load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadRequest {
  pub pos: ChunkPos,
  /// Monotonic enqueue order.
  pub order: u64,
}

/// How a drain treats the time budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainMode {
  /// Drain everything, reporting progress.
  Initial,
  /// Stop once the budget is exceeded.
  Steady,
}

/// Result of processing one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
  /// The store returned data.
  Loaded,
  /// The store has no data for the coordinate.
  Missing,
  /// Already cached; nothing to do.
  Skipped,
  /// The store failed.
  Failed,
}

/// Initial-load progress.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadProgress {
  pub done: usize,
  pub total: usize,
}

impl LoadProgress {
  /// Completed fraction in `[0, 1]`.
  pub fn fraction(&self) -> f32 {
    if self.total == 0 {
      1.0
    } else {
      self.done as f32 / self.total as f32
    }
  }
}

/// Summary of one drain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
  pub processed: usize,
  pub loaded: usize,
  pub missing: usize,
  pub skipped: usize,
  pub failed: usize,
  /// Requests still queued afterwards.
  pub remaining: usize,
  pub elapsed: Duration,
  /// True if a steady drain stopped on its budget.
  pub out_of_budget: bool,
}

impl DrainReport {
  fn record(&mut self, outcome: LoadOutcome) {
    self.processed += 1;
    match outcome {
      LoadOutcome::Loaded => self.loaded += 1,
      LoadOutcome::Missing => self.missing += 1,
      LoadOutcome::Skipped => self.skipped += 1,
      LoadOutcome::Failed => self.failed += 1,
    }
  }
}

/// Monotonic time source for drain budgets.
pub trait Clock {
  /// Time since an arbitrary fixed origin.
  fn now(&self) -> Duration;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug)]
pub struct WallClock {
  origin: Instant,
}

impl Default for WallClock {
  fn default() -> Self {
    Self {
      origin: Instant::now(),
    }
  }
}

impl Clock for WallClock {
  fn now(&self) -> Duration {
    self.origin.elapsed()
  }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
  now: Cell<Duration>,
}

impl ManualClock {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn advance(&self, by: Duration) {
    self.now.set(self.now.get() + by);
  }
}

impl Clock for ManualClock {
  fn now(&self) -> Duration {
    self.now.get()
  }
}

/// Deduplicated FIFO of chunk coordinates awaiting load.
pub struct ChunkLoadQueue {
  pending: VecDeque<LoadRequest>,
  members: HashSet<ChunkPos>,
  next_order: u64,
  progress_interval: usize,
}

impl Default for ChunkLoadQueue {
  fn default() -> Self {
    Self::new(5)
  }
}

impl ChunkLoadQueue {
  /// Creates an empty queue reporting initial-load progress every
  /// `progress_interval` items.
  pub fn new(progress_interval: usize) -> Self {
    Self {
      pending: VecDeque::new(),
      members: HashSet::new(),
      next_order: 0,
      progress_interval: progress_interval.max(1),
    }
  }

  /// Appends `pos`. Returns false if it is already pending.
  pub fn enqueue(&mut self, pos: ChunkPos) -> bool {
    if !self.members.insert(pos) {
      return false;
    }
    self.pending.push_back(LoadRequest {
      pos,
      order: self.next_order,
    });
    self.next_order += 1;
    true
  }

  /// Drops the pending request for `pos`. Returns false if none existed.
  pub fn cancel(&mut self, pos: ChunkPos) -> bool {
    if !self.members.remove(&pos) {
      return false;
    }
    self.pending.retain(|req| req.pos != pos);
    true
  }

  /// Drops every request outside `rect`, returning how many were dropped.
  pub fn retain_within(&mut self, rect: ChunkRect) -> usize {
    let before = self.pending.len();
    self.pending.retain(|req| rect.contains(req.pos));
    self.members.retain(|pos| rect.contains(*pos));
    before - self.pending.len()
  }

  pub fn contains(&self, pos: ChunkPos) -> bool {
    self.members.contains(&pos)
  }

  pub fn len(&self) -> usize {
    self.pending.len()
  }

  pub fn is_empty(&self) -> bool {
    self.pending.is_empty()
  }

  pub fn clear(&mut self) {
    self.pending.clear();
    self.members.clear();
  }

  /// Pending requests in load order.
  pub fn pending(&self) -> impl Iterator<Item = &LoadRequest> {
    self.pending.iter()
  }

  fn pop(&mut self) -> Option<LoadRequest> {
    let req = self.pending.pop_front()?;
    self.members.remove(&req.pos);
    Some(req)
  }

  /// Processes requests in FIFO order.
  ///
  /// In [`DrainMode::Steady`] the clock is checked after each item and the
  /// drain stops once more than `budget` has elapsed, so it overruns by at
  /// most one item. In [`DrainMode::Initial`] the budget is ignored and
  /// `progress` is called every `progress_interval` items and on
  /// completion.
  pub fn drain<C, F, P>(
    &mut self,
    clock: &C,
    budget: Duration,
    mode: DrainMode,
    mut load_one: F,
    mut progress: P,
  ) -> DrainReport
  where
    C: Clock + ?Sized,
    F: FnMut(LoadRequest) -> LoadOutcome,
    P: FnMut(LoadProgress),
  {
    let start = clock.now();
    let total = self.len();
    let mut report = DrainReport::default();

    while let Some(req) = self.pop() {
      report.record(load_one(req));

      match mode {
        DrainMode::Initial => {
          let done = report.processed;
          if done % self.progress_interval == 0 || self.is_empty() {
            progress(LoadProgress { done, total });
          }
        }
        DrainMode::Steady => {
          if clock.now().saturating_sub(start) > budget {
            report.out_of_budget = !self.is_empty();
            break;
          }
        }
      }
    }

    report.remaining = self.len();
    report.elapsed = clock.now().saturating_sub(start);
    report
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn queue_of(positions: &[(i32, i32)]) -> ChunkLoadQueue {
    let mut queue = ChunkLoadQueue::new(5);
    for &(x, z) in positions {
      queue.enqueue(ChunkPos::new(x, z));
    }
    queue
  }

  #[test]
  fn enqueue_is_deduplicated() {
    let mut queue = ChunkLoadQueue::new(5);
    assert!(queue.enqueue(ChunkPos::new(1, 1)));
    assert!(!queue.enqueue(ChunkPos::new(1, 1)));
    assert_eq!(queue.len(), 1);

    assert!(queue.cancel(ChunkPos::new(1, 1)));
    assert!(!queue.cancel(ChunkPos::new(1, 1)));
    assert!(queue.enqueue(ChunkPos::new(1, 1)));
    assert_eq!(queue.pending().next().map(|r| r.order), Some(1));
  }

  #[test]
  fn retain_within_drops_outside_requests() {
    let mut queue = queue_of(&[(0, 0), (5, 0), (1, -1), (-3, 0)]);
    let dropped = queue.retain_within(ChunkRect::square(ChunkPos::new(0, 0), 2));
    assert_eq!(dropped, 2);
    assert!(!queue.contains(ChunkPos::new(5, 0)));
    let left: Vec<_> = queue.pending().map(|r| r.pos).collect();
    assert_eq!(left, vec![ChunkPos::new(0, 0), ChunkPos::new(1, -1)]);
  }

  #[test]
  fn steady_drain_stops_after_budget_and_keeps_order() {
    let mut queue = queue_of(&[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0), (5, 0)]);
    let clock = ManualClock::new();
    let mut seen = Vec::new();

    let report = queue.drain(
      &clock,
      Duration::from_millis(100),
      DrainMode::Steady,
      |req| {
        clock.advance(Duration::from_millis(30));
        seen.push(req.pos.x);
        LoadOutcome::Loaded
      },
      |_| panic!("no progress in steady mode"),
    );

    // 30, 60, 90 are within budget; 120 is the single overrun.
    assert_eq!(seen, vec![0, 1, 2, 3]);
    assert_eq!(report.processed, 4);
    assert_eq!(report.remaining, 2);
    assert!(report.out_of_budget);
    assert_eq!(report.elapsed, Duration::from_millis(120));
    assert_eq!(queue.pending().next().map(|r| r.pos), Some(ChunkPos::new(4, 0)));
  }

  #[test]
  fn initial_drain_ignores_budget_and_reports_progress() {
    let positions: Vec<_> = (0..12).map(|x| (x, 0)).collect();
    let mut queue = queue_of(&positions);
    let clock = ManualClock::new();
    let mut updates = Vec::new();

    let report = queue.drain(
      &clock,
      Duration::from_millis(1),
      DrainMode::Initial,
      |req| {
        clock.advance(Duration::from_millis(50));
        if req.pos.x % 4 == 0 {
          LoadOutcome::Missing
        } else {
          LoadOutcome::Loaded
        }
      },
      |p| updates.push(p.done),
    );

    assert_eq!(report.processed, 12);
    assert_eq!(report.missing, 3);
    assert_eq!(report.loaded, 9);
    assert_eq!(report.remaining, 0);
    assert!(!report.out_of_budget);
    assert_eq!(updates, vec![5, 10, 12]);
  }

  #[test]
  fn draining_an_empty_queue_is_a_no_op() {
    let mut queue = ChunkLoadQueue::default();
    let report = queue.drain(
      &WallClock::default(),
      Duration::ZERO,
      DrainMode::Steady,
      |_| LoadOutcome::Loaded,
      |_| {},
    );
    assert_eq!(report.processed, 0);
    assert!(!report.out_of_budget);
  }

  #[test]
  fn progress_fraction() {
    assert_eq!(LoadProgress { done: 0, total: 0 }.fraction(), 1.0);
    assert_eq!(LoadProgress { done: 5, total: 20 }.fraction(), 0.25);
  }
}
