//! Chunk Minimap - world-chunk streaming cache and toroidal minimap for Bevy.
//!
//! A camera moving over an unbounded tile world keeps a square window of
//! chunks resident. Chunks are fetched from a [`ChunkStore`] through a
//! budgeted FIFO queue, cached by coordinate, and composited into a fixed
//! size wrap-around raster that stands in for a much larger map.

pub mod blitter;
pub mod block;
pub mod cache;
pub mod chunk;
pub mod config;
pub mod coords;
pub mod error;
pub mod highlight;
pub mod minimap;
pub mod plugin;
pub mod render;
pub mod store;
pub mod streaming;
pub mod surface;
#[cfg(feature = "tracy")]
mod tracy_init;

pub use blitter::{Blitter, Rect};
pub use block::{BlockColors, BlockId};
pub use cache::{ChunkCache, Residency};
pub use chunk::{Chunk, ChunkFlags, ChunkPayload, TileColors};
pub use config::StreamingConfig;
pub use coords::{Axis, BlockPos, CHUNK_SIZE, ChunkPos, ChunkRect, LocalPos};
pub use error::{ConfigError, StoreError};
pub use highlight::HighlightMode;
pub use minimap::{
  MapMode, MarkerKind, MarkerStyle, MinimapCompositor, MinimapTexture, MinimapTransform,
  minimap_base,
};
pub use plugin::{ChunkMinimapPlugin, MinimapImage, StreamingCamera};
pub use render::{create_minimap_texture, upload_surface};
pub use store::{ChunkStore, MemoryStore};
pub use streaming::{
  ChunkLoadQueue, ChunkStreamer, ChunkWindowTracker, Clock, DrainMode, DrainReport, Drift,
  LoadOutcome, LoadProgress, LoadRequest, ManualClock, StreamingSettings, TrimStrip, WallClock,
  WindowDelta, WindowState,
};
pub use surface::{Rgba, RgbaSurface, Surface};
#[cfg(feature = "tracy")]
pub use tracy_init::init_tracy;
