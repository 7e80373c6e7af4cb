//! Toroidal minimap compositor.
//!
//! The minimap is a fixed square raster of `dim` pixels standing in for an
//! unbounded world. Each chunk owns a [`CHUNK_SIZE`]² tile at
//! [`minimap_base`] on both axes; coordinates one period apart
//! (`dim / CHUNK_SIZE` chunks) share a tile, so every write wraps around the
//! raster edges.
//!
//! Tiles far behind the camera are cleared in strips (see
//! [`MinimapCompositor::trim_strip`]) before the area they occupy is reused
//! by chunks ahead.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use bevy::math::Vec2;

use crate::blitter::{Blitter, Rect};
use crate::chunk::TileColors;
use crate::coords::{Axis, BlockPos, CHUNK_SIZE, ChunkPos, ChunkRect};
use crate::surface::{Rgba, RgbaSurface};

/// Half extent of the small overlay map, in pixels.
const SMALL_MAP_HALF_EXTENT: f32 = 200.0;

/// Radius of the marker ring, in pixels.
const MARKER_RING_RADIUS: f32 = 5.5;

/// Half length of the marker crosshair arms, in pixels.
const MARKER_ARM: i64 = 8;

/// Pixel offset of chunk coordinate `c` on a raster of `dim` pixels.
///
/// Never negative and periodic with period `dim / CHUNK_SIZE` chunks.
#[inline]
pub fn minimap_base(c: i32, dim: u32) -> u32 {
  let d = dim as i64;
  (((c as i64 * CHUNK_SIZE as i64) % d + d) % d) as u32
}

/// Overlay markers tracked on the minimap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkerKind {
  Spawn,
  Player,
}

impl MarkerKind {
  /// Default glyph style for this marker.
  pub fn style(self) -> MarkerStyle {
    match self {
      MarkerKind::Spawn => MarkerStyle {
        color: Rgba::rgb(255, 0, 0),
      },
      MarkerKind::Player => MarkerStyle {
        color: Rgba::rgb(255, 255, 0),
      },
    }
  }
}

/// Appearance of a marker glyph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkerStyle {
  pub color: Rgba,
}

/// How much of the raster the display shows around the camera.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MapMode {
  /// Corner overlay, 400 pixels across.
  #[default]
  Small,
  /// The entire raster.
  Full,
}

/// Maps world positions onto the minimap texture's UV space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinimapTransform {
  dim: u32,
}

impl MinimapTransform {
  /// UV rectangle to sample around the camera, in block coordinates.
  ///
  /// The texture is sampled with repeat addressing, so the rectangle may
  /// extend past `[0, 1]`.
  pub fn uv_rect(&self, camera_xz: Vec2, mode: MapMode) -> bevy::math::Rect {
    let dim = self.dim as f32;
    let half = match mode {
      MapMode::Small => SMALL_MAP_HALF_EXTENT / dim,
      MapMode::Full => 0.5,
    };
    bevy::math::Rect::from_center_half_size(camera_xz / dim, Vec2::splat(half))
  }
}

/// Read-only view of the raster for display.
pub struct MinimapTexture<'a> {
  pub surface: &'a RgbaSurface,
  pub transform: MinimapTransform,
}

/// Owns the minimap raster and the overlay markers drawn onto it.
pub struct MinimapCompositor {
  surface: RgbaSurface,
  dim: u32,
  markers: BTreeMap<MarkerKind, BlockPos>,
  needs_upload: bool,
}

impl MinimapCompositor {
  /// Creates a transparent raster of `dim`×`dim` pixels.
  ///
  /// `dim` must be a positive multiple of [`CHUNK_SIZE`];
  /// [`StreamingConfig::validate`](crate::StreamingConfig::validate) checks
  /// this.
  pub fn new(dim: u32) -> Self {
    debug_assert!(dim > 0 && dim % CHUNK_SIZE == 0);
    Self {
      surface: RgbaSurface::new(dim, dim),
      dim,
      markers: BTreeMap::new(),
      needs_upload: true,
    }
  }

  pub fn dim(&self) -> u32 {
    self.dim
  }

  /// Number of chunks after which tile positions repeat.
  pub fn period(&self) -> i32 {
    (self.dim / CHUNK_SIZE) as i32
  }

  /// Top-left pixel of the tile for `pos`.
  pub fn tile_origin(&self, pos: ChunkPos) -> (u32, u32) {
    (minimap_base(pos.x, self.dim), minimap_base(pos.z, self.dim))
  }

  fn tile_rect(&self, pos: ChunkPos) -> Rect {
    let (x, y) = self.tile_origin(pos);
    Rect::new(x as i64, y as i64, CHUNK_SIZE, CHUNK_SIZE)
  }

  /// Writes the tile for `pos`. Columns without a visible block become
  /// transparent.
  pub fn draw_tile(&mut self, pos: ChunkPos, colors: &TileColors) {
    let rect = self.tile_rect(pos);
    Blitter::new(&mut self.surface).blit(rect, |dx, dy| {
      colors
        .get(dx, dy)
        .copied()
        .flatten()
        .unwrap_or(Rgba::TRANSPARENT)
    });
    self.needs_upload = true;
  }

  /// Paints the tile for `pos` transparent.
  pub fn erase_tile(&mut self, pos: ChunkPos) {
    let rect = self.tile_rect(pos);
    Blitter::new(&mut self.surface).fill(rect, Rgba::TRANSPARENT);
    self.needs_upload = true;
  }

  /// Clears the full-length band of every chunk coordinate in `range`
  /// along `axis`.
  ///
  /// An X strip clears whole pixel columns, a Z strip whole pixel rows.
  pub fn trim_strip(&mut self, axis: Axis, range: RangeInclusive<i32>) {
    let dim = self.dim;
    let period = self.period() as usize;
    let mut blitter = Blitter::new(&mut self.surface);
    for c in range.take(period) {
      let base = minimap_base(c, dim) as i64;
      let rect = match axis {
        Axis::X => Rect::new(base, 0, CHUNK_SIZE, dim),
        Axis::Z => Rect::new(0, base, dim, CHUNK_SIZE),
      };
      blitter.fill(rect, Rgba::TRANSPARENT);
    }
    self.needs_upload = true;
  }

  /// Draws a ring-and-crosshair glyph centred on `block`.
  pub fn draw_marker(&mut self, block: BlockPos, style: MarkerStyle) {
    let dim = self.dim as i64;
    let cx = block.x.rem_euclid(dim);
    let cy = block.z.rem_euclid(dim);
    let mut blitter = Blitter::new(&mut self.surface);

    for d in -MARKER_ARM..=MARKER_ARM {
      blitter.plot(cx + d, cy, style.color);
      blitter.plot(cx, cy + d, style.color);
    }

    let reach = MARKER_RING_RADIUS.ceil() as i64;
    for dy in -reach..=reach {
      for dx in -reach..=reach {
        let dist = ((dx * dx + dy * dy) as f32).sqrt();
        if (dist - MARKER_RING_RADIUS).abs() <= 0.5 {
          blitter.plot(cx + dx, cy + dy, style.color);
        }
      }
    }
    self.needs_upload = true;
  }

  /// Remembers a marker so it can be reissued when tiles under it are
  /// redrawn. Does not draw it.
  pub fn set_marker(&mut self, kind: MarkerKind, block: BlockPos) {
    self.markers.insert(kind, block);
  }

  /// Forgets a marker, returning its last position. Pixels already drawn
  /// stay until the tiles under them are redrawn.
  pub fn clear_marker(&mut self, kind: MarkerKind) -> Option<BlockPos> {
    self.markers.remove(&kind)
  }

  pub fn marker(&self, kind: MarkerKind) -> Option<BlockPos> {
    self.markers.get(&kind).copied()
  }

  /// Forgets every marker.
  pub fn clear_markers(&mut self) {
    self.markers.clear();
  }

  /// Chunks whose tiles a marker glyph at `block` touches.
  pub fn marker_footprint(block: BlockPos) -> impl Iterator<Item = ChunkPos> {
    let lo = BlockPos::new(block.x - MARKER_ARM, block.z - MARKER_ARM).chunk();
    let hi = BlockPos::new(block.x + MARKER_ARM, block.z + MARKER_ARM).chunk();
    ChunkRect::new(lo, hi).positions()
  }

  /// Redraws every remembered marker whose glyph overlaps the tile of
  /// `pos`. Returns how many were drawn.
  pub fn redraw_markers_in(&mut self, pos: ChunkPos) -> usize {
    self.redraw_markers_in_if(pos, |_| true)
  }

  /// Like [`redraw_markers_in`](Self::redraw_markers_in), but skips markers
  /// for which `keep` returns false.
  pub fn redraw_markers_in_if(
    &mut self,
    pos: ChunkPos,
    keep: impl Fn(BlockPos) -> bool,
  ) -> usize {
    let hits: Vec<_> = self
      .markers
      .iter()
      .filter(|(_, block)| keep(**block))
      .filter(|(_, block)| Self::marker_footprint(**block).any(|p| p == pos))
      .map(|(kind, block)| (*kind, *block))
      .collect();
    for (kind, block) in &hits {
      self.draw_marker(*block, kind.style());
    }
    hits.len()
  }

  /// Makes the whole raster transparent.
  pub fn clear(&mut self) {
    self.surface.fill(Rgba::TRANSPARENT);
    self.needs_upload = true;
  }

  /// Returns true if the raster changed since the last upload.
  pub fn needs_upload(&self) -> bool {
    self.needs_upload
  }

  /// Clears the upload flag, returning its previous value.
  pub fn take_upload(&mut self) -> bool {
    std::mem::take(&mut self.needs_upload)
  }

  pub fn surface(&self) -> &RgbaSurface {
    &self.surface
  }

  /// Raster plus the mapping used to display it.
  pub fn texture(&self) -> MinimapTexture<'_> {
    MinimapTexture {
      surface: &self.surface,
      transform: MinimapTransform { dim: self.dim },
    }
  }
}
