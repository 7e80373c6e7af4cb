//! ECS plugin and systems.
//!
//! Drives a [`ChunkStreamer`] resource from the [`StreamingCamera`] position
//! and keeps the minimap texture in sync with its raster. The application
//! inserts the streamer; without one the systems do nothing.

use bevy::prelude::*;

use crate::coords::BlockPos;
use crate::render::{create_minimap_texture, upload_surface};
use crate::streaming::{ChunkStreamer, LoadProgress, WallClock};

/// Marker component for the camera that controls streaming.
#[derive(Component)]
pub struct StreamingCamera;

/// Texture the minimap raster is uploaded to, created on first upload.
#[derive(Resource, Default)]
pub struct MinimapImage(pub Option<Handle<Image>>);

/// Plugin for chunk streaming and minimap compositing.
pub struct ChunkMinimapPlugin;

impl Plugin for ChunkMinimapPlugin {
  fn build(&self, app: &mut App) {
    app
      .init_resource::<LoadProgress>()
      .init_resource::<MinimapImage>()
      .add_systems(
        Update,
        (track_streaming_camera, drain_load_queue, upload_minimap).chain(),
      );
  }
}

/// System: Moves the streaming window to the camera's chunk.
#[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
pub fn track_streaming_camera(
  camera_query: Query<&GlobalTransform, With<StreamingCamera>>,
  streamer: Option<ResMut<ChunkStreamer>>,
) {
  let Some(mut streamer) = streamer else {
    return;
  };
  let Ok(camera_transform) = camera_query.single() else {
    return;
  };

  let cam_pos = camera_transform.translation();
  let chunk = BlockPos::from_world(cam_pos.x, cam_pos.z).chunk();
  streamer.update(chunk);
}

/// System: Loads queued chunks within the frame budget.
#[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
pub fn drain_load_queue(
  streamer: Option<ResMut<ChunkStreamer>>,
  mut progress: ResMut<LoadProgress>,
  clock: Local<WallClock>,
) {
  let Some(mut streamer) = streamer else {
    return;
  };
  if streamer.pending_loads() == 0 {
    return;
  }
  streamer.drain_with_progress(&*clock, |p| *progress = p);
}

/// System: Copies the minimap raster to its texture when it changed.
///
/// Skipped when the app has no image assets (headless).
#[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
pub fn upload_minimap(
  streamer: Option<ResMut<ChunkStreamer>>,
  images: Option<ResMut<Assets<Image>>>,
  mut minimap_image: ResMut<MinimapImage>,
) {
  let (Some(mut streamer), Some(mut images)) = (streamer, images) else {
    return;
  };
  let Some(texture) = streamer.take_minimap_upload() else {
    return;
  };

  let dim = texture.surface.width();
  let handle = minimap_image
    .0
    .get_or_insert_with(|| create_minimap_texture(&mut images, dim))
    .clone();
  if let Some(image) = images.get_mut(&handle) {
    upload_surface(texture.surface, image);
  }
}
