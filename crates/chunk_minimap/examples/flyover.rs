//! Flyover Demo - chunk streaming with a wrap-around minimap.
//!
//! Flies a viewpoint over a patterned world. Chunks stream in around it and
//! are composited into the minimap overlay in the top-right corner.
//!
//! Controls:
//! - WASD/Arrow keys: Move viewpoint
//! - Shift: Speed boost (5x)
//! - M: Toggle small/full map
//! - H: Cycle highlight mode
//! - 1-6: Select render range
//! - Home: Jump back to spawn
//!
//! Reads `streaming.toml` from the working directory if present.
//!
//! Run with: `cargo run -p chunk_minimap --example flyover`

use bevy::prelude::*;
use chunk_minimap::{
  BlockId, BlockPos, CHUNK_SIZE, ChunkMinimapPlugin, ChunkPayload, ChunkPos, ChunkStreamer,
  LoadProgress, MapMode, MarkerKind, MinimapImage, StoreError, StreamingCamera, StreamingConfig,
  Surface, block::ids,
};

/// Base viewpoint speed in blocks per second.
const CAMERA_SPEED: f32 = 120.0;

/// Speed multiplier when holding shift.
const SPEED_BOOST: f32 = 5.0;

/// On-screen size of the small map, in logical pixels.
const SMALL_MAP_SIZE: f32 = 400.0;

const RANGE_KEYS: [KeyCode; 6] = [
  KeyCode::Digit1,
  KeyCode::Digit2,
  KeyCode::Digit3,
  KeyCode::Digit4,
  KeyCode::Digit5,
  KeyCode::Digit6,
];

fn main() {
  #[cfg(feature = "tracy")]
  chunk_minimap::init_tracy();

  let config = match StreamingConfig::load("streaming.toml") {
    Ok(config) => config,
    Err(err) => {
      eprintln!("Using default streaming config: {err}");
      StreamingConfig::default()
    }
  };

  let streamer = match ChunkStreamer::new(config, generate_chunk) {
    Ok(streamer) => streamer,
    Err(err) => {
      eprintln!("Invalid streaming config: {err}");
      return;
    }
  };

  App::new()
    .add_plugins(DefaultPlugins.set(WindowPlugin {
      primary_window: Some(Window {
        title: "Flyover Demo".to_string(),
        resolution: (1280, 720).into(),
        ..default()
      }),
      ..default()
    }))
    .add_plugins(ChunkMinimapPlugin)
    .insert_resource(streamer)
    .init_resource::<DisplayMode>()
    .add_systems(Startup, setup)
    .add_systems(Update, (viewpoint_input, settings_input, show_minimap, show_status))
    .run();
}

#[derive(Resource, Default)]
struct DisplayMode(MapMode);

#[derive(Component)]
struct MinimapDisplay;

#[derive(Component)]
struct StatusText;

/// Deterministic striped terrain with scattered water.
fn generate_chunk(pos: ChunkPos) -> Result<Option<ChunkPayload>, StoreError> {
  let palette = [ids::GRASS, ids::DIRT, ids::SAND, ids::STONE, ids::LEAVES, ids::SNOW];
  let band = (pos.x.div_euclid(4) + pos.z.div_euclid(4)).rem_euclid(palette.len() as i32);
  let mut top_blocks: Surface<BlockId> = Surface::filled(CHUNK_SIZE, CHUNK_SIZE, palette[band as usize]);

  if (pos.x * 31 + pos.z * 17).rem_euclid(7) == 0 {
    for z in 4..12 {
      for x in 4..12 {
        top_blocks[(x, z)] = ids::WATER;
      }
    }
  }
  Ok(Some(ChunkPayload {
    top_blocks,
    data: Vec::new(),
  }))
}

fn setup(mut commands: Commands, mut streamer: ResMut<ChunkStreamer>) {
  commands.spawn(Camera2d);
  commands.spawn((Transform::default(), StreamingCamera));

  streamer.set_marker(MarkerKind::Spawn, BlockPos::new(0, 0));

  commands.spawn((
    ImageNode::default(),
    Node {
      position_type: PositionType::Absolute,
      top: Val::Px(10.0),
      right: Val::Px(10.0),
      width: Val::Px(SMALL_MAP_SIZE),
      height: Val::Px(SMALL_MAP_SIZE),
      ..default()
    },
    MinimapDisplay,
  ));

  commands.spawn((
    Text::new(""),
    Node {
      position_type: PositionType::Absolute,
      bottom: Val::Px(10.0),
      left: Val::Px(10.0),
      ..default()
    },
    StatusText,
  ));
}

fn viewpoint_input(
  keys: Res<ButtonInput<KeyCode>>,
  mut viewpoint: Query<&mut Transform, With<StreamingCamera>>,
  mut streamer: ResMut<ChunkStreamer>,
  time: Res<Time>,
) {
  let Ok(mut transform) = viewpoint.single_mut() else {
    return;
  };

  if keys.just_pressed(KeyCode::Home) {
    transform.translation = Vec3::ZERO;
    streamer.relocate();
    return;
  }

  let mut direction = Vec2::ZERO;
  if keys.pressed(KeyCode::KeyW) || keys.pressed(KeyCode::ArrowUp) {
    direction.y -= 1.0;
  }
  if keys.pressed(KeyCode::KeyS) || keys.pressed(KeyCode::ArrowDown) {
    direction.y += 1.0;
  }
  if keys.pressed(KeyCode::KeyA) || keys.pressed(KeyCode::ArrowLeft) {
    direction.x -= 1.0;
  }
  if keys.pressed(KeyCode::KeyD) || keys.pressed(KeyCode::ArrowRight) {
    direction.x += 1.0;
  }
  if direction == Vec2::ZERO {
    return;
  }

  let speed = if keys.pressed(KeyCode::ShiftLeft) || keys.pressed(KeyCode::ShiftRight) {
    CAMERA_SPEED * SPEED_BOOST
  } else {
    CAMERA_SPEED
  };
  let step = direction.normalize() * speed * time.delta_secs();
  transform.translation.x += step.x;
  transform.translation.z += step.y;

  let player = BlockPos::from_world(transform.translation.x, transform.translation.z);
  if streamer.marker(MarkerKind::Player) != Some(player) {
    streamer.set_marker(MarkerKind::Player, player);
  }
}

fn settings_input(
  keys: Res<ButtonInput<KeyCode>>,
  mut streamer: ResMut<ChunkStreamer>,
  mut mode: ResMut<DisplayMode>,
) {
  if keys.just_pressed(KeyCode::KeyM) {
    mode.0 = match mode.0 {
      MapMode::Small => MapMode::Full,
      MapMode::Full => MapMode::Small,
    };
  }
  if keys.just_pressed(KeyCode::KeyH) {
    let highlight = streamer.cycle_highlight();
    info!("Highlight: {}", highlight.label());
  }
  for (index, key) in RANGE_KEYS.iter().enumerate() {
    if keys.just_pressed(*key) {
      let range = streamer.select_render_range(index);
      info!("Render range: {range}");
    }
  }
}

fn show_minimap(
  streamer: Res<ChunkStreamer>,
  minimap_image: Res<MinimapImage>,
  mode: Res<DisplayMode>,
  viewpoint: Query<&GlobalTransform, With<StreamingCamera>>,
  mut display: Query<(&mut ImageNode, &mut Node), With<MinimapDisplay>>,
) {
  let (Some(handle), Ok(camera), Ok((mut image, mut node))) =
    (&minimap_image.0, viewpoint.single(), display.single_mut())
  else {
    return;
  };

  let texture = streamer.minimap_texture();
  let dim = texture.surface.width() as f32;
  let cam = camera.translation();
  let uv = texture.transform.uv_rect(Vec2::new(cam.x, cam.z), mode.0);

  image.image = handle.clone();
  image.rect = Some(Rect::from_corners(uv.min * dim, uv.max * dim));

  let size = match mode.0 {
    MapMode::Small => Val::Px(SMALL_MAP_SIZE),
    MapMode::Full => Val::Vh(95.0),
  };
  node.width = size;
  node.height = size;
}

fn show_status(
  streamer: Res<ChunkStreamer>,
  progress: Res<LoadProgress>,
  time: Res<Time>,
  mut status: Query<(&mut Text, &mut TextColor), With<StatusText>>,
) {
  let Ok((mut text, mut color)) = status.single_mut() else {
    return;
  };
  let Some(window) = streamer.current_window() else {
    return;
  };

  **text = format!(
    "chunk {:?} | render {} | highlight {} ({}) | loaded {}/{} | queued {}",
    window.center,
    window.render_range,
    streamer.highlight().label(),
    window.effective_highlight_range(),
    progress.done,
    progress.total,
    streamer.pending_loads(),
  );

  color.0 = match streamer.highlight_color(time.elapsed()) {
    Some([r, g, b, a]) => Color::srgba(r, g, b, a.max(0.5)),
    None => Color::WHITE,
  };
}
