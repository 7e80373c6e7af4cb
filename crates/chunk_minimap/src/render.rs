//! GPU texture creation and upload for the minimap raster.

use bevy::asset::RenderAssetUsages;
use bevy::image::{ImageAddressMode, ImageSampler, ImageSamplerDescriptor};
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

use crate::surface::RgbaSurface;

/// Creates a transparent square RGBA8 texture for the minimap.
///
/// Sampling is nearest-neighbour with repeat addressing, so UV rectangles
/// from [`MinimapTransform::uv_rect`](crate::MinimapTransform::uv_rect) may
/// cross the texture edges.
pub fn create_minimap_texture(images: &mut Assets<Image>, dim: u32) -> Handle<Image> {
  let size = Extent3d {
    width: dim,
    height: dim,
    depth_or_array_layers: 1,
  };

  let mut image = Image::new_fill(
    size,
    TextureDimension::D2,
    &[0, 0, 0, 0],
    TextureFormat::Rgba8UnormSrgb,
    RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
  );

  image.sampler = ImageSampler::Descriptor(ImageSamplerDescriptor {
    address_mode_u: ImageAddressMode::Repeat,
    address_mode_v: ImageAddressMode::Repeat,
    ..ImageSamplerDescriptor::nearest()
  });

  images.add(image)
}

/// Copies raster pixels into an existing texture.
///
/// Does nothing if the sizes differ.
pub fn upload_surface(surface: &RgbaSurface, image: &mut Image) {
  let bytes = surface.as_bytes();
  if let Some(ref mut data) = image.data {
    if data.len() == bytes.len() {
      data.copy_from_slice(bytes);
    } else {
      warn!(
        "Minimap texture holds {} bytes but raster has {}; skipping upload",
        data.len(),
        bytes.len()
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::surface::Rgba;

  #[test]
  fn upload_copies_raster_bytes() {
    let mut images = Assets::<Image>::default();
    let handle = create_minimap_texture(&mut images, 32);

    let mut surface = RgbaSurface::new(32, 32);
    surface.set(1, 0, Rgba::rgb(10, 20, 30));

    let image = images.get_mut(&handle).unwrap();
    upload_surface(&surface, image);
    let data = image.data.as_ref().unwrap();
    assert_eq!(&data[4..8], &[10, 20, 30, 255]);
    assert_eq!(&data[0..4], &[0, 0, 0, 0]);
  }
}
