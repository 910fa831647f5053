//! Material records and their GPU representation.
//!
//! A [`Material`] is created once at scene load and stays immutable. Draw
//! calls reference materials by index through a push constant, and the
//! fragment shader reads the matching [`MaterialGpu`] record out of a
//! storage buffer.

use glam::{Vec3, Vec4};
use vulkano::buffer::BufferContents;

/// Number of texture slots in the shader's `sampler2D` array. Materials may
/// not reference texture indices at or above this.
pub const MAX_TEXTURES: usize = 32;

/// Texture offset/tiling with no transformation: zero offset, unit tiling.
pub const OFFSET_TILING_IDENTITY: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);

/// A surface material as loaded from an MTL file.
///
/// Texture channels are optional; `None` makes the shader fall back to the
/// matching reflectivity color (or the geometric normal, for the normal
/// channel). Offset/tiling vectors are `(offset_u, offset_v, tile_u,
/// tile_v)` applied to the mesh UVs before sampling that channel.
#[derive(Debug, Clone)]
pub struct Material {
  pub name: String,
  /// Reflectivity color for ambient light contributions.
  pub ambient: Vec3,
  /// Reflectivity color (albedo) for diffuse light contributions.
  pub diffuse: Vec3,
  /// Reflectivity color for specular highlights.
  pub specular: Vec3,
  /// Specular exponent for the Blinn-Phong power term.
  pub shininess: f32,
  pub diffuse_texture: Option<usize>,
  pub specular_texture: Option<usize>,
  pub height_texture: Option<usize>,
  pub normal_texture: Option<usize>,
  pub diffuse_offset_tiling: Vec4,
  pub specular_offset_tiling: Vec4,
  pub height_offset_tiling: Vec4,
  pub normal_offset_tiling: Vec4,
}

impl Default for Material {
  fn default() -> Self {
    Self {
      name: "default".to_string(),
      ambient: Vec3::splat(1.0),
      diffuse: Vec3::splat(0.8),
      specular: Vec3::splat(0.1),
      shininess: 16.0,
      diffuse_texture: None,
      specular_texture: None,
      height_texture: None,
      normal_texture: None,
      diffuse_offset_tiling: OFFSET_TILING_IDENTITY,
      specular_offset_tiling: OFFSET_TILING_IDENTITY,
      height_offset_tiling: OFFSET_TILING_IDENTITY,
      normal_offset_tiling: OFFSET_TILING_IDENTITY,
    }
  }
}

impl Material {
  /// Packs this material into its std430 storage-buffer representation.
  ///
  /// Untextured channels become the sentinel index `-1`, which the shader
  /// checks before sampling.
  pub fn to_gpu(&self) -> MaterialGpu {
    MaterialGpu {
      ambient_reflectivity: self.ambient.extend(0.0).to_array(),
      diffuse_reflectivity: self.diffuse.extend(0.0).to_array(),
      specular_reflectivity: self.specular.extend(0.0).to_array(),
      diffuse_offset_tiling: self.diffuse_offset_tiling.to_array(),
      specular_offset_tiling: self.specular_offset_tiling.to_array(),
      height_offset_tiling: self.height_offset_tiling.to_array(),
      normal_offset_tiling: self.normal_offset_tiling.to_array(),
      diffuse_tex: texture_slot(self.diffuse_texture),
      specular_tex: texture_slot(self.specular_texture),
      height_tex: texture_slot(self.height_texture),
      normal_tex: texture_slot(self.normal_texture),
      shininess: self.shininess,
      _pad: [0.0; 3],
    }
  }
}

fn texture_slot(index: Option<usize>) -> i32 {
  debug_assert!(index.is_none_or(|i| i < MAX_TEXTURES));
  index.map_or(-1, |i| i as i32)
}

/// std430 mirror of [`Material`], one array element per scene material.
///
/// Field order and padding must match the `Material` struct in
/// `scene.frag.glsl` exactly.
#[derive(Clone, Copy, Debug, BufferContents)]
#[repr(C)]
pub struct MaterialGpu {
  pub ambient_reflectivity: [f32; 4],
  pub diffuse_reflectivity: [f32; 4],
  pub specular_reflectivity: [f32; 4],
  pub diffuse_offset_tiling: [f32; 4],
  pub specular_offset_tiling: [f32; 4],
  pub height_offset_tiling: [f32; 4],
  pub normal_offset_tiling: [f32; 4],
  pub diffuse_tex: i32,
  pub specular_tex: i32,
  pub height_tex: i32,
  pub normal_tex: i32,
  pub shininess: f32,
  pub _pad: [f32; 3],
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::mem::size_of;

  #[test]
  fn material_gpu_size_matches_std430_layout() {
    // 7 vec4 fields + 4 ints + shininess + 3 floats of padding.
    assert_eq!(size_of::<MaterialGpu>(), 7 * 16 + 4 * 4 + 4 + 12);
  }

  #[test]
  fn untextured_channels_use_sentinel_index() {
    let gpu = Material::default().to_gpu();
    assert_eq!(gpu.diffuse_tex, -1);
    assert_eq!(gpu.specular_tex, -1);
    assert_eq!(gpu.height_tex, -1);
    assert_eq!(gpu.normal_tex, -1);
  }

  #[test]
  fn textured_channels_keep_their_index() {
    let material = Material {
      diffuse_texture: Some(3),
      normal_texture: Some(7),
      ..Material::default()
    };
    let gpu = material.to_gpu();
    assert_eq!(gpu.diffuse_tex, 3);
    assert_eq!(gpu.specular_tex, -1);
    assert_eq!(gpu.normal_tex, 7);
  }

  #[test]
  fn reflectivity_and_tiling_round_trip() {
    let material = Material {
      diffuse: Vec3::new(0.1, 0.2, 0.3),
      shininess: 64.0,
      diffuse_offset_tiling: Vec4::new(0.5, 0.25, 2.0, 4.0),
      ..Material::default()
    };
    let gpu = material.to_gpu();
    assert_eq!(gpu.diffuse_reflectivity, [0.1, 0.2, 0.3, 0.0]);
    assert_eq!(gpu.diffuse_offset_tiling, [0.5, 0.25, 2.0, 4.0]);
    assert_eq!(gpu.shininess, 64.0);
  }
}
