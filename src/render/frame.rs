//! Per-frame uniform data shared by every pipeline.

use glam::{Mat4, Vec3};
use vulkano::buffer::BufferContents;

/// Matrices and user input, repacked every frame into a host-visible
/// uniform buffer. Field order must match the `FrameData` block declared in
/// the shaders.
///
/// `user_input.x` carries the normal mapping strength; the remaining
/// components are reserved.
#[derive(Clone, Copy, Debug, Default, BufferContents)]
#[repr(C)]
pub struct FrameUbo {
  pub view_matrix: [[f32; 4]; 4],
  pub proj_matrix: [[f32; 4]; 4],
  /// Transformation to the camera's position (translation only).
  pub camera_transform: [[f32; 4]; 4],
  pub user_input: [f32; 4],
}

impl FrameUbo {
  pub fn new(view: Mat4, proj: Mat4, camera_position: Vec3, normal_mapping_strength: f32) -> Self {
    Self {
      view_matrix: view.to_cols_array_2d(),
      proj_matrix: proj.to_cols_array_2d(),
      camera_transform: Mat4::from_translation(camera_position).to_cols_array_2d(),
      user_input: [normal_mapping_strength, 0.0, 0.0, 0.0],
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::mem::size_of;

  #[test]
  fn frame_ubo_size_matches_std140_layout() {
    // Three mat4 columns-major matrices plus one vec4.
    assert_eq!(size_of::<FrameUbo>(), 3 * 64 + 16);
  }

  #[test]
  fn camera_position_lands_in_the_translation_column() {
    let ubo = FrameUbo::new(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::new(1.0, 2.0, 3.0), 0.5);
    assert_eq!(ubo.camera_transform[3][0], 1.0);
    assert_eq!(ubo.camera_transform[3][1], 2.0);
    assert_eq!(ubo.camera_transform[3][2], 3.0);
    assert_eq!(ubo.user_input[0], 0.5);
  }
}
