//! GPU-side draw call records.

use glam::Mat4;
use vulkano::buffer::Subbuffer;

use crate::render::vertex::{Bitangent, Normal, Position, Tangent, TexCoord};

/// Everything one draw needs: the model matrix and material index that go
/// out as push constants, plus the vertex and index buffers to bind.
/// Created once at scene upload and immutable afterwards.
pub struct DrawCall {
  pub model_matrix: Mat4,
  pub material_index: i32,
  pub positions: Subbuffer<[Position]>,
  pub tex_coords: Subbuffer<[TexCoord]>,
  pub normals: Subbuffer<[Normal]>,
  pub tangents: Subbuffer<[Tangent]>,
  pub bitangents: Subbuffer<[Bitangent]>,
  pub indices: Subbuffer<[u32]>,
}
