//! Scene loading from OBJ/MTL files.
//!
//! Produces CPU-side mesh and material data ready for GPU upload: one
//! [`MeshData`] per OBJ mesh (with generated tangent-space vectors), one
//! [`Material`] per MTL material, and a deduplicated list of texture paths
//! the materials reference by index.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glam::{Mat4, Vec2, Vec3};
use thiserror::Error;

use crate::core::config::ModelEntry;
use crate::scene::material::{MAX_TEXTURES, Material};

#[derive(Debug, Error)]
pub enum SceneError {
  #[error("failed to load model {path}: {source}")]
  Model {
    path: PathBuf,
    source: tobj::LoadError,
  },

  #[error("failed to load texture {path}: {source}")]
  Texture {
    path: PathBuf,
    source: image::ImageError,
  },

  #[error("scene contains no geometry")]
  Empty,
}

/// One mesh ready for upload: attribute arrays share a single index buffer.
#[derive(Debug, Clone)]
pub struct MeshData {
  pub model_matrix: Mat4,
  pub material_index: usize,
  pub positions: Vec<[f32; 3]>,
  pub tex_coords: Vec<[f32; 2]>,
  pub normals: Vec<[f32; 3]>,
  pub tangents: Vec<[f32; 3]>,
  pub bitangents: Vec<[f32; 3]>,
  pub indices: Vec<u32>,
}

/// A texture referenced by the scene's materials, with the color space it
/// should be uploaded in. Normal and height maps carry vector data and must
/// not be sRGB-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSource {
  pub path: PathBuf,
  pub srgb: bool,
}

#[derive(Debug)]
pub struct LoadedScene {
  pub meshes: Vec<MeshData>,
  pub materials: Vec<Material>,
  pub textures: Vec<TextureSource>,
}

/// Assigns texture array slots to paths, deduplicating and capping at
/// [`MAX_TEXTURES`]. The first channel to reference a path decides its
/// color space.
#[derive(Default)]
struct TextureRegistry {
  sources: Vec<TextureSource>,
  slots: HashMap<PathBuf, usize>,
}

impl TextureRegistry {
  fn slot(&mut self, base_dir: &Path, relative: &str, srgb: bool) -> Option<usize> {
    let path = base_dir.join(relative.replace('\\', "/"));
    if let Some(&slot) = self.slots.get(&path) {
      return Some(slot);
    }
    if self.sources.len() == MAX_TEXTURES {
      log::warn!(
        "texture slots exhausted ({MAX_TEXTURES}); {} falls back to material colors",
        path.display()
      );
      return None;
    }
    let slot = self.sources.len();
    self.sources.push(TextureSource { path: path.clone(), srgb });
    self.slots.insert(path, slot);
    Some(slot)
  }
}

/// Loads every model entry and flattens the result into a single scene.
pub fn load_scene(entries: &[ModelEntry]) -> Result<LoadedScene, SceneError> {
  let mut meshes = Vec::new();
  let mut materials: Vec<Material> = Vec::new();
  let mut registry = TextureRegistry::default();
  // Lazily appended when a mesh has no MTL material.
  let mut fallback_material: Option<usize> = None;

  for entry in entries {
    let path = Path::new(&entry.path);
    let (models, obj_materials) = tobj::load_obj(
      path,
      &tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
      },
    )
    .map_err(|source| SceneError::Model { path: path.to_path_buf(), source })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let material_offset = materials.len();
    match obj_materials {
      Ok(mtl) => {
        for material in &mtl {
          materials.push(convert_material(material, base_dir, &mut registry));
        }
      }
      Err(source) => {
        log::warn!("no usable MTL for {}: {source}", path.display());
      }
    }
    let obj_material_count = materials.len() - material_offset;

    let model_matrix = entry.model_matrix();
    for model in &models {
      let mesh = &model.mesh;
      if mesh.indices.is_empty() {
        log::debug!("skipping empty mesh {:?} in {}", model.name, path.display());
        continue;
      }

      // material_id can point past the material list when the MTL file was
      // missing or malformed; such meshes share the fallback material.
      let material_index = match mesh.material_id.filter(|&id| id < obj_material_count) {
        Some(id) => material_offset + id,
        None => *fallback_material.get_or_insert_with(|| {
          materials.push(Material::default());
          materials.len() - 1
        }),
      };

      let positions: Vec<[f32; 3]> = mesh
        .positions
        .chunks(3)
        .map(|xyz| [xyz[0], xyz[1], xyz[2]])
        .collect();

      let tex_coords: Vec<[f32; 2]> = if mesh.texcoords.is_empty() {
        vec![[0.0, 0.0]; positions.len()]
      } else {
        mesh
          .texcoords
          .chunks(2)
          .map(|uv| [uv[0], 1.0 - uv[1]])
          .collect()
      };

      let normals: Vec<[f32; 3]> = if mesh.normals.is_empty() {
        compute_normals(&positions, &mesh.indices)
      } else {
        mesh
          .normals
          .chunks(3)
          .map(|xyz| [xyz[0], xyz[1], xyz[2]])
          .collect()
      };

      let (tangents, bitangents) =
        compute_tangents(&positions, &tex_coords, &normals, &mesh.indices);

      meshes.push(MeshData {
        model_matrix,
        material_index,
        positions,
        tex_coords,
        normals,
        tangents,
        bitangents,
        indices: mesh.indices.clone(),
      });
    }
  }

  if meshes.is_empty() {
    return Err(SceneError::Empty);
  }

  log::info!(
    "loaded scene: {} meshes, {} materials, {} textures",
    meshes.len(),
    materials.len(),
    registry.sources.len()
  );

  Ok(LoadedScene {
    meshes,
    materials,
    textures: registry.sources,
  })
}

fn convert_material(
  material: &tobj::Material,
  base_dir: &Path,
  registry: &mut TextureRegistry,
) -> Material {
  let mut slot = |texture: &Option<String>, srgb: bool| {
    texture
      .as_deref()
      .and_then(|relative| registry.slot(base_dir, relative, srgb))
  };

  // MTL has no standard displacement key; "disp" is the common convention.
  let height_texture = material
    .unknown_param
    .get("disp")
    .or_else(|| material.unknown_param.get("map_disp"))
    .cloned();

  Material {
    name: material.name.clone(),
    ambient: Vec3::from_array(material.ambient.unwrap_or([1.0; 3])),
    diffuse: Vec3::from_array(material.diffuse.unwrap_or([0.8; 3])),
    specular: Vec3::from_array(material.specular.unwrap_or([0.0; 3])),
    shininess: material.shininess.unwrap_or(16.0),
    diffuse_texture: slot(&material.diffuse_texture, true),
    specular_texture: slot(&material.specular_texture, true),
    height_texture: slot(&height_texture, false),
    normal_texture: slot(&material.normal_texture, false),
    ..Material::default()
  }
}

/// Computes smooth per-vertex normals by accumulating area-weighted face
/// normals. Used when the OBJ carries no normals of its own.
pub fn compute_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
  let mut accumulated = vec![Vec3::ZERO; positions.len()];

  for tri in indices.chunks_exact(3) {
    let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
    let p0 = Vec3::from_array(positions[i0]);
    let p1 = Vec3::from_array(positions[i1]);
    let p2 = Vec3::from_array(positions[i2]);
    // Cross product length is twice the triangle area, which weights the
    // contribution of large faces accordingly.
    let face_normal = (p1 - p0).cross(p2 - p0);
    accumulated[i0] += face_normal;
    accumulated[i1] += face_normal;
    accumulated[i2] += face_normal;
  }

  accumulated
    .into_iter()
    .map(|n| n.normalize_or(Vec3::Y).to_array())
    .collect()
}

/// Generates per-vertex tangents and bitangents from positions and UVs.
///
/// Tangents are accumulated per triangle, then Gram-Schmidt-orthogonalized
/// against the vertex normal; the bitangent is rebuilt from the cross
/// product with the accumulated handedness. Triangles with degenerate UVs
/// are skipped, and vertices that end up without a usable tangent get an
/// arbitrary basis perpendicular to their normal.
pub fn compute_tangents(
  positions: &[[f32; 3]],
  tex_coords: &[[f32; 2]],
  normals: &[[f32; 3]],
  indices: &[u32],
) -> (Vec<[f32; 3]>, Vec<[f32; 3]>) {
  let mut tangent_acc = vec![Vec3::ZERO; positions.len()];
  let mut bitangent_acc = vec![Vec3::ZERO; positions.len()];

  for tri in indices.chunks_exact(3) {
    let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
    let p0 = Vec3::from_array(positions[i0]);
    let p1 = Vec3::from_array(positions[i1]);
    let p2 = Vec3::from_array(positions[i2]);
    let uv0 = Vec2::from_array(tex_coords[i0]);
    let uv1 = Vec2::from_array(tex_coords[i1]);
    let uv2 = Vec2::from_array(tex_coords[i2]);

    let edge1 = p1 - p0;
    let edge2 = p2 - p0;
    let duv1 = uv1 - uv0;
    let duv2 = uv2 - uv0;

    let determinant = duv1.x * duv2.y - duv1.y * duv2.x;
    if determinant.abs() < 1e-8 {
      continue;
    }
    let inv = 1.0 / determinant;
    let tangent = (edge1 * duv2.y - edge2 * duv1.y) * inv;
    let bitangent = (edge2 * duv1.x - edge1 * duv2.x) * inv;

    for &i in &[i0, i1, i2] {
      tangent_acc[i] += tangent;
      bitangent_acc[i] += bitangent;
    }
  }

  let mut tangents = Vec::with_capacity(positions.len());
  let mut bitangents = Vec::with_capacity(positions.len());

  for ((tangent, bitangent), normal) in tangent_acc.iter().zip(&bitangent_acc).zip(normals) {
    let n = Vec3::from_array(*normal);
    let orthogonal = *tangent - n * n.dot(*tangent);
    let t = orthogonal.normalize_or(fallback_tangent(n));
    // Keep the UV-space handedness of the accumulated bitangent.
    let handedness = if n.cross(t).dot(*bitangent) < 0.0 { -1.0 } else { 1.0 };
    let b = n.cross(t) * handedness;

    tangents.push(t.to_array());
    bitangents.push(b.to_array());
  }

  (tangents, bitangents)
}

/// Any unit vector perpendicular to `n`.
fn fallback_tangent(n: Vec3) -> Vec3 {
  let axis = if n.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
  n.cross(axis).normalize_or(Vec3::X)
}

#[cfg(test)]
mod tests {
  use super::*;

  // A unit quad in the XY plane with standard UVs: two triangles.
  fn quad() -> (Vec<[f32; 3]>, Vec<[f32; 2]>, Vec<[f32; 3]>, Vec<u32>) {
    let positions = vec![
      [0.0, 0.0, 0.0],
      [1.0, 0.0, 0.0],
      [1.0, 1.0, 0.0],
      [0.0, 1.0, 0.0],
    ];
    let tex_coords = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
    let normals = vec![[0.0, 0.0, 1.0]; 4];
    let indices = vec![0, 1, 2, 0, 2, 3];
    (positions, tex_coords, normals, indices)
  }

  #[test]
  fn quad_tangents_follow_the_u_axis() {
    let (positions, tex_coords, normals, indices) = quad();
    let (tangents, bitangents) =
      compute_tangents(&positions, &tex_coords, &normals, &indices);

    for tangent in &tangents {
      let t = Vec3::from_array(*tangent);
      assert!((t - Vec3::X).length() < 1e-5, "tangent {t:?} should be +X");
    }
    for bitangent in &bitangents {
      let b = Vec3::from_array(*bitangent);
      assert!((b - Vec3::Y).length() < 1e-5, "bitangent {b:?} should be +Y");
    }
  }

  #[test]
  fn tangents_are_orthogonal_to_normals() {
    let (positions, tex_coords, normals, indices) = quad();
    let (tangents, _) = compute_tangents(&positions, &tex_coords, &normals, &indices);
    for (tangent, normal) in tangents.iter().zip(&normals) {
      let dot = Vec3::from_array(*tangent).dot(Vec3::from_array(*normal));
      assert!(dot.abs() < 1e-5);
    }
  }

  #[test]
  fn degenerate_uvs_get_a_fallback_basis() {
    let (positions, _, normals, indices) = quad();
    let collapsed_uvs = vec![[0.5, 0.5]; 4];
    let (tangents, bitangents) =
      compute_tangents(&positions, &collapsed_uvs, &normals, &indices);

    for (tangent, bitangent) in tangents.iter().zip(&bitangents) {
      let t = Vec3::from_array(*tangent);
      let b = Vec3::from_array(*bitangent);
      assert!((t.length() - 1.0).abs() < 1e-5);
      assert!((b.length() - 1.0).abs() < 1e-5);
      assert!(t.dot(Vec3::Z).abs() < 1e-5);
    }
  }

  #[test]
  fn computed_normals_point_out_of_the_face() {
    let (positions, _, _, indices) = quad();
    let normals = compute_normals(&positions, &indices);
    for normal in &normals {
      let n = Vec3::from_array(*normal);
      assert!((n - Vec3::Z).length() < 1e-5, "normal {n:?} should be +Z");
    }
  }

  #[test]
  fn texture_registry_dedupes_and_caps() {
    let mut registry = TextureRegistry::default();
    let base = Path::new("assets");

    let first = registry.slot(base, "wall.png", true);
    let duplicate = registry.slot(base, "wall.png", true);
    assert_eq!(first, Some(0));
    assert_eq!(duplicate, Some(0));
    assert_eq!(registry.sources.len(), 1);

    for i in 1..MAX_TEXTURES {
      assert_eq!(registry.slot(base, &format!("tex{i}.png"), true), Some(i));
    }
    // The array is full now; further textures are rejected.
    assert_eq!(registry.slot(base, "overflow.png", true), None);
    assert_eq!(registry.sources.len(), MAX_TEXTURES);
  }
}
