//! Procedural sphere geometry for the skybox.

/// A unit sphere mesh: positions only, indexed triangles with
/// counter-clockwise winding when viewed from outside.
#[derive(Debug, Clone)]
pub struct SphereMesh {
  pub positions: Vec<[f32; 3]>,
  pub indices: Vec<u32>,
}

/// Generates a unit UV sphere with `stacks` latitudinal bands and `slices`
/// longitudinal segments.
///
/// Vertex count is `slices * (stacks - 1) + 2` (interior rings plus the two
/// poles); index count is `6 * slices * (stacks - 1)`.
pub fn generate_sphere(stacks: u32, slices: u32) -> SphereMesh {
  assert!(stacks >= 2 && slices >= 3, "sphere needs at least 2 stacks and 3 slices");

  let mut positions = Vec::with_capacity((slices * (stacks - 1) + 2) as usize);

  // North pole, interior rings top to bottom, south pole.
  positions.push([0.0, 1.0, 0.0]);
  for ring in 1..stacks {
    let polar = std::f32::consts::PI * ring as f32 / stacks as f32;
    let (ring_sin, ring_cos) = polar.sin_cos();
    for segment in 0..slices {
      let azimuth = std::f32::consts::TAU * segment as f32 / slices as f32;
      let (az_sin, az_cos) = azimuth.sin_cos();
      positions.push([ring_sin * az_cos, ring_cos, ring_sin * az_sin]);
    }
  }
  positions.push([0.0, -1.0, 0.0]);

  let ring_start = |ring: u32| 1 + (ring - 1) * slices;
  let south_pole = positions.len() as u32 - 1;

  let mut indices = Vec::with_capacity((6 * slices * (stacks - 1)) as usize);

  // Top cap fan.
  for segment in 0..slices {
    let next = (segment + 1) % slices;
    indices.extend([0, ring_start(1) + segment, ring_start(1) + next]);
  }

  // Quads between consecutive rings, two triangles each.
  for ring in 1..stacks - 1 {
    let upper = ring_start(ring);
    let lower = ring_start(ring + 1);
    for segment in 0..slices {
      let next = (segment + 1) % slices;
      indices.extend([upper + segment, lower + segment, lower + next]);
      indices.extend([upper + segment, lower + next, upper + next]);
    }
  }

  // Bottom cap fan.
  let last_ring = ring_start(stacks - 1);
  for segment in 0..slices {
    let next = (segment + 1) % slices;
    indices.extend([south_pole, last_ring + next, last_ring + segment]);
  }

  SphereMesh { positions, indices }
}

#[cfg(test)]
mod tests {
  use glam::Vec3;

  use super::*;

  #[test]
  fn vertex_and_index_counts_match_the_formula() {
    let sphere = generate_sphere(8, 12);
    assert_eq!(sphere.positions.len(), (12 * 7 + 2) as usize);
    assert_eq!(sphere.indices.len(), (6 * 12 * 7) as usize);
    assert_eq!(sphere.indices.len() % 3, 0);
  }

  #[test]
  fn all_indices_are_in_bounds() {
    let sphere = generate_sphere(6, 9);
    let vertex_count = sphere.positions.len() as u32;
    assert!(sphere.indices.iter().all(|&i| i < vertex_count));
  }

  #[test]
  fn every_vertex_lies_on_the_unit_sphere() {
    let sphere = generate_sphere(10, 16);
    for p in &sphere.positions {
      let radius = Vec3::from_array(*p).length();
      assert!((radius - 1.0).abs() < 1e-5, "vertex off the unit sphere: {p:?}");
    }
  }

  #[test]
  fn no_degenerate_triangles() {
    let sphere = generate_sphere(4, 6);
    for tri in sphere.indices.chunks(3) {
      assert!(tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2]);
    }
  }
}
