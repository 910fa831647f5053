//! Light sources and their packed uniform-buffer representation.
//!
//! The host keeps lights as a plain [`LightSource`] list that the GUI and
//! the animator mutate freely. Once per frame [`pack_lights`] partitions the
//! list into four contiguous index ranges (ambient, directional, point,
//! spot), transforms directions and positions into view space, and writes
//! the result into a fixed-capacity [`LightsUbo`] for upload.

use glam::{Mat3, Mat4, Vec3};
use vulkano::buffer::BufferContents;

/// Capacity of the uniform-buffer light array. Lights beyond this are
/// dropped at pack time.
pub const MAX_LIGHTS: usize = 128;

/// Angular speed of animated point lights, in radians per second.
const ORBIT_SPEED: f32 = 0.5;

/// Light source categories, in the order their ranges appear in the UBO.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
  Ambient,
  Directional,
  Point,
  Spot,
}

const KIND_ORDER: [LightKind; 4] = [
  LightKind::Ambient,
  LightKind::Directional,
  LightKind::Point,
  LightKind::Spot,
];

/// A single light source in world space.
#[derive(Clone, Debug)]
pub struct LightSource {
  pub kind: LightKind,
  pub color: Vec3,
  /// Travel direction of the emitted light (directional and spot lights).
  pub direction: Vec3,
  /// World-space position (point and spot lights).
  pub position: Vec3,
  /// Constant, linear, and quadratic attenuation coefficients.
  pub attenuation: Vec3,
  /// Inner cone angle in radians (spot lights).
  pub inner_angle: f32,
  /// Outer cone angle in radians (spot lights).
  pub outer_angle: f32,
  /// Falloff exponent applied to the cone gradient (spot lights).
  pub falloff: f32,
}

impl LightSource {
  pub fn ambient(color: Vec3) -> Self {
    Self {
      kind: LightKind::Ambient,
      color,
      direction: Vec3::ZERO,
      position: Vec3::ZERO,
      attenuation: Vec3::new(1.0, 0.0, 0.0),
      inner_angle: 0.0,
      outer_angle: 0.0,
      falloff: 1.0,
    }
  }

  pub fn directional(direction: Vec3, color: Vec3) -> Self {
    Self {
      direction: direction.normalize_or_zero(),
      ..Self::ambient(color).with_kind(LightKind::Directional)
    }
  }

  pub fn point(position: Vec3, color: Vec3, attenuation: Vec3) -> Self {
    Self {
      position,
      attenuation,
      ..Self::ambient(color).with_kind(LightKind::Point)
    }
  }

  pub fn spot(
    position: Vec3,
    direction: Vec3,
    color: Vec3,
    inner_angle: f32,
    outer_angle: f32,
  ) -> Self {
    Self {
      position,
      direction: direction.normalize_or_zero(),
      inner_angle,
      outer_angle,
      ..Self::ambient(color).with_kind(LightKind::Spot)
    }
  }

  fn with_kind(mut self, kind: LightKind) -> Self {
    self.kind = kind;
    self
  }
}

/// One light in the uniform buffer, in view space. The light's kind is
/// implied by which partition range its index falls into, so no type tag is
/// stored on the GPU side.
#[derive(Clone, Copy, Debug, BufferContents)]
#[repr(C)]
pub struct LightGpu {
  pub color: [f32; 4],
  /// View-space travel direction; w unused.
  pub direction: [f32; 4],
  /// View-space position; w unused.
  pub position: [f32; 4],
  /// Constant, linear, quadratic attenuation; w unused.
  pub attenuation: [f32; 4],
  /// Cosine of the inner and outer cone angles, falloff exponent; w unused.
  pub angles: [f32; 4],
}

impl LightGpu {
  pub const ZERO: Self = Self {
    color: [0.0; 4],
    direction: [0.0; 4],
    position: [0.0; 4],
    attenuation: [1.0, 0.0, 0.0, 0.0],
    angles: [0.0; 4],
  };
}

/// The per-frame light uniform buffer.
///
/// `ranges_ambient_directional` holds `{ambient begin, ambient end,
/// directional begin, directional end}` and `ranges_point_spot` the same
/// for point and spot lights; all ends are exclusive. The four ranges are
/// contiguous and cover `0..total` in kind order. Field order must match
/// the `LightsData` block in `scene.frag.glsl`.
#[derive(Clone, Copy, Debug, BufferContents)]
#[repr(C)]
pub struct LightsUbo {
  pub ranges_ambient_directional: [u32; 4],
  pub ranges_point_spot: [u32; 4],
  pub lights: [LightGpu; MAX_LIGHTS],
}

/// Partitions `lights` by kind and packs them, view-space transformed, into
/// a [`LightsUbo`].
///
/// The relative order of lights of the same kind is preserved. If more than
/// [`MAX_LIGHTS`] lights are active the excess is dropped, never wrapped.
pub fn pack_lights(lights: &[LightSource], view: Mat4) -> LightsUbo {
  let rotation = Mat3::from_mat4(view);

  let mut packed = [LightGpu::ZERO; MAX_LIGHTS];
  let mut ranges = [0u32; 8];
  let mut cursor = 0usize;

  for (slot, kind) in KIND_ORDER.into_iter().enumerate() {
    ranges[slot * 2] = cursor as u32;
    for light in lights.iter().filter(|l| l.kind == kind) {
      if cursor == MAX_LIGHTS {
        log::warn!("light capacity {MAX_LIGHTS} exceeded; dropping excess {kind:?} lights");
        break;
      }
      let direction_vs = (rotation * light.direction).normalize_or_zero();
      let position_vs = view.transform_point3(light.position);
      packed[cursor] = LightGpu {
        color: light.color.extend(1.0).to_array(),
        direction: direction_vs.extend(0.0).to_array(),
        position: position_vs.extend(1.0).to_array(),
        attenuation: light.attenuation.extend(0.0).to_array(),
        angles: [
          light.inner_angle.cos(),
          light.outer_angle.cos(),
          light.falloff,
          0.0,
        ],
      };
      cursor += 1;
    }
    ranges[slot * 2 + 1] = cursor as u32;
  }

  LightsUbo {
    ranges_ambient_directional: [ranges[0], ranges[1], ranges[2], ranges[3]],
    ranges_point_spot: [ranges[4], ranges[5], ranges[6], ranges[7]],
    lights: packed,
  }
}

/// Returns a copy of `lights` with point lights orbited around the world Y
/// axis by `t` seconds of animation. Deterministic in `t`: the same input
/// always produces the same output, so the animation can be paused and
/// resumed without drift.
pub fn animate_lights(lights: &[LightSource], t: f32) -> Vec<LightSource> {
  let rotation = Mat3::from_rotation_y(t * ORBIT_SPEED);
  lights
    .iter()
    .map(|light| {
      let mut animated = light.clone();
      if light.kind == LightKind::Point {
        animated.position = rotation * light.position;
      }
      animated
    })
    .collect()
}

/// The default light rig: one dim ambient fill, a warm sun, a few colored
/// point lights, and one spot light aimed down the scene.
pub fn default_lights() -> Vec<LightSource> {
  vec![
    LightSource::ambient(Vec3::splat(0.08)),
    LightSource::directional(Vec3::new(-0.4, -1.0, 0.2), Vec3::new(1.0, 0.96, 0.88)),
    LightSource::point(
      Vec3::new(4.0, 1.5, 0.0),
      Vec3::new(1.0, 0.3, 0.2),
      Vec3::new(1.0, 0.2, 0.1),
    ),
    LightSource::point(
      Vec3::new(-4.0, 1.5, 0.0),
      Vec3::new(0.2, 0.4, 1.0),
      Vec3::new(1.0, 0.2, 0.1),
    ),
    LightSource::point(
      Vec3::new(0.0, 2.0, 4.0),
      Vec3::new(0.3, 1.0, 0.4),
      Vec3::new(1.0, 0.2, 0.1),
    ),
    LightSource::spot(
      Vec3::new(0.0, 5.0, 0.0),
      Vec3::new(0.0, -1.0, 0.0),
      Vec3::splat(0.9),
      0.3,
      0.5,
    ),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::mem::size_of;

  fn mixed_lights() -> Vec<LightSource> {
    vec![
      LightSource::point(Vec3::X, Vec3::ONE, Vec3::new(1.0, 0.0, 0.0)),
      LightSource::ambient(Vec3::splat(0.1)),
      LightSource::directional(Vec3::NEG_Y, Vec3::ONE),
      LightSource::spot(Vec3::Y, Vec3::NEG_Y, Vec3::ONE, 0.2, 0.4),
      LightSource::point(Vec3::Z, Vec3::ONE, Vec3::new(1.0, 0.0, 0.0)),
      LightSource::directional(Vec3::NEG_X, Vec3::ONE),
    ]
  }

  #[test]
  fn lights_ubo_size_matches_std140_layout() {
    assert_eq!(size_of::<LightGpu>(), 5 * 16);
    assert_eq!(size_of::<LightsUbo>(), 2 * 16 + MAX_LIGHTS * 80);
  }

  #[test]
  fn ranges_are_contiguous_and_ordered() {
    let ubo = pack_lights(&mixed_lights(), Mat4::IDENTITY);
    let [a0, a1, d0, d1] = ubo.ranges_ambient_directional;
    let [p0, p1, s0, s1] = ubo.ranges_point_spot;

    assert_eq!(a0, 0);
    assert_eq!(a1, d0);
    assert_eq!(d1, p0);
    assert_eq!(p1, s0);
    assert_eq!((a1 - a0, d1 - d0, p1 - p0, s1 - s0), (1, 2, 2, 1));
    assert_eq!(s1, 6);
    assert!(s1 as usize <= MAX_LIGHTS);
  }

  #[test]
  fn same_kind_order_is_preserved() {
    let ubo = pack_lights(&mixed_lights(), Mat4::IDENTITY);
    let [p0, _, _, _] = ubo.ranges_point_spot;
    // First point light sits at world X, second at world Z.
    assert_eq!(ubo.lights[p0 as usize].position[0], 1.0);
    assert_eq!(ubo.lights[p0 as usize + 1].position[2], 1.0);
  }

  #[test]
  fn excess_lights_are_dropped_not_wrapped() {
    let lights: Vec<_> = (0..MAX_LIGHTS + 10)
      .map(|i| LightSource::point(Vec3::X * i as f32, Vec3::ONE, Vec3::X))
      .collect();
    let ubo = pack_lights(&lights, Mat4::IDENTITY);
    let [p0, p1, s0, s1] = ubo.ranges_point_spot;
    assert_eq!((p0, p1), (0, MAX_LIGHTS as u32));
    // Spot range stays empty and in bounds even though capacity was hit.
    assert_eq!(s0, s1);
    assert_eq!(s1, MAX_LIGHTS as u32);
  }

  #[test]
  fn directions_and_positions_are_view_space() {
    // Camera at +5Z looking at the origin: world -Z maps to view forward.
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    let lights = vec![
      LightSource::directional(Vec3::NEG_Y, Vec3::ONE),
      LightSource::point(Vec3::ZERO, Vec3::ONE, Vec3::X),
    ];
    let ubo = pack_lights(&lights, view);

    let sun = &ubo.lights[0];
    assert!((sun.direction[1] - (-1.0)).abs() < 1e-6);

    // A point light at the origin is 5 units down the view -Z axis.
    let point = &ubo.lights[1];
    assert!((point.position[2] - (-5.0)).abs() < 1e-5);
    assert!(point.position[0].abs() < 1e-5);
  }

  #[test]
  fn spot_angles_are_packed_as_cosines() {
    let ubo = pack_lights(
      &[LightSource::spot(Vec3::ZERO, Vec3::NEG_Y, Vec3::ONE, 0.3, 0.5)],
      Mat4::IDENTITY,
    );
    let spot = &ubo.lights[0];
    assert!((spot.angles[0] - 0.3f32.cos()).abs() < 1e-6);
    assert!((spot.angles[1] - 0.5f32.cos()).abs() < 1e-6);
  }

  #[test]
  fn animation_is_deterministic_and_preserves_radius() {
    let lights = default_lights();
    let a = animate_lights(&lights, 2.5);
    let b = animate_lights(&lights, 2.5);
    for (x, y) in a.iter().zip(&b) {
      assert_eq!(x.position, y.position);
    }

    for (animated, original) in a.iter().zip(&lights) {
      if animated.kind == LightKind::Point {
        assert!((animated.position.length() - original.position.length()).abs() < 1e-4);
        assert!((animated.position.y - original.position.y).abs() < 1e-5);
      } else {
        assert_eq!(animated.position, original.position);
      }
    }
  }

  #[test]
  fn animation_at_time_zero_is_identity() {
    let lights = default_lights();
    for (animated, original) in animate_lights(&lights, 0.0).iter().zip(&lights) {
      assert!((animated.position - original.position).length() < 1e-6);
    }
  }
}
