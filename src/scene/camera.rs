//! First-person fly camera with physics-based movement.
//!
//! The camera tracks position, yaw, and pitch, and integrates a velocity
//! with acceleration and deceleration so movement ramps smoothly instead of
//! snapping. Movement input arrives as a world-space direction vector built
//! from the pressed-key state; rotation arrives as raw mouse deltas.

use glam::{Mat4, Vec3};

/// Vertical field of view of the scene projection, in degrees.
pub const FOV_Y_DEGREES: f32 = 60.0;
/// Near clipping plane distance.
pub const NEAR_PLANE: f32 = 0.3;
/// Far clipping plane distance.
pub const FAR_PLANE: f32 = 1000.0;

pub struct Camera {
  pub position: Vec3,
  pub yaw: f32,
  pub pitch: f32,
  pub velocity: Vec3,
  pub movement_acceleration: f32,
  pub movement_deceleration: f32,
  pub max_speed: f32,
  pub mouse_sensitivity: f32,
}

impl Camera {
  pub fn new() -> Self {
    Self {
      position: Vec3::new(-6.8, 1.7, -0.7),
      yaw: 0.0,
      pitch: 0.0,
      velocity: Vec3::ZERO,
      movement_acceleration: 20.0,
      movement_deceleration: 10.0,
      max_speed: 5.0,
      mouse_sensitivity: 0.002,
    }
  }

  /// Integrates one step of movement.
  ///
  /// `movement` is the desired world-space direction (already yaw-aligned
  /// by the caller, not necessarily normalized); `delta_time` is in
  /// seconds.
  pub fn update_movement(&mut self, movement: Vec3, delta_time: f32) {
    let input = movement.normalize_or_zero();

    // Apply acceleration based on input
    self.velocity += input * self.movement_acceleration * delta_time;

    // Apply deceleration when no input
    if input.length_squared() < 0.1 {
      let deceleration = -self.velocity.normalize_or_zero() * self.movement_deceleration;
      self.velocity += deceleration * delta_time;

      // Stop completely if velocity is very small
      if self.velocity.length_squared() < 0.01 {
        self.velocity = Vec3::ZERO;
      }
    }

    // Clamp velocity to max speed
    if self.velocity.length_squared() > self.max_speed * self.max_speed {
      self.velocity = self.velocity.normalize() * self.max_speed;
    }

    // Update position
    self.position += self.velocity * delta_time;
  }

  /// Applies a mouse delta to yaw and pitch, clamping pitch short of the
  /// poles so the view matrix never degenerates.
  pub fn rotate(&mut self, delta_yaw: f32, delta_pitch: f32) {
    self.yaw += delta_yaw;
    self.pitch = (self.pitch + delta_pitch).clamp(
      -std::f32::consts::FRAC_PI_2 + 0.01,
      std::f32::consts::FRAC_PI_2 - 0.01,
    );
  }

  /// Unit vector the camera is looking along.
  pub fn forward(&self) -> Vec3 {
    Vec3::new(
      self.yaw.cos() * self.pitch.cos(),
      self.pitch.sin(),
      self.yaw.sin() * self.pitch.cos(),
    )
  }

  pub fn view_matrix(&self) -> Mat4 {
    Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
  }
}

impl Default for Camera {
  fn default() -> Self {
    Self::new()
  }
}

/// Perspective projection with the Y flip Vulkan's clip space requires.
pub fn projection_matrix(aspect_ratio: f32) -> Mat4 {
  let mut proj = Mat4::perspective_rh(
    FOV_Y_DEGREES.to_radians(),
    aspect_ratio,
    NEAR_PLANE,
    FAR_PLANE,
  );
  proj.y_axis.y *= -1.0;
  proj
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn movement_accelerates_toward_input() {
    let mut camera = Camera::new();
    camera.update_movement(Vec3::X, 0.1);
    assert!(camera.velocity.x > 0.0);
    assert_eq!(camera.velocity.y, 0.0);
  }

  #[test]
  fn velocity_is_clamped_to_max_speed() {
    let mut camera = Camera::new();
    for _ in 0..100 {
      camera.update_movement(Vec3::X, 0.1);
    }
    assert!(camera.velocity.length() <= camera.max_speed + 1e-4);
  }

  #[test]
  fn deceleration_stops_the_camera() {
    let mut camera = Camera::new();
    camera.update_movement(Vec3::X, 0.1);
    for _ in 0..200 {
      camera.update_movement(Vec3::ZERO, 0.1);
    }
    assert_eq!(camera.velocity, Vec3::ZERO);
  }

  #[test]
  fn pitch_is_clamped_short_of_the_poles() {
    let mut camera = Camera::new();
    camera.rotate(0.0, 100.0);
    assert!(camera.pitch < std::f32::consts::FRAC_PI_2);
    camera.rotate(0.0, -200.0);
    assert!(camera.pitch > -std::f32::consts::FRAC_PI_2);
  }

  #[test]
  fn view_matrix_looks_along_forward() {
    let mut camera = Camera::new();
    camera.position = Vec3::ZERO;
    camera.yaw = 0.0;
    camera.pitch = 0.0;
    // Looking along +X: that world direction maps to view-space -Z.
    let view = camera.view_matrix();
    let forward_vs = view.transform_vector3(Vec3::X);
    assert!((forward_vs - Vec3::NEG_Z).length() < 1e-5);
  }

  #[test]
  fn projection_flips_y_for_vulkan() {
    let proj = projection_matrix(16.0 / 9.0);
    // A point above the center projects to negative clip-space Y after the
    // flip (Vulkan's Y axis points down).
    let clip = proj * glam::Vec4::new(0.0, 1.0, -5.0, 1.0);
    assert!(clip.y < 0.0);
  }
}
