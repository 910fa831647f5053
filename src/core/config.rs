//! Viewer configuration loaded from `viewer.toml`.
//!
//! Every field has a default, so a missing or partial file still yields a
//! runnable configuration. A malformed file is an error: silently ignoring
//! a typo would be worse than refusing to start.

use std::path::Path;

use glam::{Mat4, Vec3};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to parse config file: {0}")]
  Parse(#[from] toml::de::Error),
}

/// One model to place in the scene.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelEntry {
  pub path: String,
  pub scale: f32,
  pub translation: [f32; 3],
  /// Rotation around the world Y axis, in degrees.
  pub rotation_y_degrees: f32,
}

impl Default for ModelEntry {
  fn default() -> Self {
    Self {
      path: "assets/sponza.obj".to_string(),
      scale: 1.0,
      translation: [0.0; 3],
      rotation_y_degrees: 0.0,
    }
  }
}

impl ModelEntry {
  /// The model matrix placing this entry in the world.
  pub fn model_matrix(&self) -> Mat4 {
    Mat4::from_translation(Vec3::from_array(self.translation))
      * Mat4::from_rotation_y(self.rotation_y_degrees.to_radians())
      * Mat4::from_scale(Vec3::splat(self.scale))
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
  pub window_width: u32,
  pub window_height: u32,
  pub models: Vec<ModelEntry>,
  pub normal_mapping_strength: f32,
  pub animate_lights: bool,
}

impl Default for ViewerConfig {
  fn default() -> Self {
    Self {
      window_width: 1920,
      window_height: 1080,
      models: vec![ModelEntry::default()],
      normal_mapping_strength: 0.5,
      animate_lights: true,
    }
  }
}

impl ViewerConfig {
  /// Loads the configuration from `path`, falling back to the defaults
  /// when the file does not exist.
  pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
    if !path.exists() {
      log::info!("no config at {}; using defaults", path.display());
      return Ok(Self::default());
    }
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn full_config_parses() {
    let config: ViewerConfig = toml::from_str(
      r#"
        window_width = 1280
        window_height = 720
        normal_mapping_strength = 0.8
        animate_lights = false

        [[models]]
        path = "assets/hall.obj"
        scale = 0.5
        translation = [1.0, 0.0, -2.0]
        rotation_y_degrees = 90.0
      "#,
    )
    .unwrap();

    assert_eq!(config.window_width, 1280);
    assert_eq!(config.normal_mapping_strength, 0.8);
    assert!(!config.animate_lights);
    assert_eq!(config.models.len(), 1);
    assert_eq!(config.models[0].path, "assets/hall.obj");
  }

  #[test]
  fn missing_fields_fall_back_to_defaults() {
    let config: ViewerConfig = toml::from_str("window_width = 800").unwrap();
    assert_eq!(config.window_width, 800);
    assert_eq!(config.window_height, 1080);
    assert_eq!(config.models.len(), 1);
    assert_eq!(config.normal_mapping_strength, 0.5);
  }

  #[test]
  fn malformed_config_is_an_error() {
    let result: Result<ViewerConfig, _> = toml::from_str("window_width = \"wide\"");
    assert!(result.is_err());
  }

  #[test]
  fn model_matrix_applies_translation_rotation_scale() {
    let entry = ModelEntry {
      scale: 2.0,
      translation: [1.0, 0.0, 0.0],
      rotation_y_degrees: 0.0,
      ..ModelEntry::default()
    };
    let transformed = entry.model_matrix().transform_point3(Vec3::new(1.0, 0.0, 0.0));
    assert!((transformed - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-5);
  }
}
