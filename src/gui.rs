//! GUI Implementation using egui
//!
//! This module implements the application's graphical user interface using egui.
//! It provides real-time statistics, lighting controls, and camera controls.

use std::time::Instant;

use egui_winit_vulkano::Gui;

use crate::scene::camera::Camera;

/// Stores the current state of the GUI including performance metrics and
/// the live-tunable rendering parameters.
#[derive(Clone, Copy)]
pub struct GuiState {
  /// Current frames per second
  pub fps: f32,
  /// Average frames per second over time
  pub avg_fps: f32,
  /// Total number of frames rendered
  pub frame_count: u32,
  /// Accumulated frame times for averaging
  pub frame_time_accumulator: f32,
  /// Timestamp of the last frame
  pub last_frame_time: Instant,
  /// Timestamp of last FPS average calculation
  pub last_avg_update: Instant,
  /// Blend factor between the geometric normal and the sampled normal map
  pub normal_mapping_strength: f32,
  /// Whether point lights orbit the scene
  pub animate_lights: bool,
  /// Sun heading in degrees
  pub sun_azimuth_degrees: f32,
  /// Sun height above the horizon in degrees
  pub sun_elevation_degrees: f32,
  /// Sun color multiplier
  pub sun_intensity: f32,
  /// Number of active lights per kind (ambient, directional, point, spot)
  pub light_counts: [usize; 4],
}

impl Default for GuiState {
  fn default() -> Self {
    Self {
      fps: 0.0,
      avg_fps: 0.0,
      frame_count: 0,
      frame_time_accumulator: 0.0,
      last_frame_time: Instant::now(),
      last_avg_update: Instant::now(),
      normal_mapping_strength: 0.5,
      animate_lights: true,
      sun_azimuth_degrees: 200.0,
      sun_elevation_degrees: 60.0,
      sun_intensity: 1.0,
      light_counts: [0; 4],
    }
  }
}

/// Represents changes made by the GUI that need to be synced back to the App
#[derive(Default)]
pub struct GuiStateChanges {
  /// The sun sliders moved; the directional light must be rebuilt
  pub sun_changed: bool,
  /// Flag to reset camera position
  pub camera_reset: bool,
}

/// Draws the GUI frame and handles user interactions
///
/// # Arguments
/// * `gui` - The egui context
/// * `state` - Current GUI state
/// * `camera` - Camera controller for view manipulation
///
/// # Returns
/// A `GuiStateChanges` struct containing any modifications made through the GUI
pub fn draw_gui(gui: &mut Gui, state: &mut GuiState, camera: &mut Camera) -> GuiStateChanges {
  let mut changes = GuiStateChanges::default();

  // Calculate FPS
  let now = Instant::now();
  let frame_time = now.duration_since(state.last_frame_time).as_secs_f32();
  state.fps = 1.0 / frame_time;
  state.frame_time_accumulator += frame_time;
  state.frame_count += 1;

  // Update average FPS once per second
  let time_since_last_update = now.duration_since(state.last_avg_update).as_secs_f32();
  if time_since_last_update >= 1.0 {
    state.avg_fps = state.frame_count as f32 / state.frame_time_accumulator;
    state.frame_count = 0;
    state.frame_time_accumulator = 0.0;
    state.last_avg_update = now;
  }

  state.last_frame_time = now;

  gui.immediate_ui(|gui| {
    egui::Window::new("Settings")
      .default_pos([10.0, 10.0])
      .show(&gui.context(), |ui| {
        // Performance stats
        ui.heading("Performance");
        ui.label(format!("FPS: {:.1}", state.fps));
        ui.label(format!("Avg FPS: {:.1}", state.avg_fps));
        ui.label(format!("Frame Time: {:.2}ms", frame_time * 1000.0));

        ui.separator();

        // Lighting settings
        ui.heading("Lighting");
        ui.add(
          egui::Slider::new(&mut state.normal_mapping_strength, 0.0..=1.0)
            .text("Normal Mapping Strength"),
        );
        ui.checkbox(&mut state.animate_lights, "Animate point lights");

        if ui
          .add(
            egui::Slider::new(&mut state.sun_azimuth_degrees, -180.0..=180.0)
              .text("Sun Azimuth"),
          )
          .changed()
        {
          changes.sun_changed = true;
        }
        if ui
          .add(
            egui::Slider::new(&mut state.sun_elevation_degrees, 0.0..=90.0)
              .text("Sun Elevation"),
          )
          .changed()
        {
          changes.sun_changed = true;
        }
        if ui
          .add(egui::Slider::new(&mut state.sun_intensity, 0.0..=3.0).text("Sun Intensity"))
          .changed()
        {
          changes.sun_changed = true;
        }

        let [ambient, directional, point, spot] = state.light_counts;
        ui.label(format!(
          "Lights: {ambient} ambient, {directional} directional, {point} point, {spot} spot"
        ));

        ui.separator();

        // Camera info and settings
        ui.heading("Camera");
        ui.label(format!(
          "Position: ({:.2}, {:.2}, {:.2})",
          camera.position.x, camera.position.y, camera.position.z
        ));
        ui.label(format!("Yaw: {:.1}°", camera.yaw.to_degrees()));
        ui.label(format!("Pitch: {:.1}°", camera.pitch.to_degrees()));
        ui.add(egui::Slider::new(&mut camera.max_speed, 0.5..=20.0).text("Speed"));
        if ui.button("Reset Camera Position").clicked() {
          changes.camera_reset = true;
        }

        ui.separator();

        // Controls help
        ui.heading("Controls");
        ui.label("Click - Capture mouse");
        ui.label("WASD - Move horizontally");
        ui.label("Space/Shift - Move up/down");
        ui.label("Esc - Release mouse / quit");
      });
  });

  changes
}
