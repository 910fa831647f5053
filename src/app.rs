//! Main application logic and per-frame rendering flow.
//!
//! This module implements the core application functionality:
//! * Window creation and event handling (resize, input, focus)
//! * Swapchain creation and recreation
//! * Per-frame uniform packing (camera matrices, user input, light sources)
//! * Command buffer recording and frame submission
//! * Camera control with smooth movement
//!
//! # Frame Loop
//! Each frame follows this sequence:
//! 1. Process window and input events
//! 2. Update camera position and orientation
//! 3. Repack the frame uniform buffer and the light-source uniform buffer
//! 4. Submit the light upload, then the frame's draw commands; the draw
//!    submission waits on both the upload and the swapchain image becoming
//!    available
//! 5. Present the frame

use std::{sync::Arc, time::Instant};

use egui_winit_vulkano::{Gui, GuiConfig};
use glam::Vec3;
use vulkano::{
  Validated,
  VulkanError,
  buffer::Subbuffer,
  command_buffer::{
    AutoCommandBufferBuilder,
    CommandBufferUsage,
    CopyBufferInfo,
    PrimaryCommandBufferAbstract,
    allocator::StandardCommandBufferAllocator,
  },
  descriptor_set::{DescriptorSet, WriteDescriptorSet, allocator::StandardDescriptorSetAllocator},
  device::{Device, Queue},
  format::Format,
  image::ImageUsage,
  instance::Instance,
  memory::allocator::StandardMemoryAllocator,
  pipeline::Pipeline,
  render_pass::Subpass,
  swapchain::{
    PresentMode,
    Surface,
    Swapchain,
    SwapchainCreateInfo,
    SwapchainPresentInfo,
    acquire_next_image,
  },
  sync::{self, GpuFuture},
};
use winit::{
  application::ApplicationHandler,
  dpi::LogicalSize,
  event::{DeviceEvent, DeviceId, ElementState, MouseButton, WindowEvent},
  event_loop::{ActiveEventLoop, EventLoop},
  window::{CursorGrabMode, Window, WindowId},
};

use crate::{
  core::{
    command_buffer_builder_ext::AutoCommandBufferBuilderExt,
    config::ViewerConfig,
    init::{
      SceneBuffers,
      SkyBuffers,
      create_lights_buffer,
      initialize_vulkan,
      upload_scene,
      upload_sky,
    },
  },
  gui::{self, GuiState},
  render::{
    frame::FrameUbo,
    pipeline::{
      RenderContext,
      WindowSizeSetupConfig,
      create_material_descriptor_set,
      window_size_dependent_setup,
    },
  },
  scene::{
    camera::{Camera, projection_matrix},
    light::{LightKind, LightSource, LightsUbo, animate_lights, default_lights, pack_lights},
    loader::{SceneError, load_scene},
    sky::generate_sphere,
  },
  shaders::{scene_fs, scene_vs, sky_fs, sky_vs},
};

/// Initial camera position, also used by the GUI's reset button.
const CAMERA_HOME: Vec3 = Vec3::new(-6.8, 1.7, -0.7);

/// Main application state containing all Vulkan and window resources.
///
/// The scene (draw calls, materials, textures) and the skybox sphere are
/// uploaded once in [`App::new`] and stay immutable; the light list and the
/// camera are the only mutable scene state, repacked into uniform buffers
/// every frame.
pub struct App {
  // Vulkan resources
  instance: Arc<Instance>,
  device: Arc<Device>,
  queue: Arc<Queue>,
  memory_allocator: Arc<StandardMemoryAllocator>,
  descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,
  command_buffer_allocator: Arc<StandardCommandBufferAllocator>,

  // Scene resources
  scene: SceneBuffers,
  sky: SkyBuffers,
  lights_buffer: Subbuffer<LightsUbo>,
  lights: Vec<LightSource>,

  // Rendering context and UI
  rcx: Option<RenderContext>,
  gui: Option<Gui>,
  gui_state: GuiState,

  // Per-frame allocators, owned here because they are used every frame
  uniform_buffer_allocator: vulkano::buffer::allocator::SubbufferAllocator,
  staging_buffer_allocator: vulkano::buffer::allocator::SubbufferAllocator,

  // Timing
  start_time: Instant,
  last_frame_time: Instant,

  // Camera and input state
  camera: Camera,
  forward_pressed: bool,
  back_pressed: bool,
  left_pressed: bool,
  right_pressed: bool,
  up_pressed: bool,
  down_pressed: bool,
  cursor_captured: bool,

  config: ViewerConfig,
}

impl App {
  /// Creates the application: initializes Vulkan, loads the scene from the
  /// configured model entries, and uploads everything to the GPU.
  ///
  /// Fails if the scene cannot be loaded; Vulkan initialization failures
  /// are fatal and panic, as there is nothing to recover.
  pub fn new(event_loop: &EventLoop<()>, config: ViewerConfig) -> Result<Self, SceneError> {
    let initialized = initialize_vulkan(event_loop);

    let loaded = load_scene(&config.models)?;
    let scene = upload_scene(&initialized, &loaded)?;
    let sky = upload_sky(&initialized, &generate_sphere(16, 24));
    let lights_buffer = create_lights_buffer(&initialized);

    let gui_state = GuiState {
      normal_mapping_strength: config.normal_mapping_strength,
      animate_lights: config.animate_lights,
      ..GuiState::default()
    };

    let mut lights = default_lights();
    apply_sun_settings(&mut lights, &gui_state);

    Ok(App {
      instance: initialized.instance,
      device: initialized.device,
      queue: initialized.queue,
      memory_allocator: initialized.memory_allocator,
      descriptor_set_allocator: initialized.descriptor_set_allocator,
      command_buffer_allocator: initialized.command_buffer_allocator,
      uniform_buffer_allocator: initialized.uniform_buffer_allocator,
      staging_buffer_allocator: initialized.staging_buffer_allocator,
      scene,
      sky,
      lights_buffer,
      lights,
      rcx: None,
      gui: None,
      gui_state,
      start_time: Instant::now(),
      last_frame_time: Instant::now(),
      camera: Camera {
        position: CAMERA_HOME,
        ..Camera::new()
      },
      forward_pressed: false,
      back_pressed: false,
      left_pressed: false,
      right_pressed: false,
      up_pressed: false,
      down_pressed: false,
      cursor_captured: false,
      config,
    })
  }

  /// Updates camera position from the current key state.
  ///
  /// Horizontal movement is aligned to the camera's yaw; vertical movement
  /// is world-space. The combined direction is normalized so diagonal
  /// movement is not faster.
  fn update_camera_movement(&mut self, delta_time: f32) {
    let mut movement = Vec3::ZERO;
    if self.up_pressed {
      movement.y += 1.0;
    }
    if self.down_pressed {
      movement.y -= 1.0;
    }

    let (yaw_sin, yaw_cos) = self.camera.yaw.sin_cos();
    if self.forward_pressed {
      movement.x += yaw_cos;
      movement.z += yaw_sin;
    }
    if self.back_pressed {
      movement.x -= yaw_cos;
      movement.z -= yaw_sin;
    }
    if self.right_pressed {
      movement.x -= yaw_sin;
      movement.z += yaw_cos;
    }
    if self.left_pressed {
      movement.x += yaw_sin;
      movement.z -= yaw_cos;
    }

    self.camera.update_movement(movement, delta_time);
  }

  fn release_cursor(&mut self) {
    let rcx = self.rcx.as_ref().unwrap();
    self.cursor_captured = false;
    rcx.window.set_cursor_grab(CursorGrabMode::None).unwrap();
    rcx.window.set_cursor_visible(true);
  }
}

impl ApplicationHandler for App {
  /// Creates the window, the swapchain, the render pass, both pipelines,
  /// and the GUI once the event loop is running.
  fn resumed(&mut self, event_loop: &ActiveEventLoop) {
    let window_attrs = Window::default_attributes()
      .with_decorations(true)
      .with_title("Blinn-Phong Scene Viewer")
      .with_inner_size(LogicalSize::new(
        self.config.window_width,
        self.config.window_height,
      ));

    let window = Arc::new(event_loop.create_window(window_attrs).unwrap());

    let surface = Surface::from_window(self.instance.clone(), window.clone()).unwrap();
    let window_size = window.inner_size();

    let (swapchain, images) = {
      let surface_capabilities = self
        .device
        .physical_device()
        .surface_capabilities(&surface, Default::default())
        .unwrap();

      let present_modes = self
        .device
        .physical_device()
        .surface_present_modes(&surface, Default::default())
        .unwrap();

      // Mailbox avoids tearing without stalling the frame loop; FIFO is the
      // guaranteed fallback.
      let present_mode = if present_modes.contains(&PresentMode::Mailbox) {
        PresentMode::Mailbox
      } else {
        PresentMode::Fifo
      };
      log::info!("present mode: {:?}", present_mode);

      let formats = self
        .device
        .physical_device()
        .surface_formats(&surface, Default::default())
        .unwrap();
      // Lighting happens in linear space, so prefer an sRGB target and let
      // the hardware encode on store.
      let (image_format, _) = formats
        .iter()
        .find(|(format, _)| {
          matches!(format, Format::B8G8R8A8_SRGB | Format::R8G8B8A8_SRGB)
        })
        .cloned()
        .unwrap_or_else(|| formats[0]);
      log::info!("swapchain format: {:?}", image_format);

      Swapchain::new(self.device.clone(), surface.clone(), SwapchainCreateInfo {
        min_image_count: surface_capabilities.min_image_count.max(2),
        image_format,
        image_extent: window_size.into(),
        image_usage: ImageUsage::COLOR_ATTACHMENT,
        composite_alpha: vulkano::swapchain::CompositeAlpha::Opaque,
        pre_transform: surface_capabilities.current_transform,
        clipped: true,
        present_mode,
        ..Default::default()
      })
      .unwrap()
    };

    let render_pass = vulkano::ordered_passes_renderpass!(
      self.device.clone(),
      attachments: {
        color: {
          format: swapchain.image_format(),
          samples: 1,
          load_op: Clear,
          store_op: Store,
        },
        depth: {
          format: Format::D32_SFLOAT,
          samples: 1,
          load_op: Clear,
          store_op: DontCare,
        }
      },
      passes: [
        {
          color: [color],
          depth_stencil: {depth},
          input: []
        },
        {
          color: [color],
          depth_stencil: {},
          input: []
        }
      ]
    )
    .unwrap();

    let scene_vs = scene_vs::load(self.device.clone())
      .unwrap()
      .entry_point("main")
      .unwrap();
    let scene_fs = scene_fs::load(self.device.clone())
      .unwrap()
      .entry_point("main")
      .unwrap();
    let sky_vs = sky_vs::load(self.device.clone())
      .unwrap()
      .entry_point("main")
      .unwrap();
    let sky_fs = sky_fs::load(self.device.clone())
      .unwrap()
      .entry_point("main")
      .unwrap();

    let (framebuffers, scene_pipeline, sky_pipeline) =
      window_size_dependent_setup(WindowSizeSetupConfig {
        window_size,
        images: &images,
        render_pass: &render_pass,
        memory_allocator: &self.memory_allocator,
        scene_vs: &scene_vs,
        scene_fs: &scene_fs,
        sky_vs: &sky_vs,
        sky_fs: &sky_fs,
      });

    let scene_material_set = create_material_descriptor_set(
      self.descriptor_set_allocator.clone(),
      &scene_pipeline,
      &self.scene,
    );

    let previous_frame_end = Some(sync::now(self.device.clone()).boxed());

    self.gui = Some(Gui::new_with_subpass(
      event_loop,
      surface.clone(),
      self.queue.clone(),
      Subpass::from(render_pass.clone(), 1).unwrap(),
      swapchain.image_format(),
      GuiConfig::default(),
    ));

    self.rcx = Some(RenderContext {
      window,
      swapchain,
      render_pass,
      framebuffers,
      scene_vs,
      scene_fs,
      sky_vs,
      sky_fs,
      scene_pipeline,
      sky_pipeline,
      scene_material_set,
      recreate_swapchain: false,
      previous_frame_end,
    });
  }

  /// Processes window events: resize, close, keyboard input for camera
  /// movement, mouse capture, and the per-frame redraw.
  fn window_event(
    &mut self,
    event_loop: &ActiveEventLoop,
    _window_id: WindowId,
    event: WindowEvent,
  ) {
    // Let egui see every event first; events it consumes stay out of the
    // camera controls.
    let mut pass_events_to_game = true;
    if let Some(gui) = &mut self.gui {
      if gui.update(&event) {
        pass_events_to_game = false;
      }
    }

    let rcx = self.rcx.as_mut().unwrap();

    match event {
      WindowEvent::CloseRequested => {
        event_loop.exit();
      }
      WindowEvent::Resized(_) => {
        rcx.recreate_swapchain = true;
      }
      WindowEvent::MouseInput {
        state: ElementState::Pressed,
        button: MouseButton::Left,
        ..
      } => {
        if pass_events_to_game {
          rcx
            .window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_e| rcx.window.set_cursor_grab(CursorGrabMode::Confined))
            .unwrap();
          rcx.window.set_cursor_visible(false);
          self.cursor_captured = true;
        }
      }
      WindowEvent::KeyboardInput {
        event:
          winit::event::KeyEvent {
            physical_key: key,
            state,
            ..
          },
        ..
      } => {
        use winit::keyboard::{KeyCode, PhysicalKey};

        if !self.cursor_captured {
          // Escape quits outright when the camera is not engaged.
          if let PhysicalKey::Code(KeyCode::Escape) = key {
            if state == ElementState::Pressed {
              event_loop.exit();
            }
          }
          return;
        }

        match key {
          PhysicalKey::Code(KeyCode::KeyW) => {
            self.forward_pressed = state == ElementState::Pressed;
          }
          PhysicalKey::Code(KeyCode::KeyS) => {
            self.back_pressed = state == ElementState::Pressed;
          }
          PhysicalKey::Code(KeyCode::KeyA) => {
            self.left_pressed = state == ElementState::Pressed;
          }
          PhysicalKey::Code(KeyCode::KeyD) => {
            self.right_pressed = state == ElementState::Pressed;
          }
          PhysicalKey::Code(KeyCode::Space) => {
            self.up_pressed = state == ElementState::Pressed;
          }
          PhysicalKey::Code(KeyCode::ShiftLeft) => {
            self.down_pressed = state == ElementState::Pressed;
          }
          PhysicalKey::Code(KeyCode::Escape) => {
            if state == ElementState::Pressed {
              self.release_cursor();
            }
          }
          _ => {}
        }
      }
      WindowEvent::RedrawRequested => {
        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;

        // Clamp frame time to avoid huge jumps after stalls
        let clamped_frame_time = frame_time.min(0.1);
        self.update_camera_movement(clamped_frame_time);

        let rcx = self.rcx.as_mut().unwrap();
        let window_size = rcx.window.inner_size();

        if window_size.width == 0 || window_size.height == 0 {
          return;
        }

        rcx.previous_frame_end.as_mut().unwrap().cleanup_finished();

        if rcx.recreate_swapchain {
          let (new_swapchain, new_images) = rcx
            .swapchain
            .recreate(SwapchainCreateInfo {
              image_extent: window_size.into(),
              ..rcx.swapchain.create_info()
            })
            .expect("failed to recreate swapchain");

          rcx.swapchain = new_swapchain;
          (rcx.framebuffers, rcx.scene_pipeline, rcx.sky_pipeline) =
            window_size_dependent_setup(WindowSizeSetupConfig {
              window_size,
              images: &new_images,
              render_pass: &rcx.render_pass,
              memory_allocator: &self.memory_allocator,
              scene_vs: &rcx.scene_vs,
              scene_fs: &rcx.scene_fs,
              sky_vs: &rcx.sky_vs,
              sky_fs: &rcx.sky_fs,
            });
          rcx.scene_material_set = create_material_descriptor_set(
            self.descriptor_set_allocator.clone(),
            &rcx.scene_pipeline,
            &self.scene,
          );
          rcx.recreate_swapchain = false;
        }

        // Draw GUI and handle changes
        for (slot, kind) in [
          LightKind::Ambient,
          LightKind::Directional,
          LightKind::Point,
          LightKind::Spot,
        ]
        .into_iter()
        .enumerate()
        {
          self.gui_state.light_counts[slot] =
            self.lights.iter().filter(|l| l.kind == kind).count();
        }
        if let Some(gui) = &mut self.gui {
          let changes = gui::draw_gui(gui, &mut self.gui_state, &mut self.camera);

          if changes.sun_changed {
            apply_sun_settings(&mut self.lights, &self.gui_state);
          }
          if changes.camera_reset {
            self.camera.position = CAMERA_HOME;
            self.camera.yaw = 0.0;
            self.camera.pitch = 0.0;
            self.camera.velocity = Vec3::ZERO;
          }
        }

        // Pack this frame's uniform data.
        let view = self.camera.view_matrix();
        let aspect_ratio =
          rcx.swapchain.image_extent()[0] as f32 / rcx.swapchain.image_extent()[1] as f32;
        let proj = projection_matrix(aspect_ratio);

        let frame_ubo = FrameUbo::new(
          view,
          proj,
          self.camera.position,
          self.gui_state.normal_mapping_strength,
        );
        let frame_uniforms = self.uniform_buffer_allocator.allocate_sized().unwrap();
        *frame_uniforms.write().unwrap() = frame_ubo;

        let elapsed = self.start_time.elapsed().as_secs_f32();
        let frame_lights = if self.gui_state.animate_lights {
          animate_lights(&self.lights, elapsed)
        } else {
          self.lights.clone()
        };
        let lights_ubo = pack_lights(&frame_lights, view);

        let (image_index, suboptimal, acquire_future) =
          match acquire_next_image(rcx.swapchain.clone(), None).map_err(Validated::unwrap) {
            Ok(r) => r,
            Err(VulkanError::OutOfDate) => {
              rcx.recreate_swapchain = true;
              return;
            }
            Err(e) => panic!("failed to acquire next image: {e}"),
          };

        if suboptimal {
          rcx.recreate_swapchain = true;
        }

        // The lights buffer lives in device-local memory, so the new
        // contents go through a staging buffer and a copy submission. The
        // draw submission below waits on its semaphore.
        let lights_staging = self.staging_buffer_allocator.allocate_sized().unwrap();
        *lights_staging.write().unwrap() = lights_ubo;

        let mut upload_builder = AutoCommandBufferBuilder::primary(
          self.command_buffer_allocator.clone(),
          self.queue.queue_family_index(),
          CommandBufferUsage::OneTimeSubmit,
        )
        .unwrap();
        upload_builder
          .copy_buffer(CopyBufferInfo::buffers(
            lights_staging,
            self.lights_buffer.clone(),
          ))
          .unwrap();
        let upload_future = upload_builder
          .build()
          .unwrap()
          .execute(self.queue.clone())
          .unwrap()
          .then_signal_semaphore_and_flush()
          .unwrap();

        // Per-frame descriptor sets: the frame UBO changes allocation every
        // frame, so these cannot be cached.
        let frame_set = DescriptorSet::new(
          self.descriptor_set_allocator.clone(),
          rcx.scene_pipeline.layout().set_layouts()[1].clone(),
          [
            WriteDescriptorSet::buffer(0, frame_uniforms.clone()),
            WriteDescriptorSet::buffer(1, self.lights_buffer.clone()),
          ],
          [],
        )
        .unwrap();
        let sky_set = DescriptorSet::new(
          self.descriptor_set_allocator.clone(),
          rcx.sky_pipeline.layout().set_layouts()[0].clone(),
          [WriteDescriptorSet::buffer(0, frame_uniforms)],
          [],
        )
        .unwrap();

        let mut builder = AutoCommandBufferBuilder::primary(
          self.command_buffer_allocator.clone(),
          self.queue.queue_family_index(),
          CommandBufferUsage::OneTimeSubmit,
        )
        .unwrap();

        builder.record_scene_frame(
          rcx,
          image_index,
          &frame_set,
          &sky_set,
          &self.sky,
          &self.scene.draw_calls,
          &mut self.gui,
        );

        let command_buffer = builder.build().unwrap();

        // The draw submission must wait for the swapchain image to become
        // available and for the lights upload to land in device memory.
        let final_future = rcx
          .previous_frame_end
          .take()
          .unwrap()
          .join(acquire_future)
          .join(upload_future)
          .then_execute(self.queue.clone(), command_buffer)
          .unwrap()
          .then_swapchain_present(
            self.queue.clone(),
            SwapchainPresentInfo::swapchain_image_index(rcx.swapchain.clone(), image_index),
          )
          .then_signal_fence_and_flush();

        match final_future.map_err(Validated::unwrap) {
          Ok(future) => {
            rcx.previous_frame_end = Some(future.boxed());
          }
          Err(VulkanError::OutOfDate) => {
            rcx.recreate_swapchain = true;
            rcx.previous_frame_end = Some(sync::now(self.device.clone()).boxed());
          }
          Err(e) => {
            log::error!("failed to flush frame: {e}");
            rcx.previous_frame_end = Some(sync::now(self.device.clone()).boxed());
          }
        }
      }
      _ => {}
    }
  }

  /// Converts raw mouse motion into camera rotation while the cursor is
  /// captured.
  fn device_event(
    &mut self,
    _event_loop: &ActiveEventLoop,
    _device_id: DeviceId,
    event: DeviceEvent,
  ) {
    if let DeviceEvent::MouseMotion { delta } = event {
      if self.cursor_captured {
        let (delta_x, delta_y) = delta;
        let sensitivity = self.camera.mouse_sensitivity;

        self
          .camera
          .rotate(delta_x as f32 * sensitivity, -delta_y as f32 * sensitivity);
      }
    }
  }

  fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
    let rcx = self.rcx.as_mut().unwrap();
    rcx.window.request_redraw();
  }
}

/// Rebuilds the rig's directional light from the GUI's sun parameters.
///
/// Azimuth is the heading the light travels toward; elevation raises the
/// light above the horizon, so the travel direction tips downward as the
/// elevation grows.
fn apply_sun_settings(lights: &mut [LightSource], state: &GuiState) {
  let azimuth = state.sun_azimuth_degrees.to_radians();
  let elevation = state.sun_elevation_degrees.to_radians();
  let direction = Vec3::new(
    elevation.cos() * azimuth.cos(),
    -elevation.sin(),
    elevation.cos() * azimuth.sin(),
  );

  if let Some(sun) = lights
    .iter_mut()
    .find(|light| light.kind == LightKind::Directional)
  {
    sun.direction = direction.normalize_or_zero();
    sun.color = Vec3::new(1.0, 0.96, 0.88) * state.sun_intensity;
  }
}
