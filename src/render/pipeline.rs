//! Vulkan rendering pipeline and context management.
//!
//! This module implements the core rendering infrastructure including:
//! * Swapchain: Manages the presentation of rendered frames to the window
//! * Pipelines: The scene pipeline (Blinn-Phong with normal mapping) and the
//!   skybox pipeline (depth-independent background)
//! * Framebuffers: Manages render targets for each swapchain image
//! * Render Pass: Defines the sequence of rendering operations
//!
//! # Pipeline Configuration
//! The scene pipeline streams five vertex attributes (position, texture
//! coordinate, normal, tangent, bitangent) and runs with depth testing
//! enabled. The skybox pipeline streams positions only and disables both
//! depth testing and depth writes so it never occludes scene geometry.
//!
//! Both pipelines are recreated whenever the window is resized or the
//! swapchain becomes invalid.

use std::sync::Arc;

use vulkano::{
  descriptor_set::{DescriptorSet, WriteDescriptorSet, allocator::StandardDescriptorSetAllocator},
  device::DeviceOwned,
  format::Format,
  image::{Image, ImageCreateInfo, ImageType, ImageUsage, view::ImageView},
  memory::allocator::{AllocationCreateInfo, StandardMemoryAllocator},
  pipeline::{
    GraphicsPipeline,
    Pipeline,
    PipelineLayout,
    PipelineShaderStageCreateInfo,
    graphics::{
      GraphicsPipelineCreateInfo,
      color_blend::{ColorBlendAttachmentState, ColorBlendState},
      depth_stencil::{CompareOp, DepthState, DepthStencilState},
      input_assembly::InputAssemblyState,
      multisample::MultisampleState,
      rasterization::{CullMode, RasterizationState},
      vertex_input::{Vertex, VertexDefinition},
      viewport::{Viewport, ViewportState},
    },
    layout::PipelineDescriptorSetLayoutCreateInfo,
  },
  render_pass::{Framebuffer, FramebufferCreateInfo, RenderPass, Subpass},
  shader::EntryPoint,
  swapchain::Swapchain,
  sync::GpuFuture,
};
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
  core::init::SceneBuffers,
  render::vertex::{Bitangent, Normal, Position, Tangent, TexCoord},
  scene::material::MAX_TEXTURES,
};

/// Core rendering context containing all Vulkan resources whose lifetime is
/// tied to the window and swapchain.
pub struct RenderContext {
  pub window: Arc<Window>,
  pub swapchain: Arc<Swapchain>,
  pub render_pass: Arc<RenderPass>,
  pub framebuffers: Vec<Arc<Framebuffer>>,
  pub scene_vs: EntryPoint,
  pub scene_fs: EntryPoint,
  pub sky_vs: EntryPoint,
  pub sky_fs: EntryPoint,
  pub scene_pipeline: Arc<GraphicsPipeline>,
  pub sky_pipeline: Arc<GraphicsPipeline>,
  /// Descriptor set 0 of the scene pipeline: materials buffer plus the
  /// texture array. Static content, but tied to the pipeline layout, so it
  /// is rebuilt together with the pipelines.
  pub scene_material_set: Arc<DescriptorSet>,
  pub recreate_swapchain: bool,
  pub previous_frame_end: Option<Box<dyn GpuFuture>>,
}

/// Configuration for window size dependent setup
pub struct WindowSizeSetupConfig<'a> {
  pub window_size: PhysicalSize<u32>,
  pub images: &'a [Arc<Image>],
  pub render_pass: &'a Arc<RenderPass>,
  pub memory_allocator: &'a Arc<StandardMemoryAllocator>,
  pub scene_vs: &'a EntryPoint,
  pub scene_fs: &'a EntryPoint,
  pub sky_vs: &'a EntryPoint,
  pub sky_fs: &'a EntryPoint,
}

/// This function is called once during initialization, then again whenever
/// the window is resized. Returns the framebuffers, the scene pipeline, and
/// the skybox pipeline.
pub fn window_size_dependent_setup(
  config: WindowSizeSetupConfig,
) -> (
  Vec<Arc<Framebuffer>>,
  Arc<GraphicsPipeline>,
  Arc<GraphicsPipeline>,
) {
  let device = config.memory_allocator.device();

  let depth_buffer = ImageView::new_default(
    Image::new(
      config.memory_allocator.clone(),
      ImageCreateInfo {
        image_type: ImageType::Dim2d,
        format: Format::D32_SFLOAT,
        extent: config.images[0].extent(),
        usage: ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::TRANSIENT_ATTACHMENT,
        ..Default::default()
      },
      AllocationCreateInfo::default(),
    )
    .unwrap(),
  )
  .unwrap();

  let framebuffers = config
    .images
    .iter()
    .map(|image| {
      let view = ImageView::new_default(image.clone()).unwrap();
      Framebuffer::new(
        config.render_pass.clone(),
        FramebufferCreateInfo {
          attachments: vec![view, depth_buffer.clone()],
          ..Default::default()
        },
      )
      .unwrap()
    })
    .collect::<Vec<_>>();

  let viewport_state = ViewportState {
    viewports: [Viewport {
      offset: [0.0, 0.0],
      extent: config.window_size.into(),
      depth_range: 0.0..=1.0,
    }]
    .into_iter()
    .collect(),
    ..Default::default()
  };

  let subpass = Subpass::from(config.render_pass.clone(), 0).unwrap();

  let scene_pipeline = {
    let vertex_input_state = [
      Position::per_vertex(),
      TexCoord::per_vertex(),
      Normal::per_vertex(),
      Tangent::per_vertex(),
      Bitangent::per_vertex(),
    ]
    .definition(config.scene_vs)
    .unwrap();

    let stages = [
      PipelineShaderStageCreateInfo::new(config.scene_vs.clone()),
      PipelineShaderStageCreateInfo::new(config.scene_fs.clone()),
    ];

    let layout = PipelineLayout::new(
      device.clone(),
      PipelineDescriptorSetLayoutCreateInfo::from_stages(&stages)
        .into_pipeline_layout_create_info(device.clone())
        .unwrap(),
    )
    .unwrap();

    GraphicsPipeline::new(
      device.clone(),
      None,
      GraphicsPipelineCreateInfo {
        stages: stages.into_iter().collect(),
        vertex_input_state: Some(vertex_input_state),
        input_assembly_state: Some(InputAssemblyState::default()),
        viewport_state: Some(viewport_state.clone()),
        rasterization_state: Some(RasterizationState {
          cull_mode: CullMode::None,
          ..Default::default()
        }),
        depth_stencil_state: Some(DepthStencilState {
          depth: Some(DepthState::simple()),
          ..Default::default()
        }),
        multisample_state: Some(MultisampleState::default()),
        color_blend_state: Some(ColorBlendState::with_attachment_states(
          subpass.num_color_attachments(),
          ColorBlendAttachmentState::default(),
        )),
        subpass: Some(subpass.clone().into()),
        ..GraphicsPipelineCreateInfo::layout(layout)
      },
    )
    .unwrap()
  };

  let sky_pipeline = {
    let vertex_input_state = [Position::per_vertex()].definition(config.sky_vs).unwrap();

    let stages = [
      PipelineShaderStageCreateInfo::new(config.sky_vs.clone()),
      PipelineShaderStageCreateInfo::new(config.sky_fs.clone()),
    ];

    let layout = PipelineLayout::new(
      device.clone(),
      PipelineDescriptorSetLayoutCreateInfo::from_stages(&stages)
        .into_pipeline_layout_create_info(device.clone())
        .unwrap(),
    )
    .unwrap();

    GraphicsPipeline::new(
      device.clone(),
      None,
      GraphicsPipelineCreateInfo {
        stages: stages.into_iter().collect(),
        vertex_input_state: Some(vertex_input_state),
        input_assembly_state: Some(InputAssemblyState::default()),
        viewport_state: Some(viewport_state),
        // The sphere is viewed from the inside, so winding is meaningless
        // and culling stays off.
        rasterization_state: Some(RasterizationState {
          cull_mode: CullMode::None,
          ..Default::default()
        }),
        // No depth test, no depth writes: the sky is a pure background.
        depth_stencil_state: Some(DepthStencilState {
          depth: Some(DepthState {
            write_enable: false,
            compare_op: CompareOp::Always,
          }),
          ..Default::default()
        }),
        multisample_state: Some(MultisampleState::default()),
        color_blend_state: Some(ColorBlendState::with_attachment_states(
          subpass.num_color_attachments(),
          ColorBlendAttachmentState::default(),
        )),
        subpass: Some(subpass.into()),
        ..GraphicsPipelineCreateInfo::layout(layout)
      },
    )
    .unwrap()
  };

  (framebuffers, scene_pipeline, sky_pipeline)
}

/// Builds descriptor set 0 of the scene pipeline: the materials storage
/// buffer and the combined-image-sampler array, padded to [`MAX_TEXTURES`]
/// entries with the white fallback texture.
pub fn create_material_descriptor_set(
  descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,
  scene_pipeline: &Arc<GraphicsPipeline>,
  scene: &SceneBuffers,
) -> Arc<DescriptorSet> {
  let layout = scene_pipeline.layout().set_layouts()[0].clone();
  DescriptorSet::new(
    descriptor_set_allocator,
    layout,
    [
      WriteDescriptorSet::buffer(0, scene.materials.clone()),
      WriteDescriptorSet::image_view_sampler_array(
        1,
        0,
        scene
          .textures
          .iter()
          .cloned()
          .map(|view| (view, scene.sampler.clone()))
          .chain(std::iter::repeat((
            scene.white_texture.clone(),
            scene.sampler.clone(),
          )))
          .take(MAX_TEXTURES),
      ),
    ],
    [],
  )
  .unwrap()
}
