use std::sync::Arc;

use egui_winit_vulkano::Gui;
use vulkano::{
  command_buffer::{
    AutoCommandBufferBuilder,
    RenderPassBeginInfo,
    SubpassBeginInfo,
    SubpassContents,
    SubpassEndInfo,
  },
  descriptor_set::DescriptorSet,
  pipeline::{Pipeline, PipelineBindPoint},
};

use crate::{
  core::init::SkyBuffers,
  render::pipeline::RenderContext,
  scene::draw_call::DrawCall,
  shaders::scene_vs,
};

pub(crate) trait AutoCommandBufferBuilderExt<L> {
  /// Records one full frame: the skybox, every scene draw call with its
  /// push constants, and the egui overlay subpass.
  #[allow(clippy::too_many_arguments)]
  fn record_scene_frame(
    &mut self,
    rcx: &RenderContext,
    image_index: u32,
    frame_set: &Arc<DescriptorSet>,
    sky_set: &Arc<DescriptorSet>,
    sky: &SkyBuffers,
    draw_calls: &[DrawCall],
    gui: &mut Option<Gui>,
  );
}

impl<L> AutoCommandBufferBuilderExt<L> for AutoCommandBufferBuilder<L> {
  #[allow(clippy::too_many_arguments)]
  fn record_scene_frame(
    &mut self,
    rcx: &RenderContext,
    image_index: u32,
    frame_set: &Arc<DescriptorSet>,
    sky_set: &Arc<DescriptorSet>,
    sky: &SkyBuffers,
    draw_calls: &[DrawCall],
    gui: &mut Option<Gui>,
  ) {
    self
      .begin_render_pass(
        RenderPassBeginInfo {
          clear_values: vec![
            Some([0.0, 0.0, 0.0, 1.0].into()), // color clear value
            Some(1.0.into()),                  // depth clear value
          ],
          ..RenderPassBeginInfo::framebuffer(rcx.framebuffers[image_index as usize].clone())
        },
        SubpassBeginInfo {
          contents: SubpassContents::Inline,
          ..Default::default()
        },
      )
      .unwrap();

    // The sky runs without depth test or writes, so it must come first and
    // let the scene draw over it.
    self
      .bind_pipeline_graphics(rcx.sky_pipeline.clone())
      .unwrap()
      .bind_descriptor_sets(
        PipelineBindPoint::Graphics,
        rcx.sky_pipeline.layout().clone(),
        0,
        sky_set.clone(),
      )
      .unwrap()
      .bind_vertex_buffers(0, sky.positions.clone())
      .unwrap()
      .bind_index_buffer(sky.indices.clone())
      .unwrap();

    unsafe { self.draw_indexed(sky.indices.len() as u32, 1, 0, 0, 0) }.unwrap();

    self
      .bind_pipeline_graphics(rcx.scene_pipeline.clone())
      .unwrap()
      .bind_descriptor_sets(
        PipelineBindPoint::Graphics,
        rcx.scene_pipeline.layout().clone(),
        0,
        (rcx.scene_material_set.clone(), frame_set.clone()),
      )
      .unwrap();

    for draw_call in draw_calls {
      self
        .push_constants(
          rcx.scene_pipeline.layout().clone(),
          0,
          scene_vs::PushConstants {
            model_matrix: draw_call.model_matrix.to_cols_array_2d(),
            material_index: draw_call.material_index,
          },
        )
        .unwrap()
        .bind_vertex_buffers(
          0,
          (
            draw_call.positions.clone(),
            draw_call.tex_coords.clone(),
            draw_call.normals.clone(),
            draw_call.tangents.clone(),
            draw_call.bitangents.clone(),
          ),
        )
        .unwrap()
        .bind_index_buffer(draw_call.indices.clone())
        .unwrap();

      unsafe { self.draw_indexed(draw_call.indices.len() as u32, 1, 0, 0, 0) }.unwrap();
    }

    // Move to the egui subpass
    self
      .next_subpass(
        SubpassEndInfo::default(),
        SubpassBeginInfo {
          contents: SubpassContents::SecondaryCommandBuffers,
          ..Default::default()
        },
      )
      .unwrap();

    if let Some(gui) = gui {
      let cb = gui.draw_on_subpass_image([
        rcx.swapchain.image_extent()[0],
        rcx.swapchain.image_extent()[1],
      ]);
      self.execute_commands(cb).unwrap();
    }

    self.end_render_pass(SubpassEndInfo::default()).unwrap();
  }
}
