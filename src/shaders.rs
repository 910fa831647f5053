//! GLSL shader compilation and loading.
//!
//! This module provides compile-time shader loading using the vulkano_shaders macro.
//! The shaders are compiled from GLSL source files during build time.

/// Scene vertex shader module.
///
/// Streams position, texture coordinate, normal, tangent, and bitangent
/// attributes and transforms them into view space for the lighting pass.
pub mod scene_vs {
  vulkano_shaders::shader! {
    ty: "vertex",
    path: "src/shaders/scene.vert.glsl",
  }
}

/// Scene fragment shader module.
///
/// Evaluates Blinn-Phong lighting (ambient, directional, point, and spot
/// lights) with optional tangent-space normal mapping per material.
pub mod scene_fs {
  vulkano_shaders::shader! {
    ty: "fragment",
    path: "src/shaders/scene.frag.glsl",
  }
}

/// Skybox vertex shader module.
pub mod sky_vs {
  vulkano_shaders::shader! {
    ty: "vertex",
    path: "src/shaders/sky.vert.glsl",
  }
}

/// Skybox fragment shader module.
pub mod sky_fs {
  vulkano_shaders::shader! {
    ty: "fragment",
    path: "src/shaders/sky.frag.glsl",
  }
}
