use std::sync::Arc;

use vulkano::{
  VulkanLibrary,
  buffer::{
    Buffer,
    BufferCreateInfo,
    BufferUsage,
    Subbuffer,
    allocator::{SubbufferAllocator, SubbufferAllocatorCreateInfo},
  },
  command_buffer::{
    AutoCommandBufferBuilder,
    CommandBufferUsage,
    CopyBufferToImageInfo,
    PrimaryCommandBufferAbstract,
    allocator::StandardCommandBufferAllocator,
  },
  descriptor_set::allocator::StandardDescriptorSetAllocator,
  device::{
    Device,
    DeviceCreateInfo,
    DeviceExtensions,
    Queue,
    QueueCreateInfo,
    QueueFlags,
    physical::PhysicalDeviceType,
  },
  format::Format,
  image::{
    Image,
    ImageCreateInfo,
    ImageType,
    ImageUsage,
    sampler::{Filter, Sampler, SamplerAddressMode, SamplerCreateInfo},
    view::ImageView,
  },
  instance::{Instance, InstanceCreateFlags, InstanceCreateInfo},
  memory::allocator::{AllocationCreateInfo, MemoryTypeFilter, StandardMemoryAllocator},
  swapchain::Surface,
  sync::GpuFuture,
};
use winit::event_loop::EventLoop;

use crate::{
  scene::{
    draw_call::DrawCall,
    light::LightsUbo,
    loader::{LoadedScene, SceneError, TextureSource},
    material::MaterialGpu,
    sky::SphereMesh,
  },
  render::vertex::{Bitangent, Normal, Position, Tangent, TexCoord},
};

pub struct InitializedVulkan {
  pub instance: Arc<Instance>,
  pub device: Arc<Device>,
  pub queue: Arc<Queue>,
  pub memory_allocator: Arc<StandardMemoryAllocator>,
  pub descriptor_set_allocator: Arc<StandardDescriptorSetAllocator>,
  pub command_buffer_allocator: Arc<StandardCommandBufferAllocator>,
  pub uniform_buffer_allocator: SubbufferAllocator,
  pub staging_buffer_allocator: SubbufferAllocator,
}

pub fn initialize_vulkan(event_loop: &EventLoop<()>) -> InitializedVulkan {
  let library = VulkanLibrary::new().unwrap();
  let required_extensions = Surface::required_extensions(event_loop).unwrap();
  let instance = Instance::new(
    library,
    InstanceCreateInfo {
      flags: InstanceCreateFlags::ENUMERATE_PORTABILITY,
      enabled_extensions: required_extensions,
      ..Default::default()
    },
  )
  .unwrap();

  let device_extensions = DeviceExtensions {
    khr_swapchain: true,
    ..DeviceExtensions::empty()
  };

  let (physical_device, queue_family_index) = instance
    .enumerate_physical_devices()
    .unwrap()
    .filter(|p| p.supported_extensions().contains(&device_extensions))
    .filter_map(|p| {
      p.queue_family_properties()
        .iter()
        .enumerate()
        .position(|(i, q)| {
          q.queue_flags.intersects(QueueFlags::GRAPHICS)
            && p.presentation_support(i as u32, event_loop).unwrap()
        })
        .map(|i| (p, i as u32))
    })
    .min_by_key(|(p, _)| match p.properties().device_type {
      PhysicalDeviceType::DiscreteGpu => 0,
      PhysicalDeviceType::IntegratedGpu => 1,
      PhysicalDeviceType::VirtualGpu => 2,
      PhysicalDeviceType::Cpu => 3,
      PhysicalDeviceType::Other => 4,
      _ => 5,
    })
    .unwrap();

  log::info!(
    "using device: {} (type: {:?})",
    physical_device.properties().device_name,
    physical_device.properties().device_type,
  );

  let (device, mut queues) = Device::new(
    physical_device,
    DeviceCreateInfo {
      enabled_extensions: device_extensions,
      queue_create_infos: vec![QueueCreateInfo {
        queue_family_index,
        ..Default::default()
      }],
      ..Default::default()
    },
  )
  .unwrap();

  let queue = queues.next().unwrap();

  let memory_allocator = Arc::new(StandardMemoryAllocator::new_default(device.clone()));
  let descriptor_set_allocator = Arc::new(StandardDescriptorSetAllocator::new(
    device.clone(),
    Default::default(),
  ));
  let command_buffer_allocator = Arc::new(StandardCommandBufferAllocator::new(
    device.clone(),
    Default::default(),
  ));

  let uniform_buffer_allocator = SubbufferAllocator::new(
    memory_allocator.clone(),
    SubbufferAllocatorCreateInfo {
      buffer_usage: BufferUsage::UNIFORM_BUFFER,
      memory_type_filter: MemoryTypeFilter::PREFER_DEVICE | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
      ..Default::default()
    },
  );

  // Staging allocator for the per-frame copy into the device-local lights
  // buffer.
  let staging_buffer_allocator = SubbufferAllocator::new(
    memory_allocator.clone(),
    SubbufferAllocatorCreateInfo {
      buffer_usage: BufferUsage::TRANSFER_SRC,
      memory_type_filter: MemoryTypeFilter::PREFER_HOST | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
      ..Default::default()
    },
  );

  InitializedVulkan {
    instance,
    device,
    queue,
    memory_allocator,
    descriptor_set_allocator,
    command_buffer_allocator,
    uniform_buffer_allocator,
    staging_buffer_allocator,
  }
}

/// The loaded scene in GPU memory.
pub struct SceneBuffers {
  pub draw_calls: Vec<DrawCall>,
  pub materials: Subbuffer<[MaterialGpu]>,
  pub textures: Vec<Arc<ImageView>>,
  /// 1x1 white image used to pad unused texture array slots.
  pub white_texture: Arc<ImageView>,
  pub sampler: Arc<Sampler>,
}

/// Skybox sphere geometry in GPU memory.
pub struct SkyBuffers {
  pub positions: Subbuffer<[Position]>,
  pub indices: Subbuffer<[u32]>,
}

/// Uploads a loaded scene: vertex/index buffers per mesh, the materials
/// storage buffer, and all referenced textures.
pub fn upload_scene(
  init: &InitializedVulkan,
  scene: &LoadedScene,
) -> Result<SceneBuffers, SceneError> {
  let draw_calls = scene
    .meshes
    .iter()
    .map(|mesh| DrawCall {
      model_matrix: mesh.model_matrix,
      material_index: mesh.material_index as i32,
      positions: vertex_buffer(
        init,
        mesh.positions.iter().map(|&position| Position { position }),
      ),
      tex_coords: vertex_buffer(
        init,
        mesh.tex_coords.iter().map(|&tex_coord| TexCoord { tex_coord }),
      ),
      normals: vertex_buffer(init, mesh.normals.iter().map(|&normal| Normal { normal })),
      tangents: vertex_buffer(init, mesh.tangents.iter().map(|&tangent| Tangent { tangent })),
      bitangents: vertex_buffer(
        init,
        mesh.bitangents.iter().map(|&bitangent| Bitangent { bitangent }),
      ),
      indices: index_buffer(init, mesh.indices.iter().copied()),
    })
    .collect();

  let materials = Buffer::from_iter(
    init.memory_allocator.clone(),
    BufferCreateInfo {
      usage: BufferUsage::STORAGE_BUFFER,
      ..Default::default()
    },
    AllocationCreateInfo {
      memory_type_filter: MemoryTypeFilter::PREFER_DEVICE | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
      ..Default::default()
    },
    scene.materials.iter().map(|material| material.to_gpu()),
  )
  .unwrap();

  // One command buffer uploads every texture, then we wait for the copies
  // before the first frame samples them.
  let mut uploads = AutoCommandBufferBuilder::primary(
    init.command_buffer_allocator.clone(),
    init.queue.queue_family_index(),
    CommandBufferUsage::OneTimeSubmit,
  )
  .unwrap();

  let textures = scene
    .textures
    .iter()
    .map(|source| load_texture(init, &mut uploads, source))
    .collect::<Result<Vec<_>, _>>()?;

  let white_texture = create_white_texture(init, &mut uploads);

  uploads
    .build()
    .unwrap()
    .execute(init.queue.clone())
    .unwrap()
    .then_signal_fence_and_flush()
    .unwrap()
    .wait(None)
    .unwrap();

  let sampler = Sampler::new(
    init.device.clone(),
    SamplerCreateInfo {
      mag_filter: Filter::Linear,
      min_filter: Filter::Linear,
      address_mode: [SamplerAddressMode::Repeat; 3],
      ..Default::default()
    },
  )
  .unwrap();

  Ok(SceneBuffers {
    draw_calls,
    materials,
    textures,
    white_texture,
    sampler,
  })
}

/// Uploads the skybox sphere.
pub fn upload_sky(init: &InitializedVulkan, mesh: &SphereMesh) -> SkyBuffers {
  SkyBuffers {
    positions: vertex_buffer(
      init,
      mesh.positions.iter().map(|&position| Position { position }),
    ),
    indices: index_buffer(init, mesh.indices.iter().copied()),
  }
}

/// Creates the device-local lights uniform buffer, refilled every frame via
/// a staging copy.
pub fn create_lights_buffer(init: &InitializedVulkan) -> Subbuffer<LightsUbo> {
  Buffer::new_sized(
    init.memory_allocator.clone(),
    BufferCreateInfo {
      usage: BufferUsage::UNIFORM_BUFFER | BufferUsage::TRANSFER_DST,
      ..Default::default()
    },
    AllocationCreateInfo {
      memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
      ..Default::default()
    },
  )
  .unwrap()
}

fn vertex_buffer<T, I>(init: &InitializedVulkan, data: I) -> Subbuffer<[T]>
where
  T: vulkano::buffer::BufferContents,
  I: IntoIterator<Item = T>,
  I::IntoIter: ExactSizeIterator,
{
  Buffer::from_iter(
    init.memory_allocator.clone(),
    BufferCreateInfo {
      usage: BufferUsage::VERTEX_BUFFER,
      ..Default::default()
    },
    AllocationCreateInfo {
      memory_type_filter: MemoryTypeFilter::PREFER_DEVICE | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
      ..Default::default()
    },
    data,
  )
  .unwrap()
}

fn index_buffer<I>(init: &InitializedVulkan, data: I) -> Subbuffer<[u32]>
where
  I: IntoIterator<Item = u32>,
  I::IntoIter: ExactSizeIterator,
{
  Buffer::from_iter(
    init.memory_allocator.clone(),
    BufferCreateInfo {
      usage: BufferUsage::INDEX_BUFFER,
      ..Default::default()
    },
    AllocationCreateInfo {
      memory_type_filter: MemoryTypeFilter::PREFER_DEVICE | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
      ..Default::default()
    },
    data,
  )
  .unwrap()
}

/// Loads one texture from disk and records its staging copy into `uploads`.
/// Color textures are stored as sRGB so sampling returns linear values;
/// normal and height maps hold vector data and stay UNORM.
fn load_texture(
  init: &InitializedVulkan,
  uploads: &mut AutoCommandBufferBuilder<
    vulkano::command_buffer::PrimaryAutoCommandBuffer,
  >,
  source: &TextureSource,
) -> Result<Arc<ImageView>, SceneError> {
  let data = image::open(&source.path)
    .map_err(|error| SceneError::Texture {
      path: source.path.clone(),
      source: error,
    })?
    .to_rgba8();
  let dimensions = data.dimensions();
  log::debug!(
    "texture {} ({}x{}, srgb: {})",
    source.path.display(),
    dimensions.0,
    dimensions.1,
    source.srgb
  );

  let format = if source.srgb {
    Format::R8G8B8A8_SRGB
  } else {
    Format::R8G8B8A8_UNORM
  };
  Ok(upload_rgba_image(init, uploads, format, dimensions, data.into_raw()))
}

fn create_white_texture(
  init: &InitializedVulkan,
  uploads: &mut AutoCommandBufferBuilder<
    vulkano::command_buffer::PrimaryAutoCommandBuffer,
  >,
) -> Arc<ImageView> {
  upload_rgba_image(init, uploads, Format::R8G8B8A8_UNORM, (1, 1), vec![255u8; 4])
}

fn upload_rgba_image(
  init: &InitializedVulkan,
  uploads: &mut AutoCommandBufferBuilder<
    vulkano::command_buffer::PrimaryAutoCommandBuffer,
  >,
  format: Format,
  dimensions: (u32, u32),
  pixels: Vec<u8>,
) -> Arc<ImageView> {
  let image = Image::new(
    init.memory_allocator.clone(),
    ImageCreateInfo {
      image_type: ImageType::Dim2d,
      format,
      extent: [dimensions.0, dimensions.1, 1],
      usage: ImageUsage::TRANSFER_DST | ImageUsage::SAMPLED,
      ..Default::default()
    },
    AllocationCreateInfo {
      memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
      ..Default::default()
    },
  )
  .unwrap();

  let staging_buffer = Buffer::from_iter(
    init.memory_allocator.clone(),
    BufferCreateInfo {
      usage: BufferUsage::TRANSFER_SRC,
      ..Default::default()
    },
    AllocationCreateInfo {
      memory_type_filter: MemoryTypeFilter::PREFER_HOST | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
      ..Default::default()
    },
    pixels,
  )
  .unwrap();

  uploads
    .copy_buffer_to_image(CopyBufferToImageInfo::buffer_image(
      staging_buffer,
      image.clone(),
    ))
    .unwrap();

  ImageView::new_default(image).unwrap()
}
