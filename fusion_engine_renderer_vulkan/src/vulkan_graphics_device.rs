/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Owns nothing but an `Arc<DeviceContext>` and a few capabilities picked at
/// startup. Every object it creates shares the context, so the instance and
/// logical device live until the last GPU object is dropped.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc};
use gpu_allocator::MemoryLocation;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::CString;
use std::sync::Arc;
use fusion_engine::fusion::{Error, Result};
use fusion_engine::fusion::device::{
    AttachmentTextureDesc, CommandList, CommandPool, Config, DescriptorSetLayout, DescriptorSetLayoutDesc,
    Extent2D, Fence, Framebuffer, FramebufferDesc, GraphicsDevice, GraphicsPipelineDesc, ImageReadback, Pipeline,
    PipelineLayout, PipelineLayoutDesc, PresentMode, QueueType, RenderPass, RenderPassDesc, SampleCount, Sampler,
    SamplerDesc, Semaphore, SubmitInfo, Surface, SurfaceTarget, Swapchain, Texture, TextureFormat,
};
use fusion_engine::{engine_bail, engine_err, engine_error, engine_info, engine_warn};

use crate::debug::{severity_flags, vulkan_debug_callback};
use crate::vulkan_command_list::{VulkanCommandList, VulkanCommandPool};
use crate::vulkan_context::{init_error, vk_error, DebugMessenger, DeviceContext, SOURCE};
use crate::vulkan_descriptor_set::VulkanDescriptorSetLayout;
use crate::vulkan_format::{format_to_vk, max_sample_count};
use crate::vulkan_frame_buffer::VulkanFramebuffer;
use crate::vulkan_pipeline::{VulkanPipeline, VulkanPipelineLayout};
use crate::vulkan_render_pass::VulkanRenderPass;
use crate::vulkan_sampler::VulkanSampler;
use crate::vulkan_surface::VulkanSurface;
use crate::vulkan_swapchain::VulkanSwapchain;
use crate::vulkan_sync::{fence_handle, semaphore_handle, VulkanFence, VulkanSemaphore};
use crate::vulkan_texture::{allocation_error, VulkanTexture};

/// Depth formats in order of preference
const DEPTH_CANDIDATES: [TextureFormat; 3] = [
    TextureFormat::D32_FLOAT,
    TextureFormat::D32_FLOAT_S8_UINT,
    TextureFormat::D24_UNORM_S8_UINT,
];

/// Vulkan graphics device
pub struct VulkanGraphicsDevice {
    ctx: Arc<DeviceContext>,
    present_mode: PresentMode,
    msaa_samples: SampleCount,
    depth_format: Option<TextureFormat>,
}

/// Physical device and the queue family used for graphics and presentation
struct DeviceChoice {
    physical_device: vk::PhysicalDevice,
    queue_family: u32,
    name: String,
}

impl VulkanGraphicsDevice {
    /// Create a new Vulkan graphics device
    ///
    /// # Arguments
    ///
    /// * `target` - A window the device must be able to present to
    /// * `config` - Graphics configuration
    pub fn new(target: &dyn SurfaceTarget, config: &Config) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                engine_error!(SOURCE, "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            let app_name = CString::new(config.app_name.as_str()).map_err(|e| {
                engine_error!(SOURCE, "Invalid application name '{}': {}", config.app_name, e);
                Error::InitializationFailed(format!("Invalid application name: {}", e))
            })?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Fusion")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = target.display_handle().map_err(|e| {
                engine_error!(SOURCE, "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| init_error(e, "Failed to get required extensions"))?
                .to_vec();
            if config.enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            let layer_names = if config.enable_validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_error(e, "Failed to create Vulkan instance"))?;

            let debug = if config.enable_validation {
                let loader = ash::ext::debug_utils::Instance::new(&entry, &instance);
                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(severity_flags(config.debug_severity))
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                    )
                    .pfn_user_callback(Some(vulkan_debug_callback));
                match loader.create_debug_utils_messenger(&debug_info, None) {
                    Ok(messenger) => Some(DebugMessenger { loader, messenger }),
                    Err(e) => {
                        instance.destroy_instance(None);
                        return Err(init_error(e, "Failed to create debug messenger"));
                    }
                }
            } else {
                None
            };

            // Everything below is torn down by DeviceContext once it exists;
            // until then failures release the instance by hand.
            let release_instance = |debug: Option<DebugMessenger>| {
                if let Some(debug) = debug {
                    debug.loader.destroy_debug_utils_messenger(debug.messenger, None);
                }
                instance.destroy_instance(None);
            };

            let choice = match Self::pick_physical_device(&entry, &instance, target) {
                Ok(choice) => choice,
                Err(e) => {
                    release_instance(debug);
                    return Err(e);
                }
            };
            engine_info!(SOURCE, "Using GPU '{}' (queue family {})", choice.name, choice.queue_family);

            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(choice.queue_family)
                .queue_priorities(&queue_priorities)];
            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
            let supported_features = instance.get_physical_device_features(choice.physical_device);
            let device_features = vk::PhysicalDeviceFeatures::default()
                .sampler_anisotropy(supported_features.sampler_anisotropy == vk::TRUE);
            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);

            let device = match instance.create_device(choice.physical_device, &device_create_info, None) {
                Ok(device) => device,
                Err(e) => {
                    release_instance(debug);
                    return Err(init_error(e, "Failed to create logical device"));
                }
            };

            let release_device = |debug: Option<DebugMessenger>| {
                device.destroy_device(None);
                release_instance(debug);
            };

            let allocator = match Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device: choice.physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            }) {
                Ok(allocator) => allocator,
                Err(e) => {
                    engine_error!(SOURCE, "Failed to create GPU allocator: {}", e);
                    release_device(debug);
                    return Err(Error::InitializationFailed(format!("Failed to create allocator: {}", e)));
                }
            };

            let pipeline_cache = match device.create_pipeline_cache(&vk::PipelineCacheCreateInfo::default(), None) {
                Ok(cache) => cache,
                Err(e) => {
                    drop(allocator);
                    release_device(debug);
                    return Err(init_error(e, "Failed to create pipeline cache"));
                }
            };

            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(choice.queue_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let transient_pool = match device.create_command_pool(&pool_info, None) {
                Ok(pool) => pool,
                Err(e) => {
                    device.destroy_pipeline_cache(pipeline_cache, None);
                    drop(allocator);
                    release_device(debug);
                    return Err(init_error(e, "Failed to create transient command pool"));
                }
            };

            let properties = instance.get_physical_device_properties(choice.physical_device);
            let supported_samples = properties.limits.framebuffer_color_sample_counts
                & properties.limits.framebuffer_depth_sample_counts;
            let msaa_samples = max_sample_count(supported_samples, config.max_msaa_samples);

            let depth_format = DEPTH_CANDIDATES.into_iter().find(|&format| {
                let props = instance.get_physical_device_format_properties(choice.physical_device, format_to_vk(format));
                props
                    .optimal_tiling_features
                    .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
            });
            if depth_format.is_none() {
                engine_warn!(SOURCE, "No supported depth attachment format");
            }

            let ctx = Arc::new(DeviceContext::new(
                entry,
                instance,
                choice.physical_device,
                device,
                allocator,
                choice.queue_family,
                pipeline_cache,
                transient_pool,
                debug,
            ));

            engine_info!(
                SOURCE,
                "Vulkan device ready (msaa {:?}, depth {:?}, present {:?})",
                msaa_samples,
                depth_format,
                config.present_mode
            );

            Ok(Self { ctx, present_mode: config.present_mode, msaa_samples, depth_format })
        }
    }

    /// Pick a GPU with a queue family that can both draw and present to `target`
    ///
    /// Discrete GPUs win over integrated ones.
    unsafe fn pick_physical_device(
        entry: &ash::Entry,
        instance: &ash::Instance,
        target: &dyn SurfaceTarget,
    ) -> Result<DeviceChoice> {
        let display_handle = target.display_handle().map_err(|e| {
            engine_error!(SOURCE, "Failed to get display handle: {}", e);
            Error::InitializationFailed(format!("Failed to get display handle: {}", e))
        })?;
        let window_handle = target.window_handle().map_err(|e| {
            engine_error!(SOURCE, "Failed to get window handle: {}", e);
            Error::InitializationFailed(format!("Failed to get window handle: {}", e))
        })?;

        // Temporary surface, only used for the present support query
        let surface =
            ash_window::create_surface(entry, instance, display_handle.as_raw(), window_handle.as_raw(), None)
                .map_err(|e| init_error(e, "Failed to create surface"))?;
        let surface_loader = ash::khr::surface::Instance::new(entry, instance);

        let result = instance
            .enumerate_physical_devices()
            .map_err(|e| init_error(e, "Failed to enumerate physical devices"))
            .map(|devices| {
                let mut best: Option<(DeviceChoice, bool)> = None;
                for physical_device in devices {
                    let families = instance.get_physical_device_queue_family_properties(physical_device);
                    let queue_family = (0..families.len() as u32).find(|&index| {
                        families[index as usize].queue_flags.contains(vk::QueueFlags::GRAPHICS)
                            && surface_loader
                                .get_physical_device_surface_support(physical_device, index, surface)
                                .unwrap_or(false)
                    });
                    let Some(queue_family) = queue_family else {
                        continue;
                    };

                    let properties = instance.get_physical_device_properties(physical_device);
                    let name = properties
                        .device_name_as_c_str()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|_| "unknown".to_string());
                    let discrete = properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU;

                    if best.as_ref().map_or(true, |(_, best_discrete)| discrete && !best_discrete) {
                        best = Some((DeviceChoice { physical_device, queue_family, name }, discrete));
                    }
                }
                best.map(|(choice, _)| choice)
            });

        surface_loader.destroy_surface(surface, None);

        result?.ok_or_else(|| {
            engine_error!(SOURCE, "No Vulkan GPU can draw to and present on this window");
            Error::InitializationFailed("No suitable Vulkan GPU found".to_string())
        })
    }
}

/// Host-visible buffer receiving an image copy
struct StagingBuffer<'a> {
    ctx: &'a DeviceContext,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
}

impl<'a> StagingBuffer<'a> {
    fn new(ctx: &'a DeviceContext, size: u64) -> Result<Self> {
        let create_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(vk::BufferUsageFlags::TRANSFER_DST)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer = unsafe { ctx.device.create_buffer(&create_info, None) }
            .map_err(|e| vk_error(e, "Failed to create readback buffer"))?;
        let mut staging = Self { ctx, buffer, allocation: None };

        let requirements = unsafe { ctx.device.get_buffer_memory_requirements(buffer) };
        let allocation = ctx
            .allocator()?
            .allocate(&AllocationCreateDesc {
                name: "swapchain_readback",
                requirements,
                location: MemoryLocation::GpuToCpu,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| allocation_error(e, "Failed to allocate readback memory"))?;
        let (memory, offset) = (unsafe { allocation.memory() }, allocation.offset());
        staging.allocation = Some(allocation);

        unsafe { ctx.device.bind_buffer_memory(buffer, memory, offset) }
            .map_err(|e| vk_error(e, "Failed to bind readback memory"))?;
        Ok(staging)
    }

    fn bytes(&self) -> Result<&[u8]> {
        self.allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_slice())
            .ok_or_else(|| engine_err!(SOURCE, "Readback buffer is not host mapped"))
    }
}

impl Drop for StagingBuffer<'_> {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            match self.ctx.allocator() {
                Ok(mut allocator) => {
                    if let Err(e) = allocator.free(allocation) {
                        engine_warn!(SOURCE, "Failed to free readback memory: {}", e);
                    }
                }
                Err(e) => engine_warn!(SOURCE, "Leaking readback memory: {}", e),
            }
        }
        unsafe {
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}

fn command_buffer_of(command_list: &dyn CommandList) -> Result<vk::CommandBuffer> {
    if command_list.is_recording() {
        engine_bail!(SOURCE, "Command list submitted while still recording");
    }
    command_list
        .as_any()
        .downcast_ref::<VulkanCommandList>()
        .map(|list| list.command_buffer())
        .ok_or_else(|| Error::InvalidResource("Command list was not created by the Vulkan device".to_string()))
}

fn color_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

impl VulkanGraphicsDevice {
    /// Record and run a one-shot copy on the transient pool, blocking until done
    fn run_transient(&self, record: impl FnOnce(vk::CommandBuffer)) -> Result<()> {
        let ctx = &self.ctx;
        let pool = ctx
            .transient_pool
            .lock()
            .map_err(|_| Error::BackendError("Transient pool mutex poisoned".to_string()))?;

        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let command_buffer = unsafe { ctx.device.allocate_command_buffers(&allocate_info) }
            .map_err(|e| vk_error(e, "Failed to allocate transient command buffer"))?
            .first()
            .copied()
            .ok_or_else(|| engine_err!(SOURCE, "Driver returned no command buffer"))?;

        let result = (|| -> Result<()> {
            unsafe {
                let begin_info =
                    vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
                ctx.device
                    .begin_command_buffer(command_buffer, &begin_info)
                    .map_err(|e| vk_error(e, "Failed to begin transient command buffer"))?;
                record(command_buffer);
                ctx.device
                    .end_command_buffer(command_buffer)
                    .map_err(|e| vk_error(e, "Failed to end transient command buffer"))?;
            }

            let fence = VulkanFence::new(Arc::clone(ctx), false)?;
            let command_buffers = [command_buffer];
            let submit = vk::SubmitInfo::default().command_buffers(&command_buffers);
            {
                let queue = ctx.queue()?;
                unsafe { ctx.device.queue_submit(*queue, &[submit], fence.fence) }
                    .map_err(|e| vk_error(e, "Failed to submit transient command buffer"))?;
            }
            unsafe { ctx.device.wait_for_fences(&[fence.fence], true, u64::MAX) }
                .map_err(|e| vk_error(e, "Failed to wait for transient command buffer"))
        })();

        unsafe {
            ctx.device.free_command_buffers(*pool, &[command_buffer]);
        }
        result
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_surface(&self, target: &dyn SurfaceTarget) -> Result<Box<dyn Surface>> {
        Ok(Box::new(VulkanSurface::new(Arc::clone(&self.ctx), target)?))
    }

    fn create_swapchain(
        &self,
        surface: &dyn Surface,
        extent: Extent2D,
        old: Option<&dyn Swapchain>,
    ) -> Result<Box<dyn Swapchain>> {
        let surface = surface
            .as_any()
            .downcast_ref::<VulkanSurface>()
            .ok_or_else(|| Error::InvalidResource("Surface was not created by the Vulkan device".to_string()))?;
        let old = old
            .map(|old| {
                old.as_any()
                    .downcast_ref::<VulkanSwapchain>()
                    .ok_or_else(|| Error::InvalidResource("Swapchain was not created by the Vulkan device".to_string()))
            })
            .transpose()?;
        Ok(Box::new(VulkanSwapchain::new(Arc::clone(&self.ctx), surface, extent, old, self.present_mode)?))
    }

    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>> {
        Ok(Arc::new(VulkanSemaphore::new(Arc::clone(&self.ctx))?))
    }

    fn create_fence(&self, signaled: bool) -> Result<Arc<dyn Fence>> {
        Ok(Arc::new(VulkanFence::new(Arc::clone(&self.ctx), signaled)?))
    }

    fn create_command_pool(&self, queue: QueueType) -> Result<Arc<dyn CommandPool>> {
        Ok(Arc::new(VulkanCommandPool::new(Arc::clone(&self.ctx), queue)?))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        Ok(Arc::new(VulkanRenderPass::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc<'_>) -> Result<Arc<dyn Framebuffer>> {
        Ok(Arc::new(VulkanFramebuffer::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_attachment_texture(&self, desc: &AttachmentTextureDesc) -> Result<Arc<dyn Texture>> {
        Ok(Arc::new(VulkanTexture::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Arc<dyn Sampler>> {
        Ok(Arc::new(VulkanSampler::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_descriptor_set_layout(&self, desc: &DescriptorSetLayoutDesc) -> Result<Arc<dyn DescriptorSetLayout>> {
        Ok(Arc::new(VulkanDescriptorSetLayout::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_pipeline_layout(&self, desc: &PipelineLayoutDesc) -> Result<Arc<dyn PipelineLayout>> {
        Ok(Arc::new(VulkanPipelineLayout::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Result<Arc<dyn Pipeline>> {
        Ok(Arc::new(VulkanPipeline::new(Arc::clone(&self.ctx), desc)?))
    }

    fn submit(&self, command_list: &dyn CommandList, info: &SubmitInfo<'_>) -> Result<()> {
        let command_buffers = [command_buffer_of(command_list)?];
        let wait_semaphores = info.wait.map(semaphore_handle).transpose()?;
        let signal_semaphores = info.signal.map(semaphore_handle).transpose()?;
        let fence = info.fence.map(fence_handle).transpose()?.unwrap_or(vk::Fence::null());

        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let mut submit = vk::SubmitInfo::default().command_buffers(&command_buffers);
        if let Some(wait) = wait_semaphores.as_ref() {
            submit = submit
                .wait_semaphores(std::slice::from_ref(wait))
                .wait_dst_stage_mask(&wait_stages);
        }
        if let Some(signal) = signal_semaphores.as_ref() {
            submit = submit.signal_semaphores(std::slice::from_ref(signal));
        }

        let queue = self.ctx.queue()?;
        unsafe { self.ctx.device.queue_submit(*queue, &[submit], fence) }
            .map_err(|e| vk_error(e, "Failed to submit command list"))
    }

    fn submit_idle(&self, command_list: &dyn CommandList, queue: QueueType) -> Result<()> {
        let fence = VulkanFence::new(Arc::clone(&self.ctx), false)?;
        self.submit(command_list, &SubmitInfo { queue, wait: None, signal: None, fence: Some(&fence) })?;
        unsafe { self.ctx.device.wait_for_fences(&[fence.fence], true, u64::MAX) }
            .map_err(|e| vk_error(e, "Failed to wait for idle submission"))
    }

    fn wait_idle(&self) -> Result<()> {
        self.ctx.wait_idle()
    }

    fn depth_format(&self) -> Result<TextureFormat> {
        self.depth_format
            .ok_or_else(|| engine_err!(SOURCE, "The GPU supports none of the depth attachment formats"))
    }

    fn msaa_samples(&self) -> SampleCount {
        self.msaa_samples
    }

    fn read_swapchain_image(&self, swapchain: &dyn Swapchain, image_index: u32) -> Result<ImageReadback> {
        let vk_swapchain = swapchain
            .as_any()
            .downcast_ref::<VulkanSwapchain>()
            .ok_or_else(|| Error::InvalidResource("Swapchain was not created by the Vulkan device".to_string()))?;
        let image = vk_swapchain.image(image_index)?;
        let extent = swapchain.extent();
        let format = swapchain.format();
        if !matches!(
            format,
            TextureFormat::B8G8R8A8_SRGB
                | TextureFormat::B8G8R8A8_UNORM
                | TextureFormat::R8G8B8A8_SRGB
                | TextureFormat::R8G8B8A8_UNORM
        ) {
            engine_bail!(SOURCE, "Cannot read back swapchain format {:?}", format);
        }

        let size = extent.width as u64 * extent.height as u64 * 4;
        let staging = StagingBuffer::new(&self.ctx, size)?;
        let device = &self.ctx.device;

        self.run_transient(|command_buffer| unsafe {
            let to_transfer = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::PRESENT_SRC_KHR)
                .new_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(color_range())
                .src_access_mask(vk::AccessFlags::MEMORY_READ)
                .dst_access_mask(vk::AccessFlags::TRANSFER_READ);
            device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_transfer],
            );

            let region = vk::BufferImageCopy::default()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                .image_extent(vk::Extent3D { width: extent.width, height: extent.height, depth: 1 });
            device.cmd_copy_image_to_buffer(
                command_buffer,
                image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                staging.buffer,
                &[region],
            );

            let to_present = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
                .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(color_range())
                .src_access_mask(vk::AccessFlags::TRANSFER_READ)
                .dst_access_mask(vk::AccessFlags::MEMORY_READ);
            device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::BOTTOM_OF_PIPE,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_present],
            );
        })?;

        let bytes = staging.bytes()?;
        let pixels = bytes
            .get(..size as usize)
            .ok_or_else(|| engine_err!(SOURCE, "Readback buffer smaller than the image"))?
            .to_vec();

        Ok(ImageReadback { width: extent.width, height: extent.height, format, pixels })
    }
}
