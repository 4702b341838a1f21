/// Texture - Vulkan implementation of the Texture trait (render stage attachments)

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::{AllocationError, MemoryLocation};
use std::any::Any;
use std::sync::Arc;
use fusion_engine::fusion::{Error, Result};
use fusion_engine::fusion::device::{AttachmentTextureDesc, SampleCount, Texture, TextureInfo, TextureUsage};
use fusion_engine::{engine_bail, engine_error, engine_warn};

use crate::vulkan_context::{vk_error, DeviceContext, SOURCE};
use crate::vulkan_format::{aspect_mask, format_to_vk, sample_count_to_vk};

/// Vulkan texture implementation
pub struct VulkanTexture {
    ctx: Arc<DeviceContext>,
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    allocation: Option<Allocation>,
    info: TextureInfo,
}

/// Log an allocator failure and turn it into an engine error
pub(crate) fn allocation_error(e: AllocationError, what: &str) -> Error {
    engine_error!(SOURCE, "{}: {}", what, e);
    match e {
        AllocationError::OutOfMemory => Error::OutOfMemory,
        other => Error::BackendError(format!("{}: {}", what, other)),
    }
}

/// Image usage of an attachment
///
/// Single-sampled attachments can be read by later subpasses (input
/// attachment) or later stages (sampled).
fn image_usage(usage: TextureUsage, samples: SampleCount) -> vk::ImageUsageFlags {
    let attachment = match usage {
        TextureUsage::SampledAndRenderTarget => vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC,
        TextureUsage::DepthStencil => vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
    };
    if samples == SampleCount::S1 {
        attachment | vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::INPUT_ATTACHMENT
    } else {
        attachment
    }
}

impl VulkanTexture {
    pub(crate) fn new(ctx: Arc<DeviceContext>, desc: &AttachmentTextureDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            engine_bail!(SOURCE, "Attachment '{}' has an empty extent {}x{}", desc.name, desc.width, desc.height);
        }
        let format = format_to_vk(desc.format);
        if format == vk::Format::UNDEFINED {
            engine_bail!(SOURCE, "Attachment '{}' has no concrete format", desc.name);
        }

        unsafe {
            let image_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D { width: desc.width, height: desc.height, depth: 1 })
                .mip_levels(1)
                .array_layers(1)
                .samples(sample_count_to_vk(desc.samples))
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(image_usage(desc.usage, desc.samples))
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = ctx
                .device
                .create_image(&image_info, None)
                .map_err(|e| vk_error(e, "Failed to create attachment image"))?;

            // Drop releases partial state on failure
            let mut texture = Self {
                ctx,
                image,
                view: vk::ImageView::null(),
                allocation: None,
                info: TextureInfo {
                    width: desc.width,
                    height: desc.height,
                    format: desc.format,
                    usage: desc.usage,
                    samples: desc.samples,
                },
            };

            let requirements = texture.ctx.device.get_image_memory_requirements(image);
            let allocation = texture
                .ctx
                .allocator()?
                .allocate(&AllocationCreateDesc {
                    name: &desc.name,
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| allocation_error(e, "Failed to allocate attachment memory"))?;
            let (memory, offset) = (allocation.memory(), allocation.offset());
            texture.allocation = Some(allocation);

            texture
                .ctx
                .device
                .bind_image_memory(image, memory, offset)
                .map_err(|e| vk_error(e, "Failed to bind attachment memory"))?;

            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: aspect_mask(desc.format),
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            texture.view = texture
                .ctx
                .device
                .create_image_view(&view_info, None)
                .map_err(|e| vk_error(e, "Failed to create attachment image view"))?;

            Ok(texture)
        }
    }
}

impl Texture for VulkanTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanTexture {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.ctx.device.destroy_image_view(self.view, None);
            }

            if let Some(allocation) = self.allocation.take() {
                match self.ctx.allocator() {
                    Ok(mut allocator) => {
                        if let Err(e) = allocator.free(allocation) {
                            engine_warn!(SOURCE, "Failed to free attachment memory: {}", e);
                        }
                    }
                    Err(e) => engine_warn!(SOURCE, "Leaking attachment memory: {}", e),
                }
            }

            self.ctx.device.destroy_image(self.image, None);
        }
    }
}
