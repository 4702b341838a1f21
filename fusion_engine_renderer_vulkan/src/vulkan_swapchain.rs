/// Swapchain - Vulkan implementation of the Swapchain trait
///
/// Out-of-date and suboptimal results are values, never errors: the frame
/// controller decides when to rebuild. A rebuild hands the previous
/// swapchain to the driver through `old_swapchain`.

use ash::vk;
use std::any::Any;
use std::sync::Arc;
use fusion_engine::fusion::{Error, Result};
use fusion_engine::fusion::device::{
    AcquireResult, Extent2D, PresentMode, PresentResult, Semaphore, Swapchain, TextureFormat,
};
use fusion_engine::{engine_bail, engine_debug, engine_error, engine_warn};

use crate::vulkan_context::{vk_error, DeviceContext, SOURCE};
use crate::vulkan_format::{choose_extent, choose_image_count, choose_present_mode, choose_surface_format, vk_to_format};
use crate::vulkan_surface::{SurfaceHandle, VulkanSurface};
use crate::vulkan_sync::semaphore_handle;

/// Vulkan swapchain implementation
pub struct VulkanSwapchain {
    ctx: Arc<DeviceContext>,
    /// The surface must outlive the swapchain
    _surface: Arc<SurfaceHandle>,
    pub(crate) swapchain: vk::SwapchainKHR,
    pub(crate) images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    vk_format: vk::Format,
    format: TextureFormat,
    extent: Extent2D,
    active_image: u32,
}

impl VulkanSwapchain {
    /// Create a swapchain on `surface`
    ///
    /// # Arguments
    ///
    /// * `extent` - Desired size when the surface leaves it to the swapchain
    /// * `old` - Swapchain being replaced
    /// * `present_mode` - Requested mode, FIFO when unsupported
    pub(crate) fn new(
        ctx: Arc<DeviceContext>,
        surface: &VulkanSurface,
        extent: Extent2D,
        old: Option<&VulkanSwapchain>,
        present_mode: PresentMode,
    ) -> Result<Self> {
        let surface_handle = Arc::clone(&surface.handle);
        let vk_surface = surface_handle.surface;

        unsafe {
            let capabilities = ctx
                .surface_loader
                .get_physical_device_surface_capabilities(ctx.physical_device, vk_surface)
                .map_err(|e| vk_error(e, "Failed to get surface capabilities"))?;
            let formats = ctx
                .surface_loader
                .get_physical_device_surface_formats(ctx.physical_device, vk_surface)
                .map_err(|e| vk_error(e, "Failed to get surface formats"))?;
            let present_modes = ctx
                .surface_loader
                .get_physical_device_surface_present_modes(ctx.physical_device, vk_surface)
                .map_err(|e| vk_error(e, "Failed to get surface present modes"))?;

            let Some(surface_format) = choose_surface_format(&formats) else {
                engine_bail!(SOURCE, "Surface reports no formats");
            };
            let Some(format) = vk_to_format(surface_format.format) else {
                engine_bail!(SOURCE, "Unsupported surface format {:?}", surface_format.format);
            };
            let vk_extent = choose_extent(&capabilities, vk::Extent2D { width: extent.width, height: extent.height });
            let mode = choose_present_mode(present_mode, &present_modes);
            if present_mode != PresentMode::Fifo && mode == vk::PresentModeKHR::FIFO {
                engine_warn!(SOURCE, "Present mode {:?} not supported, using FIFO", present_mode);
            }

            let create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(vk_surface)
                .min_image_count(choose_image_count(&capabilities))
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(vk_extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(mode)
                .clipped(true)
                .old_swapchain(old.map_or(vk::SwapchainKHR::null(), |old| old.swapchain));

            let swapchain = ctx
                .swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| vk_error(e, "Failed to create swapchain"))?;

            // From here on, Drop cleans up whatever was created
            let mut this = Self {
                ctx,
                _surface: surface_handle,
                swapchain,
                images: Vec::new(),
                image_views: Vec::new(),
                vk_format: surface_format.format,
                format,
                extent: Extent2D::new(vk_extent.width, vk_extent.height),
                active_image: 0,
            };

            this.images = this
                .ctx
                .swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| vk_error(e, "Failed to get swapchain images"))?;

            for &image in &this.images {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(this.vk_format)
                    .components(vk::ComponentMapping {
                        r: vk::ComponentSwizzle::IDENTITY,
                        g: vk::ComponentSwizzle::IDENTITY,
                        b: vk::ComponentSwizzle::IDENTITY,
                        a: vk::ComponentSwizzle::IDENTITY,
                    })
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });
                let view = this
                    .ctx
                    .device
                    .create_image_view(&view_info, None)
                    .map_err(|e| vk_error(e, "Failed to create swapchain image view"))?;
                this.image_views.push(view);
            }

            engine_debug!(
                SOURCE,
                "Swapchain created: {}x{}, {} images, {:?}, {:?}",
                this.extent.width,
                this.extent.height,
                this.images.len(),
                format,
                mode
            );
            Ok(this)
        }
    }

    /// View of image `index`, for framebuffers
    pub(crate) fn image_view(&self, index: u32) -> Result<vk::ImageView> {
        match self.image_views.get(index as usize) {
            Some(&view) => Ok(view),
            None => {
                engine_error!(SOURCE, "Swapchain image {} out of range (count: {})", index, self.image_views.len());
                Err(Error::InvalidResource(format!("Swapchain image {} out of range", index)))
            }
        }
    }

    pub(crate) fn image(&self, index: u32) -> Result<vk::Image> {
        self.images
            .get(index as usize)
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!("Swapchain image {} out of range", index)))
    }
}

impl Swapchain for VulkanSwapchain {
    fn acquire_next_image(&mut self, signal: &dyn Semaphore, timeout_ns: u64) -> Result<AcquireResult> {
        let semaphore = semaphore_handle(signal)?;
        let result = unsafe {
            self.ctx
                .swapchain_loader
                .acquire_next_image(self.swapchain, timeout_ns, semaphore, vk::Fence::null())
        };
        match result {
            Ok((index, false)) => {
                self.active_image = index;
                Ok(AcquireResult::Acquired(index))
            }
            Ok((index, true)) => {
                self.active_image = index;
                Ok(AcquireResult::Suboptimal(index))
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireResult::OutOfDate),
            Err(e) => Err(vk_error(e, "Failed to acquire next swapchain image")),
        }
    }

    fn present(&mut self, image_index: u32, wait: &dyn Semaphore) -> Result<PresentResult> {
        let wait_semaphores = [semaphore_handle(wait)?];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let queue = self.ctx.queue()?;
        match unsafe { self.ctx.swapchain_loader.queue_present(*queue, &present_info) } {
            Ok(false) => Ok(PresentResult::Presented),
            Ok(true) => Ok(PresentResult::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentResult::OutOfDate),
            Err(e) => Err(vk_error(e, "Failed to present swapchain image")),
        }
    }

    fn active_image_index(&self) -> u32 {
        self.active_image
    }

    fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        // Images may still be read by the presentation engine
        if let Err(e) = self.ctx.wait_idle() {
            engine_warn!(SOURCE, "wait_idle failed before destroying swapchain: {}", e);
        }
        unsafe {
            for &view in &self.image_views {
                self.ctx.device.destroy_image_view(view, None);
            }
            self.ctx.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}
