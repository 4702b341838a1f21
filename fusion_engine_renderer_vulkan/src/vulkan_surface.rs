/// Surface - Vulkan implementation of the Surface trait

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::any::Any;
use std::sync::Arc;
use fusion_engine::fusion::{Error, Result};
use fusion_engine::fusion::device::{Surface, SurfaceTarget};
use fusion_engine::engine_error;

use crate::vulkan_context::{vk_error, DeviceContext, SOURCE};

/// Owned VkSurfaceKHR, shared with the swapchains built on it
pub(crate) struct SurfaceHandle {
    pub(crate) ctx: Arc<DeviceContext>,
    pub(crate) surface: vk::SurfaceKHR,
}

impl Drop for SurfaceHandle {
    fn drop(&mut self) {
        unsafe {
            self.ctx.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

/// Vulkan surface
pub struct VulkanSurface {
    pub(crate) handle: Arc<SurfaceHandle>,
}

impl VulkanSurface {
    /// Create a surface for `target` and check the device can present to it
    pub(crate) fn new(ctx: Arc<DeviceContext>, target: &dyn SurfaceTarget) -> Result<Self> {
        let display_handle = target.display_handle().map_err(|e| {
            engine_error!(SOURCE, "Failed to get display handle: {}", e);
            Error::InvalidResource(format!("Failed to get display handle: {}", e))
        })?;
        let window_handle = target.window_handle().map_err(|e| {
            engine_error!(SOURCE, "Failed to get window handle: {}", e);
            Error::InvalidResource(format!("Failed to get window handle: {}", e))
        })?;

        let surface = unsafe {
            ash_window::create_surface(&ctx.entry, &ctx.instance, display_handle.as_raw(), window_handle.as_raw(), None)
        }
        .map_err(|e| vk_error(e, "Failed to create surface"))?;
        let handle = SurfaceHandle { ctx, surface };

        let supported = unsafe {
            handle.ctx.surface_loader.get_physical_device_surface_support(
                handle.ctx.physical_device,
                handle.ctx.queue_family,
                surface,
            )
        }
        .map_err(|e| vk_error(e, "Failed to query surface support"))?;
        if !supported {
            engine_error!(SOURCE, "Queue family {} cannot present to this surface", handle.ctx.queue_family);
            return Err(Error::InitializationFailed(
                "Graphics queue family cannot present to the surface".to_string(),
            ));
        }

        Ok(Self { handle: Arc::new(handle) })
    }
}

impl Surface for VulkanSurface {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
