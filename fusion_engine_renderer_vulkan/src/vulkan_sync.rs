/// Fence and Semaphore - Vulkan implementations of the sync traits

use ash::vk;
use std::any::Any;
use std::sync::Arc;
use fusion_engine::fusion::{Error, Result};
use fusion_engine::fusion::device::{Fence, Semaphore};

use crate::vulkan_context::{vk_error, DeviceContext};

/// Vulkan fence
pub struct VulkanFence {
    ctx: Arc<DeviceContext>,
    pub(crate) fence: vk::Fence,
}

impl VulkanFence {
    pub(crate) fn new(ctx: Arc<DeviceContext>, signaled: bool) -> Result<Self> {
        let flags = if signaled { vk::FenceCreateFlags::SIGNALED } else { vk::FenceCreateFlags::empty() };
        let info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe { ctx.device.create_fence(&info, None) }
            .map_err(|e| vk_error(e, "Failed to create fence"))?;
        Ok(Self { ctx, fence })
    }
}

impl Fence for VulkanFence {
    fn wait(&self, timeout_ns: u64) -> Result<bool> {
        match unsafe { self.ctx.device.wait_for_fences(&[self.fence], true, timeout_ns) } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(e) => Err(vk_error(e, "Failed to wait for fence")),
        }
    }

    fn reset(&self) -> Result<()> {
        unsafe { self.ctx.device.reset_fences(&[self.fence]) }.map_err(|e| vk_error(e, "Failed to reset fence"))
    }

    fn is_signaled(&self) -> Result<bool> {
        unsafe { self.ctx.device.get_fence_status(self.fence) }.map_err(|e| vk_error(e, "Failed to query fence status"))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_fence(self.fence, None);
        }
    }
}

/// Vulkan binary semaphore
pub struct VulkanSemaphore {
    ctx: Arc<DeviceContext>,
    pub(crate) semaphore: vk::Semaphore,
}

impl VulkanSemaphore {
    pub(crate) fn new(ctx: Arc<DeviceContext>) -> Result<Self> {
        let semaphore = unsafe { ctx.device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None) }
            .map_err(|e| vk_error(e, "Failed to create semaphore"))?;
        Ok(Self { ctx, semaphore })
    }
}

impl Semaphore for VulkanSemaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanSemaphore {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Raw handle of an engine semaphore
pub(crate) fn semaphore_handle(semaphore: &dyn Semaphore) -> Result<vk::Semaphore> {
    semaphore
        .as_any()
        .downcast_ref::<VulkanSemaphore>()
        .map(|s| s.semaphore)
        .ok_or_else(|| Error::InvalidResource("Semaphore was not created by the Vulkan device".to_string()))
}

/// Raw handle of an engine fence
pub(crate) fn fence_handle(fence: &dyn Fence) -> Result<vk::Fence> {
    fence
        .as_any()
        .downcast_ref::<VulkanFence>()
        .map(|f| f.fence)
        .ok_or_else(|| Error::InvalidResource("Fence was not created by the Vulkan device".to_string()))
}
