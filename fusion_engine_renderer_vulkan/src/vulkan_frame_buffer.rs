/// Framebuffer - Vulkan implementation of the Framebuffer trait

use ash::vk;
use std::any::Any;
use std::sync::Arc;
use fusion_engine::fusion::{Error, Result};
use fusion_engine::fusion::device::{Framebuffer, FramebufferAttachment, FramebufferDesc};

use crate::vulkan_context::{vk_error, DeviceContext};
use crate::vulkan_render_pass::VulkanRenderPass;
use crate::vulkan_swapchain::VulkanSwapchain;
use crate::vulkan_texture::VulkanTexture;

/// Vulkan framebuffer
///
/// Holds image views it does not own: the render stage keeps its textures
/// and the swapchain alive for as long as the framebuffer exists.
pub struct VulkanFramebuffer {
    ctx: Arc<DeviceContext>,
    pub(crate) framebuffer: vk::Framebuffer,
    width: u32,
    height: u32,
}

fn attachment_view(attachment: &FramebufferAttachment<'_>) -> Result<vk::ImageView> {
    match attachment {
        FramebufferAttachment::Texture(texture) => texture
            .as_any()
            .downcast_ref::<VulkanTexture>()
            .map(|texture| texture.view)
            .ok_or_else(|| Error::InvalidResource("Texture was not created by the Vulkan device".to_string())),
        FramebufferAttachment::SwapchainImage { swapchain, image_index } => swapchain
            .as_any()
            .downcast_ref::<VulkanSwapchain>()
            .ok_or_else(|| Error::InvalidResource("Swapchain was not created by the Vulkan device".to_string()))?
            .image_view(*image_index),
    }
}

impl VulkanFramebuffer {
    pub(crate) fn new(ctx: Arc<DeviceContext>, desc: &FramebufferDesc<'_>) -> Result<Self> {
        let render_pass = desc
            .render_pass
            .as_any()
            .downcast_ref::<VulkanRenderPass>()
            .ok_or_else(|| Error::InvalidResource("Render pass was not created by the Vulkan device".to_string()))?;

        let views = desc.attachments.iter().map(attachment_view).collect::<Result<Vec<_>>>()?;

        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass.render_pass)
            .attachments(&views)
            .width(desc.width)
            .height(desc.height)
            .layers(1);

        let framebuffer = unsafe { ctx.device.create_framebuffer(&create_info, None) }
            .map_err(|e| vk_error(e, "Failed to create framebuffer"))?;

        Ok(Self { ctx, framebuffer, width: desc.width, height: desc.height })
    }
}

impl Framebuffer for VulkanFramebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanFramebuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}
