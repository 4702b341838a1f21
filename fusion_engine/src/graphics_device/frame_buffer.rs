/// Framebuffer trait - groups render stage attachments for a render pass
///
/// One framebuffer is built per swapchain image. Must be recreated only when
/// attachments change (e.g., window resize).

use std::any::Any;
use std::sync::Arc;
use crate::graphics_device::{RenderPass, Swapchain, Texture};

/// Framebuffer: the set of image views a render pass renders into
pub trait Framebuffer: Send + Sync {
    /// Get the width in pixels
    fn width(&self) -> u32;

    /// Get the height in pixels
    fn height(&self) -> u32;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}

/// One image view of a framebuffer
pub enum FramebufferAttachment<'a> {
    /// Image owned by the render stage (color or depth)
    Texture(&'a Arc<dyn Texture>),
    /// Presentable image `image_index` of a swapchain
    SwapchainImage {
        swapchain: &'a dyn Swapchain,
        image_index: u32,
    },
}

/// Descriptor for creating a framebuffer
pub struct FramebufferDesc<'a> {
    /// The render pass this framebuffer is compatible with
    pub render_pass: &'a Arc<dyn RenderPass>,
    /// Attachments in render pass binding order
    pub attachments: Vec<FramebufferAttachment<'a>>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}
