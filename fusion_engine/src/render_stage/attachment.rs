/// Attachment and subpass descriptions of a render stage
///
/// These are plain values: a `RenderStage` takes them once at construction
/// and never mutates them.

use crate::graphics_device::{ImageLayout, TextureFormat};

/// What an attachment renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentType {
    /// Color image owned by the stage, readable by later stages
    Image,
    /// Depth/stencil image owned by the stage
    Depth,
    /// The presentable image of the surface
    Swapchain,
}

/// One output of a render stage
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// Index of the attachment inside the render pass
    pub binding: u32,
    /// Name under which the attachment is published as a descriptor
    pub name: String,
    pub attachment_type: AttachmentType,
    /// Render with the device MSAA sample count
    pub multisampled: bool,
    /// Pixel format, `Undefined` inherits the surface format (Image only)
    pub format: TextureFormat,
    /// Layout the image is left in when the render pass ends (Image only)
    pub layout: ImageLayout,
    /// RGBA clear color (Image and Swapchain)
    pub clear_color: [f32; 4],
}

impl Attachment {
    /// Create an attachment with the default format, layout and clear color
    pub fn new(binding: u32, name: impl Into<String>, attachment_type: AttachmentType) -> Self {
        Self {
            binding,
            name: name.into(),
            attachment_type,
            multisampled: false,
            format: TextureFormat::R8G8B8A8_UNORM,
            layout: ImageLayout::ShaderReadOnly,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Color image attachment
    pub fn image(binding: u32, name: impl Into<String>) -> Self {
        Self::new(binding, name, AttachmentType::Image)
    }

    /// Depth attachment
    pub fn depth(binding: u32, name: impl Into<String>) -> Self {
        Self::new(binding, name, AttachmentType::Depth)
    }

    /// Swapchain attachment
    pub fn swapchain(binding: u32, name: impl Into<String>) -> Self {
        Self::new(binding, name, AttachmentType::Swapchain)
    }

    pub fn with_multisampled(mut self, multisampled: bool) -> Self {
        self.multisampled = multisampled;
        self
    }

    pub fn with_format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_layout(mut self, layout: ImageLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }
}

/// One subpass of a render stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubpassType {
    /// Subpass index
    pub binding: u32,
    /// Attachment bindings written by the subpass, in order
    pub attachment_bindings: Vec<u32>,
}

impl SubpassType {
    pub fn new(binding: u32, attachment_bindings: Vec<u32>) -> Self {
        Self { binding, attachment_bindings }
    }
}
