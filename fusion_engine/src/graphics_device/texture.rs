/// Texture trait - GPU images used as render stage attachments

use std::any::Any;

/// Pixel formats understood by the render core
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// Inherit the surface (swapchain) format
    Undefined,

    // Color formats
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
    R16G16B16A16_SFLOAT,
    R32G32B32A32_SFLOAT,
    R8_UNORM,

    // Depth formats
    D16_UNORM,
    D32_FLOAT,
    D24_UNORM_S8_UINT,
    D32_FLOAT_S8_UINT,

    // Vertex attribute formats
    R32_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
}

impl TextureFormat {
    /// Whether this is a depth (or depth/stencil) format
    pub fn is_depth(self) -> bool {
        matches!(
            self,
            TextureFormat::D16_UNORM
                | TextureFormat::D32_FLOAT
                | TextureFormat::D24_UNORM_S8_UINT
                | TextureFormat::D32_FLOAT_S8_UINT
        )
    }

    /// Whether the format carries a stencil aspect
    pub fn has_stencil(self) -> bool {
        matches!(self, TextureFormat::D24_UNORM_S8_UINT | TextureFormat::D32_FLOAT_S8_UINT)
    }

    /// Whether the channels are stored blue-first
    pub fn is_bgra(self) -> bool {
        matches!(self, TextureFormat::B8G8R8A8_SRGB | TextureFormat::B8G8R8A8_UNORM)
    }
}

/// Multisample count of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum SampleCount {
    #[default]
    S1,
    S2,
    S4,
    S8,
    S16,
}

impl SampleCount {
    pub fn count(self) -> u32 {
        match self {
            SampleCount::S1 => 1,
            SampleCount::S2 => 2,
            SampleCount::S4 => 4,
            SampleCount::S8 => 8,
            SampleCount::S16 => 16,
        }
    }
}

/// Texture usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureUsage {
    /// Color attachment that can also be sampled by later passes
    SampledAndRenderTarget,
    /// Depth/stencil attachment (also sampleable)
    DepthStencil,
}

/// Read-only texture properties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub samples: SampleCount,
}

/// Descriptor for an attachment image owned by a render stage
#[derive(Debug, Clone)]
pub struct AttachmentTextureDesc {
    /// Debug name (attachment name)
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Concrete format (never `Undefined` at this point)
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub samples: SampleCount,
}

/// GPU texture
///
/// Backend objects release their image, view and memory on drop.
pub trait Texture: Send + Sync {
    /// Get texture properties
    fn info(&self) -> &TextureInfo;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}
