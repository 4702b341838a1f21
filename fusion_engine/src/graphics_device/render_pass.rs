/// RenderPass trait and the compiled description a backend turns into one
///
/// The description is fully resolved by the render core (formats, sample
/// counts, references, dependencies) so that backends only translate it.

use std::any::Any;
use bitflags::bitflags;
use crate::graphics_device::{SampleCount, TextureFormat};

/// Render pass
pub trait RenderPass: Send + Sync {
    /// Number of subpasses the pass was compiled with
    fn subpass_count(&self) -> u32;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}

/// Descriptor for creating a render pass
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDesc {
    /// Attachments, indexed by their binding
    pub attachments: Vec<AttachmentDesc>,
    /// Subpasses in declaration order
    pub subpasses: Vec<SubpassDesc>,
    /// Dependencies between subpasses (and the outside world)
    pub dependencies: Vec<SubpassDependency>,
}

/// Descriptor for a single attachment in a render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentDesc {
    /// Pixel format
    pub format: TextureFormat,
    /// Number of samples
    pub samples: SampleCount,
    /// Load operation (what to do with existing content)
    pub load_op: LoadOp,
    /// Store operation (what to do with rendered content)
    pub store_op: StoreOp,
    /// Initial layout (how the attachment starts)
    pub initial_layout: ImageLayout,
    /// Final layout (how the attachment ends)
    pub final_layout: ImageLayout,
}

/// Load operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

/// Store operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Store,
    DontCare,
}

/// Image layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    /// Undefined layout (initial state)
    Undefined,
    /// Layout for color attachment
    ColorAttachment,
    /// Layout for depth/stencil attachment
    DepthStencilAttachment,
    /// Layout for shader read-only access
    ShaderReadOnly,
    /// Layout for transfer source
    TransferSrc,
    /// Layout for transfer destination
    TransferDst,
    /// Layout for presenting to swapchain
    PresentSrc,
    /// Layout accepted by every operation
    General,
}

/// Reference from a subpass to an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentReference {
    /// Index into `RenderPassDesc::attachments`
    pub attachment: u32,
    /// Layout the attachment is in during the subpass
    pub layout: ImageLayout,
}

/// One subpass of a render pass
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubpassDesc {
    pub color_attachments: Vec<AttachmentReference>,
    /// Resolve targets, either empty or one entry per color attachment
    /// (`None` leaves that color attachment unresolved)
    pub resolve_attachments: Vec<Option<AttachmentReference>>,
    pub depth_attachment: Option<AttachmentReference>,
}

/// Subpass index used in a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubpassRef {
    /// Work outside the render pass
    External,
    Index(u32),
}

bitflags! {
    /// Pipeline stages, as used by subpass dependencies
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStageFlags: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const VERTEX_SHADER = 1 << 1;
        const FRAGMENT_SHADER = 1 << 2;
        const EARLY_FRAGMENT_TESTS = 1 << 3;
        const LATE_FRAGMENT_TESTS = 1 << 4;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 5;
        const TRANSFER = 1 << 6;
        const BOTTOM_OF_PIPE = 1 << 7;
    }
}

bitflags! {
    /// Memory access types, as used by subpass dependencies
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const SHADER_READ = 1 << 0;
        const COLOR_ATTACHMENT_READ = 1 << 1;
        const COLOR_ATTACHMENT_WRITE = 1 << 2;
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 3;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 4;
        const TRANSFER_READ = 1 << 5;
        const MEMORY_READ = 1 << 6;
        const MEMORY_WRITE = 1 << 7;
    }
}

/// Execution and memory dependency between two subpasses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubpassDependency {
    pub src_subpass: SubpassRef,
    pub dst_subpass: SubpassRef,
    pub src_stage: PipelineStageFlags,
    pub dst_stage: PipelineStageFlags,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    /// Framebuffer-local dependency
    pub by_region: bool,
}
