/// GraphicsDevice trait - backend factory and queue interface
///
/// Every method takes `&self`: the device is shared (`Arc<dyn GraphicsDevice>`)
/// between the frame thread, the object caches and worker threads. Backends
/// serialize queue access internally.
///
/// Objects returned by the device own their GPU handles and release them on
/// drop. They keep the device alive, so teardown order is enforced by
/// ownership rather than by call order.

use std::sync::Arc;
use std::time::Duration;
use crate::error::Result;
use crate::graphics_device::{
    AttachmentTextureDesc, CommandList, CommandPool, DescriptorSetLayout, DescriptorSetLayoutDesc,
    Extent2D, Fence, Framebuffer, FramebufferDesc, GraphicsPipelineDesc, Pipeline, PipelineLayout,
    PipelineLayoutDesc, QueueType, RenderPass, RenderPassDesc, SampleCount, Sampler, SamplerDesc,
    Semaphore, Surface, SurfaceTarget, Swapchain, Texture, TextureFormat,
};

// ============================================================================
// Configuration
// ============================================================================

/// Validation message verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    ErrorsOnly,
    ErrorsAndWarnings,
    All,
}

/// Presentation mode of the swapchains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentMode {
    /// Vsync, always supported
    Fifo,
    /// Vsync without blocking, falls back to Fifo
    Mailbox,
    /// No vsync, falls back to Fifo
    Immediate,
}

/// Graphics configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Validation message verbosity (only with `enable_validation`)
    pub debug_severity: DebugSeverity,
    /// Requested presentation mode
    pub present_mode: PresentMode,
    /// Upper bound for multisampled attachments
    pub max_msaa_samples: SampleCount,
    /// Command pools unused for longer than this are released
    pub command_pool_purge_interval: Duration,
    /// Timeout for in-flight fence waits
    pub fence_timeout_ns: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Fusion Application".to_string(),
            app_version: (1, 0, 0),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            present_mode: PresentMode::Fifo,
            max_msaa_samples: SampleCount::S8,
            command_pool_purge_interval: Duration::from_secs(5),
            fence_timeout_ns: u64::MAX,
        }
    }
}

// ============================================================================
// Submission
// ============================================================================

/// Synchronization of a queue submission
pub struct SubmitInfo<'a> {
    pub queue: QueueType,
    /// Semaphore waited on before color output
    pub wait: Option<&'a dyn Semaphore>,
    /// Semaphore signaled when execution completes
    pub signal: Option<&'a dyn Semaphore>,
    /// Fence signaled when execution completes
    pub fence: Option<&'a dyn Fence>,
}

/// CPU copy of a presentable image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReadback {
    pub width: u32,
    pub height: u32,
    /// Format of `pixels` (4 bytes per pixel, rows tightly packed)
    pub format: TextureFormat,
    pub pixels: Vec<u8>,
}

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// Backend device
///
/// Implemented by backend-specific devices (e.g., VulkanGraphicsDevice).
pub trait GraphicsDevice: Send + Sync {
    /// Create a presentation surface for a window
    fn create_surface(&self, target: &dyn SurfaceTarget) -> Result<Box<dyn Surface>>;

    /// Create a swapchain on `surface`
    ///
    /// # Arguments
    ///
    /// * `surface` - Surface to present to
    /// * `extent` - Desired size, used when the surface leaves it to the swapchain
    /// * `old` - Swapchain being replaced, its resources are handed over
    fn create_swapchain(
        &self,
        surface: &dyn Surface,
        extent: Extent2D,
        old: Option<&dyn Swapchain>,
    ) -> Result<Box<dyn Swapchain>>;

    /// Create a semaphore
    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>>;

    /// Create a fence, optionally already signaled
    fn create_fence(&self, signaled: bool) -> Result<Arc<dyn Fence>>;

    /// Create a command pool for the calling thread
    fn create_command_pool(&self, queue: QueueType) -> Result<Arc<dyn CommandPool>>;

    /// Compile a render pass
    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>>;

    /// Create a framebuffer
    fn create_framebuffer(&self, desc: &FramebufferDesc<'_>) -> Result<Arc<dyn Framebuffer>>;

    /// Create a color or depth attachment image
    fn create_attachment_texture(&self, desc: &AttachmentTextureDesc) -> Result<Arc<dyn Texture>>;

    /// Create a sampler (use `SamplerCache` instead of calling this directly)
    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Arc<dyn Sampler>>;

    /// Create a descriptor set layout (use `DescriptorLayoutCache`)
    fn create_descriptor_set_layout(&self, desc: &DescriptorSetLayoutDesc) -> Result<Arc<dyn DescriptorSetLayout>>;

    /// Create a pipeline layout (use `PipelineLayoutCache`)
    fn create_pipeline_layout(&self, desc: &PipelineLayoutDesc) -> Result<Arc<dyn PipelineLayout>>;

    /// Compile a graphics pipeline (use `PipelineCache`)
    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Result<Arc<dyn Pipeline>>;

    /// Submit a recorded command list
    fn submit(&self, command_list: &dyn CommandList, info: &SubmitInfo<'_>) -> Result<()>;

    /// Submit a recorded command list and block until the queue is idle
    fn submit_idle(&self, command_list: &dyn CommandList, queue: QueueType) -> Result<()>;

    /// Wait for all GPU operations to complete
    fn wait_idle(&self) -> Result<()>;

    /// Best supported depth attachment format
    fn depth_format(&self) -> Result<TextureFormat>;

    /// Sample count used for multisampled attachments
    fn msaa_samples(&self) -> SampleCount;

    /// Copy a presented swapchain image to CPU memory (blocking)
    fn read_swapchain_image(&self, swapchain: &dyn Swapchain, image_index: u32) -> Result<ImageReadback>;
}
