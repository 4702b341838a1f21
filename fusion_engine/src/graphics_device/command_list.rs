/// CommandList and CommandPool traits - for recording rendering commands

use std::any::Any;
use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{Framebuffer, Pipeline, PipelineLayout, RenderPass, ShaderStageFlags};

/// Queue a command buffer is submitted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    /// Frame recording and presentation
    Graphics,
    /// Dedicated compute queue (falls back to graphics)
    Compute,
    /// Dedicated transfer queue (falls back to graphics)
    Transfer,
}

/// Command pool owned by a single thread
///
/// Command lists allocated from a pool must only be recorded on the
/// thread that owns the pool.
pub trait CommandPool: Send + Sync {
    /// Allocate a primary command list
    fn allocate(&self) -> Result<Box<dyn CommandList>>;

    /// Queue family the pool allocates for
    fn queue_type(&self) -> QueueType;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}

/// Command list for recording rendering commands
///
/// Commands are recorded and later submitted through `GraphicsDevice::submit()`
pub trait CommandList: Send + Sync {
    /// Reset and begin recording (one-time submit)
    fn begin(&mut self) -> Result<()>;

    /// End recording commands
    fn end(&mut self) -> Result<()>;

    /// Whether `begin` was called without a matching `end`
    fn is_recording(&self) -> bool;

    /// Begin a render pass
    ///
    /// # Arguments
    ///
    /// * `render_pass` - The render pass to begin
    /// * `framebuffer` - The framebuffer containing every attachment of the pass
    /// * `render_area` - Area of the framebuffer affected by the pass
    /// * `clear_values` - One clear value per attachment, in binding order
    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        render_area: Rect2D,
        clear_values: &[ClearValue],
    ) -> Result<()>;

    /// Advance to the next subpass of the current render pass
    fn next_subpass(&mut self) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    /// Set the viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Set the scissor rectangle
    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Bind a graphics pipeline
    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()>;

    /// Push constants
    ///
    /// # Arguments
    ///
    /// * `layout` - Layout declaring the push constant range
    /// * `stages` - Shader stages that read the range
    /// * `offset` - Offset in bytes
    /// * `data` - Raw bytes
    fn push_constants(
        &mut self,
        layout: &Arc<dyn PipelineLayout>,
        stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()>;

    /// Draw non-indexed primitives
    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> Result<()>;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;

    /// Backend downcast hook (mutable)
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}
