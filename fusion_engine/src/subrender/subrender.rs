/// Subrender trait - a unit of draw work bound to one (stage, subpass)

use std::any::Any;
use crate::error::Result;
use crate::graphics::{GraphicsContext, SurfaceId};
use crate::graphics_device::CommandList;
use crate::render_stage::RenderStage;

/// Where a subrender records: render stage index and subpass within it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineStage {
    pub stage: u32,
    pub subpass: u32,
}

impl PipelineStage {
    pub const fn new(stage: u32, subpass: u32) -> Self {
        Self { stage, subpass }
    }
}

/// Everything a subrender may read while recording
pub struct RenderContext<'a> {
    pub graphics: &'a GraphicsContext,
    /// Stage being recorded (render pass, render area, descriptors)
    pub stage: &'a RenderStage,
    pub pipeline_stage: PipelineStage,
    pub surface: SurfaceId,
    /// Swapchain image the frame renders to
    pub image_index: u32,
    /// In-flight frame slot
    pub frame: usize,
}

/// Draw work recorded inside a subpass
///
/// Subrenders read scene data through their own handles. They are called on
/// the frame thread only.
pub trait Subrender: Any {
    /// Called once per frame before any recording, while enabled
    fn on_update(&mut self, _ctx: &GraphicsContext) -> Result<()> {
        Ok(())
    }

    /// Record the draw commands of the bound subpass
    fn on_render(&mut self, cmd: &mut dyn CommandList, ctx: &RenderContext<'_>) -> Result<()>;

    /// Called when the subrender goes from disabled to enabled
    fn on_enabled(&mut self) {}

    /// Called when the subrender goes from enabled to disabled
    fn on_disabled(&mut self) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
