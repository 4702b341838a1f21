/// Renderer - ordered render stages plus the subrenders recording into them
///
/// Stages record in the order they were added. Application-specific setup
/// goes through `RendererHooks`: `on_start` runs once, after the stages were
/// built for the first time (render passes exist, so pipelines can be
/// compiled), and `on_update` runs every frame before recording.

use crate::error::Result;
use crate::graphics::GraphicsContext;
use crate::render_stage::RenderStage;
use crate::subrender::{PipelineStage, Subrender, SubrenderHolder, SubrenderId};

/// Application callbacks of a renderer
pub trait RendererHooks {
    /// Called once, after the first stage build
    fn on_start(&mut self, ctx: &GraphicsContext, stages: &[RenderStage], subrenders: &mut SubrenderHolder) -> Result<()>;

    /// Called every frame before the subrenders update
    fn on_update(&mut self, _ctx: &GraphicsContext, _stages: &mut [RenderStage], _subrenders: &mut SubrenderHolder) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct Renderer {
    stages: Vec<RenderStage>,
    subrenders: SubrenderHolder,
    hooks: Option<Box<dyn RendererHooks>>,
    started: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hooks<H: RendererHooks + 'static>(mut self, hooks: H) -> Self {
        self.hooks = Some(Box::new(hooks));
        self
    }

    // ===== STAGES =====

    /// Append a stage, returns its index
    pub fn add_render_stage(&mut self, stage: RenderStage) -> u32 {
        self.stages.push(stage);
        self.stages.len() as u32 - 1
    }

    pub fn render_stage(&self, index: u32) -> Option<&RenderStage> {
        self.stages.get(index as usize)
    }

    pub fn render_stage_mut(&mut self, index: u32) -> Option<&mut RenderStage> {
        self.stages.get_mut(index as usize)
    }

    pub fn render_stages(&self) -> &[RenderStage] {
        &self.stages
    }

    pub fn render_stages_mut(&mut self) -> &mut [RenderStage] {
        &mut self.stages
    }

    // ===== SUBRENDERS =====

    pub fn add_subrender<T: Subrender>(&mut self, pipeline_stage: PipelineStage, subrender: T) -> SubrenderId {
        self.subrenders.add(pipeline_stage, subrender)
    }

    pub fn subrenders(&self) -> &SubrenderHolder {
        &self.subrenders
    }

    pub fn subrenders_mut(&mut self) -> &mut SubrenderHolder {
        &mut self.subrenders
    }

    /// Stages and subrenders borrowed together, for recording
    pub(crate) fn split_mut(&mut self) -> (&mut [RenderStage], &mut SubrenderHolder) {
        (&mut self.stages, &mut self.subrenders)
    }

    // ===== LIFECYCLE =====

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Run `on_start` if it did not run yet
    pub(crate) fn start(&mut self, ctx: &GraphicsContext) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_start(ctx, &self.stages, &mut self.subrenders)?;
        }
        Ok(())
    }

    /// Per-frame update: hooks first, then every enabled subrender
    pub(crate) fn update(&mut self, ctx: &GraphicsContext) -> Result<()> {
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_update(ctx, &mut self.stages, &mut self.subrenders)?;
        }
        self.subrenders.update_all(ctx)
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
