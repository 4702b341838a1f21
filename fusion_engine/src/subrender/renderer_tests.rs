//! Unit tests for Renderer

use std::any::Any;
use std::sync::{Arc, Mutex};
use super::*;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::{CommandList, Config};
use crate::render_stage::{Attachment, SubpassType, Viewport};
use crate::subrender::RenderContext;

struct Counter {
    updates: u32,
}

impl Subrender for Counter {
    fn on_update(&mut self, _ctx: &GraphicsContext) -> Result<()> {
        self.updates += 1;
        Ok(())
    }

    fn on_render(&mut self, _cmd: &mut dyn CommandList, _ctx: &RenderContext<'_>) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Hooks registering a subrender on start and counting calls
struct Hooks {
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl RendererHooks for Hooks {
    fn on_start(&mut self, _ctx: &GraphicsContext, stages: &[RenderStage], subrenders: &mut SubrenderHolder) -> Result<()> {
        self.calls.lock().unwrap().push("start");
        assert_eq!(stages.len(), 1);
        subrenders.add(PipelineStage::new(0, 0), Counter { updates: 0 });
        Ok(())
    }

    fn on_update(&mut self, _ctx: &GraphicsContext, _stages: &mut [RenderStage], _subrenders: &mut SubrenderHolder) -> Result<()> {
        self.calls.lock().unwrap().push("update");
        Ok(())
    }
}

fn context() -> GraphicsContext {
    GraphicsContext::new(Arc::new(MockGraphicsDevice::new(800, 600)), Config::default())
}

fn stage() -> RenderStage {
    RenderStage::new(
        vec![Attachment::swapchain(0, "swapchain")],
        vec![SubpassType::new(0, vec![0])],
        Viewport::default(),
    )
    .unwrap()
}

// ============================================================================
// STAGES
// ============================================================================

#[test]
fn test_add_render_stage_returns_index() {
    let mut renderer = Renderer::new();
    assert_eq!(renderer.add_render_stage(stage()), 0);
    assert_eq!(renderer.add_render_stage(stage()), 1);

    assert_eq!(renderer.render_stages().len(), 2);
    assert!(renderer.render_stage(1).is_some());
    assert!(renderer.render_stage(2).is_none());
}

// ============================================================================
// LIFECYCLE
// ============================================================================

#[test]
fn test_start_runs_once() {
    let ctx = context();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut renderer = Renderer::new().with_hooks(Hooks { calls: Arc::clone(&calls) });
    renderer.add_render_stage(stage());
    assert!(!renderer.is_started());

    renderer.start(&ctx).unwrap();
    renderer.start(&ctx).unwrap();

    assert!(renderer.is_started());
    assert_eq!(*calls.lock().unwrap(), vec!["start"]);
    assert!(renderer.subrenders().has::<Counter>());
}

#[test]
fn test_update_runs_hooks_then_subrenders() {
    let ctx = context();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut renderer = Renderer::new().with_hooks(Hooks { calls: Arc::clone(&calls) });
    renderer.add_render_stage(stage());
    renderer.start(&ctx).unwrap();

    renderer.update(&ctx).unwrap();
    renderer.update(&ctx).unwrap();

    assert_eq!(*calls.lock().unwrap(), vec!["start", "update", "update"]);
    assert_eq!(renderer.subrenders().get::<Counter>().map(|c| c.updates), Some(2));
}

#[test]
fn test_renderer_without_hooks() {
    let ctx = context();
    let mut renderer = Renderer::new();
    renderer.add_subrender(PipelineStage::new(0, 0), Counter { updates: 0 });

    renderer.start(&ctx).unwrap();
    renderer.update(&ctx).unwrap();

    assert_eq!(renderer.subrenders().get::<Counter>().map(|c| c.updates), Some(1));
}
