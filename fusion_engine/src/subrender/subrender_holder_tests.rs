//! Unit tests for SubrenderHolder

use std::any::Any;
use std::sync::{Arc, Mutex};
use slotmap::SlotMap;
use super::*;
use crate::graphics::SurfaceId;
use crate::graphics_device::mock_graphics_device::{MockCommandList, MockGraphicsDevice};
use crate::graphics_device::Config;
use crate::render_stage::{Attachment, RenderStage, SubpassType, Viewport};

type Journal = Arc<Mutex<Vec<String>>>;

/// Subrender writing every callback into a shared journal
struct Recorder {
    name: &'static str,
    journal: Journal,
}

impl Recorder {
    fn new(name: &'static str, journal: &Journal) -> Self {
        Self { name, journal: Arc::clone(journal) }
    }

    fn note(&self, event: &str) {
        self.journal.lock().unwrap().push(format!("{}:{}", self.name, event));
    }
}

impl Subrender for Recorder {
    fn on_update(&mut self, _ctx: &GraphicsContext) -> Result<()> {
        self.note("update");
        Ok(())
    }

    fn on_render(&mut self, _cmd: &mut dyn CommandList, _ctx: &RenderContext<'_>) -> Result<()> {
        self.note("render");
        Ok(())
    }

    fn on_enabled(&mut self) {
        self.note("enabled");
    }

    fn on_disabled(&mut self) {
        self.note("disabled");
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Second type, to exercise typed lookups
struct Overlay {
    draws: u32,
}

impl Subrender for Overlay {
    fn on_render(&mut self, cmd: &mut dyn CommandList, _ctx: &RenderContext<'_>) -> Result<()> {
        self.draws += 1;
        cmd.draw(3, 1, 0, 0)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn context() -> GraphicsContext {
    GraphicsContext::new(Arc::new(MockGraphicsDevice::new(800, 600)), Config::default())
}

fn stage() -> RenderStage {
    RenderStage::new(
        vec![Attachment::swapchain(0, "swapchain")],
        vec![SubpassType::new(0, vec![0]), SubpassType::new(1, vec![0])],
        Viewport::default(),
    )
    .unwrap()
}

fn render(holder: &mut SubrenderHolder, ctx: &GraphicsContext, stage: &RenderStage, pipeline_stage: PipelineStage) -> Vec<String> {
    let surface = SlotMap::<SurfaceId, ()>::with_key().insert(());
    let render_ctx = RenderContext { graphics: ctx, stage, pipeline_stage, surface, image_index: 0, frame: 0 };
    let mut cmd = MockCommandList::new();
    holder.render_stage(&mut cmd, &render_ctx).unwrap();
    cmd.commands
}

fn take(journal: &Journal) -> Vec<String> {
    std::mem::take(&mut *journal.lock().unwrap())
}

// ============================================================================
// REGISTRATION
// ============================================================================

#[test]
fn test_add_and_typed_lookup() {
    let journal = Journal::default();
    let mut holder = SubrenderHolder::new();
    let main = PipelineStage::new(0, 0);

    holder.add(main, Recorder::new("a", &journal));
    let overlay = holder.add(PipelineStage::new(0, 1), Overlay { draws: 0 });

    assert_eq!(holder.len(), 2);
    assert!(holder.has::<Recorder>());
    assert!(holder.has::<Overlay>());
    assert_eq!(holder.get::<Recorder>().map(|r| r.name), Some("a"));
    assert_eq!(holder.pipeline_stage(overlay), Some(PipelineStage::new(0, 1)));

    holder.get_mut::<Overlay>().unwrap().draws = 5;
    assert_eq!(holder.get::<Overlay>().map(|o| o.draws), Some(5));
}

#[test]
fn test_remove_by_type() {
    let journal = Journal::default();
    let mut holder = SubrenderHolder::new();
    let main = PipelineStage::new(0, 0);
    holder.add(main, Recorder::new("a", &journal));
    holder.add(main, Overlay { draws: 0 });
    holder.add(main, Recorder::new("b", &journal));

    assert_eq!(holder.remove::<Recorder>(), 2);
    assert!(!holder.has::<Recorder>());
    assert_eq!(holder.ids_for(main).len(), 1);
    assert_eq!(holder.remove::<Recorder>(), 0);
}

#[test]
fn test_remove_id_and_clear() {
    let journal = Journal::default();
    let mut holder = SubrenderHolder::new();
    let id = holder.add(PipelineStage::new(1, 0), Recorder::new("a", &journal));

    assert!(holder.remove_id(id).is_some());
    assert!(!holder.contains(id));
    assert!(holder.remove_id(id).is_none());
    assert!(holder.ids_for(PipelineStage::new(1, 0)).is_empty());

    holder.add(PipelineStage::new(1, 0), Overlay { draws: 0 });
    holder.clear();
    assert!(holder.is_empty());
}

// ============================================================================
// ENABLED STATE
// ============================================================================

#[test]
fn test_enable_callbacks_fire_once_per_transition() {
    let journal = Journal::default();
    let mut holder = SubrenderHolder::new();
    let id = holder.add(PipelineStage::new(0, 0), Recorder::new("a", &journal));
    assert!(holder.is_enabled(id));

    assert!(!holder.set_enabled(id, true));
    assert!(take(&journal).is_empty());

    assert!(holder.set_enabled(id, false));
    assert!(!holder.set_enabled(id, false));
    assert_eq!(take(&journal), vec!["a:disabled"]);

    assert!(holder.set_enabled(id, true));
    assert!(!holder.set_enabled(id, true));
    assert_eq!(take(&journal), vec!["a:enabled"]);
}

#[test]
fn test_set_enabled_unknown_id() {
    let journal = Journal::default();
    let mut holder = SubrenderHolder::new();
    let id = holder.add(PipelineStage::new(0, 0), Recorder::new("a", &journal));
    holder.remove_id(id);

    assert!(!holder.set_enabled(id, false));
    assert!(!holder.is_enabled(id));
}

// ============================================================================
// FRAME
// ============================================================================

#[test]
fn test_draw_order_survives_any_enablement() {
    let ctx = context();
    let stage = stage();
    let main = PipelineStage::new(0, 0);
    let names = ["a", "b", "c", "d"];

    // Every enabled/disabled combination of four subrenders
    for mask in 0u32..16 {
        let journal = Journal::default();
        let mut holder = SubrenderHolder::new();
        let ids: Vec<SubrenderId> = names.iter().map(|&n| holder.add(main, Recorder::new(n, &journal))).collect();

        // Toggle everything off and back on in reverse, then apply the mask
        for &id in ids.iter().rev() {
            holder.set_enabled(id, false);
        }
        for &id in ids.iter().rev() {
            holder.set_enabled(id, true);
        }
        for (bit, &id) in ids.iter().enumerate() {
            holder.set_enabled(id, mask & (1 << bit) != 0);
        }
        take(&journal);

        render(&mut holder, &ctx, &stage, main);

        let expected: Vec<String> = names
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, n)| format!("{}:render", n))
            .collect();
        assert_eq!(take(&journal), expected, "mask {:04b}", mask);
    }
}

#[test]
fn test_render_only_bound_pipeline_stage() {
    let ctx = context();
    let stage = stage();
    let journal = Journal::default();
    let mut holder = SubrenderHolder::new();
    holder.add(PipelineStage::new(0, 0), Recorder::new("geometry", &journal));
    holder.add(PipelineStage::new(0, 1), Overlay { draws: 0 });

    let commands = render(&mut holder, &ctx, &stage, PipelineStage::new(0, 1));
    assert_eq!(commands, vec!["draw(3, 1)"]);
    assert!(take(&journal).is_empty());

    let commands = render(&mut holder, &ctx, &stage, PipelineStage::new(0, 0));
    assert!(commands.is_empty());
    assert_eq!(take(&journal), vec!["geometry:render"]);

    // Nothing bound there
    assert!(render(&mut holder, &ctx, &stage, PipelineStage::new(3, 0)).is_empty());
}

#[test]
fn test_update_all_skips_disabled_in_stage_order() {
    let ctx = context();
    let journal = Journal::default();
    let mut holder = SubrenderHolder::new();
    holder.add(PipelineStage::new(1, 0), Recorder::new("late", &journal));
    let off = holder.add(PipelineStage::new(0, 1), Recorder::new("off", &journal));
    holder.add(PipelineStage::new(0, 0), Recorder::new("early", &journal));
    holder.set_enabled(off, false);
    take(&journal);

    holder.update_all(&ctx).unwrap();

    assert_eq!(take(&journal), vec!["early:update", "late:update"]);
}
