/// Graphics - frame controller
///
/// Owns the graphics context, the registered surfaces and the active
/// renderer, and drives one frame per `update()` call on every surface:
///
/// 1. wait for the in-flight fence of the current slot
/// 2. on an out-of-date render stage: recreate the swapchain, rebuild every
///    stage and skip the surface for this frame (same for an empty stage
///    area, without the rebuild)
/// 3. acquire the next swapchain image; out of date recreates and skips
/// 4. record every stage in order, subrenders in registration order
/// 5. submit (waits image-available, signals render-finished + fence)
/// 6. present; suboptimal/out-of-date marks the surface for recreation
///
/// Fatal errors (device loss, failed compilation, out of memory) are
/// returned from `update()`. Swapchain invalidation is never an error.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use crate::error::{Error, Result};
use crate::graphics::frame_state::SurfaceSlot;
use crate::graphics::{save_readback, FrameState, GraphicsContext, SurfaceId};
use crate::graphics_device::{
    AcquireResult, Config, GraphicsDevice, QueueType, SubmitInfo, SurfaceTarget, Swapchain, Texture,
    Viewport,
};
use crate::render_stage::RenderStage;
use crate::subrender::{PipelineStage, RenderContext, Renderer};
use crate::{engine_debug, engine_err, engine_info, engine_warn};

pub struct Graphics {
    renderer: Option<Renderer>,
    pending_renderer: Option<Renderer>,
    surfaces: SlotMap<SurfaceId, SurfaceSlot>,
    attachments: FxHashMap<String, Arc<dyn Texture>>,
    last_purge: Instant,
    context: GraphicsContext,
}

impl Graphics {
    pub fn new(device: Arc<dyn GraphicsDevice>, config: Config) -> Self {
        engine_info!("fusion::Graphics", "Graphics initialized ({})", config.app_name);
        Self {
            renderer: None,
            pending_renderer: None,
            surfaces: SlotMap::with_key(),
            attachments: FxHashMap::default(),
            last_purge: Instant::now(),
            context: GraphicsContext::new(device, config),
        }
    }

    pub fn context(&self) -> &GraphicsContext {
        &self.context
    }

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        self.context.device()
    }

    // ===== RENDERER =====

    /// Replace the renderer, effective at the next `update()`
    pub fn set_renderer(&mut self, renderer: Renderer) {
        self.pending_renderer = Some(renderer);
    }

    pub fn renderer(&self) -> Option<&Renderer> {
        self.renderer.as_ref()
    }

    pub fn renderer_mut(&mut self) -> Option<&mut Renderer> {
        self.renderer.as_mut()
    }

    pub fn render_stage(&self, index: u32) -> Option<&RenderStage> {
        self.renderer.as_ref().and_then(|r| r.render_stage(index))
    }

    /// Named render stage output, from the latest rebuild of any stage
    pub fn attachment(&self, name: &str) -> Option<Arc<dyn Texture>> {
        self.attachments.get(name).cloned()
    }

    fn install_pending_renderer(&mut self) -> Result<()> {
        let Some(mut renderer) = self.pending_renderer.take() else {
            return Ok(());
        };
        // In-flight frames may still use the previous stages
        self.context.device().wait_idle()?;
        self.renderer = None;

        for (id, slot) in self.surfaces.iter() {
            for stage in renderer.render_stages_mut() {
                stage.rebuild(&self.context, id, slot.swapchain.as_ref())?;
            }
        }
        self.attachments = collect_attachments(renderer.render_stages());
        if !self.surfaces.is_empty() {
            renderer.start(&self.context)?;
        }
        engine_info!(
            "fusion::Graphics",
            "Renderer installed with {} render stages",
            renderer.render_stages().len()
        );
        self.renderer = Some(renderer);
        Ok(())
    }

    // ===== SURFACES =====

    /// Register a window, creating its surface, swapchain and frame slots
    ///
    /// The window is kept alive as long as the surface is registered.
    pub fn add_surface(&mut self, target: Arc<dyn SurfaceTarget + Send + Sync>) -> Result<SurfaceId> {
        let device = self.context.device();
        let surface = device.create_surface(&*target)?;
        let swapchain = device.create_swapchain(surface.as_ref(), target.drawable_size(), None)?;
        let frame = FrameState::new(&self.context, swapchain.image_count())?;
        let extent = swapchain.extent();

        let id = self.surfaces.insert(SurfaceSlot {
            frame,
            swapchain,
            surface,
            target,
            needs_recreate: false,
        });

        if let Some(renderer) = self.renderer.as_mut() {
            let swapchain = self.surfaces[id].swapchain.as_ref();
            for stage in renderer.render_stages_mut() {
                stage.rebuild(&self.context, id, swapchain)?;
            }
            self.attachments = collect_attachments(renderer.render_stages());
            renderer.start(&self.context)?;
        }

        engine_info!(
            "fusion::Graphics",
            "Surface registered ({}x{}, {} images)",
            extent.width,
            extent.height,
            self.surfaces[id].swapchain.image_count()
        );
        Ok(id)
    }

    /// Unregister a surface once the GPU is done with it
    pub fn remove_surface(&mut self, id: SurfaceId) -> Result<()> {
        if !self.surfaces.contains_key(id) {
            return Err(Error::InvalidResource(format!("Unknown surface {:?}", id)));
        }
        self.context.device().wait_idle()?;
        self.attachments.clear();
        if let Some(renderer) = self.renderer.as_mut() {
            for stage in renderer.render_stages_mut() {
                stage.remove_surface(id);
            }
            self.attachments = collect_attachments(renderer.render_stages());
        }
        self.surfaces.remove(id);
        engine_info!("fusion::Graphics", "Surface removed");
        Ok(())
    }

    /// Request a swapchain recreation before the next frame of a surface
    /// (window resized)
    pub fn set_framebuffer_resized(&mut self, id: SurfaceId) {
        if let Some(slot) = self.surfaces.get_mut(id) {
            slot.needs_recreate = true;
        }
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn surface_ids(&self) -> Vec<SurfaceId> {
        self.surfaces.keys().collect()
    }

    pub fn swapchain(&self, id: SurfaceId) -> Option<&dyn Swapchain> {
        self.surfaces.get(id).map(|slot| slot.swapchain.as_ref())
    }

    /// In-flight slot the next frame of a surface will use
    pub fn current_frame(&self, id: SurfaceId) -> Option<usize> {
        self.surfaces.get(id).map(|slot| slot.frame.current_frame())
    }

    // ===== FRAME =====

    /// Run one frame on every surface
    pub fn update(&mut self) -> Result<()> {
        self.install_pending_renderer()?;

        if self.last_purge.elapsed() >= self.context.command_pools().purge_interval() {
            self.context.command_pools().purge();
            self.last_purge = Instant::now();
        }

        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        if !renderer.is_started() {
            return Ok(());
        }
        renderer.update(&self.context)?;

        let ids: Vec<SurfaceId> = self.surfaces.keys().collect();
        for id in ids {
            let Some(slot) = self.surfaces.get_mut(id) else {
                continue;
            };
            draw_surface(&self.context, id, slot, renderer, &mut self.attachments)?;
        }
        Ok(())
    }

    /// Block until the GPU is idle
    pub fn wait_idle(&self) -> Result<()> {
        self.context.device().wait_idle()
    }

    /// Write the image last acquired on a surface to `path`
    ///
    /// Blocks until the GPU finished every submitted frame and the copy is
    /// done. The file format follows the extension (png, bmp).
    pub fn capture_screenshot(&self, path: impl AsRef<Path>, id: SurfaceId) -> Result<()> {
        let slot = self
            .surfaces
            .get(id)
            .ok_or_else(|| Error::InvalidResource(format!("Unknown surface {:?}", id)))?;
        let device = self.context.device();
        device.wait_idle()?;

        let started = Instant::now();
        let image_index = slot.swapchain.active_image_index();
        let readback = device.read_swapchain_image(slot.swapchain.as_ref(), image_index)?;
        save_readback(path.as_ref(), readback)?;
        engine_info!(
            "fusion::Graphics",
            "Screenshot saved to {} in {} ms",
            path.as_ref().display(),
            started.elapsed().as_millis()
        );
        Ok(())
    }
}

impl Drop for Graphics {
    fn drop(&mut self) {
        // GPU objects below must not be released while still in use
        if let Err(e) = self.context.device().wait_idle() {
            engine_warn!("fusion::Graphics", "wait_idle failed on shutdown: {}", e);
        }
    }
}

/// Named outputs of every stage; later stages win on name clashes
fn collect_attachments(stages: &[RenderStage]) -> FxHashMap<String, Arc<dyn Texture>> {
    let mut attachments = FxHashMap::default();
    for stage in stages {
        for name in stage.descriptor_names() {
            if let Some(texture) = stage.descriptor(&name) {
                attachments.insert(name, texture);
            }
        }
    }
    attachments
}

/// Recreate the swapchain of a surface and rebuild every stage against it
///
/// Returns `false` when the window is minimized (nothing was recreated).
fn recreate_swapchain(
    ctx: &GraphicsContext,
    id: SurfaceId,
    slot: &mut SurfaceSlot,
    stages: &mut [RenderStage],
    attachments: &mut FxHashMap<String, Arc<dyn Texture>>,
) -> Result<bool> {
    let extent = slot.target.drawable_size();
    if extent.is_empty() {
        slot.needs_recreate = true;
        return Ok(false);
    }

    let device = ctx.device();
    device.wait_idle()?;
    let swapchain = device.create_swapchain(slot.surface.as_ref(), extent, Some(slot.swapchain.as_ref()))?;
    slot.swapchain = swapchain;
    slot.frame.reset_sync(ctx, slot.swapchain.image_count())?;

    for stage in stages.iter_mut() {
        stage.rebuild(ctx, id, slot.swapchain.as_ref())?;
    }
    *attachments = collect_attachments(stages);
    slot.needs_recreate = false;

    let extent = slot.swapchain.extent();
    engine_debug!(
        "fusion::Graphics",
        "Swapchain recreated at {}x{}",
        extent.width,
        extent.height
    );
    Ok(true)
}

fn draw_surface(
    ctx: &GraphicsContext,
    id: SurfaceId,
    slot: &mut SurfaceSlot,
    renderer: &mut Renderer,
    attachments: &mut FxHashMap<String, Arc<dyn Texture>>,
) -> Result<()> {
    let (stages, subrenders) = renderer.split_mut();

    if slot.needs_recreate && !recreate_swapchain(ctx, id, slot, stages, attachments)? {
        return Ok(());
    }
    if slot.target.drawable_size().is_empty() {
        return Ok(());
    }

    let timeout = ctx.config().fence_timeout_ns;
    let frame = slot.frame.current_frame();

    // 1. Backpressure: the slot's previous submission must be complete
    if !slot.frame.sync().in_flight().wait(timeout)? {
        return Err(engine_err!("fusion::Graphics", "Timed out waiting for frame slot {}", frame));
    }

    // 2. Stage areas, checked before acquiring so a skipped frame leaves no
    // semaphore signal pending
    let mut stages_out_of_date = false;
    let mut empty_area = false;
    for stage in stages.iter_mut() {
        stage.update(id, slot.swapchain.as_ref());
        stages_out_of_date |= stage.is_out_of_date(id);
        empty_area |= stage.render_area(id).map_or(true, |area| area.is_empty());
    }
    if stages_out_of_date {
        engine_debug!("fusion::Graphics", "Render stage out of date, recreating swapchain");
        recreate_swapchain(ctx, id, slot, stages, attachments)?;
        return Ok(());
    }
    // Nothing would move the swapchain image to its present layout
    if empty_area {
        return Ok(());
    }

    // 3. Acquire
    let (image_index, suboptimal) = match slot
        .swapchain
        .acquire_next_image(&**slot.frame.sync().image_available(), timeout)?
    {
        AcquireResult::Acquired(index) => (index, false),
        AcquireResult::Suboptimal(index) => (index, true),
        AcquireResult::OutOfDate => {
            engine_warn!("fusion::Graphics", "Swapchain out of date, recreating");
            recreate_swapchain(ctx, id, slot, stages, attachments)?;
            return Ok(());
        }
    };

    // 4. Record
    let (cmd, sync, images_in_flight) = slot.frame.slot_mut();
    cmd.begin()?;
    for (stage_index, stage) in stages.iter().enumerate() {
        record_stage(ctx, id, image_index, frame, stage_index as u32, stage, cmd, subrenders)?;
    }
    cmd.end()?;

    // 5. Submit
    images_in_flight.claim(image_index, sync.in_flight(), timeout)?;
    sync.in_flight().reset()?;
    cmd.submit(&SubmitInfo {
        queue: QueueType::Graphics,
        wait: Some(&**sync.image_available()),
        signal: Some(&**sync.render_finished()),
        fence: Some(&**sync.in_flight()),
    })?;

    // 6. Present
    let presented = slot.swapchain.present(image_index, &**sync.render_finished())?;
    if suboptimal || presented.needs_recreate() {
        slot.needs_recreate = true;
    }

    slot.frame.advance();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn record_stage(
    ctx: &GraphicsContext,
    surface: SurfaceId,
    image_index: u32,
    frame: usize,
    stage_index: u32,
    stage: &RenderStage,
    cmd: &mut crate::graphics::CommandBuffer,
    subrenders: &mut crate::subrender::SubrenderHolder,
) -> Result<()> {
    let (Some(render_pass), Some(framebuffer), Some(area)) = (
        stage.render_pass(),
        stage.framebuffer(surface, image_index),
        stage.render_area(surface),
    ) else {
        return Err(Error::InvalidResource(format!(
            "Render stage {} was not built for this surface",
            stage_index
        )));
    };
    let rect = area.rect();
    cmd.set_viewport(Viewport {
        x: rect.x as f32,
        y: rect.y as f32,
        width: rect.width as f32,
        height: rect.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    })?;
    cmd.set_scissor(rect)?;
    cmd.begin_render_pass(render_pass, framebuffer, rect, stage.clear_values())?;

    for subpass in 0..stage.subpass_count() {
        if subpass > 0 {
            cmd.next_subpass()?;
        }
        let render_ctx = RenderContext {
            graphics: ctx,
            stage,
            pipeline_stage: PipelineStage::new(stage_index, subpass),
            surface,
            image_index,
            frame,
        };
        subrenders.render_stage(&mut **cmd, &render_ctx)?;
    }

    cmd.end_render_pass()
}

#[cfg(test)]
#[path = "graphics_tests.rs"]
mod tests;
