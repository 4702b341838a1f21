/// Per-surface frame state: surface, swapchain and in-flight frame slots

use std::sync::Arc;
use slotmap::new_key_type;
use crate::error::Result;
use crate::graphics::{CommandBuffer, GraphicsContext};
use crate::graphics_device::{QueueType, Surface, SurfaceTarget, Swapchain};
use crate::sync::{create_frame_sync, ImagesInFlight, SyncObject, MAX_FRAMES_IN_FLIGHT};

new_key_type! {
    /// Handle of a surface registered with `Graphics`
    pub struct SurfaceId;
}

/// In-flight frame slots of one surface
pub struct FrameState {
    current_frame: usize,
    command_buffers: Vec<CommandBuffer>,
    sync: Vec<SyncObject>,
    images_in_flight: ImagesInFlight,
}

impl FrameState {
    pub fn new(ctx: &GraphicsContext, image_count: u32) -> Result<Self> {
        let command_buffers = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|_| CommandBuffer::new(ctx, QueueType::Graphics))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            current_frame: 0,
            command_buffers,
            sync: create_frame_sync(&**ctx.device())?,
            images_in_flight: ImagesInFlight::new(image_count),
        })
    }

    /// Fresh sync objects after a swapchain recreation (device must be idle)
    pub fn reset_sync(&mut self, ctx: &GraphicsContext, image_count: u32) -> Result<()> {
        self.sync = create_frame_sync(&**ctx.device())?;
        self.images_in_flight.reset(image_count);
        self.current_frame = 0;
        Ok(())
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn advance(&mut self) {
        self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;
    }

    pub fn sync(&self) -> &SyncObject {
        &self.sync[self.current_frame]
    }

    /// Command buffer, sync objects and image table of the current slot
    pub(crate) fn slot_mut(&mut self) -> (&mut CommandBuffer, &SyncObject, &mut ImagesInFlight) {
        (
            &mut self.command_buffers[self.current_frame],
            &self.sync[self.current_frame],
            &mut self.images_in_flight,
        )
    }
}

/// Everything `Graphics` keeps for one window
///
/// Field order is drop order: frame objects, then the swapchain, then the
/// surface, then the window.
pub(crate) struct SurfaceSlot {
    pub frame: FrameState,
    pub swapchain: Box<dyn Swapchain>,
    pub surface: Box<dyn Surface>,
    pub target: Arc<dyn SurfaceTarget + Send + Sync>,
    /// Recreate the swapchain before the next frame
    pub needs_recreate: bool,
}
