/// Per-frame synchronization objects
///
/// One `SyncObject` per in-flight frame slot:
/// - `image_available` is signaled by acquire, waited on by the submission
/// - `render_finished` is signaled by the submission, waited on by present
/// - `in_flight` is signaled when the slot's command buffer finished
///
/// `ImagesInFlight` remembers which slot fence last rendered each swapchain
/// image, so an image is never re-recorded while the GPU still uses it.

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{Fence, GraphicsDevice, Semaphore};

/// Number of frames the CPU may record ahead of the GPU
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

pub struct SyncObject {
    image_available: Arc<dyn Semaphore>,
    render_finished: Arc<dyn Semaphore>,
    in_flight: Arc<dyn Fence>,
}

impl SyncObject {
    /// Create the objects of one slot (the fence starts signaled so the
    /// first wait returns immediately)
    pub fn new(device: &dyn GraphicsDevice) -> Result<Self> {
        Ok(Self {
            image_available: device.create_semaphore()?,
            render_finished: device.create_semaphore()?,
            in_flight: device.create_fence(true)?,
        })
    }

    pub fn image_available(&self) -> &Arc<dyn Semaphore> {
        &self.image_available
    }

    pub fn render_finished(&self) -> &Arc<dyn Semaphore> {
        &self.render_finished
    }

    pub fn in_flight(&self) -> &Arc<dyn Fence> {
        &self.in_flight
    }
}

/// Create the sync objects of every frame slot
pub fn create_frame_sync(device: &dyn GraphicsDevice) -> Result<Vec<SyncObject>> {
    (0..MAX_FRAMES_IN_FLIGHT).map(|_| SyncObject::new(device)).collect()
}

/// Fence of the frame that last rendered each swapchain image
#[derive(Default)]
pub struct ImagesInFlight {
    fences: Vec<Option<Arc<dyn Fence>>>,
}

impl ImagesInFlight {
    pub fn new(image_count: u32) -> Self {
        Self { fences: vec![None; image_count as usize] }
    }

    /// Forget every image (after swapchain recreation)
    pub fn reset(&mut self, image_count: u32) {
        self.fences.clear();
        self.fences.resize(image_count as usize, None);
    }

    /// Wait until the previous frame rendering `image_index` is done, then
    /// assign the image to `fence`
    pub fn claim(&mut self, image_index: u32, fence: &Arc<dyn Fence>, timeout_ns: u64) -> Result<()> {
        let index = image_index as usize;
        if index >= self.fences.len() {
            self.fences.resize(index + 1, None);
        }
        if let Some(previous) = &self.fences[index] {
            if !Arc::ptr_eq(previous, fence) {
                previous.wait(timeout_ns)?;
            }
        }
        self.fences[index] = Some(Arc::clone(fence));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.fences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fences.is_empty()
    }
}

#[cfg(test)]
#[path = "sync_object_tests.rs"]
mod tests;
