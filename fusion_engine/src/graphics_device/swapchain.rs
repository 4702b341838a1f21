/// Surface and Swapchain traits - window presentation
///
/// A `SurfaceTarget` is anything that owns a native window (winit windows
/// implement it out of the box). The backend turns it into a `Surface`, and
/// builds/rebuilds `Swapchain`s on top of that surface.

use std::any::Any;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use crate::error::Result;
use crate::graphics_device::{Semaphore, TextureFormat};

/// Size in pixels of a surface or image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A minimized window reports a zero-sized surface
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Native window a surface can be created for
pub trait SurfaceTarget: HasWindowHandle + HasDisplayHandle {
    /// Current drawable size in physical pixels
    fn drawable_size(&self) -> Extent2D;
}

impl SurfaceTarget for winit::window::Window {
    fn drawable_size(&self) -> Extent2D {
        let size = self.inner_size();
        Extent2D::new(size.width, size.height)
    }
}

/// Presentation surface bound to one window
pub trait Surface: Send + Sync {
    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}

/// Outcome of acquiring a swapchain image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireResult {
    /// Image acquired, swapchain matches the surface
    Acquired(u32),
    /// Image acquired but the swapchain no longer matches the surface exactly
    Suboptimal(u32),
    /// The swapchain can't be used anymore and must be recreated
    OutOfDate,
}

/// Outcome of presenting a swapchain image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentResult {
    Presented,
    Suboptimal,
    OutOfDate,
}

impl PresentResult {
    /// Whether the swapchain should be recreated before the next frame
    pub fn needs_recreate(self) -> bool {
        !matches!(self, PresentResult::Presented)
    }
}

/// Swapchain for presenting rendered images to a window
pub trait Swapchain: Send + Sync {
    /// Acquire the next presentable image
    ///
    /// `signal` is signaled once the image is actually available to the GPU.
    /// Out-of-date and suboptimal swapchains are reported through
    /// `AcquireResult`; only unrecoverable failures are errors.
    fn acquire_next_image(&mut self, signal: &dyn Semaphore, timeout_ns: u64) -> Result<AcquireResult>;

    /// Queue the image for presentation once `wait` is signaled
    fn present(&mut self, image_index: u32, wait: &dyn Semaphore) -> Result<PresentResult>;

    /// Index of the last acquired image
    fn active_image_index(&self) -> u32;

    /// Get the number of images in the swapchain
    fn image_count(&self) -> u32;

    /// Size of the swapchain images
    fn extent(&self) -> Extent2D;

    /// Get the pixel format of the swapchain images
    fn format(&self) -> TextureFormat;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}
