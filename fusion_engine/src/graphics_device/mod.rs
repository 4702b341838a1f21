/// Graphics device module - backend abstraction traits and descriptors

// Module declarations
pub mod graphics_device;
pub mod texture;
pub mod pipeline;
pub mod command_list;
pub mod render_pass;
pub mod swapchain;
pub mod sync;
pub mod frame_buffer;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use texture::*;
pub use pipeline::*;
pub use command_list::*;
pub use render_pass::*;
pub use swapchain::*;
pub use sync::*;
pub use frame_buffer::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
