/// Graphics module - frame controller and the context shared by the render core

pub mod graphics_context;
pub mod command_pools;
pub mod command_buffer;
pub mod frame_state;
pub mod screenshot;
pub mod graphics;

pub use graphics_context::*;
pub use command_pools::*;
pub use command_buffer::*;
pub use frame_state::{FrameState, SurfaceId};
pub use screenshot::*;
pub use graphics::*;
