/// Render stage module - attachment/subpass descriptions compiled into render passes

pub mod attachment;
pub mod viewport;
pub mod render_pass_builder;
pub mod framebuffers;
pub mod render_stage;

pub use attachment::*;
pub use viewport::*;
pub use render_pass_builder::ResolvedFormats;
pub use framebuffers::*;
pub use render_stage::*;
