/// Subrenders and the renderer that orders them

pub mod subrender;
pub mod subrender_holder;
pub mod renderer;

pub use subrender::*;
pub use subrender_holder::*;
pub use renderer::*;
