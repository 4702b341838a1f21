/// Descriptor module - named uniform and descriptor staging for subrenders

pub mod uniform_handler;
pub mod descriptors_handler;

pub use uniform_handler::*;
pub use descriptors_handler::*;
