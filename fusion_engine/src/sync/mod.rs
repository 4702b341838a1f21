/// Sync module - semaphores and fences of in-flight frames

pub mod sync_object;

pub use sync_object::*;
