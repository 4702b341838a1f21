/// Object caches - content-addressed deduplication of device objects

pub mod object_cache;
pub mod sampler_cache;
pub mod descriptor_layout_cache;
pub mod pipeline_layout_cache;
pub mod pipeline_cache;

pub use object_cache::*;
pub use sampler_cache::*;
pub use descriptor_layout_cache::*;
pub use pipeline_layout_cache::*;
pub use pipeline_cache::*;

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
