/// Fence and Semaphore traits - CPU/GPU and GPU/GPU synchronization primitives

use std::any::Any;
use crate::error::Result;

/// GPU → CPU synchronization primitive
pub trait Fence: Send + Sync {
    /// Block until the fence is signaled or `timeout_ns` elapses
    ///
    /// Returns `Ok(false)` on timeout. Device loss is an error.
    fn wait(&self, timeout_ns: u64) -> Result<bool>;

    /// Return the fence to the unsignaled state
    fn reset(&self) -> Result<()>;

    /// Non-blocking status query
    fn is_signaled(&self) -> Result<bool>;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}

/// GPU → GPU synchronization primitive
pub trait Semaphore: Send + Sync {
    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}
