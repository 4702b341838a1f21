//! Error types for the Fusion render core
//!
//! This module defines the error types used throughout the engine:
//! device failures, GPU object compilation, render stage validation.
//!
//! Swapchain conditions that are recovered every frame (out-of-date,
//! suboptimal) are NOT errors: they are reported as values by
//! `AcquireResult` and `PresentResult`.

use std::fmt;

/// Result type for Fusion engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fusion engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan object creation, submission, etc.)
    BackendError(String),

    /// Out of GPU (or host) memory
    OutOfMemory,

    /// Invalid resource (unknown surface, foreign backend object, etc.)
    InvalidResource(String),

    /// Initialization failed (instance, device, surface, subsystems)
    InitializationFailed(String),

    /// The logical device was lost; nothing recorded can be trusted anymore
    DeviceLost(String),

    /// A render stage description violates its attachment/subpass rules
    InvalidDescription(String),
}

impl Error {
    /// Whether this error must terminate the frame loop
    ///
    /// Validation errors are raised at construction time and are the
    /// caller's to handle; everything coming from the device is fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::BackendError(_)
                | Error::OutOfMemory
                | Error::DeviceLost(_)
                | Error::InitializationFailed(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::DeviceLost(msg) => write!(f, "Device lost: {}", msg),
            Error::InvalidDescription(msg) => write!(f, "Invalid description: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
