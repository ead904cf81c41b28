//! Error types for the Sponza upscale renderer
//!
//! This module defines the error types used throughout the renderer,
//! covering device bootstrap, GPU object creation and host input.

use std::fmt;

/// Result type for renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Renderer errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (Vulkan object creation, submission, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource or invalid host input (null handle, empty file, bad index)
    InvalidResource(String),

    /// Initialization failed (device features, pass creation, pipelines)
    InitializationFailed(String),

    /// A required device or vendor extension is not exposed by the device
    MissingExtension(String),

    /// The frame driver was asked to render before a successful prepare
    NotPrepared,
}

impl Error {
    /// Whether this error belongs to the fatal initialization class.
    ///
    /// Fatal errors leave the frame driver permanently un-prepared; the
    /// render thread exits its loop instead of retrying.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::InitializationFailed(_) | Error::MissingExtension(_) | Error::OutOfMemory
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
            Error::MissingExtension(name) => write!(f, "Missing device extension: {}", name),
            Error::NotPrepared => write!(f, "Renderer not prepared"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
