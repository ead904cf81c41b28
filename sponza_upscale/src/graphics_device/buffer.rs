/// Buffer trait and buffer descriptor

use std::any::Any;
use crate::error::Result;

/// Buffer usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Vertex buffer
    Vertex,
    /// Index buffer
    Index,
    /// Uniform buffer (host-visible, persistently mapped)
    Uniform,
    /// Storage buffer
    Storage,
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Debug label
    pub label: String,
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
}

/// Vertex attribute data format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum BufferFormat {
    R32_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,
}

impl BufferFormat {
    /// Returns size in bytes for this format
    pub fn size_bytes(&self) -> u32 {
        match self {
            BufferFormat::R32_SFLOAT => 4,
            BufferFormat::R32G32_SFLOAT => 8,
            BufferFormat::R32G32B32_SFLOAT => 12,
            BufferFormat::R32G32B32A32_SFLOAT => 16,
        }
    }
}

/// Buffer resource trait
///
/// The buffer is automatically destroyed when dropped.
pub trait Buffer: Send + Sync {
    /// Write bytes into the buffer
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset into the buffer in bytes
    /// * `data` - Data to write
    ///
    /// # Errors
    ///
    /// `InvalidResource` when the range exceeds the buffer size.
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Size in bytes
    fn size(&self) -> u64;

    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}
