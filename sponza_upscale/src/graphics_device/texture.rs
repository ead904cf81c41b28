/// Texture trait, texture descriptor, and texture info

use std::any::Any;
use bitflags::bitflags;

/// Image format of a texture or render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    // Color formats
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
    R32G32B32A32_SFLOAT,

    // Shading-rate image format
    R8_UINT,

    // Depth formats
    D16_UNORM,
    D32_FLOAT,
    D24_UNORM_S8_UINT,
    D32_FLOAT_S8_UINT,
}

impl TextureFormat {
    /// Returns true for depth and depth/stencil formats
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::D16_UNORM
                | TextureFormat::D32_FLOAT
                | TextureFormat::D24_UNORM_S8_UINT
                | TextureFormat::D32_FLOAT_S8_UINT
        )
    }

    /// Returns true when the format carries a stencil aspect
    pub fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::D24_UNORM_S8_UINT | TextureFormat::D32_FLOAT_S8_UINT)
    }

    /// Size of one texel in bytes
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8_UINT => 1,
            TextureFormat::D16_UNORM => 2,
            TextureFormat::R8G8B8A8_SRGB
            | TextureFormat::R8G8B8A8_UNORM
            | TextureFormat::B8G8R8A8_SRGB
            | TextureFormat::B8G8R8A8_UNORM
            | TextureFormat::D32_FLOAT
            | TextureFormat::D24_UNORM_S8_UINT => 4,
            TextureFormat::D32_FLOAT_S8_UINT => 8,
            TextureFormat::R32G32B32A32_SFLOAT => 16,
        }
    }
}

bitflags! {
    /// How an image may be used by the GPU
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const SAMPLED = 1 << 0;
        const COLOR_ATTACHMENT = 1 << 1;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 2;
        const SHADING_RATE_ATTACHMENT = 1 << 3;
        const TRANSFER_SRC = 1 << 4;
        const TRANSFER_DST = 1 << 5;
        const STORAGE = 1 << 6;
    }
}

// ===== TEXTURE DESC =====

/// Descriptor for creating a 2-D, single-mip texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Debug label (used in logs and validation messages)
    pub label: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Usage flags
    pub usage: TextureUsage,
}

// ===== TEXTURE INFO =====

/// Read-only properties of a created texture
#[derive(Debug, Clone, PartialEq)]
pub struct TextureInfo {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl From<&TextureDesc> for TextureInfo {
    fn from(desc: &TextureDesc) -> Self {
        Self {
            label: desc.label.clone(),
            width: desc.width,
            height: desc.height,
            format: desc.format,
            usage: desc.usage,
        }
    }
}

// ===== TEXTURE TRAIT =====

/// Texture resource trait
///
/// Implemented by backend-specific texture types (e.g., VulkanTexture).
/// The image, its memory and its view are released when the last `Arc` drops.
pub trait Texture: Send + Sync {
    /// Get the read-only properties of this texture
    fn info(&self) -> &TextureInfo;

    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
