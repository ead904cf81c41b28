/// Attachment Manager
///
/// An `Attachment` is a plain value: one device texture plus the format and
/// size it was created with. Creation is synchronous and destruction is
/// idempotent.

use std::sync::Arc;

use crate::config::SHADING_RATE_TEXEL_SIZE;
use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, Texture, TextureDesc, TextureFormat, TextureUsage, FormatFeature, Extent2D,
};
use crate::engine_error;

/// Size of the shading-rate image covering a `width x height` target
pub fn shading_rate_extent(width: u32, height: u32) -> Extent2D {
    Extent2D::new(
        width.div_ceil(SHADING_RATE_TEXEL_SIZE),
        height.div_ceil(SHADING_RATE_TEXEL_SIZE),
    )
}

#[derive(Clone)]
pub struct Attachment {
    texture: Option<Arc<dyn Texture>>,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
}

impl Attachment {
    /// Allocate a 2-D attachment; `SAMPLED` is always added to `usage`
    pub fn create(
        device: &mut dyn GraphicsDevice,
        label: &str,
        format: TextureFormat,
        usage: TextureUsage,
        extent: Extent2D,
    ) -> Result<Self> {
        let texture = device.create_texture(TextureDesc {
            label: label.to_string(),
            width: extent.width,
            height: extent.height,
            format,
            usage: usage | TextureUsage::SAMPLED,
        })?;
        Ok(Self {
            texture: Some(texture),
            format,
            width: extent.width,
            height: extent.height,
        })
    }

    /// Color render target read by a later pass
    pub fn color(
        device: &mut dyn GraphicsDevice,
        label: &str,
        format: TextureFormat,
        extent: Extent2D,
    ) -> Result<Self> {
        Self::create(device, label, format, TextureUsage::COLOR_ATTACHMENT, extent)
    }

    /// Depth target in the device's depth format
    pub fn depth(device: &mut dyn GraphicsDevice, label: &str, extent: Extent2D) -> Result<Self> {
        let format = device.depth_format();
        Self::create(device, label, format, TextureUsage::DEPTH_STENCIL_ATTACHMENT, extent)
    }

    /// R8_UINT shading-rate image covering a `target`-sized attachment
    ///
    /// # Errors
    ///
    /// `InitializationFailed` when R8_UINT lacks the shading-rate attachment
    /// feature with optimal tiling.
    pub fn shading_rate(device: &mut dyn GraphicsDevice, label: &str, target: Extent2D) -> Result<Self> {
        let format = TextureFormat::R8_UINT;
        if !device.supports_format_feature(format, FormatFeature::FragmentShadingRateAttachment) {
            engine_error!(
                "sponza::Attachment",
                "R8_UINT does not support fragment shading rate attachments"
            );
            return Err(Error::InitializationFailed(
                "shading rate attachment format unsupported".to_string(),
            ));
        }
        let usage = TextureUsage::SHADING_RATE_ATTACHMENT
            | TextureUsage::TRANSFER_DST
            | TextureUsage::STORAGE;
        Self::create(device, label, format, usage, shading_rate_extent(target.width, target.height))
    }

    /// The backing texture
    ///
    /// # Errors
    ///
    /// `InvalidResource` after `destroy`.
    pub fn texture(&self) -> Result<&Arc<dyn Texture>> {
        self.texture
            .as_ref()
            .ok_or_else(|| Error::InvalidResource("attachment already destroyed".to_string()))
    }

    pub fn is_allocated(&self) -> bool {
        self.texture.is_some()
    }

    pub fn extent(&self) -> Extent2D {
        Extent2D::new(self.width, self.height)
    }

    /// Release the texture (safe to call repeatedly)
    pub fn destroy(&mut self) {
        self.texture.take();
    }
}

#[cfg(test)]
#[path = "attachment_tests.rs"]
mod tests;
