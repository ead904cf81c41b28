/// SamplerCache - internal VkSampler management for the Vulkan backend
///
/// Creates and caches VkSampler objects on first use. The renderer needs
/// four samplers at most.

use sponza_upscale::sponza::{Error, Result, render::SamplerType};
use sponza_upscale::engine_err;
use crate::vulkan_context::GpuContext;
use ash::vk;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Internal sampler cache - creates VkSampler on first use, destroys on shutdown/drop
pub(crate) struct SamplerCache {
    ctx: Option<Arc<GpuContext>>,
    cache: FxHashMap<SamplerType, vk::Sampler>,
}

impl SamplerCache {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Self {
        Self {
            ctx: Some(ctx),
            cache: FxHashMap::default(),
        }
    }

    /// Get or create a VkSampler for the given type
    pub(crate) fn get(&mut self, sampler_type: SamplerType) -> Result<vk::Sampler> {
        if let Some(&sampler) = self.cache.get(&sampler_type) {
            return Ok(sampler);
        }

        let ctx = self.ctx.as_ref()
            .ok_or_else(|| Error::BackendError("Sampler cache used after shutdown".to_string()))?;
        let sampler = Self::create_vk_sampler(ctx, sampler_type)?;
        self.cache.insert(sampler_type, sampler);
        Ok(sampler)
    }

    /// Destroy all cached VkSamplers and release the GpuContext reference
    pub(crate) fn shutdown(&mut self) {
        if let Some(ctx) = &self.ctx {
            for (_, sampler) in self.cache.drain() {
                unsafe { ctx.device.destroy_sampler(sampler, None); }
            }
        }
        self.ctx = None;
    }

    fn create_vk_sampler(ctx: &GpuContext, sampler_type: SamplerType) -> Result<vk::Sampler> {
        let (filter, mipmap, address, max_lod) = match sampler_type {
            SamplerType::NearestClamp => (
                vk::Filter::NEAREST,
                vk::SamplerMipmapMode::NEAREST,
                vk::SamplerAddressMode::CLAMP_TO_EDGE,
                8.0,
            ),
            SamplerType::NearestClampSingleLod => (
                vk::Filter::NEAREST,
                vk::SamplerMipmapMode::NEAREST,
                vk::SamplerAddressMode::CLAMP_TO_EDGE,
                1.0,
            ),
            SamplerType::LinearClamp => (
                vk::Filter::LINEAR,
                vk::SamplerMipmapMode::LINEAR,
                vk::SamplerAddressMode::CLAMP_TO_EDGE,
                vk::LOD_CLAMP_NONE,
            ),
            SamplerType::LinearRepeat => (
                vk::Filter::LINEAR,
                vk::SamplerMipmapMode::LINEAR,
                vk::SamplerAddressMode::REPEAT,
                vk::LOD_CLAMP_NONE,
            ),
        };

        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(filter)
            .min_filter(filter)
            .mipmap_mode(mipmap)
            .address_mode_u(address)
            .address_mode_v(address)
            .address_mode_w(address)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(max_lod)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_WHITE)
            .anisotropy_enable(false)
            .max_anisotropy(1.0)
            .compare_enable(false)
            .compare_op(vk::CompareOp::NEVER)
            .unnormalized_coordinates(false);

        unsafe { ctx.device.create_sampler(&create_info, None) }
            .map_err(|e| engine_err!("sponza::vulkan",
                "Failed to create {:?} sampler: {:?}", sampler_type, e))
    }
}

impl Drop for SamplerCache {
    fn drop(&mut self) {
        // Nothing left when shutdown() already ran
        if let Some(ctx) = &self.ctx {
            for (_, sampler) in self.cache.drain() {
                unsafe { ctx.device.destroy_sampler(sampler, None); }
            }
        }
    }
}
