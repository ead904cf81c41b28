/// Texture - Vulkan implementation of the Texture trait
///
/// Offscreen attachments own their image and memory. Swapchain images are
/// wrapped without ownership: only the view is destroyed on drop.

use sponza_upscale::sponza::{
    Error, Result,
    render::{Texture as RendererTexture, TextureDesc, TextureFormat, TextureInfo, TextureUsage},
};
use sponza_upscale::engine_err;
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{aspect_mask, texture_format_to_vk, texture_usage_to_vk};

/// Vulkan texture implementation
pub struct Texture {
    /// Shared GPU context (for cleanup)
    ctx: Arc<GpuContext>,
    /// Vulkan image
    pub(crate) image: vk::Image,
    /// Vulkan image view
    pub(crate) view: vk::ImageView,
    /// GPU memory allocation (None for swapchain images)
    allocation: Option<Allocation>,
    /// Whether the image is destroyed with this texture
    owns_image: bool,
    /// Read-only texture properties
    info: TextureInfo,
}

impl Texture {
    /// Create a device-local 2-D texture and its view
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &TextureDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::InvalidResource(format!(
                "Texture '{}' has a zero extent ({}x{})",
                desc.label, desc.width, desc.height
            )));
        }

        let format = texture_format_to_vk(desc.format);
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D { width: desc.width, height: desc.height, depth: 1 })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(texture_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        unsafe {
            let image = ctx.device.create_image(&image_info, None)
                .map_err(|e| engine_err!("sponza::vulkan",
                    "Failed to create image '{}': {:?}", desc.label, e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = {
                let mut allocator = match ctx.allocator() {
                    Ok(allocator) => allocator,
                    Err(e) => {
                        ctx.device.destroy_image(image, None);
                        return Err(e);
                    }
                };
                allocator.allocate(&AllocationCreateDesc {
                    name: &desc.label,
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
            };

            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(gpu_allocator::AllocationError::OutOfMemory) => {
                    sponza_upscale::engine_error!("sponza::vulkan",
                        "Out of GPU memory allocating texture '{}' ({}x{} {:?})",
                        desc.label, desc.width, desc.height, desc.format);
                    ctx.device.destroy_image(image, None);
                    return Err(Error::OutOfMemory);
                }
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    return Err(engine_err!("sponza::vulkan",
                        "Failed to allocate memory for texture '{}': {:?}", desc.label, e));
                }
            };

            if let Err(e) = ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                if let Ok(mut allocator) = ctx.allocator() {
                    allocator.free(allocation).ok();
                }
                ctx.device.destroy_image(image, None);
                return Err(engine_err!("sponza::vulkan",
                    "Failed to bind memory for texture '{}': {:?}", desc.label, e));
            }

            let view = match create_view(&ctx.device, image, desc.format) {
                Ok(view) => view,
                Err(e) => {
                    if let Ok(mut allocator) = ctx.allocator() {
                        allocator.free(allocation).ok();
                    }
                    ctx.device.destroy_image(image, None);
                    return Err(engine_err!("sponza::vulkan",
                        "Failed to create view for texture '{}': {:?}", desc.label, e));
                }
            };

            Ok(Self {
                ctx,
                image,
                view,
                allocation: Some(allocation),
                owns_image: true,
                info: TextureInfo::from(desc),
            })
        }
    }

    /// Wrap a swapchain image (the swapchain keeps ownership of the image)
    pub(crate) fn from_swapchain_image(
        ctx: Arc<GpuContext>,
        image: vk::Image,
        format: TextureFormat,
        width: u32,
        height: u32,
        index: usize,
    ) -> Result<Self> {
        let view = unsafe { create_view(&ctx.device, image, format) }
            .map_err(|e| engine_err!("sponza::vulkan",
                "Failed to create swapchain image view {}: {:?}", index, e))?;

        Ok(Self {
            ctx,
            image,
            view,
            allocation: None,
            owns_image: false,
            info: TextureInfo {
                label: format!("swapchain_{}", index),
                width,
                height,
                format,
                usage: TextureUsage::COLOR_ATTACHMENT,
            },
        })
    }

    /// Downcast a texture created by this backend
    pub(crate) fn cast(texture: &dyn RendererTexture) -> Result<&Self> {
        texture.as_any().downcast_ref::<Self>().ok_or_else(|| {
            Error::InvalidResource(format!(
                "Texture '{}' was not created by the Vulkan device",
                texture.info().label
            ))
        })
    }

    /// Subresource range covering the single mip and layer
    pub(crate) fn subresource_range(&self) -> vk::ImageSubresourceRange {
        full_range(self.info.format)
    }
}

unsafe fn create_view(
    device: &ash::Device,
    image: vk::Image,
    format: TextureFormat,
) -> std::result::Result<vk::ImageView, vk::Result> {
    let view_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(texture_format_to_vk(format))
        .components(vk::ComponentMapping::default())
        .subresource_range(full_range(format));

    device.create_image_view(&view_info, None)
}

fn full_range(format: TextureFormat) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: aspect_mask(format),
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

impl RendererTexture for Texture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.view, None);

            if let Some(allocation) = self.allocation.take() {
                // Don't panic if lock fails - we still need to destroy the image
                if let Ok(mut allocator) = self.ctx.allocator() {
                    allocator.free(allocation).ok();
                }
            }

            if self.owns_image {
                self.ctx.device.destroy_image(self.image, None);
            }
        }
    }
}
