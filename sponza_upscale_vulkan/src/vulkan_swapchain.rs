/// Swapchain - Vulkan implementation of the Swapchain trait
///
/// Owns the window surface. Out-of-date and suboptimal results are
/// reported as `SwapchainStatus` values; only real failures are errors.

use sponza_upscale::sponza::{
    Error, Result,
    render::{Swapchain as RendererSwapchain, SwapchainStatus, Texture as RendererTexture, TextureFormat},
};
use sponza_upscale::{engine_debug, engine_err, engine_error};
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::vk_format_to_texture_format;
use crate::vulkan_texture::Texture;

/// Acquire semaphores cycled between consecutive frames
const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Surface formats the composite pass can target, in preference order
const PREFERRED_FORMATS: [vk::Format; 4] = [
    vk::Format::B8G8R8A8_UNORM,
    vk::Format::B8G8R8A8_SRGB,
    vk::Format::R8G8B8A8_UNORM,
    vk::Format::R8G8B8A8_SRGB,
];

/// Vulkan swapchain implementation
pub struct Swapchain {
    ctx: Arc<GpuContext>,

    /// Surface
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,

    /// Swapchain
    swapchain: vk::SwapchainKHR,
    swapchain_loader: ash::khr::swapchain::Device,
    images: Vec<Arc<Texture>>,
    surface_format: vk::SurfaceFormatKHR,
    format: TextureFormat,
    extent: vk::Extent2D,

    /// One semaphore per frame in flight (for acquire)
    image_available_semaphores: Vec<vk::Semaphore>,
    /// One semaphore per swapchain image (for present)
    render_finished_semaphores: Vec<vk::Semaphore>,

    /// Current frame in flight
    current_frame: usize,
}

impl Swapchain {
    /// Create a swapchain for an already created surface
    ///
    /// Takes ownership of `surface`; it is destroyed with the swapchain,
    /// including when creation fails.
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        surface: vk::SurfaceKHR,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let surface_loader = ash::khr::surface::Instance::new(&ctx.entry, &ctx.instance);
        let swapchain_loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);

        let (surface_format, format) = match choose_surface_format(&ctx, &surface_loader, surface) {
            Ok(formats) => formats,
            Err(e) => {
                unsafe { surface_loader.destroy_surface(surface, None); }
                return Err(e);
            }
        };

        let mut swapchain = Self {
            ctx,
            surface,
            surface_loader,
            swapchain: vk::SwapchainKHR::null(),
            swapchain_loader,
            images: Vec::new(),
            surface_format,
            format,
            extent: vk::Extent2D { width: 0, height: 0 },
            image_available_semaphores: Vec::new(),
            render_finished_semaphores: Vec::new(),
            current_frame: 0,
        };

        // On failure, Drop releases whatever was created so far
        swapchain.build(width, height)?;
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            let semaphore = swapchain.create_semaphore()?;
            swapchain.image_available_semaphores.push(semaphore);
        }

        engine_debug!("sponza::vulkan", "Swapchain created: {}x{} {:?}, {} images",
            swapchain.extent.width, swapchain.extent.height, swapchain.format, swapchain.images.len());
        Ok(swapchain)
    }

    /// Get synchronization info for submitting with this swapchain
    ///
    /// Returns (wait_semaphore, signal_semaphore) for the current frame and image.
    pub(crate) fn sync_info(&self, image_index: u32) -> Result<(vk::Semaphore, vk::Semaphore)> {
        let signal = self.render_finished_semaphores
            .get(image_index as usize)
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!(
                "Swapchain image index {} out of range (count: {})",
                image_index, self.images.len()
            )))?;
        Ok((self.image_available_semaphores[self.current_frame], signal))
    }

    /// Downcast a swapchain created by this backend
    pub(crate) fn cast(swapchain: &dyn RendererSwapchain) -> Result<&Self> {
        swapchain.as_any().downcast_ref::<Self>().ok_or_else(|| {
            Error::InvalidResource("Swapchain was not created by the Vulkan device".to_string())
        })
    }

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        unsafe { self.ctx.device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None) }
            .map_err(|e| {
                engine_error!("sponza::vulkan", "Failed to create semaphore: {:?}", e);
                Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e))
            })
    }

    /// (Re)create the swapchain, its image textures and per-image semaphores
    fn build(&mut self, width: u32, height: u32) -> Result<()> {
        let capabilities = unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(self.ctx.physical_device, self.surface)
        }
        .map_err(|e| {
            engine_error!("sponza::vulkan", "Failed to get surface capabilities: {:?}", e);
            Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e))
        })?;

        let extent = if capabilities.current_extent.width != u32::MAX {
            capabilities.current_extent
        } else {
            vk::Extent2D {
                width: width.clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
                height: height.clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
            }
        };
        if extent.width == 0 || extent.height == 0 {
            return Err(Error::BackendError("Surface has a zero extent".to_string()));
        }

        let image_count = capabilities.min_image_count + 1;
        let image_count = if capabilities.max_image_count > 0 {
            image_count.min(capabilities.max_image_count)
        } else {
            image_count
        };

        let old_swapchain = self.swapchain;
        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(image_count)
            .image_format(self.surface_format.format)
            .image_color_space(self.surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe { self.swapchain_loader.create_swapchain(&create_info, None) }
            .map_err(|e| {
                engine_error!("sponza::vulkan", "Failed to create swapchain: {:?}", e);
                Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
            })?;

        // Old image views stay valid until the framebuffers holding them drop
        self.images.clear();
        self.destroy_render_finished_semaphores();
        if old_swapchain != vk::SwapchainKHR::null() {
            unsafe { self.swapchain_loader.destroy_swapchain(old_swapchain, None); }
        }
        self.swapchain = swapchain;
        self.extent = extent;

        let vk_images = unsafe { self.swapchain_loader.get_swapchain_images(swapchain) }
            .map_err(|e| {
                engine_error!("sponza::vulkan", "Failed to get swapchain images: {:?}", e);
                Error::InitializationFailed(format!("Failed to get swapchain images: {:?}", e))
            })?;

        for (index, image) in vk_images.into_iter().enumerate() {
            let texture = Texture::from_swapchain_image(
                Arc::clone(&self.ctx),
                image,
                self.format,
                extent.width,
                extent.height,
                index,
            )?;
            self.images.push(Arc::new(texture));

            let semaphore = self.create_semaphore()?;
            self.render_finished_semaphores.push(semaphore);
        }
        Ok(())
    }

    fn destroy_render_finished_semaphores(&mut self) {
        for semaphore in self.render_finished_semaphores.drain(..) {
            unsafe { self.ctx.device.destroy_semaphore(semaphore, None); }
        }
    }
}

fn choose_surface_format(
    ctx: &GpuContext,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<(vk::SurfaceFormatKHR, TextureFormat)> {
    let surface_formats = unsafe {
        surface_loader.get_physical_device_surface_formats(ctx.physical_device, surface)
    }
    .map_err(|e| {
        engine_error!("sponza::vulkan", "Failed to query surface formats: {:?}", e);
        Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
    })?;

    PREFERRED_FORMATS
        .iter()
        .find_map(|preferred| surface_formats.iter().find(|f| f.format == *preferred).copied())
        .and_then(|surface_format| {
            vk_format_to_texture_format(surface_format.format).map(|format| (surface_format, format))
        })
        .ok_or_else(|| {
            engine_error!("sponza::vulkan",
                "No supported surface format among {} offered", surface_formats.len());
            Error::InitializationFailed("No supported surface format".to_string())
        })
}

impl RendererSwapchain for Swapchain {
    fn acquire_next_image(&mut self) -> Result<(u32, SwapchainStatus)> {
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                self.image_available_semaphores[self.current_frame],
                vk::Fence::null(),
            )
        };

        match result {
            Ok((image_index, false)) => Ok((image_index, SwapchainStatus::Optimal)),
            Ok((image_index, true)) => Ok((image_index, SwapchainStatus::Suboptimal)),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok((0, SwapchainStatus::OutOfDate)),
            Err(e) => Err(engine_err!("sponza::vulkan",
                "Failed to acquire next swapchain image: {:?}", e)),
        }
    }

    fn present(&mut self, image_index: u32) -> Result<SwapchainStatus> {
        let (_, wait_semaphore) = self.sync_info(image_index)?;
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait_semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe { self.swapchain_loader.queue_present(self.ctx.present_queue, &present_info) };
        // Move to next frame
        self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;

        match result {
            Ok(false) => Ok(SwapchainStatus::Optimal),
            Ok(true) | Err(vk::Result::SUBOPTIMAL_KHR) => Ok(SwapchainStatus::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(SwapchainStatus::OutOfDate),
            Err(e) => Err(engine_err!("sponza::vulkan", "Failed to present swapchain image: {:?}", e)),
        }
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe { self.ctx.device.device_wait_idle() }
            .map_err(|e| engine_err!("sponza::vulkan",
                "Failed to wait idle before swapchain recreate: {:?}", e))?;

        self.build(width, height)?;
        self.current_frame = 0;
        engine_debug!("sponza::vulkan", "Swapchain recreated: {}x{}", self.extent.width, self.extent.height);
        Ok(())
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn width(&self) -> u32 {
        self.extent.width
    }

    fn height(&self) -> u32 {
        self.extent.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn image(&self, index: usize) -> Option<Arc<dyn RendererTexture>> {
        self.images.get(index).map(|texture| Arc::clone(texture) as Arc<dyn RendererTexture>)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();

            for &semaphore in &self.image_available_semaphores {
                self.ctx.device.destroy_semaphore(semaphore, None);
            }
        }
        self.destroy_render_finished_semaphores();
        self.images.clear();

        unsafe {
            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
