/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Bootstraps the instance, picks a physical device with graphics and
/// present queues, enables the render pass 2 and fragment shading rate
/// extensions when available, and exposes every object factory the frame
/// graph needs. Device creation succeeds on hardware missing a requirement;
/// the capabilities report what is absent and preparation fails closed.

use sponza_upscale::sponza::{
    Error, GraphicsDevice, Result,
    render::{
        BindingGroup as RendererBindingGroup, BindingResource, Buffer as RendererBuffer, BufferDesc,
        CommandList as RendererCommandList, DeviceCapabilities, FormatFeature,
        Framebuffer as RendererFramebuffer, FramebufferDesc, Pipeline as RendererPipeline, PipelineDesc,
        RenderPass as RendererRenderPass, RenderPassDesc, Shader as RendererShader, ShaderDesc,
        SpatialUpscaleDesc, SpatialUpscaler as RendererSpatialUpscaler, Swapchain as RendererSwapchain,
        Texture as RendererTexture, TextureDesc, TextureFormat, VrsDispatcher as RendererVrsDispatcher,
        VrsDispatcherDesc,
    },
};
use sponza_upscale::{engine_debug, engine_error, engine_info, engine_warn, engine_err};
use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

use crate::vulkan_binding_group::{BindingGroup, DescriptorPools};
use crate::vulkan_buffer::Buffer;
use crate::vulkan_command_list::CommandList;
use crate::vulkan_config::VulkanConfig;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{format_feature_to_vk, texture_format_to_vk};
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_sampler::SamplerCache;
use crate::vulkan_shader::Shader;
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_texture::Texture;
use crate::vulkan_xengine;

/// Depth formats in order of preference
const DEPTH_FORMAT_CANDIDATES: [TextureFormat; 4] = [
    TextureFormat::D32_FLOAT,
    TextureFormat::D32_FLOAT_S8_UINT,
    TextureFormat::D24_UNORM_S8_UINT,
    TextureFormat::D16_UNORM,
];

/// Queue families and extension support of one physical device
struct DeviceCandidate {
    physical_device: vk::PhysicalDevice,
    name: String,
    graphics_family: u32,
    present_family: u32,
    extensions: Vec<String>,
}

impl DeviceCandidate {
    fn supports_required_extensions(&self) -> bool {
        [ash::khr::create_renderpass2::NAME, ash::khr::fragment_shading_rate::NAME]
            .iter()
            .all(|name| self.has_extension(name))
    }

    fn has_extension(&self, name: &std::ffi::CStr) -> bool {
        name.to_str().is_ok_and(|name| self.extensions.iter().any(|ext| ext == name))
    }
}

/// Vulkan graphics device
///
/// Central object for creating resources and submitting commands. Swapchains
/// are created separately through [`VulkanGraphicsDevice::create_swapchain`].
pub struct VulkanGraphicsDevice {
    ctx: Arc<GpuContext>,
    present_queue_family: u32,
    capabilities: DeviceCapabilities,
    depth_format: TextureFormat,
    /// Signaled once the previous submission has completed
    submit_fence: vk::Fence,
    descriptor_pools: Arc<DescriptorPools>,
    samplers: SamplerCache,
}

impl VulkanGraphicsDevice {
    /// Create a Vulkan device able to present to `window`
    ///
    /// # Arguments
    ///
    /// * `window` - Window used to pick a physical device that can present
    /// * `config` - Instance and validation options
    ///
    /// # Errors
    ///
    /// `InitializationFailed` when no usable GPU is found or an object
    /// needed by every frame cannot be created.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: VulkanConfig) -> Result<Self> {
        let entry = unsafe { ash::Entry::load() }.map_err(|e| {
            engine_error!("sponza::vulkan", "Failed to load Vulkan library: {:?}", e);
            Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
        })?;

        let display_handle = window.display_handle().map_err(|e| {
            engine_error!("sponza::vulkan", "Failed to get display handle: {}", e);
            Error::InitializationFailed(format!("Failed to get display handle: {}", e))
        })?;
        let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
            .map_err(|e| {
                engine_error!("sponza::vulkan", "Failed to get required extensions: {}", e);
                Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
            })?
            .to_vec();

        let validation = config.enable_validation && cfg!(feature = "vulkan-validation");
        if config.enable_validation && !validation {
            engine_warn!("sponza::vulkan",
                "Validation requested but the crate was built without the vulkan-validation feature");
        }
        if validation {
            extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
        }
        let layer_names = if validation {
            vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
        } else {
            vec![]
        };

        let application_name = CString::new(config.application_name.as_str())
            .map_err(|_| Error::InitializationFailed("Application name contains a NUL byte".to_string()))?;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&application_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"Sponza Upscale")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_1);

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);

        let instance = unsafe { entry.create_instance(&create_info, None) }.map_err(|e| {
            engine_error!("sponza::vulkan", "Failed to create Vulkan instance: {:?}", e);
            Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
        })?;

        let debug_utils = if validation {
            match create_debug_messenger(&entry, &instance, &config) {
                Ok(debug_utils) => debug_utils,
                Err(e) => {
                    unsafe { instance.destroy_instance(None); }
                    return Err(e);
                }
            }
        } else {
            None
        };

        // From here on the instance is released by the error path below or by GpuContext
        match Self::create_with_instance(&entry, &instance, window) {
            Ok(parts) => Self::assemble(entry, instance, debug_utils, parts),
            Err(e) => {
                unsafe {
                    if let Some((loader, messenger)) = debug_utils {
                        loader.destroy_debug_utils_messenger(messenger, None);
                    }
                    instance.destroy_instance(None);
                }
                Err(e)
            }
        }
    }

    /// Pick the physical device and create the logical device and allocator
    fn create_with_instance<W: HasDisplayHandle + HasWindowHandle>(
        entry: &ash::Entry,
        instance: &ash::Instance,
        window: &W,
    ) -> Result<DeviceParts> {
        let candidate = pick_physical_device(entry, instance, window)?;
        engine_info!("sponza::vulkan", "Using GPU '{}'", candidate.name);

        let mut capabilities = DeviceCapabilities {
            extensions: candidate.extensions.clone(),
            ..Default::default()
        };
        capabilities.extensions.extend(vulkan_xengine::vendor_extensions(candidate.physical_device));
        capabilities.renderpass2 = candidate.has_extension(ash::khr::create_renderpass2::NAME);

        let has_fsr = candidate.has_extension(ash::khr::fragment_shading_rate::NAME);
        if has_fsr {
            let mut fsr_features = vk::PhysicalDeviceFragmentShadingRateFeaturesKHR::default();
            let mut features2 = vk::PhysicalDeviceFeatures2::default().push_next(&mut fsr_features);
            unsafe { instance.get_physical_device_features2(candidate.physical_device, &mut features2); }
            capabilities.pipeline_fragment_shading_rate = fsr_features.pipeline_fragment_shading_rate == vk::TRUE;
            capabilities.attachment_fragment_shading_rate = fsr_features.attachment_fragment_shading_rate == vk::TRUE;
            capabilities.primitive_fragment_shading_rate = fsr_features.primitive_fragment_shading_rate == vk::TRUE;
        }

        let missing = capabilities.missing_requirements();
        if !missing.is_empty() {
            engine_warn!("sponza::vulkan", "GPU '{}' lacks: {}", candidate.name, missing.join(", "));
        }

        let queue_priorities = [1.0];
        let mut queue_create_infos = vec![
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(candidate.graphics_family)
                .queue_priorities(&queue_priorities),
        ];
        if candidate.present_family != candidate.graphics_family {
            queue_create_infos.push(
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(candidate.present_family)
                    .queue_priorities(&queue_priorities),
            );
        }

        let mut device_extension_names = vec![ash::khr::swapchain::NAME.as_ptr()];
        if capabilities.renderpass2 {
            device_extension_names.push(ash::khr::create_renderpass2::NAME.as_ptr());
        }
        if has_fsr {
            device_extension_names.push(ash::khr::fragment_shading_rate::NAME.as_ptr());
        }

        // Primitive shading rate is never used
        let mut fsr_enable = vk::PhysicalDeviceFragmentShadingRateFeaturesKHR::default()
            .pipeline_fragment_shading_rate(capabilities.pipeline_fragment_shading_rate)
            .attachment_fragment_shading_rate(capabilities.attachment_fragment_shading_rate);

        let mut device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extension_names);
        if has_fsr {
            device_create_info = device_create_info.push_next(&mut fsr_enable);
        }

        let device = unsafe { instance.create_device(candidate.physical_device, &device_create_info, None) }
            .map_err(|e| {
                engine_error!("sponza::vulkan", "Failed to create logical device: {:?}", e);
                Error::InitializationFailed(format!("Failed to create device: {:?}", e))
            })?;

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device: candidate.physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        });
        let allocator = match allocator {
            Ok(allocator) => allocator,
            Err(e) => {
                unsafe { device.destroy_device(None); }
                engine_error!("sponza::vulkan", "Failed to create GPU allocator: {:?}", e);
                return Err(Error::InitializationFailed(format!("Failed to create allocator: {:?}", e)));
            }
        };

        let renderpass2 = capabilities.renderpass2
            .then(|| ash::khr::create_renderpass2::Device::new(instance, &device));
        let fragment_shading_rate = has_fsr
            .then(|| ash::khr::fragment_shading_rate::Device::new(instance, &device));

        Ok(DeviceParts {
            candidate,
            capabilities,
            device,
            allocator,
            renderpass2,
            fragment_shading_rate,
        })
    }

    /// Wrap the created objects into the shared context and per-device state
    fn assemble(
        entry: ash::Entry,
        instance: ash::Instance,
        debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
        parts: DeviceParts,
    ) -> Result<Self> {
        let DeviceParts { candidate, capabilities, device, allocator, renderpass2, fragment_shading_rate } = parts;

        let graphics_queue = unsafe { device.get_device_queue(candidate.graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(candidate.present_family, 0) };

        // GpuContext owns device, allocator, messenger and instance destruction
        let ctx = Arc::new(GpuContext {
            entry,
            instance,
            physical_device: candidate.physical_device,
            device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            graphics_queue,
            graphics_queue_family: candidate.graphics_family,
            present_queue,
            renderpass2,
            fragment_shading_rate,
            debug_utils,
        });

        let depth_format = DEPTH_FORMAT_CANDIDATES
            .into_iter()
            .find(|&format| format_supports(&ctx, format, FormatFeature::DepthStencilAttachment))
            .ok_or_else(|| {
                engine_error!("sponza::vulkan", "No supported depth format");
                Error::InitializationFailed("No supported depth format".to_string())
            })?;

        let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
        let submit_fence = unsafe { ctx.device.create_fence(&fence_info, None) }.map_err(|e| {
            engine_error!("sponza::vulkan", "Failed to create submit fence: {:?}", e);
            Error::InitializationFailed(format!("Failed to create fence: {:?}", e))
        })?;

        let descriptor_pools = match DescriptorPools::new(Arc::clone(&ctx)) {
            Ok(pools) => Arc::new(pools),
            Err(e) => {
                unsafe { ctx.device.destroy_fence(submit_fence, None); }
                return Err(e);
            }
        };

        engine_debug!("sponza::vulkan", "Device ready (depth format {:?}, {} extensions)",
            depth_format, capabilities.extensions.len());

        Ok(Self {
            samplers: SamplerCache::new(Arc::clone(&ctx)),
            present_queue_family: candidate.present_family,
            ctx,
            capabilities,
            depth_format,
            submit_fence,
            descriptor_pools,
        })
    }

    /// Create a swapchain presenting to `window`
    ///
    /// # Errors
    ///
    /// `InitializationFailed` when the surface cannot be created or the
    /// device cannot present to it.
    pub fn create_swapchain<W: HasDisplayHandle + HasWindowHandle>(
        &self,
        window: &W,
        width: u32,
        height: u32,
    ) -> Result<Swapchain> {
        let surface = create_surface(&self.ctx.entry, &self.ctx.instance, window)?;

        let surface_loader = ash::khr::surface::Instance::new(&self.ctx.entry, &self.ctx.instance);
        let supported = unsafe {
            surface_loader.get_physical_device_surface_support(
                self.ctx.physical_device, self.present_queue_family, surface)
        }
        .unwrap_or(false);
        if !supported {
            unsafe { surface_loader.destroy_surface(surface, None); }
            engine_error!("sponza::vulkan", "Present queue cannot present to this surface");
            return Err(Error::InitializationFailed("Surface not supported by the present queue".to_string()));
        }

        Swapchain::new(Arc::clone(&self.ctx), surface, width, height)
    }
}

/// Objects created between the instance and the shared context
struct DeviceParts {
    candidate: DeviceCandidate,
    capabilities: DeviceCapabilities,
    device: ash::Device,
    allocator: Allocator,
    renderpass2: Option<ash::khr::create_renderpass2::Device>,
    fragment_shading_rate: Option<ash::khr::fragment_shading_rate::Device>,
}

// ============================================================================
// Bootstrap helpers
// ============================================================================

#[cfg(feature = "vulkan-validation")]
fn create_debug_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
    config: &VulkanConfig,
) -> Result<Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>> {
    let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

    crate::debug::init_debug_config(crate::debug::Config {
        severity: config.debug_severity,
        output: config.debug_output.clone(),
        message_filter: config.debug_message_filter,
        break_on_error: config.break_on_validation_error,
        panic_on_error: config.panic_on_error,
        enable_stats: config.enable_validation_stats,
    });

    let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(crate::debug::severity_flags(config.debug_severity))
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

    let messenger = unsafe { debug_utils.create_debug_utils_messenger(&debug_info, None) }
        .map_err(|e| {
            engine_error!("sponza::vulkan", "Failed to create debug messenger: {:?}", e);
            Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
        })?;

    Ok(Some((debug_utils, messenger)))
}

#[cfg(not(feature = "vulkan-validation"))]
fn create_debug_messenger(
    _entry: &ash::Entry,
    _instance: &ash::Instance,
    _config: &VulkanConfig,
) -> Result<Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>> {
    Ok(None)
}

fn create_surface<W: HasDisplayHandle + HasWindowHandle>(
    entry: &ash::Entry,
    instance: &ash::Instance,
    window: &W,
) -> Result<vk::SurfaceKHR> {
    let display_handle = window.display_handle().map_err(|e| {
        engine_error!("sponza::vulkan", "Failed to get display handle: {}", e);
        Error::InitializationFailed(format!("Failed to get display handle: {}", e))
    })?;
    let window_handle = window.window_handle().map_err(|e| {
        engine_error!("sponza::vulkan", "Failed to get window handle: {}", e);
        Error::InitializationFailed(format!("Failed to get window handle: {}", e))
    })?;

    unsafe {
        ash_window::create_surface(entry, instance, display_handle.as_raw(), window_handle.as_raw(), None)
    }
    .map_err(|e| {
        engine_error!("sponza::vulkan", "Failed to create surface: {:?}", e);
        Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
    })
}

/// Pick a device with graphics and present queues, preferring one with the
/// render pass 2 and fragment shading rate extensions
fn pick_physical_device<W: HasDisplayHandle + HasWindowHandle>(
    entry: &ash::Entry,
    instance: &ash::Instance,
    window: &W,
) -> Result<DeviceCandidate> {
    // Temporary surface for queue selection
    let surface = create_surface(entry, instance, window)?;
    let surface_loader = ash::khr::surface::Instance::new(entry, instance);

    let candidates = unsafe { instance.enumerate_physical_devices() }
        .map(|devices| {
            devices
                .into_iter()
                .filter_map(|device| inspect_physical_device(instance, &surface_loader, surface, device))
                .collect::<Vec<_>>()
        });

    unsafe { surface_loader.destroy_surface(surface, None); }

    let mut candidates = candidates.map_err(|e| {
        engine_error!("sponza::vulkan", "Failed to enumerate physical devices: {:?}", e);
        Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
    })?;

    let preferred = candidates.iter().position(DeviceCandidate::supports_required_extensions);
    match preferred {
        Some(index) => Ok(candidates.swap_remove(index)),
        None if !candidates.is_empty() => Ok(candidates.swap_remove(0)),
        None => {
            engine_error!("sponza::vulkan", "No Vulkan GPU with graphics and present queues found");
            Err(Error::InitializationFailed("No Vulkan-capable GPU found".to_string()))
        }
    }
}

fn inspect_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
) -> Option<DeviceCandidate> {
    let queue_families = unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

    let graphics_family = queue_families
        .iter()
        .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))? as u32;

    let supports_present = |family: u32| unsafe {
        surface_loader
            .get_physical_device_surface_support(physical_device, family, surface)
            .unwrap_or(false)
    };
    let present_family = if supports_present(graphics_family) {
        graphics_family
    } else {
        (0..queue_families.len() as u32).find(|&family| supports_present(family))?
    };

    let properties = unsafe { instance.get_physical_device_properties(physical_device) };
    let name = properties
        .device_name_as_c_str()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "Unknown GPU".to_string());

    let extensions = unsafe { instance.enumerate_device_extension_properties(physical_device) }
        .unwrap_or_default()
        .iter()
        .filter_map(|ext| ext.extension_name_as_c_str().ok())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();

    Some(DeviceCandidate {
        physical_device,
        name,
        graphics_family,
        present_family,
        extensions,
    })
}

fn format_supports(ctx: &GpuContext, format: TextureFormat, feature: FormatFeature) -> bool {
    let properties = unsafe {
        ctx.instance.get_physical_device_format_properties(ctx.physical_device, texture_format_to_vk(format))
    };
    properties.optimal_tiling_features.contains(format_feature_to_vk(feature))
}

// ============================================================================
// GraphicsDevice implementation
// ============================================================================

impl GraphicsDevice for VulkanGraphicsDevice {
    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn supports_format_feature(&self, format: TextureFormat, feature: FormatFeature) -> bool {
        format_supports(&self.ctx, format, feature)
    }

    fn depth_format(&self) -> TextureFormat {
        self.depth_format
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn RendererTexture>> {
        Ok(Arc::new(Texture::new(Arc::clone(&self.ctx), &desc)?))
    }

    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn RendererBuffer>> {
        Ok(Arc::new(Buffer::new(Arc::clone(&self.ctx), &desc)?))
    }

    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn RendererShader>> {
        Ok(Arc::new(Shader::new(Arc::clone(&self.ctx), &desc)?))
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<Arc<dyn RendererRenderPass>> {
        Ok(Arc::new(RenderPass::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<Arc<dyn RendererFramebuffer>> {
        Ok(Arc::new(Framebuffer::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn RendererPipeline>> {
        Ok(Arc::new(Pipeline::new(Arc::clone(&self.ctx), &desc)?))
    }

    fn create_binding_group(
        &mut self,
        pipeline: &Arc<dyn RendererPipeline>,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn RendererBindingGroup>> {
        let group = BindingGroup::new(&self.descriptor_pools, &mut self.samplers, pipeline, set_index, resources)?;
        Ok(Arc::new(group))
    }

    fn create_command_lists(&mut self, count: usize) -> Result<Vec<Box<dyn RendererCommandList>>> {
        (0..count)
            .map(|_| {
                CommandList::new(Arc::clone(&self.ctx))
                    .map(|list| Box::new(list) as Box<dyn RendererCommandList>)
            })
            .collect()
    }

    fn create_spatial_upscaler(&mut self, desc: &SpatialUpscaleDesc) -> Result<Box<dyn RendererSpatialUpscaler>> {
        vulkan_xengine::create_spatial_upscaler(&self.ctx, desc)
    }

    fn create_vrs_dispatcher(&mut self, desc: &VrsDispatcherDesc) -> Result<Box<dyn RendererVrsDispatcher>> {
        vulkan_xengine::create_vrs_dispatcher(&self.ctx, desc)
    }

    fn submit(
        &mut self,
        command_list: &dyn RendererCommandList,
        swapchain: &dyn RendererSwapchain,
        image_index: u32,
    ) -> Result<()> {
        let vk_cmd = CommandList::cast(command_list)?;
        if !vk_cmd.is_recorded() {
            return Err(Error::InvalidResource("Submitted command list has not been recorded".to_string()));
        }
        let (wait_semaphore, signal_semaphore) = Swapchain::cast(swapchain)?.sync_info(image_index)?;

        unsafe {
            self.ctx.device
                .wait_for_fences(&[self.submit_fence], true, u64::MAX)
                .map_err(|e| engine_err!("sponza::vulkan", "Failed to wait for submit fence: {:?}", e))?;
            self.ctx.device
                .reset_fences(&[self.submit_fence])
                .map_err(|e| engine_err!("sponza::vulkan", "Failed to reset submit fence: {:?}", e))?;

            let wait_semaphores = [wait_semaphore];
            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let signal_semaphores = [signal_semaphore];
            let command_buffers = [vk_cmd.command_buffer()];

            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);

            self.ctx.device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], self.submit_fence)
                .map_err(|e| engine_err!("sponza::vulkan", "Failed to submit commands to GPU queue: {:?}", e))?;
        }
        Ok(())
    }

    fn queue_wait_idle(&self) -> Result<()> {
        unsafe { self.ctx.device.queue_wait_idle(self.ctx.graphics_queue) }
            .map_err(|e| engine_err!("sponza::vulkan", "Failed to wait for queue idle: {:?}", e))
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe { self.ctx.device.device_wait_idle() }
            .map_err(|e| engine_err!("sponza::vulkan", "Failed to wait for device idle: {:?}", e))
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();
            self.samplers.shutdown();
            self.ctx.device.destroy_fence(self.submit_fence, None);
        }
        // Descriptor pools and the context go with the last Arc
    }
}
