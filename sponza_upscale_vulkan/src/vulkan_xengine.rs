/// Vendor XEngine kernels - spatial upscale and adaptive VRS
///
/// The kernels live in the vendor `xengine` shared library and are reached
/// through its C API. Without the `xengine` feature the device reports
/// neither vendor extension and kernel creation fails with
/// `MissingExtension`, so preparation fails closed.

use sponza_upscale::sponza::{
    Result,
    render::{SpatialUpscaler as RendererSpatialUpscaler, SpatialUpscaleDesc,
             VrsDispatcher as RendererVrsDispatcher, VrsDispatcherDesc},
};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

#[cfg(not(feature = "xengine"))]
use sponza_upscale::sponza::{
    Error,
    render::{XEG_SPATIAL_UPSCALE_EXTENSION_NAME, XEG_ADAPTIVE_VRS_EXTENSION_NAME},
};

// ============================================================================
// Entry points used by the device
// ============================================================================

/// Vendor extensions exposed for the physical device
#[cfg(feature = "xengine")]
pub(crate) fn vendor_extensions(physical_device: ash::vk::PhysicalDevice) -> Vec<String> {
    kernels::enumerate_extensions(physical_device)
}

#[cfg(not(feature = "xengine"))]
pub(crate) fn vendor_extensions(_physical_device: ash::vk::PhysicalDevice) -> Vec<String> {
    Vec::new()
}

#[cfg(feature = "xengine")]
pub(crate) fn create_spatial_upscaler(
    ctx: &Arc<GpuContext>,
    desc: &SpatialUpscaleDesc,
) -> Result<Box<dyn RendererSpatialUpscaler>> {
    Ok(Box::new(kernels::SpatialUpscaler::new(Arc::clone(ctx), desc)?))
}

#[cfg(not(feature = "xengine"))]
pub(crate) fn create_spatial_upscaler(
    _ctx: &Arc<GpuContext>,
    _desc: &SpatialUpscaleDesc,
) -> Result<Box<dyn RendererSpatialUpscaler>> {
    Err(Error::MissingExtension(XEG_SPATIAL_UPSCALE_EXTENSION_NAME.to_string()))
}

#[cfg(feature = "xengine")]
pub(crate) fn create_vrs_dispatcher(
    ctx: &Arc<GpuContext>,
    desc: &VrsDispatcherDesc,
) -> Result<Box<dyn RendererVrsDispatcher>> {
    Ok(Box::new(kernels::VrsDispatcher::new(Arc::clone(ctx), desc)?))
}

#[cfg(not(feature = "xengine"))]
pub(crate) fn create_vrs_dispatcher(
    _ctx: &Arc<GpuContext>,
    _desc: &VrsDispatcherDesc,
) -> Result<Box<dyn RendererVrsDispatcher>> {
    Err(Error::MissingExtension(XEG_ADAPTIVE_VRS_EXTENSION_NAME.to_string()))
}

// ============================================================================
// C API
// ============================================================================

#[cfg(feature = "xengine")]
#[allow(non_snake_case)]
mod ffi {
    use ash::vk;
    use std::os::raw::{c_char, c_void};

    pub type XegSpatialUpscale = *mut c_void;
    pub type XegAdaptiveVrs = *mut c_void;

    #[repr(C)]
    pub struct XegExtensionProperties {
        pub extension_name: [c_char; vk::MAX_EXTENSION_NAME_SIZE],
        pub spec_version: u32,
    }

    #[repr(C)]
    pub struct XegSpatialUpscaleCreateInfo {
        pub format: vk::Format,
        pub sharpness: f32,
        pub output_size: vk::Extent2D,
        pub input_region: vk::Rect2D,
        pub input_size: vk::Extent2D,
        pub output_region: vk::Rect2D,
    }

    #[repr(C)]
    pub struct XegSpatialUpscaleDescription {
        pub input_image: vk::ImageView,
        pub output_image: vk::ImageView,
    }

    #[repr(C)]
    pub struct XegAdaptiveVrsCreateInfo {
        pub input_size: vk::Extent2D,
        pub input_region: vk::Rect2D,
        pub adaptive_tile_size: u32,
        pub error_sensitivity: f32,
        pub flip: bool,
    }

    #[repr(C)]
    pub struct XegAdaptiveVrsDescription {
        pub input_color_image: vk::ImageView,
        pub input_depth_image: vk::ImageView,
        pub output_shading_rate_image: vk::ImageView,
        /// Column-major 4x4 matrix, null disables reprojection
        pub reprojection_matrix: *const f32,
    }

    #[link(name = "xengine")]
    extern "C" {
        pub fn HMS_XEG_EnumerateDeviceExtensionProperties(
            physical_device: vk::PhysicalDevice,
            property_count: *mut u32,
            properties: *mut XegExtensionProperties,
        ) -> vk::Result;

        pub fn HMS_XEG_CreateSpatialUpscale(
            device: vk::Device,
            create_info: *const XegSpatialUpscaleCreateInfo,
            spatial_upscale: *mut XegSpatialUpscale,
        ) -> vk::Result;

        pub fn HMS_XEG_CmdRenderSpatialUpscale(
            command_buffer: vk::CommandBuffer,
            spatial_upscale: XegSpatialUpscale,
            description: *const XegSpatialUpscaleDescription,
        );

        pub fn HMS_XEG_DestroySpatialUpscale(spatial_upscale: XegSpatialUpscale);

        pub fn HMS_XEG_CreateAdaptiveVRS(
            device: vk::Device,
            create_info: *const XegAdaptiveVrsCreateInfo,
            adaptive_vrs: *mut XegAdaptiveVrs,
        ) -> vk::Result;

        pub fn HMS_XEG_CmdDispatchAdaptiveVRS(
            command_buffer: vk::CommandBuffer,
            adaptive_vrs: XegAdaptiveVrs,
            description: *const XegAdaptiveVrsDescription,
        );

        pub fn HMS_XEG_DestroyAdaptiveVRS(adaptive_vrs: XegAdaptiveVrs);
    }
}

// ============================================================================
// Kernel wrappers
// ============================================================================

#[cfg(feature = "xengine")]
mod kernels {
    use super::ffi;
    use sponza_upscale::sponza::{
        Result,
        render::{
            CommandList as RendererCommandList, Texture as RendererTexture, Extent2D,
            SpatialUpscaler as RendererSpatialUpscaler, SpatialUpscaleDesc,
            VrsDispatcher as RendererVrsDispatcher, VrsDispatcherDesc, VrsDispatchDesc,
        },
    };
    use sponza_upscale::{engine_debug, engine_err, engine_warn};
    use ash::vk;
    use std::ffi::CStr;
    use std::sync::Arc;

    use crate::vulkan_command_list::CommandList;
    use crate::vulkan_context::GpuContext;
    use crate::vulkan_format::{texture_format_to_vk, rect_to_vk};
    use crate::vulkan_texture::Texture;

    fn extent_to_vk(extent: Extent2D) -> vk::Extent2D {
        vk::Extent2D { width: extent.width, height: extent.height }
    }

    fn view_of(texture: &Arc<dyn RendererTexture>) -> Result<vk::ImageView> {
        Texture::cast(texture.as_ref()).map(|texture| texture.view)
    }

    /// Names of the vendor extensions available on `physical_device`
    pub(super) fn enumerate_extensions(physical_device: vk::PhysicalDevice) -> Vec<String> {
        unsafe {
            let mut count = 0u32;
            let result = ffi::HMS_XEG_EnumerateDeviceExtensionProperties(
                physical_device, &mut count, std::ptr::null_mut());
            if result != vk::Result::SUCCESS || count == 0 {
                engine_warn!("sponza::vulkan", "XEngine reports no extensions ({:?})", result);
                return Vec::new();
            }

            let mut properties: Vec<ffi::XegExtensionProperties> = (0..count)
                .map(|_| ffi::XegExtensionProperties {
                    extension_name: [0; vk::MAX_EXTENSION_NAME_SIZE],
                    spec_version: 0,
                })
                .collect();
            let result = ffi::HMS_XEG_EnumerateDeviceExtensionProperties(
                physical_device, &mut count, properties.as_mut_ptr());
            if result != vk::Result::SUCCESS {
                engine_warn!("sponza::vulkan", "XEngine extension enumeration failed: {:?}", result);
                return Vec::new();
            }
            properties.truncate(count as usize);

            properties
                .iter()
                .filter_map(|property| {
                    CStr::from_ptr(property.extension_name.as_ptr())
                        .to_str()
                        .ok()
                        .map(str::to_string)
                })
                .collect()
        }
    }

    // ===== SPATIAL UPSCALE =====

    pub(super) struct SpatialUpscaler {
        // Keeps the device alive until the kernel is destroyed
        _ctx: Arc<GpuContext>,
        handle: ffi::XegSpatialUpscale,
    }

    // The kernel handle is only used to record into externally synchronized command buffers
    unsafe impl Send for SpatialUpscaler {}
    unsafe impl Sync for SpatialUpscaler {}

    impl SpatialUpscaler {
        pub(super) fn new(ctx: Arc<GpuContext>, desc: &SpatialUpscaleDesc) -> Result<Self> {
            let create_info = ffi::XegSpatialUpscaleCreateInfo {
                format: texture_format_to_vk(desc.format),
                sharpness: desc.sharpness,
                output_size: extent_to_vk(desc.output_size),
                input_region: rect_to_vk(desc.input_region),
                input_size: extent_to_vk(desc.input_size),
                output_region: rect_to_vk(desc.output_region),
            };

            let mut handle: ffi::XegSpatialUpscale = std::ptr::null_mut();
            let result = unsafe {
                ffi::HMS_XEG_CreateSpatialUpscale(ctx.device.handle(), &create_info, &mut handle)
            };
            if result != vk::Result::SUCCESS || handle.is_null() {
                return Err(engine_err!("sponza::vulkan",
                    "XEngine spatial upscale creation failed: {:?}", result));
            }

            engine_debug!("sponza::vulkan", "Spatial upscaler {}x{} -> {}x{} (sharpness {})",
                desc.input_size.width, desc.input_size.height,
                desc.output_size.width, desc.output_size.height, desc.sharpness);
            Ok(Self { _ctx: ctx, handle })
        }
    }

    impl RendererSpatialUpscaler for SpatialUpscaler {
        fn record(
            &self,
            cmd: &mut dyn RendererCommandList,
            input: &Arc<dyn RendererTexture>,
            output: &Arc<dyn RendererTexture>,
        ) -> Result<()> {
            let description = ffi::XegSpatialUpscaleDescription {
                input_image: view_of(input)?,
                output_image: view_of(output)?,
            };

            let vk_cmd = CommandList::cast_mut(cmd)?;
            vk_cmd.require_outside_render_pass()?;
            // The kernel handles its own image transitions and leaves the output in GENERAL
            unsafe {
                ffi::HMS_XEG_CmdRenderSpatialUpscale(vk_cmd.command_buffer(), self.handle, &description);
            }
            Ok(())
        }
    }

    impl Drop for SpatialUpscaler {
        fn drop(&mut self) {
            unsafe { ffi::HMS_XEG_DestroySpatialUpscale(self.handle); }
        }
    }

    // ===== ADAPTIVE VRS =====

    pub(super) struct VrsDispatcher {
        _ctx: Arc<GpuContext>,
        handle: ffi::XegAdaptiveVrs,
    }

    unsafe impl Send for VrsDispatcher {}
    unsafe impl Sync for VrsDispatcher {}

    impl VrsDispatcher {
        pub(super) fn new(ctx: Arc<GpuContext>, desc: &VrsDispatcherDesc) -> Result<Self> {
            let create_info = ffi::XegAdaptiveVrsCreateInfo {
                input_size: extent_to_vk(desc.input_size),
                input_region: rect_to_vk(desc.input_region),
                adaptive_tile_size: desc.tile_size,
                error_sensitivity: desc.error_sensitivity,
                flip: desc.flip,
            };

            let mut handle: ffi::XegAdaptiveVrs = std::ptr::null_mut();
            let result = unsafe {
                ffi::HMS_XEG_CreateAdaptiveVRS(ctx.device.handle(), &create_info, &mut handle)
            };
            if result != vk::Result::SUCCESS || handle.is_null() {
                return Err(engine_err!("sponza::vulkan",
                    "XEngine adaptive VRS creation failed for {}x{}: {:?}",
                    desc.input_size.width, desc.input_size.height, result));
            }
            Ok(Self { _ctx: ctx, handle })
        }
    }

    impl RendererVrsDispatcher for VrsDispatcher {
        fn dispatch(&self, cmd: &mut dyn RendererCommandList, desc: &VrsDispatchDesc<'_>) -> Result<()> {
            // Kept alive on the stack until the dispatch call returns
            let matrix = desc.reprojection.map(|m| m.to_cols_array());
            let description = ffi::XegAdaptiveVrsDescription {
                input_color_image: view_of(desc.color)?,
                input_depth_image: view_of(desc.depth)?,
                output_shading_rate_image: view_of(desc.shading_rate)?,
                reprojection_matrix: matrix.as_ref().map_or(std::ptr::null(), |m| m.as_ptr()),
            };

            let vk_cmd = CommandList::cast_mut(cmd)?;
            vk_cmd.require_outside_render_pass()?;
            unsafe {
                ffi::HMS_XEG_CmdDispatchAdaptiveVRS(vk_cmd.command_buffer(), self.handle, &description);
            }
            Ok(())
        }
    }

    impl Drop for VrsDispatcher {
        fn drop(&mut self) {
            unsafe { ffi::HMS_XEG_DestroyAdaptiveVRS(self.handle); }
        }
    }
}
