/*!
# Sponza Upscale - Vulkan Backend

Vulkan implementation of the `sponza_upscale` device function table.

This crate bootstraps the instance and device with Ash, manages memory with
gpu-allocator and creates surfaces through ash-window. The render passes use
`VK_KHR_create_renderpass2` whenever a shading-rate attachment is present and
pipelines enable `VK_KHR_fragment_shading_rate` dynamic state.

The vendor spatial upscale and adaptive VRS kernels are linked from the
XEngine library when the `xengine` feature is enabled.

# Example

```no_run
use sponza_upscale_vulkan::sponza::{VulkanGraphicsDevice, VulkanConfig};
# fn run<W: raw_window_handle::HasDisplayHandle + raw_window_handle::HasWindowHandle>(window: &W)
#     -> sponza_upscale::sponza::Result<()> {
let device = VulkanGraphicsDevice::new(window, VulkanConfig::default())?;
let swapchain = device.create_swapchain(window, 1280, 720)?;
# Ok(())
# }
```
*/

mod vulkan_context;
mod vulkan_format;
mod vulkan_config;
mod vulkan_device;
mod vulkan_texture;
mod vulkan_buffer;
mod vulkan_shader;
mod vulkan_sampler;
mod vulkan_render_pass;
mod vulkan_frame_buffer;
mod vulkan_pipeline;
mod vulkan_binding_group;
mod vulkan_command_list;
mod vulkan_swapchain;
mod vulkan_xengine;

#[cfg(feature = "vulkan-validation")]
mod debug;

/// Public surface of the Vulkan backend
pub mod sponza {
    pub use crate::vulkan_device::VulkanGraphicsDevice;
    pub use crate::vulkan_swapchain::Swapchain as VulkanSwapchain;
    pub use crate::vulkan_config::{
        VulkanConfig, DebugSeverity, DebugOutput, DebugMessageFilter, ValidationStats,
    };

    #[cfg(feature = "vulkan-validation")]
    pub use crate::debug::{get_validation_stats, print_validation_stats_report};
}
