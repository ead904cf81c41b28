/// GpuContext - Shared GPU state for all Vulkan objects
///
/// Every resource (texture, buffer, pipeline, command list, swapchain) keeps
/// an `Arc<GpuContext>`, so the device, allocator and instance are destroyed
/// only after the last object referencing them is gone.

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};
use sponza_upscale::sponza::{Error, Result};

/// Shared GPU context for all Vulkan resources
pub struct GpuContext {
    /// Vulkan loader (must outlive the instance)
    pub(crate) entry: ash::Entry,

    /// Vulkan instance
    pub(crate) instance: ash::Instance,

    /// Selected physical device
    pub(crate) physical_device: vk::PhysicalDevice,

    /// Vulkan logical device
    pub(crate) device: ash::Device,

    /// GPU memory allocator
    ///
    /// Dropped explicitly before the device is destroyed.
    pub(crate) allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Graphics queue (also used for presentation when the families match)
    pub(crate) graphics_queue: vk::Queue,
    pub(crate) graphics_queue_family: u32,

    /// Present queue
    pub(crate) present_queue: vk::Queue,

    /// VK_KHR_create_renderpass2 entry points (None when the extension is absent)
    pub(crate) renderpass2: Option<ash::khr::create_renderpass2::Device>,

    /// VK_KHR_fragment_shading_rate entry points (None when the extension is absent)
    pub(crate) fragment_shading_rate: Option<ash::khr::fragment_shading_rate::Device>,

    /// Debug utils loader and messenger (validation builds only)
    pub(crate) debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl GpuContext {
    /// Lock the allocator, mapping a poisoned lock to a backend error
    pub(crate) fn allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| Error::BackendError("GPU allocator lock poisoned".to_string()))
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // Free every VkDeviceMemory block before the device goes away
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);

            #[cfg(feature = "vulkan-validation")]
            crate::debug::cleanup_debug_config();

            if let Some((loader, messenger)) = self.debug_utils.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}
