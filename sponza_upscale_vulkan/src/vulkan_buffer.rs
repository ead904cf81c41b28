/// Buffer - Vulkan implementation of the Buffer trait

use sponza_upscale::sponza::{
    Error, Result,
    render::{Buffer as RendererBuffer, BufferDesc},
};
use sponza_upscale::{engine_err, engine_error};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::buffer_usage_to_vk;

/// Vulkan buffer implementation
///
/// Every buffer is host-visible and persistently mapped; the scene and the
/// per-frame uniforms are written straight through `update`.
pub struct Buffer {
    /// Shared GPU context (device, allocator)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    allocation: Option<Allocation>,
    /// Buffer size
    size: u64,
}

impl Buffer {
    /// Create and map a new Vulkan buffer
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            return Err(Error::InvalidResource(format!("Buffer '{}' has zero size", desc.label)));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(buffer_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        unsafe {
            let buffer = ctx.device.create_buffer(&buffer_info, None)
                .map_err(|e| engine_err!("sponza::vulkan",
                    "Failed to create buffer '{}': {:?}", desc.label, e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let allocation = match ctx.allocator() {
                Ok(mut allocator) => allocator.allocate(&AllocationCreateDesc {
                    name: &desc.label,
                    requirements,
                    location: MemoryLocation::CpuToGpu,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                }),
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(gpu_allocator::AllocationError::OutOfMemory) => {
                    engine_error!("sponza::vulkan",
                        "Out of GPU memory allocating buffer '{}' ({} bytes)", desc.label, desc.size);
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(Error::OutOfMemory);
                }
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(engine_err!("sponza::vulkan",
                        "Failed to allocate memory for buffer '{}': {:?}", desc.label, e));
                }
            };

            if let Err(e) = ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                if let Ok(mut allocator) = ctx.allocator() {
                    allocator.free(allocation).ok();
                }
                ctx.device.destroy_buffer(buffer, None);
                return Err(engine_err!("sponza::vulkan",
                    "Failed to bind memory for buffer '{}': {:?}", desc.label, e));
            }

            Ok(Self {
                ctx,
                buffer,
                allocation: Some(allocation),
                size: desc.size,
            })
        }
    }

    /// Downcast a buffer created by this backend
    pub(crate) fn cast(buffer: &dyn RendererBuffer) -> Result<&Self> {
        buffer.as_any().downcast_ref::<Self>().ok_or_else(|| {
            Error::InvalidResource("Buffer was not created by the Vulkan device".to_string())
        })
    }
}

impl RendererBuffer for Buffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset.checked_add(data.len() as u64);
        if end.map_or(true, |end| end > self.size) {
            return Err(Error::InvalidResource(format!(
                "Buffer update out of range: offset {} + {} bytes > size {}",
                offset, data.len(), self.size
            )));
        }

        let allocation = match &self.allocation {
            Some(allocation) => allocation,
            None => {
                engine_error!("sponza::vulkan", "Buffer update failed: no GPU allocation");
                return Err(Error::BackendError("Buffer has no allocation".to_string()));
            }
        };

        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))?
            .as_ptr() as *mut u8;

        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped_ptr.add(offset as usize), data.len());
        }
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if lock fails - we still need to destroy the buffer
                if let Ok(mut allocator) = self.ctx.allocator() {
                    allocator.free(allocation).ok();
                }
            }

            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
