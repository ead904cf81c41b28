/// BindingGroup - Vulkan implementation of the BindingGroup trait
///
/// Wraps a VkDescriptorSet allocated from a growable set of descriptor
/// pools. Binding groups are rebuilt on every resize, so sets are freed back
/// to their pool when the group drops.

use sponza_upscale::sponza::{
    Error, Result,
    render::{
        BindingGroup as RendererBindingGroup, BindingResource, BindingType, Pipeline as RendererPipeline,
    },
};
use sponza_upscale::{engine_err, engine_info};
use ash::vk;
use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_sampler::SamplerCache;
use crate::vulkan_texture::Texture;

// ============================================================================
// Descriptor pools
// ============================================================================

/// Growable list of descriptor pools shared by every binding group
pub(crate) struct DescriptorPools {
    ctx: Arc<GpuContext>,
    pools: Mutex<Vec<vk::DescriptorPool>>,
}

impl DescriptorPools {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let pool = create_descriptor_pool(&ctx.device)?;
        Ok(Self { ctx, pools: Mutex::new(vec![pool]) })
    }

    /// Allocate one set, creating a new pool when the current one is exhausted
    fn allocate(&self, layout: vk::DescriptorSetLayout) -> Result<(vk::DescriptorPool, vk::DescriptorSet)> {
        let mut pools = self.pools
            .lock()
            .map_err(|_| Error::BackendError("Descriptor pool lock poisoned".to_string()))?;
        let layouts = [layout];

        if let Some(&current_pool) = pools.last() {
            let allocate_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(current_pool)
                .set_layouts(&layouts);

            match unsafe { self.ctx.device.allocate_descriptor_sets(&allocate_info) } {
                Ok(sets) => return Ok((current_pool, sets[0])),
                Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) | Err(vk::Result::ERROR_FRAGMENTED_POOL) => {}
                Err(e) => return Err(engine_err!("sponza::vulkan",
                    "Failed to allocate descriptor set: {:?}", e)),
            }
        }

        let new_pool = create_descriptor_pool(&self.ctx.device)?;
        pools.push(new_pool);
        engine_info!("sponza::vulkan",
            "Descriptor pool exhausted, created new pool (total: {})", pools.len());

        let retry_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(new_pool)
            .set_layouts(&layouts);
        let sets = unsafe { self.ctx.device.allocate_descriptor_sets(&retry_info) }
            .map_err(|e| engine_err!("sponza::vulkan",
                "Failed to allocate descriptor set after pool growth: {:?}", e))?;
        Ok((new_pool, sets[0]))
    }

    fn free(&self, pool: vk::DescriptorPool, set: vk::DescriptorSet) {
        // Freeing must not race with an allocation from the same pool
        if let Ok(_pools) = self.pools.lock() {
            unsafe { self.ctx.device.free_descriptor_sets(pool, &[set]).ok(); }
        }
    }
}

impl Drop for DescriptorPools {
    fn drop(&mut self) {
        if let Ok(pools) = self.pools.get_mut() {
            for pool in pools.drain(..) {
                unsafe { self.ctx.device.destroy_descriptor_pool(pool, None); }
            }
        }
    }
}

fn create_descriptor_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
    let pool_sizes = [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: 2048,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: 1024,
        },
    ];
    let info = vk::DescriptorPoolCreateInfo::default()
        .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
        .pool_sizes(&pool_sizes)
        .max_sets(1024);

    unsafe { device.create_descriptor_pool(&info, None) }
        .map_err(|e| engine_err!("sponza::vulkan", "Failed to create descriptor pool: {:?}", e))
}

// ============================================================================
// BindingGroup
// ============================================================================

/// Vulkan binding group implementation
///
/// Immutable after creation - create a new BindingGroup to change resources.
pub struct BindingGroup {
    pools: Arc<DescriptorPools>,
    pool: vk::DescriptorPool,
    /// Vulkan descriptor set handle
    pub(crate) descriptor_set: vk::DescriptorSet,
    set_index: u32,
    /// Strong references keeping the bound resources alive
    resources: Vec<BindingResource>,
}

impl BindingGroup {
    /// Allocate and write a descriptor set for `set_index` of `pipeline`
    ///
    /// # Errors
    ///
    /// `InvalidResource` when the set index is out of range or the resources
    /// do not match the declared layout.
    pub(crate) fn new(
        pools: &Arc<DescriptorPools>,
        samplers: &mut SamplerCache,
        pipeline: &Arc<dyn RendererPipeline>,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Self> {
        let vk_pipeline = Pipeline::cast(pipeline.as_ref())?;

        let layout_desc = vk_pipeline.layout_descs.get(set_index as usize).ok_or_else(|| {
            Error::InvalidResource(format!(
                "Binding group set {} out of range (pipeline '{}' has {} layouts)",
                set_index, pipeline.label(), vk_pipeline.set_layouts.len()
            ))
        })?;

        if layout_desc.entries.len() != resources.len() {
            return Err(Error::InvalidResource(format!(
                "Binding group set {} of '{}' expects {} resource(s), got {}",
                set_index, pipeline.label(), layout_desc.entries.len(), resources.len()
            )));
        }

        // Resolve every resource before allocating anything
        let mut buffer_infos = Vec::new();
        let mut image_infos = Vec::new();
        for (entry, resource) in layout_desc.entries.iter().zip(resources) {
            match (entry.binding_type, resource) {
                (BindingType::UniformBuffer, BindingResource::UniformBuffer(buffer)) => {
                    let vk_buffer = Buffer::cast(buffer.as_ref())?;
                    buffer_infos.push(
                        vk::DescriptorBufferInfo::default()
                            .buffer(vk_buffer.buffer)
                            .offset(0)
                            .range(vk::WHOLE_SIZE),
                    );
                }
                (BindingType::CombinedImageSampler, BindingResource::SampledTexture(texture, sampler_type)) => {
                    let vk_texture = Texture::cast(texture.as_ref())?;
                    let layout = if texture.info().format.is_depth() {
                        vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL
                    } else {
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
                    };
                    image_infos.push(
                        vk::DescriptorImageInfo::default()
                            .image_layout(layout)
                            .image_view(vk_texture.view)
                            .sampler(samplers.get(*sampler_type)?),
                    );
                }
                (expected, _) => {
                    return Err(Error::InvalidResource(format!(
                        "Binding {} of set {} ('{}') expects {:?}",
                        entry.binding, set_index, pipeline.label(), expected
                    )));
                }
            }
        }

        let (pool, descriptor_set) = pools.allocate(vk_pipeline.set_layouts[set_index as usize])?;

        let mut next_buffer = 0;
        let mut next_image = 0;
        let writes: Vec<vk::WriteDescriptorSet> = layout_desc.entries
            .iter()
            .map(|entry| {
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(descriptor_set)
                    .dst_binding(entry.binding)
                    .dst_array_element(0);
                match entry.binding_type {
                    BindingType::UniformBuffer => {
                        next_buffer += 1;
                        write
                            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                            .buffer_info(std::slice::from_ref(&buffer_infos[next_buffer - 1]))
                    }
                    BindingType::CombinedImageSampler => {
                        next_image += 1;
                        write
                            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                            .image_info(std::slice::from_ref(&image_infos[next_image - 1]))
                    }
                }
            })
            .collect();

        unsafe { pools.ctx.device.update_descriptor_sets(&writes, &[]); }

        Ok(Self {
            pools: Arc::clone(pools),
            pool,
            descriptor_set,
            set_index,
            resources: resources.to_vec(),
        })
    }

    /// Downcast a binding group created by this backend
    pub(crate) fn cast(binding_group: &dyn RendererBindingGroup) -> Result<&Self> {
        binding_group.as_any().downcast_ref::<Self>().ok_or_else(|| {
            Error::InvalidResource("Binding group was not created by the Vulkan device".to_string())
        })
    }
}

impl RendererBindingGroup for BindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }

    fn resources(&self) -> &[BindingResource] {
        &self.resources
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for BindingGroup {
    fn drop(&mut self) {
        self.pools.free(self.pool, self.descriptor_set);
    }
}
