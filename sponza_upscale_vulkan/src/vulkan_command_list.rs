/// CommandList - Vulkan implementation of the CommandList trait
///
/// One list per swapchain image. Lists are recorded once per rebuild and
/// resubmitted every frame, so recording never uses ONE_TIME_SUBMIT.

use sponza_upscale::sponza::{
    Error, Result,
    render::{
        CommandList as RendererCommandList,
        RenderPass as RendererRenderPass,
        Framebuffer as RendererFramebuffer,
        Pipeline as RendererPipeline,
        Buffer as RendererBuffer,
        BindingGroup as RendererBindingGroup,
        Viewport, Rect2D, ClearValue, IndexType, ShaderStage, FragmentSize, CombinerOp, ImageBarrier,
    },
};
use sponza_upscale::engine_err;
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_binding_group::BindingGroup;
use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    clear_value_to_vk, viewport_to_vk, rect_to_vk, index_type_to_vk, shader_stages_to_vk,
    fragment_shading_rate_to_vk, pipeline_stages_to_vk, access_flags_to_vk, image_layout_to_vk,
};
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_texture::Texture;

/// Vulkan command list implementation
pub struct CommandList {
    ctx: Arc<GpuContext>,
    /// Command pool owning the command buffer
    command_pool: vk::CommandPool,
    /// Command buffer for recording
    command_buffer: vk::CommandBuffer,
    /// Whether the command list is currently recording
    is_recording: bool,
    /// Whether `end` completed since the last `begin`
    is_recorded: bool,
    /// Whether we're inside a render pass
    in_render_pass: bool,
    /// Currently bound pipeline layout (for push constants)
    bound_pipeline_layout: Option<vk::PipelineLayout>,
}

impl CommandList {
    /// Create a new command list with its own resettable pool
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = ctx.device.create_command_pool(&pool_info, None)
                .map_err(|e| engine_err!("sponza::vulkan", "Failed to create command pool: {:?}", e))?;

            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = match ctx.device.allocate_command_buffers(&allocate_info) {
                Ok(buffers) => buffers,
                Err(e) => {
                    ctx.device.destroy_command_pool(command_pool, None);
                    return Err(engine_err!("sponza::vulkan",
                        "Failed to allocate command buffer: {:?}", e));
                }
            };

            Ok(Self {
                ctx,
                command_pool,
                command_buffer: command_buffers[0],
                is_recording: false,
                is_recorded: false,
                in_render_pass: false,
                bound_pipeline_layout: None,
            })
        }
    }

    /// Get the underlying Vulkan command buffer
    pub(crate) fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    /// Whether the list holds a complete recording ready for submission
    pub(crate) fn is_recorded(&self) -> bool {
        self.is_recorded
    }

    /// Downcast a command list created by this backend
    pub(crate) fn cast(command_list: &dyn RendererCommandList) -> Result<&Self> {
        command_list.as_any().downcast_ref::<Self>().ok_or_else(|| {
            Error::InvalidResource("Command list was not created by the Vulkan device".to_string())
        })
    }

    /// Mutable downcast (vendor kernels record straight into the buffer)
    pub(crate) fn cast_mut(command_list: &mut dyn RendererCommandList) -> Result<&mut Self> {
        command_list.as_any_mut().downcast_mut::<Self>().ok_or_else(|| {
            Error::InvalidResource("Command list was not created by the Vulkan device".to_string())
        })
    }

    fn require_recording(&self) -> Result<()> {
        if !self.is_recording {
            return Err(Error::BackendError("Command list not recording".to_string()));
        }
        Ok(())
    }

    fn require_render_pass(&self) -> Result<()> {
        self.require_recording()?;
        if !self.in_render_pass {
            return Err(Error::BackendError("Not inside a render pass".to_string()));
        }
        Ok(())
    }

    /// Recording, outside any render pass (barriers and compute kernels)
    pub(crate) fn require_outside_render_pass(&self) -> Result<()> {
        self.require_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Command not allowed inside a render pass".to_string()));
        }
        Ok(())
    }
}

impl RendererCommandList for CommandList {
    fn begin(&mut self) -> Result<()> {
        if self.is_recording {
            return Err(Error::BackendError("Command list already recording".to_string()));
        }

        unsafe {
            self.ctx.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!("sponza::vulkan", "Failed to reset command buffer: {:?}", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default();
            self.ctx.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| engine_err!("sponza::vulkan", "Failed to begin command buffer: {:?}", e))?;
        }

        self.is_recording = true;
        self.is_recorded = false;
        self.in_render_pass = false;
        self.bound_pipeline_layout = None;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.require_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Cannot end command list inside a render pass".to_string()));
        }

        unsafe {
            self.ctx.device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| engine_err!("sponza::vulkan", "Failed to end command buffer: {:?}", e))?;
        }

        self.is_recording = false;
        self.is_recorded = true;
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RendererRenderPass>,
        framebuffer: &Arc<dyn RendererFramebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.require_outside_render_pass()?;

        let vk_render_pass = RenderPass::cast(render_pass.as_ref())?;
        let vk_framebuffer = Framebuffer::cast(framebuffer.as_ref())?;
        let vk_clear_values: Vec<vk::ClearValue> = clear_values.iter().map(clear_value_to_vk).collect();

        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(vk_render_pass.render_pass)
            .framebuffer(vk_framebuffer.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: framebuffer.width(),
                    height: framebuffer.height(),
                },
            })
            .clear_values(&vk_clear_values);

        unsafe {
            self.ctx.device.cmd_begin_render_pass(
                self.command_buffer,
                &begin_info,
                vk::SubpassContents::INLINE,
            );
        }

        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.require_render_pass()?;

        unsafe {
            self.ctx.device.cmd_end_render_pass(self.command_buffer);
        }

        self.in_render_pass = false;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.require_recording()?;

        unsafe {
            self.ctx.device.cmd_set_viewport(self.command_buffer, 0, &[viewport_to_vk(viewport)]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.require_recording()?;

        unsafe {
            self.ctx.device.cmd_set_scissor(self.command_buffer, 0, &[rect_to_vk(scissor)]);
        }
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn RendererPipeline>) -> Result<()> {
        self.require_render_pass()?;

        let vk_pipeline = Pipeline::cast(pipeline.as_ref())?;
        unsafe {
            self.ctx.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_pipeline.pipeline,
            );
        }

        self.bound_pipeline_layout = Some(vk_pipeline.pipeline_layout);
        Ok(())
    }

    fn bind_binding_group(
        &mut self,
        pipeline: &Arc<dyn RendererPipeline>,
        set_index: u32,
        binding_group: &Arc<dyn RendererBindingGroup>,
    ) -> Result<()> {
        self.require_recording()?;

        let vk_pipeline = Pipeline::cast(pipeline.as_ref())?;
        let vk_binding_group = BindingGroup::cast(binding_group.as_ref())?;
        if set_index as usize >= vk_pipeline.set_layouts.len() {
            return Err(Error::InvalidResource(format!(
                "Set {} out of range for pipeline '{}'", set_index, pipeline.label()
            )));
        }

        unsafe {
            self.ctx.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_pipeline.pipeline_layout,
                set_index,
                &[vk_binding_group.descriptor_set],
                &[],
            );
        }
        Ok(())
    }

    fn push_constants(&mut self, stages: &[ShaderStage], offset: u32, data: &[u8]) -> Result<()> {
        self.require_recording()?;

        let layout = self.bound_pipeline_layout
            .ok_or_else(|| Error::BackendError("No pipeline bound for push constants".to_string()))?;

        unsafe {
            self.ctx.device.cmd_push_constants(
                self.command_buffer,
                layout,
                shader_stages_to_vk(stages),
                offset,
                data,
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn RendererBuffer>, offset: u64) -> Result<()> {
        self.require_recording()?;

        let vk_buffer = Buffer::cast(buffer.as_ref())?;
        unsafe {
            self.ctx.device.cmd_bind_vertex_buffers(self.command_buffer, 0, &[vk_buffer.buffer], &[offset]);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn RendererBuffer>, offset: u64, index_type: IndexType) -> Result<()> {
        self.require_recording()?;

        let vk_buffer = Buffer::cast(buffer.as_ref())?;
        unsafe {
            self.ctx.device.cmd_bind_index_buffer(
                self.command_buffer,
                vk_buffer.buffer,
                offset,
                index_type_to_vk(index_type),
            );
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.require_render_pass()?;

        unsafe {
            self.ctx.device.cmd_draw(self.command_buffer, vertex_count, 1, first_vertex, 0);
        }
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.require_render_pass()?;

        unsafe {
            self.ctx.device.cmd_draw_indexed(self.command_buffer, index_count, 1, first_index, vertex_offset, 0);
        }
        Ok(())
    }

    fn set_fragment_shading_rate(
        &mut self,
        fragment_size: FragmentSize,
        combiner_ops: [CombinerOp; 2],
    ) -> Result<()> {
        self.require_recording()?;

        let loader = self.ctx.fragment_shading_rate.as_ref()
            .ok_or_else(|| Error::MissingExtension("VK_KHR_fragment_shading_rate".to_string()))?;

        let (extent, ops) = fragment_shading_rate_to_vk(fragment_size, combiner_ops);
        // The loader only exposes this command through its function table
        unsafe {
            (loader.fp().cmd_set_fragment_shading_rate_khr)(self.command_buffer, &extent, &ops);
        }
        Ok(())
    }

    fn image_barrier(&mut self, barrier: &ImageBarrier) -> Result<()> {
        self.require_outside_render_pass()?;

        let texture = Texture::cast(barrier.texture.as_ref())?;
        let image_barrier = vk::ImageMemoryBarrier::default()
            .src_access_mask(access_flags_to_vk(barrier.src_access))
            .dst_access_mask(access_flags_to_vk(barrier.dst_access))
            .old_layout(image_layout_to_vk(barrier.old_layout))
            .new_layout(image_layout_to_vk(barrier.new_layout))
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(texture.image)
            .subresource_range(texture.subresource_range());

        unsafe {
            self.ctx.device.cmd_pipeline_barrier(
                self.command_buffer,
                pipeline_stages_to_vk(barrier.src_stages),
                pipeline_stages_to_vk(barrier.dst_stages),
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[image_barrier],
            );
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        unsafe {
            // Destroying the pool frees the command buffer
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
