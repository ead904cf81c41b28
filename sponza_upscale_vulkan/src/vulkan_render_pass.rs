/// RenderPass - Vulkan implementation of the RenderPass trait
///
/// Passes without a shading-rate attachment go through vkCreateRenderPass.
/// Passes with one need VK_KHR_create_renderpass2, which is the only way to
/// chain a VkFragmentShadingRateAttachmentInfoKHR onto the subpass.

use sponza_upscale::sponza::{
    Error, Result,
    render::{RenderPass as RendererRenderPass, RenderPassDesc, AttachmentDesc, SubpassDependency},
};
use sponza_upscale::engine_err;
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    texture_format_to_vk, sample_count_to_vk, load_op_to_vk, store_op_to_vk, image_layout_to_vk,
    subpass_ref_to_vk, pipeline_stages_to_vk, access_flags_to_vk, aspect_mask,
};

/// Vulkan render pass implementation
pub struct RenderPass {
    ctx: Arc<GpuContext>,
    /// Vulkan render pass handle
    pub(crate) render_pass: vk::RenderPass,
    desc: RenderPassDesc,
}

impl RenderPass {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &RenderPassDesc) -> Result<Self> {
        let render_pass = if desc.requires_renderpass2() {
            create_render_pass2(&ctx, desc)?
        } else {
            create_render_pass(&ctx, desc)?
        };

        Ok(Self { ctx, render_pass, desc: desc.clone() })
    }

    /// Downcast a render pass created by this backend
    pub(crate) fn cast(render_pass: &dyn RendererRenderPass) -> Result<&Self> {
        render_pass.as_any().downcast_ref::<Self>().ok_or_else(|| {
            Error::InvalidResource(format!(
                "Render pass '{}' was not created by the Vulkan device",
                render_pass.desc().label
            ))
        })
    }
}

// ===== VERSION 1 =====

fn attachment_description(attachment: &AttachmentDesc) -> vk::AttachmentDescription {
    vk::AttachmentDescription::default()
        .format(texture_format_to_vk(attachment.format))
        .samples(sample_count_to_vk(attachment.samples))
        .load_op(load_op_to_vk(attachment.load_op))
        .store_op(store_op_to_vk(attachment.store_op))
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(image_layout_to_vk(attachment.initial_layout))
        .final_layout(image_layout_to_vk(attachment.final_layout))
}

fn dependency(dep: &SubpassDependency) -> vk::SubpassDependency {
    vk::SubpassDependency::default()
        .src_subpass(subpass_ref_to_vk(dep.src_subpass))
        .dst_subpass(subpass_ref_to_vk(dep.dst_subpass))
        .src_stage_mask(pipeline_stages_to_vk(dep.src_stages))
        .dst_stage_mask(pipeline_stages_to_vk(dep.dst_stages))
        .src_access_mask(access_flags_to_vk(dep.src_access))
        .dst_access_mask(access_flags_to_vk(dep.dst_access))
        .dependency_flags(dependency_flags(dep))
}

fn dependency_flags(dep: &SubpassDependency) -> vk::DependencyFlags {
    if dep.by_region {
        vk::DependencyFlags::BY_REGION
    } else {
        vk::DependencyFlags::empty()
    }
}

fn create_render_pass(ctx: &GpuContext, desc: &RenderPassDesc) -> Result<vk::RenderPass> {
    let mut attachments: Vec<vk::AttachmentDescription> =
        desc.color_attachments.iter().map(attachment_description).collect();

    let color_refs: Vec<vk::AttachmentReference> = (0..desc.color_attachments.len() as u32)
        .map(|index| vk::AttachmentReference {
            attachment: index,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        })
        .collect();

    let depth_ref = desc.depth_attachment.as_ref().map(|depth| {
        attachments.push(attachment_description(depth));
        vk::AttachmentReference {
            attachment: attachments.len() as u32 - 1,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        }
    });

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);
    if let Some(depth_ref) = depth_ref.as_ref() {
        subpass = subpass.depth_stencil_attachment(depth_ref);
    }

    let dependencies: Vec<vk::SubpassDependency> = desc.dependencies.iter().map(dependency).collect();
    let subpasses = [subpass];
    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    unsafe { ctx.device.create_render_pass(&create_info, None) }
        .map_err(|e| engine_err!("sponza::vulkan",
            "Failed to create render pass '{}': {:?}", desc.label, e))
}

// ===== VERSION 2 (SHADING-RATE ATTACHMENT) =====

fn attachment_description2(attachment: &AttachmentDesc) -> vk::AttachmentDescription2<'static> {
    vk::AttachmentDescription2::default()
        .format(texture_format_to_vk(attachment.format))
        .samples(sample_count_to_vk(attachment.samples))
        .load_op(load_op_to_vk(attachment.load_op))
        .store_op(store_op_to_vk(attachment.store_op))
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(image_layout_to_vk(attachment.initial_layout))
        .final_layout(image_layout_to_vk(attachment.final_layout))
}

fn dependency2(dep: &SubpassDependency) -> vk::SubpassDependency2<'static> {
    vk::SubpassDependency2::default()
        .src_subpass(subpass_ref_to_vk(dep.src_subpass))
        .dst_subpass(subpass_ref_to_vk(dep.dst_subpass))
        .src_stage_mask(pipeline_stages_to_vk(dep.src_stages))
        .dst_stage_mask(pipeline_stages_to_vk(dep.dst_stages))
        .src_access_mask(access_flags_to_vk(dep.src_access))
        .dst_access_mask(access_flags_to_vk(dep.dst_access))
        .dependency_flags(dependency_flags(dep))
}

fn create_render_pass2(ctx: &GpuContext, desc: &RenderPassDesc) -> Result<vk::RenderPass> {
    let loader = ctx.renderpass2.as_ref().ok_or_else(|| {
        Error::MissingExtension("VK_KHR_create_renderpass2".to_string())
    })?;

    let mut attachments: Vec<vk::AttachmentDescription2> =
        desc.color_attachments.iter().map(attachment_description2).collect();

    let color_refs: Vec<vk::AttachmentReference2> = (0..desc.color_attachments.len() as u32)
        .map(|index| {
            vk::AttachmentReference2::default()
                .attachment(index)
                .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .aspect_mask(vk::ImageAspectFlags::COLOR)
        })
        .collect();

    let depth_ref = desc.depth_attachment.as_ref().map(|depth| {
        attachments.push(attachment_description2(depth));
        vk::AttachmentReference2::default()
            .attachment(attachments.len() as u32 - 1)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .aspect_mask(aspect_mask(depth.format))
    });

    let shading_rate = desc.shading_rate_attachment.as_ref().map(|sri| {
        attachments.push(attachment_description2(&sri.attachment));
        let reference = vk::AttachmentReference2::default()
            .attachment(attachments.len() as u32 - 1)
            .layout(vk::ImageLayout::FRAGMENT_SHADING_RATE_ATTACHMENT_OPTIMAL_KHR);
        let texel_size = vk::Extent2D { width: sri.texel_width, height: sri.texel_height };
        (reference, texel_size)
    });

    let mut fsr_info = shading_rate.as_ref().map(|(reference, texel_size)| {
        vk::FragmentShadingRateAttachmentInfoKHR::default()
            .fragment_shading_rate_attachment(reference)
            .shading_rate_attachment_texel_size(*texel_size)
    });

    let mut subpass = vk::SubpassDescription2::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);
    if let Some(depth_ref) = depth_ref.as_ref() {
        subpass = subpass.depth_stencil_attachment(depth_ref);
    }
    if let Some(fsr_info) = fsr_info.as_mut() {
        subpass = subpass.push_next(fsr_info);
    }

    let dependencies: Vec<vk::SubpassDependency2> = desc.dependencies.iter().map(dependency2).collect();
    let subpasses = [subpass];
    let create_info = vk::RenderPassCreateInfo2::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    unsafe { loader.create_render_pass2(&create_info, None) }
        .map_err(|e| engine_err!("sponza::vulkan",
            "Failed to create render pass '{}' (renderpass2): {:?}", desc.label, e))
}

impl RendererRenderPass for RenderPass {
    fn desc(&self) -> &RenderPassDesc {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
