/// Shader - Vulkan implementation of the Shader trait
///
/// Loads a SPIR-V binary from disk and reflects its descriptor bindings so
/// pipeline creation can cross-check them against the declared layouts.

use sponza_upscale::sponza::{
    Error, Result,
    render::{Shader as RendererShader, ShaderDesc, ShaderStage, BindingType},
};
use sponza_upscale::{engine_debug, engine_err};
use ash::vk;
use std::any::Any;
use std::ffi::CString;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Descriptor binding found in the SPIR-V module
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReflectedBinding {
    pub set: u32,
    pub binding: u32,
    /// None for descriptor types the renderer never binds (storage images, ...)
    pub binding_type: Option<BindingType>,
}

/// Vulkan shader implementation
pub struct Shader {
    ctx: Arc<GpuContext>,
    /// Vulkan shader module
    pub(crate) module: vk::ShaderModule,
    stage: ShaderStage,
    /// Entry point name
    pub(crate) entry_point: CString,
    /// Bindings referenced by the entry point
    pub(crate) bindings: Vec<ReflectedBinding>,
    /// Size of the push constant block, if any
    pub(crate) push_constant_size: Option<u32>,
}

impl Shader {
    /// Read, reflect and compile the module described by `desc`
    ///
    /// # Errors
    ///
    /// `InvalidResource` when the file is missing, empty, not valid SPIR-V,
    /// or does not define the requested entry point.
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &ShaderDesc) -> Result<Self> {
        let bytes = std::fs::read(&desc.path).map_err(|e| {
            Error::InvalidResource(format!(
                "Cannot read shader '{}' ({}): {}",
                desc.label,
                desc.path.display(),
                e
            ))
        })?;
        if bytes.is_empty() {
            return Err(Error::InvalidResource(format!("Shader '{}' is empty", desc.label)));
        }

        let code = ash::util::read_spv(&mut std::io::Cursor::new(&bytes)).map_err(|e| {
            Error::InvalidResource(format!("Shader '{}' is not valid SPIR-V: {}", desc.label, e))
        })?;

        let entry_point = CString::new(desc.entry_point.as_str()).map_err(|_| {
            Error::InvalidResource(format!(
                "Shader '{}' entry point contains a NUL byte",
                desc.label
            ))
        })?;

        let (bindings, push_constant_size) = reflect(&code, &desc.label, &desc.entry_point)?;
        engine_debug!("sponza::vulkan", "Shader '{}' reflected {} binding(s)",
            desc.label, bindings.len());

        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
        let module = unsafe { ctx.device.create_shader_module(&create_info, None) }
            .map_err(|e| engine_err!("sponza::vulkan",
                "Failed to create shader module '{}': {:?}", desc.label, e))?;

        Ok(Self {
            ctx,
            module,
            stage: desc.stage,
            entry_point,
            bindings,
            push_constant_size,
        })
    }

    /// Downcast a shader created by this backend
    pub(crate) fn cast(shader: &dyn RendererShader) -> Result<&Self> {
        shader.as_any().downcast_ref::<Self>().ok_or_else(|| {
            Error::InvalidResource("Shader was not created by the Vulkan device".to_string())
        })
    }
}

/// Reflect the bindings and push constants used by `entry_point`
fn reflect(
    code: &[u32],
    label: &str,
    entry_point: &str,
) -> Result<(Vec<ReflectedBinding>, Option<u32>)> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(code)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| Error::InvalidResource(format!(
            "SPIR-V reflection of '{}' failed: {:?}", label, e)))?;

    let entry = entry_points
        .iter()
        .find(|ep| ep.name == entry_point)
        .ok_or_else(|| Error::InvalidResource(format!(
            "Shader '{}' has no entry point '{}'", label, entry_point)))?;

    let mut bindings = Vec::new();
    let mut push_constant_size = None;

    for var in entry.vars.iter() {
        match var {
            spirq::var::Variable::Descriptor { desc_bind, desc_ty, .. } => {
                bindings.push(ReflectedBinding {
                    set: desc_bind.set(),
                    binding: desc_bind.bind(),
                    binding_type: desc_type_to_binding_type(desc_ty),
                });
            }
            spirq::var::Variable::PushConstant { ty, .. } => {
                push_constant_size = ty.nbyte().map(|size| size as u32);
            }
            _ => {}
        }
    }

    Ok((bindings, push_constant_size))
}

fn desc_type_to_binding_type(desc_ty: &spirq::ty::DescriptorType) -> Option<BindingType> {
    use spirq::ty::DescriptorType;
    match desc_ty {
        DescriptorType::UniformBuffer() => Some(BindingType::UniformBuffer),
        DescriptorType::CombinedImageSampler() => Some(BindingType::CombinedImageSampler),
        _ => None,
    }
}

impl RendererShader for Shader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_shader_module(self.module, None);
        }
    }
}
