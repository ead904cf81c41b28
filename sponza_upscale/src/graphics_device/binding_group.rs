/// BindingGroup trait and binding layout types
///
/// A BindingGroup is an immutable set of GPU resource bindings (sampled
/// attachments and uniform buffers), the abstraction over descriptor sets.
/// It is rebuilt when the attachments it references are reallocated.

use std::any::Any;
use std::sync::Arc;
use bitflags::bitflags;
use crate::graphics_device::{Texture, Buffer};

// ============================================================================
// Binding types and layout description
// ============================================================================

/// Type of resource bound at a given slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    /// Uniform buffer
    UniformBuffer,
    /// Combined image sampler
    CombinedImageSampler,
}

bitflags! {
    /// Shader stage visibility flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
    }
}

/// Description of a single binding slot
#[derive(Debug, Clone, PartialEq)]
pub struct BindingSlotDesc {
    /// Binding number (`layout(binding = N)` in GLSL)
    pub binding: u32,
    pub binding_type: BindingType,
    /// Number of descriptors at this binding
    pub count: u32,
    pub stage_flags: ShaderStageFlags,
}

impl BindingSlotDesc {
    /// Single fragment-stage combined image sampler
    pub fn fragment_sampler(binding: u32) -> Self {
        Self {
            binding,
            binding_type: BindingType::CombinedImageSampler,
            count: 1,
            stage_flags: ShaderStageFlags::FRAGMENT,
        }
    }

    /// Single uniform buffer visible to the given stages
    pub fn uniform(binding: u32, stage_flags: ShaderStageFlags) -> Self {
        Self {
            binding,
            binding_type: BindingType::UniformBuffer,
            count: 1,
            stage_flags,
        }
    }
}

/// Description of a BindingGroup layout
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingGroupLayoutDesc {
    pub entries: Vec<BindingSlotDesc>,
}

// ============================================================================
// Binding resources
// ============================================================================

/// Sampler configuration selected by the backend sampler cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerType {
    /// Nearest filter, clamp to edge, max LOD 8 (G-buffer and composite reads)
    NearestClamp,
    /// Nearest filter, clamp to edge, max LOD 1 (sharpen upscale passes)
    NearestClampSingleLod,
    /// Linear filter, clamp to edge
    LinearClamp,
    /// Linear filter, repeat (material textures)
    LinearRepeat,
}

/// A concrete resource bound into a BindingGroup, in binding order
#[derive(Clone)]
pub enum BindingResource {
    /// Uniform buffer binding
    UniformBuffer(Arc<dyn Buffer>),
    /// Sampled texture with the sampler the backend resolves from the type
    SampledTexture(Arc<dyn Texture>, SamplerType),
}

impl BindingResource {
    /// The sampled texture, if this resource is one
    pub fn texture(&self) -> Option<&Arc<dyn Texture>> {
        match self {
            BindingResource::SampledTexture(texture, _) => Some(texture),
            BindingResource::UniformBuffer(_) => None,
        }
    }
}

// ============================================================================
// BindingGroup trait
// ============================================================================

/// An immutable set of GPU resource bindings
///
/// Keeps strong references to its resources for as long as it is alive.
pub trait BindingGroup: Send + Sync {
    /// Set index this group was created for
    fn set_index(&self) -> u32;

    /// Bound resources, index = binding number
    fn resources(&self) -> &[BindingResource];

    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}
