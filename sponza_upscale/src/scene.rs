/// Scene collaborator
///
/// Asset import and upload live outside the core. A scene arrives as
/// device buffers and textures and only has to record itself into the
/// G-buffer pass, binding its material group at set 1.

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::graphics_device::{
    GraphicsDevice, CommandList, Pipeline, Buffer, Texture, BindingGroup,
    BindingGroupLayoutDesc, BindingSlotDesc, BindingResource, SamplerType,
    VertexLayout, VertexBinding, VertexAttribute, VertexInputRate, BufferFormat, IndexType,
};
use crate::engine_debug;

/// Set index of the per-material binding group
pub const MATERIAL_SET_INDEX: u32 = 1;

// ============================================================================
// Vertex
// ============================================================================

/// Interleaved mesh vertex as produced by the OBJ importer
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct SceneVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
    pub bitangent: [f32; 3],
    pub tangent: [f32; 3],
}

impl SceneVertex {
    /// Vertex input read by the G-buffer vertex shader
    ///
    /// Locations: 0 = position, 1 = texture coordinates, 2 = normal.
    /// Tangent and bitangent are carried in the buffer but not read.
    pub fn layout() -> VertexLayout {
        VertexLayout {
            bindings: vec![VertexBinding {
                binding: 0,
                stride: std::mem::size_of::<SceneVertex>() as u32,
                input_rate: VertexInputRate::Vertex,
            }],
            attributes: vec![
                VertexAttribute { location: 0, binding: 0, format: BufferFormat::R32G32B32_SFLOAT, offset: 0 },
                VertexAttribute { location: 1, binding: 0, format: BufferFormat::R32G32_SFLOAT, offset: 24 },
                VertexAttribute { location: 2, binding: 0, format: BufferFormat::R32G32B32_SFLOAT, offset: 12 },
            ],
        }
    }
}

// ============================================================================
// SceneDrawer trait
// ============================================================================

/// Records the scene geometry into the G-buffer pass
pub trait SceneDrawer: Send + Sync {
    /// Layout of the per-material group bound at set 1
    fn material_layout(&self) -> BindingGroupLayoutDesc;

    /// Create material binding groups for one G-buffer pipeline
    ///
    /// Called once per tier after the pipelines are built.
    fn prepare(&mut self, device: &mut dyn GraphicsDevice, pipeline: &Arc<dyn Pipeline>) -> Result<()>;

    /// Record draws with `pipeline` already bound
    fn draw(&self, cmd: &mut dyn CommandList, pipeline: &Arc<dyn Pipeline>) -> Result<()>;
}

// ============================================================================
// MeshScene
// ============================================================================

/// One uploaded mesh with its optional base-color texture
#[derive(Clone)]
pub struct SceneMesh {
    pub vertex_buffer: Arc<dyn Buffer>,
    pub index_buffer: Arc<dyn Buffer>,
    /// Number of u32 indices
    pub index_count: u32,
    /// Meshes without a texture are drawn without rebinding set 1
    pub texture: Option<Arc<dyn Texture>>,
}

/// Static model: a list of meshes drawn in order
pub struct MeshScene {
    meshes: Vec<SceneMesh>,
    /// Material groups per pipeline label, parallel to `meshes`
    material_groups: FxHashMap<String, Vec<Option<Arc<dyn BindingGroup>>>>,
}

impl MeshScene {
    pub fn new(meshes: Vec<SceneMesh>) -> Self {
        Self {
            meshes,
            material_groups: FxHashMap::default(),
        }
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }
}

impl SceneDrawer for MeshScene {
    fn material_layout(&self) -> BindingGroupLayoutDesc {
        BindingGroupLayoutDesc {
            entries: vec![BindingSlotDesc::fragment_sampler(0)],
        }
    }

    fn prepare(&mut self, device: &mut dyn GraphicsDevice, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        let mut groups = Vec::with_capacity(self.meshes.len());
        for mesh in &self.meshes {
            let group = match &mesh.texture {
                Some(texture) => Some(device.create_binding_group(
                    pipeline,
                    MATERIAL_SET_INDEX,
                    &[BindingResource::SampledTexture(texture.clone(), SamplerType::LinearRepeat)],
                )?),
                None => None,
            };
            groups.push(group);
        }
        engine_debug!(
            "sponza::Scene",
            "Prepared {} material groups for pipeline '{}'",
            groups.iter().flatten().count(),
            pipeline.label()
        );
        self.material_groups.insert(pipeline.label().to_string(), groups);
        Ok(())
    }

    fn draw(&self, cmd: &mut dyn CommandList, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        let groups = self.material_groups.get(pipeline.label());
        for (index, mesh) in self.meshes.iter().enumerate() {
            cmd.bind_vertex_buffer(&mesh.vertex_buffer, 0)?;
            cmd.bind_index_buffer(&mesh.index_buffer, 0, IndexType::U32)?;
            if let Some(group) = groups.and_then(|g| g.get(index)).and_then(Option::as_ref) {
                cmd.bind_binding_group(pipeline, MATERIAL_SET_INDEX, group)?;
            }
            cmd.draw_indexed(mesh.index_count, 0, 0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
