//! Shared setup for unit tests that need a built frame graph

use std::sync::{Arc, Mutex};

use crate::asset::DirectoryAssetResolver;
use crate::config::RenderConfig;
use crate::frame_graph::{PassGraph, PresentTargets};
use crate::graphics_device::mock_graphics_device::{MockDeviceLog, MockGraphicsDevice, MockSwapchain};
use crate::graphics_device::*;
use crate::pipeline_builder::PipelineBuilder;
use crate::scene::{MeshScene, SceneMesh};

pub fn assets() -> DirectoryAssetResolver {
    DirectoryAssetResolver::new("/data/storage/sponza")
}

/// Two meshes, the first one textured
pub fn mesh_scene(device: &mut MockGraphicsDevice) -> MeshScene {
    let mut meshes = Vec::new();
    for index in 0..2 {
        let buffer = |device: &mut MockGraphicsDevice, usage| {
            device
                .create_buffer(BufferDesc { label: format!("mesh_{}", index), size: 256, usage })
                .unwrap()
        };
        let texture = (index == 0).then(|| {
            device
                .create_texture(TextureDesc {
                    label: "material_0".to_string(),
                    width: 16,
                    height: 16,
                    format: TextureFormat::R8G8B8A8_SRGB,
                    usage: TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST,
                })
                .unwrap()
        });
        meshes.push(SceneMesh {
            vertex_buffer: buffer(device, BufferUsage::Vertex),
            index_buffer: buffer(device, BufferUsage::Index),
            index_count: 36,
            texture,
        });
    }
    MeshScene::new(meshes)
}

pub struct GraphFixture {
    pub device: MockGraphicsDevice,
    pub log: Arc<Mutex<MockDeviceLog>>,
    pub config: RenderConfig,
    pub swapchain: MockSwapchain,
    pub passes: PassGraph,
    pub present: PresentTargets,
    pub scene: MeshScene,
}

impl GraphFixture {
    /// Default configuration, 1280x720 swapchain with three images
    pub fn new() -> Self {
        let mut device = MockGraphicsDevice::new();
        let log = device.log();
        let config = RenderConfig::default();
        let swapchain = MockSwapchain::new(config.screen_width, config.screen_height, 3);
        let passes = PassGraph::build(&mut device, &config, Extent2D::new(swapchain.width(), swapchain.height())).unwrap();
        let present = PresentTargets::build(&mut device, &swapchain).unwrap();
        let scene = mesh_scene(&mut device);
        Self { device, log, config, swapchain, passes, present, scene }
    }

    pub fn pipelines(&mut self) -> PipelineBuilder {
        PipelineBuilder::build(&mut self.device, &assets(), &self.passes, &self.present, &mut self.scene)
            .unwrap()
    }
}
