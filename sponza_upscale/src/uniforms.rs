/// Uniform blocks and push constants written by the core
///
/// Layouts follow std140: every `vec3` starts on a 16-byte boundary and a
/// trailing scalar may pack into the padding of the preceding `vec3`.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::camera::Camera;

/// Number of point lights in the lighting block
pub const POINT_LIGHT_COUNT: usize = 40;

/// Uniform scale applied to the Sponza model
pub const MODEL_SCALE: f32 = 0.01;

// ============================================================================
// G-buffer pass
// ============================================================================

/// Matrices read by the G-buffer vertex shader (set 0, binding 0)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SceneUniforms {
    pub projection: Mat4,
    pub model: Mat4,
    pub view: Mat4,
}

impl SceneUniforms {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            projection: camera.perspective(),
            model: Mat4::from_scale(Vec3::splat(MODEL_SCALE)),
            view: camera.view(),
        }
    }
}

// ============================================================================
// Lighting pass
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointLight {
    pub position: Vec3,
    pub _pad0: f32,
    pub ambient: Vec3,
    pub _pad1: f32,
    pub diffuse: Vec3,
    pub _pad2: f32,
    pub specular: Vec3,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
    pub _pad3: [f32; 2],
}

impl PointLight {
    /// Light at `position` with the scene's shared attenuation
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ambient: Vec3::splat(0.05),
            diffuse: Vec3::splat(0.4),
            specular: Vec3::splat(0.5),
            constant: 20.0,
            linear: 0.15,
            quadratic: 0.32,
            ..Zeroable::zeroed()
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DirLight {
    pub direction: Vec3,
    pub _pad0: f32,
    pub ambient: Vec3,
    pub _pad1: f32,
    pub diffuse: Vec3,
    pub _pad2: f32,
    pub specular: Vec3,
    pub _pad3: f32,
}

impl Default for DirLight {
    /// Straight-down sun
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, -1.0, 0.0),
            ambient: Vec3::splat(0.05),
            diffuse: Vec3::splat(0.8),
            specular: Vec3::splat(0.5),
            ..Zeroable::zeroed()
        }
    }
}

/// Lighting pass block (set 0, binding 3)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightUniforms {
    pub view_pos: Vec3,
    pub _pad0: f32,
    pub point_lights: [PointLight; POINT_LIGHT_COUNT],
    pub dir_light: DirLight,
    pub light_space_matrix: Mat4,
}

impl LightUniforms {
    /// Two rows of twenty lights either side of the nave
    pub fn point_light_positions() -> [Vec3; POINT_LIGHT_COUNT] {
        let mut positions = [Vec3::ZERO; POINT_LIGHT_COUNT];
        for (row, z) in [-0.2f32, 0.2].into_iter().enumerate() {
            let base = row * 20;
            for i in 0..10 {
                positions[base + i] = Vec3::new(i as f32, 2.0, z);
            }
            positions[base + 10] = Vec3::new(0.0, 3.0, z);
            for i in 1..10 {
                positions[base + 10 + i] = Vec3::new(-(i as f32), 2.0, z);
            }
        }
        positions
    }

    pub fn from_camera(camera: &Camera) -> Self {
        let mut point_lights = [PointLight::zeroed(); POINT_LIGHT_COUNT];
        for (light, position) in point_lights.iter_mut().zip(Self::point_light_positions()) {
            *light = PointLight::at(position);
        }
        Self {
            view_pos: camera.position(),
            _pad0: 0.0,
            point_lights,
            dir_light: DirLight::default(),
            light_space_matrix: Mat4::IDENTITY,
        }
    }
}

// ============================================================================
// Sharpen upscale
// ============================================================================

/// Contrast-adaptive sharpen block (set 0, binding 0)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SharpenUniforms {
    pub sharpness: f32,
    pub _pad: [f32; 3],
}

impl SharpenUniforms {
    pub fn new(sharpness: f32) -> Self {
        Self { sharpness, _pad: [0.0; 3] }
    }
}

/// Input region pushed to the edge-adaptive upsample pass
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct EasuPushConstants {
    pub width: u32,
    pub height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

#[cfg(test)]
#[path = "uniforms_tests.rs"]
mod tests;
