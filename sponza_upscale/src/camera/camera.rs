/// First-person camera
///
/// Owned by the frame driver. Every view or projection change snapshots the
/// current matrices into `previous` first, so the VRS stage can build a
/// reprojection matrix from the last two states.

use glam::{Mat4, Vec3};

/// Perspective and view matrices captured together
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewProjection {
    pub perspective: Mat4,
    pub view: Mat4,
}

impl ViewProjection {
    /// Both matrices zero (camera never initialized)
    pub const ZERO: Self = Self {
        perspective: Mat4::ZERO,
        view: Mat4::ZERO,
    };

    /// `perspective * view`
    pub fn combined(&self) -> Mat4 {
        self.perspective * self.view
    }

    /// Whether this snapshot is still the zero state
    pub fn is_zero(&self) -> bool {
        self.perspective == Mat4::ZERO || self.view == Mat4::ZERO
    }
}

impl Default for ViewProjection {
    fn default() -> Self {
        Self::ZERO
    }
}

#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    /// Euler angles in degrees
    rotation: Vec3,
    fov_degrees: f32,
    z_near: f32,
    z_far: f32,
    flip_y: bool,
    current: ViewProjection,
    previous: ViewProjection,
    updated: bool,
}

impl Camera {
    /// Camera at (0, 1, 0) looking down -X, Vulkan Y flip enabled
    ///
    /// Both snapshots start zeroed; call `set_perspective` before use.
    pub fn new() -> Self {
        Self {
            position: Vec3::new(0.0, 1.0, 0.0),
            rotation: Vec3::new(0.0, -90.0, 0.0),
            fov_degrees: 60.0,
            z_near: 0.1,
            z_far: 64.0,
            flip_y: true,
            current: ViewProjection::ZERO,
            previous: ViewProjection::ZERO,
            updated: false,
        }
    }

    // ===== GETTERS =====

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov_degrees
    }

    /// Matrices of the latest update
    pub fn current(&self) -> &ViewProjection {
        &self.current
    }

    /// Matrices before the latest update
    pub fn previous(&self) -> &ViewProjection {
        &self.previous
    }

    pub fn perspective(&self) -> Mat4 {
        self.current.perspective
    }

    pub fn view(&self) -> Mat4 {
        self.current.view
    }

    /// Whether the matrices changed since the last `take_updated`
    pub fn is_updated(&self) -> bool {
        self.updated
    }

    /// Return and clear the updated flag
    pub fn take_updated(&mut self) -> bool {
        std::mem::replace(&mut self.updated, false)
    }

    /// Unit vector the camera looks along
    pub fn front(&self) -> Vec3 {
        let pitch = self.rotation.x.to_radians();
        let yaw = self.rotation.y.to_radians();
        Vec3::new(
            -pitch.cos() * yaw.sin(),
            pitch.sin(),
            pitch.cos() * yaw.cos(),
        )
        .normalize()
    }

    // ===== UPDATES =====

    /// Set the projection and refresh the view
    pub fn set_perspective(&mut self, fov_degrees: f32, aspect: f32, z_near: f32, z_far: f32) {
        self.fov_degrees = fov_degrees;
        self.z_near = z_near;
        self.z_far = z_far;
        let mut perspective = Mat4::perspective_rh(fov_degrees.to_radians(), aspect, z_near, z_far);
        if self.flip_y {
            perspective.y_axis.y *= -1.0;
        }
        let view = self.compute_view();
        self.snapshot(ViewProjection { perspective, view });
    }

    /// Recompute the projection for a new aspect ratio
    pub fn update_aspect_ratio(&mut self, aspect: f32) {
        self.set_perspective(self.fov_degrees, aspect, self.z_near, self.z_far);
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.update_view();
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
        self.update_view();
    }

    /// Add `delta` degrees to the rotation
    pub fn rotate(&mut self, delta: Vec3) {
        self.rotation += delta;
        self.update_view();
    }

    /// Move by `delta` in world space
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
        self.update_view();
    }

    /// Move along `front()`
    pub fn move_forward(&mut self, distance: f32) {
        self.position += self.front() * distance;
        self.update_view();
    }

    fn update_view(&mut self) {
        let view = self.compute_view();
        let perspective = self.current.perspective;
        self.snapshot(ViewProjection { perspective, view });
    }

    fn snapshot(&mut self, next: ViewProjection) {
        self.previous = self.current;
        self.current = next;
        self.updated = true;
    }

    fn compute_view(&self) -> Mat4 {
        let pitch = if self.flip_y { -self.rotation.x } else { self.rotation.x };
        let rotation = Mat4::from_rotation_x(pitch.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
            * Mat4::from_rotation_z(self.rotation.z.to_radians());
        let mut translation = self.position;
        if self.flip_y {
            translation.y = -translation.y;
        }
        rotation * Mat4::from_translation(translation)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
