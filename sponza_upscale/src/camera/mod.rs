//! Camera module: first-person camera with frame-to-frame view-projection history.

mod camera;

pub use camera::{Camera, ViewProjection};
