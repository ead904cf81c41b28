/// Device function table - traits the bootstrap layer implements

pub mod graphics_device;
pub mod texture;
pub mod buffer;
pub mod shader;
pub mod pipeline;
pub mod command_list;
pub mod render_pass;
pub mod swapchain;
pub mod binding_group;
pub mod frame_buffer;
pub mod kernels;

pub use graphics_device::*;
pub use texture::*;
pub use buffer::*;
pub use shader::*;
pub use pipeline::*;
pub use command_list::*;
pub use render_pass::*;
pub use swapchain::*;
pub use binding_group::*;
pub use frame_buffer::*;
pub use kernels::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
