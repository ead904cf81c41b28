/// Shader module trait and descriptor

use std::any::Any;
use std::path::PathBuf;

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

/// Descriptor for loading a SPIR-V shader module
///
/// `path` is an absolute path produced by the asset resolver; the backend
/// reads the file, the core never touches the storage behind it.
#[derive(Debug, Clone)]
pub struct ShaderDesc {
    /// Logical name (the relative asset path)
    pub label: String,
    /// Absolute path of the SPIR-V binary
    pub path: PathBuf,
    /// Stage this module is compiled for
    pub stage: ShaderStage,
    /// Entry point symbol
    pub entry_point: String,
}

/// Compiled shader module
pub trait Shader: Send + Sync {
    /// Stage this module was created for
    fn stage(&self) -> ShaderStage;

    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}
