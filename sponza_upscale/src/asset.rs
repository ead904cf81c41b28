/// Asset path collaborator
///
/// The core only consumes resolved absolute paths; where the files live and
/// how they got there belongs to the platform layer.

use std::path::{Path, PathBuf};
use crate::error::{Error, Result};

/// Logical shader paths, relative to the asset root
pub mod shaders {
    pub const FULLSCREEN_VERT: &str = "shader/fullscreen.vert.spv";
    pub const SWAPCHAIN_FRAG: &str = "shader/swapChain.frag.spv";
    pub const LIGHT_FRAG: &str = "shader/light.frag.spv";
    pub const GBUFFER_VERT: &str = "shader/gbuffer.vert.spv";
    pub const GBUFFER_FRAG: &str = "shader/gbuffer.frag.spv";
    /// Full-screen triangle used by both sharpen sub-passes
    pub const SHARPEN_VERT: &str = "shader/algorithm/fullscreen.vert.spv";
    pub const EASU_FRAG: &str = "shader/algorithm/easu.frag.spv";
    pub const RCAS_FRAG: &str = "shader/algorithm/rcas.frag.spv";
}

/// Resolves logical asset paths to absolute filesystem paths
pub trait AssetResolver: Send + Sync {
    /// Resolve `relative` to an absolute path
    ///
    /// # Errors
    ///
    /// `InvalidResource` when `relative` is empty or already absolute.
    fn resolve(&self, relative: &str) -> Result<PathBuf>;
}

/// Resolver rooted at a directory (the application's files dir)
#[derive(Debug, Clone)]
pub struct DirectoryAssetResolver {
    root: PathBuf,
}

impl DirectoryAssetResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetResolver for DirectoryAssetResolver {
    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        if relative.is_empty() {
            return Err(Error::InvalidResource("empty asset path".to_string()));
        }
        let path = Path::new(relative);
        if path.is_absolute() {
            return Err(Error::InvalidResource(format!(
                "asset path '{}' must be relative",
                relative
            )));
        }
        Ok(self.root.join(path))
    }
}

#[cfg(test)]
#[path = "asset_tests.rs"]
mod tests;
