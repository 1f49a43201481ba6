//! # Module Sources
//!
//! Providers of the modules that make up one reference graph.
//!
//! - `StaticSource`: modules supplied by the caller
//! - `ManifestSource`: one TOML or JSON manifest listing many modules
//! - `DirectorySource`: one `module.toml` per subdirectory of a root
//!
//! Directory scanning is tolerant: a subdirectory with an unreadable or
//! invalid manifest is logged and skipped, never fatal.

use crate::formats::{ModuleDocument, ModuleManifest};
use crate::graph::{Module, ModuleGraph};
use crate::primitives::{MAX_MANIFEST_SIZE, MODULE_MANIFEST_FILE};
use crate::ConveneError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Something that can enumerate modules.
pub trait ModuleSource {
    /// Load every module this source knows about.
    fn load_modules(&self) -> Result<Vec<Module>, ConveneError>;

    /// Load and index the modules.
    fn load_graph(&self) -> Result<ModuleGraph, ConveneError> {
        Ok(ModuleGraph::new(self.load_modules()?))
    }
}

// =============================================================================
// STATIC SOURCE
// =============================================================================

/// An explicit module list.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    modules: Vec<Module>,
}

impl StaticSource {
    #[must_use]
    pub fn new(modules: Vec<Module>) -> Self {
        Self { modules }
    }
}

impl ModuleSource for StaticSource {
    fn load_modules(&self) -> Result<Vec<Module>, ConveneError> {
        Ok(self.modules.clone())
    }
}

// =============================================================================
// MANIFEST SOURCE
// =============================================================================

/// A single manifest file. `.json` files are read as JSON, anything else as
/// TOML.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    path: PathBuf,
}

impl ManifestSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_json(&self) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"))
    }
}

impl ModuleSource for ManifestSource {
    fn load_modules(&self) -> Result<Vec<Module>, ConveneError> {
        let bytes = read_limited(&self.path)?;
        let manifest = if self.is_json() {
            ModuleManifest::from_json_slice(&bytes)?
        } else {
            let text = String::from_utf8(bytes)
                .map_err(|e| ConveneError::InvalidManifest(e.to_string()))?;
            ModuleManifest::from_toml_str(&text)?
        };
        let modules = manifest.into_modules()?;
        info!(path = %self.path.display(), modules = modules.len(), "manifest loaded");
        Ok(modules)
    }
}

// =============================================================================
// DIRECTORY SOURCE
// =============================================================================

/// Scans the immediate subdirectories of a root for `module.toml`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load_one(path: &Path) -> Result<Module, ConveneError> {
        let bytes = read_limited(path)?;
        let text =
            String::from_utf8(bytes).map_err(|e| ConveneError::InvalidManifest(e.to_string()))?;
        ModuleDocument::from_toml_str(&text)?.into_module()
    }
}

impl ModuleSource for DirectorySource {
    fn load_modules(&self) -> Result<Vec<Module>, ConveneError> {
        if !self.root.is_dir() {
            debug!(root = %self.root.display(), "modules directory does not exist");
            return Ok(Vec::new());
        }

        let mut dirs: Vec<PathBuf> = fs::read_dir(&self.root)
            .map_err(|e| ConveneError::IoError(format!("{}: {}", self.root.display(), e)))?
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    warn!(error = %e, "unreadable directory entry, skipping");
                    None
                }
            })
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        let mut modules = Vec::new();
        for dir in dirs {
            let manifest_path = dir.join(MODULE_MANIFEST_FILE);
            if !manifest_path.is_file() {
                debug!(dir = %dir.display(), "no {} found, skipping", MODULE_MANIFEST_FILE);
                continue;
            }

            match Self::load_one(&manifest_path) {
                Ok(module) => {
                    debug!(module = %module.name, "module discovered");
                    modules.push(module);
                }
                Err(e) => {
                    warn!(
                        path = %manifest_path.display(),
                        error = %e,
                        "invalid module manifest, skipping"
                    );
                }
            }
        }

        info!(root = %self.root.display(), modules = modules.len(), "modules discovered");
        Ok(modules)
    }
}

/// Read a file, refusing anything over `MAX_MANIFEST_SIZE`.
fn read_limited(path: &Path) -> Result<Vec<u8>, ConveneError> {
    let metadata = fs::metadata(path)
        .map_err(|e| ConveneError::IoError(format!("{}: {}", path.display(), e)))?;
    if metadata.len() > MAX_MANIFEST_SIZE {
        return Err(ConveneError::InvalidManifest(format!(
            "{} is {} bytes, limit is {}",
            path.display(),
            metadata.len(),
            MAX_MANIFEST_SIZE
        )));
    }
    fs::read(path).map_err(|e| ConveneError::IoError(format!("{}: {}", path.display(), e)))
}

// =============================================================================
// TESTS
// =============================================================================
