//! # Configuration
//!
//! `convene.toml` settings and their precedence.
//!
//! Precedence, highest first: command-line flags, `CONVENE_ENVIRONMENT`
//! (environment only), the config file, built-in defaults. A missing config
//! file is fine unless its path was given explicitly.

use convene_core::{
    ComponentId, ConveneError, DirectorySource, EnvironmentScope, ManifestSource, ModuleName,
    ModuleSource, ResolverOptions,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "convene.toml";

/// Modules directory used when neither a manifest nor a directory is set.
pub const DEFAULT_MODULES_DIR: &str = "modules";

/// Environment variable overriding the configured environment.
pub const ENVIRONMENT_VAR: &str = "CONVENE_ENVIRONMENT";

/// Written by `convene init`.
pub const STARTER_CONFIG: &str = r#"# Convene configuration

# One manifest listing every module (TOML or JSON)...
# manifest = "modules.toml"

# ...or one module.toml per subdirectory.
modules_dir = "modules"

# Root reference names. Modules reaching one of these are candidates.
roots = []

# "undefined" (everything), "live" or "unit-test"
environment = "undefined"

# Component ids placed before / after the discovered components.
prepend = []
append = []

# Replaces the built-in denylist when set.
# denied_prefixes = ["std::", "core::", "system."]
"#;

/// Contents of `convene.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConveneConfig {
    pub manifest: Option<PathBuf>,
    pub modules_dir: Option<PathBuf>,
    pub roots: Vec<String>,
    pub environment: Option<String>,
    pub prepend: Vec<String>,
    pub append: Vec<String>,
    pub denied_prefixes: Option<Vec<String>>,
}

/// Values given on the command line. Empty lists and `None` leave the
/// configured value in place.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub manifest: Option<PathBuf>,
    pub modules_dir: Option<PathBuf>,
    pub roots: Vec<String>,
    pub environment: Option<String>,
    pub prepend: Vec<String>,
    pub append: Vec<String>,
}

impl ConveneConfig {
    /// Parse config text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConveneError> {
        toml::from_str(text).map_err(|e| ConveneError::SerializationError(format!("config: {}", e)))
    }

    /// Load `path`. When `explicit` is false a missing file yields defaults.
    pub fn load(path: &Path, explicit: bool) -> Result<Self, ConveneError> {
        if !path.exists() {
            if explicit {
                return Err(ConveneError::IoError(format!(
                    "config file {} not found",
                    path.display()
                )));
            }
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| ConveneError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Apply command-line values.
    ///
    /// A manifest given on the command line hides a configured modules
    /// directory and the other way round.
    #[must_use]
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(manifest) = overrides.manifest {
            self.manifest = Some(manifest);
            self.modules_dir = None;
        }
        if let Some(dir) = overrides.modules_dir {
            self.modules_dir = Some(dir);
            self.manifest = None;
        }
        if !overrides.roots.is_empty() {
            self.roots = overrides.roots;
        }
        if overrides.environment.is_some() {
            self.environment = overrides.environment;
        }
        if !overrides.prepend.is_empty() {
            self.prepend = overrides.prepend;
        }
        if !overrides.append.is_empty() {
            self.append = overrides.append;
        }
        self
    }

    /// Where modules come from. A manifest wins over a directory.
    #[must_use]
    pub fn module_source(&self) -> Box<dyn ModuleSource> {
        match (&self.manifest, &self.modules_dir) {
            (Some(manifest), _) => Box::new(ManifestSource::new(manifest)),
            (None, Some(dir)) => Box::new(DirectorySource::new(dir)),
            (None, None) => Box::new(DirectorySource::new(DEFAULT_MODULES_DIR)),
        }
    }

    /// Human-readable description of `module_source()`.
    #[must_use]
    pub fn source_label(&self) -> String {
        match (&self.manifest, &self.modules_dir) {
            (Some(manifest), _) => format!("manifest {}", manifest.display()),
            (None, Some(dir)) => format!("directory {}", dir.display()),
            (None, None) => format!("directory {}", DEFAULT_MODULES_DIR),
        }
    }

    #[must_use]
    pub fn roots(&self) -> BTreeSet<ModuleName> {
        self.roots.iter().map(ModuleName::new).collect()
    }

    #[must_use]
    pub fn prepend_ids(&self) -> Vec<ComponentId> {
        self.prepend.iter().map(ComponentId::new).collect()
    }

    #[must_use]
    pub fn append_ids(&self) -> Vec<ComponentId> {
        self.append.iter().map(ComponentId::new).collect()
    }

    #[must_use]
    pub fn resolver_options(&self) -> ResolverOptions {
        match &self.denied_prefixes {
            Some(prefixes) => ResolverOptions::with_denied_prefixes(prefixes.iter().cloned()),
            None => ResolverOptions::default(),
        }
    }

    /// Effective environment scope.
    ///
    /// `from_env` is the value of `CONVENE_ENVIRONMENT`; it applies only when
    /// no flag set the environment.
    pub fn scope(
        &self,
        flag: Option<&str>,
        from_env: Option<&str>,
    ) -> Result<EnvironmentScope, ConveneError> {
        flag.or(from_env)
            .or(self.environment.as_deref())
            .map(str::parse)
            .unwrap_or(Ok(EnvironmentScope::Undefined))
    }
}
