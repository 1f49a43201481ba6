//! # Module Manifests
//!
//! TOML/JSON metadata declaring modules, their references and the
//! components they carry.
//!
//! Two shapes are accepted:
//! - [`ModuleManifest`]: many modules, as `[[module]]` tables
//! - [`ModuleDocument`]: one module at the top level (a `module.toml`)
//!
//! `before`/`after` lists normalize onto `DependentOf`/`DependsOn` edges.
//!
//! ## Limits
//!
//! Inputs larger than `MAX_MANIFEST_SIZE` are rejected before parsing.

use crate::graph::Module;
use crate::primitives::MAX_MANIFEST_SIZE;
use crate::{
    Capability, ComponentDescriptor, ComponentId, ComponentKind, ConveneError, DependencyEdge,
    EnvironmentScope, ModuleName,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// SCHEMA
// =============================================================================

/// One `[[module.component]]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentSpec {
    pub id: String,
    pub kind: ComponentKind,
    pub scope: EnvironmentScope,
    pub capabilities: Vec<String>,
    pub depends_on: Vec<String>,
    pub dependent_of: Vec<String>,
    pub before: Vec<String>,
    pub after: Vec<String>,
}

impl ComponentSpec {
    /// Normalize into a descriptor.
    ///
    /// Edge order: `depends_on`, `after`, `dependent_of`, `before`.
    pub fn into_descriptor(self) -> Result<ComponentDescriptor, ConveneError> {
        if self.id.trim().is_empty() {
            return Err(ConveneError::InvalidManifest(
                "component id cannot be empty".to_string(),
            ));
        }

        let edges = self
            .depends_on
            .into_iter()
            .chain(self.after)
            .map(|t| DependencyEdge::depends_on(ComponentId::new(t)))
            .chain(
                self.dependent_of
                    .into_iter()
                    .chain(self.before)
                    .map(|t| DependencyEdge::dependent_of(ComponentId::new(t))),
            )
            .collect();

        Ok(ComponentDescriptor {
            id: ComponentId::new(self.id),
            scope: self.scope,
            edges,
            kind: self.kind,
            capabilities: self.capabilities.into_iter().map(Capability::new).collect(),
        })
    }
}

/// One module: a `[[module]]` table, or a whole `module.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDocument {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default, rename = "component")]
    pub components: Vec<ComponentSpec>,
}

impl ModuleDocument {
    /// Parse a single-module TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConveneError> {
        check_size(text.len())?;
        toml::from_str(text).map_err(|e| ConveneError::InvalidManifest(e.to_string()))
    }

    /// Validate and convert into a graph module.
    pub fn into_module(self) -> Result<Module, ConveneError> {
        let name = ModuleName::new(self.name);
        if name.is_blank() {
            return Err(ConveneError::InvalidManifest(
                "module name cannot be empty".to_string(),
            ));
        }

        let components = self
            .components
            .into_iter()
            .map(ComponentSpec::into_descriptor)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| match e {
                ConveneError::InvalidManifest(msg) => {
                    ConveneError::InvalidManifest(format!("module {}: {}", name, msg))
                }
                other => other,
            })?;

        Ok(Module {
            name,
            version: self.version,
            references: self.references.into_iter().map(ModuleName::new).collect(),
            components,
        })
    }
}

/// A manifest listing many modules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleDocument>,
}

impl ModuleManifest {
    /// Parse a TOML manifest.
    pub fn from_toml_str(text: &str) -> Result<Self, ConveneError> {
        check_size(text.len())?;
        toml::from_str(text).map_err(|e| ConveneError::InvalidManifest(e.to_string()))
    }

    /// Parse a JSON manifest.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ConveneError> {
        check_size(bytes.len())?;
        serde_json::from_slice(bytes).map_err(|e| ConveneError::InvalidManifest(e.to_string()))
    }

    /// Render as pretty JSON.
    pub fn to_json_string(&self) -> Result<String, ConveneError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ConveneError::SerializationError(e.to_string()))
    }

    /// Validate and convert every module. The first invalid module fails the
    /// whole manifest.
    pub fn into_modules(self) -> Result<Vec<Module>, ConveneError> {
        self.modules
            .into_iter()
            .map(ModuleDocument::into_module)
            .collect()
    }
}

fn check_size(len: usize) -> Result<(), ConveneError> {
    if len as u64 > MAX_MANIFEST_SIZE {
        return Err(ConveneError::InvalidManifest(format!(
            "manifest is {} bytes, limit is {}",
            len, MAX_MANIFEST_SIZE
        )));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Direction;

    const SAMPLE: &str = r#"
[[module]]
name = "Acme.Web"
version = "1.2.0"
references = ["Acme.Core", "std"]

[[module.component]]
id = "acme_web::Routes"
scope = "live"
capabilities = ["services"]
depends_on = ["acme_core::Logging"]
before = ["acme_web::Server"]

[[module.component]]
id = "acme_web::warmup"
kind = "callback"

[[module]]
name = "Acme.Core"

[[module.component]]
id = "acme_core::Logging"
scope = "unit-test"
"#;

    #[test]
    fn parses_toml_manifest() {
        let modules = ModuleManifest::from_toml_str(SAMPLE)
            .and_then(ModuleManifest::into_modules)
            .expect("parse");

        assert_eq!(modules.len(), 2);
        let web = &modules[0];
        assert_eq!(web.name.as_str(), "Acme.Web");
        assert_eq!(web.version.as_deref(), Some("1.2.0"));
        assert_eq!(web.references.len(), 2);
        assert_eq!(web.components.len(), 2);

        let routes = &web.components[0];
        assert_eq!(routes.scope, EnvironmentScope::Live);
        assert_eq!(routes.capabilities, vec![Capability::new("services")]);
        assert_eq!(
            routes.edges,
            vec![
                DependencyEdge::depends_on("acme_core::Logging"),
                DependencyEdge::dependent_of("acme_web::Server"),
            ]
        );

        assert_eq!(web.components[1].kind, ComponentKind::Callback);
        assert_eq!(modules[1].components[0].scope, EnvironmentScope::UnitTest);
    }

    #[test]
    fn after_is_depends_on() {
        let spec = ComponentSpec {
            id: "x".to_string(),
            after: vec!["y".to_string()],
            ..ComponentSpec::default()
        };

        let descriptor = spec.into_descriptor().expect("descriptor");

        assert_eq!(descriptor.edges[0].direction, Direction::DependsOn);
        assert_eq!(descriptor.edges[0].target.as_str(), "y");
    }

    #[test]
    fn parses_json_manifest() {
        let json = br#"{
            "module": [
                { "name": "Plugins", "references": ["Host"],
                  "component": [ { "id": "plugins::Audit", "after": ["host::Db"] } ] }
            ]
        }"#;

        let modules = ModuleManifest::from_json_slice(json)
            .and_then(ModuleManifest::into_modules)
            .expect("parse");

        assert_eq!(modules[0].name.as_str(), "Plugins");
        assert_eq!(modules[0].components[0].edges.len(), 1);
    }

    #[test]
    fn json_round_trip_keeps_modules() {
        let manifest = ModuleManifest::from_toml_str(SAMPLE).expect("parse");
        let json = manifest.to_json_string().expect("render");

        let back = ModuleManifest::from_json_slice(json.as_bytes()).expect("parse json");

        assert_eq!(back, manifest);
    }

    #[test]
    fn empty_module_name_is_rejected() {
        let result = ModuleManifest::from_toml_str("[[module]]\nname = \"  \"\n")
            .and_then(ModuleManifest::into_modules);

        assert!(matches!(result, Err(ConveneError::InvalidManifest(_))));
    }

    #[test]
    fn empty_component_id_is_rejected() {
        let text = "[[module]]\nname = \"m\"\n[[module.component]]\nscope = \"live\"\n";

        let result = ModuleManifest::from_toml_str(text).and_then(ModuleManifest::into_modules);

        match result {
            Err(ConveneError::InvalidManifest(msg)) => assert!(msg.contains("module m")),
            other => assert!(other.is_err(), "expected invalid manifest"),
        }
    }

    #[test]
    fn unknown_scope_is_rejected() {
        let text = r#"
[[module]]
name = "m"

[[module.component]]
id = "c"
scope = "staging"
"#;

        assert!(ModuleManifest::from_toml_str(text).is_err());
    }

    #[test]
    fn single_module_document() {
        let text = r#"
name = "Acme.Jobs"
references = ["Acme.Core"]

[[component]]
id = "jobs::Scheduler"
after = ["acme_core::Logging"]
"#;

        let module = ModuleDocument::from_toml_str(text)
            .and_then(ModuleDocument::into_module)
            .expect("parse");

        assert_eq!(module.name.as_str(), "Acme.Jobs");
        assert_eq!(module.components[0].id.as_str(), "jobs::Scheduler");
    }

    #[test]
    fn oversized_input_is_rejected() {
        assert!(check_size(MAX_MANIFEST_SIZE as usize + 1).is_err());
        assert!(check_size(16).is_ok());
    }

    #[test]
    fn malformed_toml_is_invalid_manifest() {
        let result = ModuleManifest::from_toml_str("[[module]\nname=");

        assert!(matches!(result, Err(ConveneError::InvalidManifest(_))));
    }
}
