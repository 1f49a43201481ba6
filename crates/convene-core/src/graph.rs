//! # Reference Graph
//!
//! Library modules and their directed "references" edges.
//!
//! The graph is pure data: it is built once per resolution pass from a
//! module source and never mutated afterwards. The name index uses
//! `BTreeMap` keyed by the lower-cased module name.

use crate::{ComponentDescriptor, ModuleName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

// =============================================================================
// MODULE
// =============================================================================

/// A named compiled unit with reference edges and declared components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Unique, case-insensitive name.
    pub name: ModuleName,
    /// Informational version string.
    #[serde(default)]
    pub version: Option<String>,
    /// Names of the modules this one references, in declaration order.
    #[serde(default)]
    pub references: Vec<ModuleName>,
    /// Components declared on this module.
    #[serde(default)]
    pub components: Vec<ComponentDescriptor>,
}

impl Module {
    /// Create a module with no references and no components.
    #[must_use]
    pub fn new(name: impl Into<ModuleName>) -> Self {
        Self {
            name: name.into(),
            version: None,
            references: Vec::new(),
            components: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_reference(mut self, name: impl Into<ModuleName>) -> Self {
        self.references.push(name.into());
        self
    }

    #[must_use]
    pub fn with_component(mut self, descriptor: ComponentDescriptor) -> Self {
        self.components.push(descriptor);
        self
    }
}

// =============================================================================
// MODULE GRAPH
// =============================================================================

/// The set of modules seen in one pass, indexed by name.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    /// Modules in input order. Later duplicates are dropped.
    modules: Vec<Module>,

    /// Lower-cased name -> position in `modules`
    index: BTreeMap<String, usize>,
}

impl ModuleGraph {
    /// Build the graph and its name index.
    ///
    /// If two modules share a name (ignoring case), the first one wins.
    #[must_use]
    pub fn new(modules: impl IntoIterator<Item = Module>) -> Self {
        let mut graph = Self::default();
        for module in modules {
            let key = module.name.key();
            if graph.index.contains_key(&key) {
                warn!(module = %module.name, "duplicate module name, keeping first occurrence");
                continue;
            }
            graph.index.insert(key, graph.modules.len());
            graph.modules.push(module);
        }
        graph
    }

    /// Look a module up by name, ignoring case.
    #[must_use]
    pub fn get(&self, name: &ModuleName) -> Option<&Module> {
        self.index.get(&name.key()).map(|&i| &self.modules[i])
    }

    /// Check if a module with this name exists.
    #[must_use]
    pub fn contains(&self, name: &ModuleName) -> bool {
        self.index.contains_key(&name.key())
    }

    /// All modules in input order.
    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// References of a module, empty if the module is absent.
    #[must_use]
    pub fn references_of(&self, name: &ModuleName) -> &[ModuleName] {
        self.get(name)
            .map(|m| m.references.as_slice())
            .unwrap_or(&[])
    }

    /// Number of modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// True if the graph has no modules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Total number of reference edges, including edges to absent modules.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.modules.iter().map(|m| m.references.len()).sum()
    }

    /// Total number of declared components across all modules.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.modules.iter().map(|m| m.components.len()).sum()
    }

    /// Find the descriptor for a component identity on any module.
    ///
    /// Modules are searched in input order.
    #[must_use]
    pub fn find_component(&self, id: &crate::ComponentId) -> Option<&ComponentDescriptor> {
        self.modules
            .iter()
            .flat_map(|m| m.components.iter())
            .find(|d| &d.id == id)
    }
}

impl FromIterator<Module> for ModuleGraph {
    fn from_iter<I: IntoIterator<Item = Module>>(iter: I) -> Self {
        Self::new(iter)
    }
}

// =============================================================================
// TESTS
// =============================================================================
