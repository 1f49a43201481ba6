//! # Component Registry
//!
//! Materializes the components declared on accepted modules.
//!
//! - Modules are read in the order given (normally the resolver's order)
//! - Identities are deduplicated within and across modules, first wins
//! - Each surviving identity is requested from the activator exactly once
//! - A failed activation is reported and skipped, never fatal

use crate::graph::Module;
use crate::{BoxError, ComponentId, ConveneError, Entry};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

// =============================================================================
// ACTIVATOR
// =============================================================================

/// Produces an instance for a component identity.
///
/// Typically backed by a dependency-injection container. The registry never
/// constructs instances itself.
pub trait Activator<T> {
    /// Materialize an instance of `id`.
    fn activate(&self, id: &ComponentId) -> Result<T, BoxError>;
}

impl<T, F> Activator<T> for F
where
    F: Fn(&ComponentId) -> Result<T, BoxError>,
{
    fn activate(&self, id: &ComponentId) -> Result<T, BoxError> {
        self(id)
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Outcome of a registry load.
#[derive(Debug)]
pub struct RegistryLoad<T> {
    /// Materialized components in discovery order.
    pub entries: Vec<Entry<T>>,
    /// Activation failures, one per failed identity.
    pub failures: Vec<ConveneError>,
}

impl<T> RegistryLoad<T> {
    /// True if every declared identity was materialized.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Loads component declarations from modules.
pub struct ComponentRegistry;

impl ComponentRegistry {
    /// Load every declared component of `modules` through `activator`.
    pub fn load<'m, T, A>(
        modules: impl IntoIterator<Item = &'m Module>,
        activator: &A,
    ) -> RegistryLoad<T>
    where
        A: Activator<T> + ?Sized,
    {
        let mut seen: BTreeSet<ComponentId> = BTreeSet::new();
        let mut entries = Vec::new();
        let mut failures = Vec::new();

        for module in modules {
            if module.components.is_empty() {
                continue;
            }

            for descriptor in &module.components {
                if !seen.insert(descriptor.id.clone()) {
                    debug!(
                        component = %descriptor.id,
                        module = %module.name,
                        "duplicate component declaration ignored"
                    );
                    continue;
                }

                match activator.activate(&descriptor.id) {
                    Ok(instance) => entries.push(Entry::new(descriptor.clone(), instance)),
                    Err(e) => {
                        warn!(
                            component = %descriptor.id,
                            module = %module.name,
                            error = %e,
                            "component activation failed, excluding"
                        );
                        failures.push(ConveneError::Activation {
                            id: descriptor.id.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            loaded = entries.len(),
            failed = failures.len(),
            "component registry loaded"
        );

        RegistryLoad { entries, failures }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ComponentDescriptor;
    use std::cell::RefCell;

    fn ids<T>(load: &RegistryLoad<T>) -> Vec<&str> {
        load.entries.iter().map(|e| e.id().as_str()).collect()
    }

    fn name_activator(id: &ComponentId) -> Result<String, BoxError> {
        Ok(format!("instance of {}", id))
    }

    #[test]
    fn loads_in_module_then_declaration_order() {
        let modules = [
            Module::new("web")
                .with_component(ComponentDescriptor::new("web::Routes"))
                .with_component(ComponentDescriptor::new("web::Cors")),
            Module::new("core").with_component(ComponentDescriptor::new("core::Logging")),
        ];

        let load: RegistryLoad<String> = ComponentRegistry::load(&modules, &name_activator);

        assert_eq!(ids(&load), vec!["web::Routes", "web::Cors", "core::Logging"]);
        assert_eq!(load.entries[0].payload, "instance of web::Routes");
        assert!(load.is_complete());
    }

    #[test]
    fn deduplicates_across_modules() {
        let modules = [
            Module::new("a")
                .with_component(ComponentDescriptor::new("shared"))
                .with_component(ComponentDescriptor::new("shared")),
            Module::new("b").with_component(ComponentDescriptor::new("shared")),
        ];
        let calls = RefCell::new(0);
        let activator = |_: &ComponentId| -> Result<u32, BoxError> {
            *calls.borrow_mut() += 1;
            Ok(1)
        };

        let load = ComponentRegistry::load(&modules, &activator);

        assert_eq!(ids(&load), vec!["shared"]);
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn empty_modules_contribute_nothing() {
        let modules = [Module::new("empty")];

        let load: RegistryLoad<String> = ComponentRegistry::load(&modules, &name_activator);

        assert!(load.entries.is_empty());
        assert!(load.failures.is_empty());
    }

    #[test]
    fn activation_failure_is_reported_and_skipped() {
        let modules = [Module::new("m")
            .with_component(ComponentDescriptor::new("ok"))
            .with_component(ComponentDescriptor::new("broken"))
            .with_component(ComponentDescriptor::new("also_ok"))];
        let activator = |id: &ComponentId| -> Result<String, BoxError> {
            if id.as_str() == "broken" {
                Err("no constructor registered".into())
            } else {
                Ok(id.to_string())
            }
        };

        let load = ComponentRegistry::load(&modules, &activator);

        assert_eq!(ids(&load), vec!["ok", "also_ok"]);
        assert_eq!(load.failures.len(), 1);
        assert!(matches!(
            &load.failures[0],
            ConveneError::Activation { id, .. } if id.as_str() == "broken"
        ));
    }

    #[test]
    fn descriptor_metadata_is_kept() {
        let descriptor = ComponentDescriptor::new("scoped")
            .with_scope(crate::EnvironmentScope::UnitTest)
            .with_edge(crate::DependencyEdge::after("other"));
        let modules = [Module::new("m").with_component(descriptor.clone())];

        let load: RegistryLoad<String> = ComponentRegistry::load(&modules, &name_activator);

        assert_eq!(load.entries[0].descriptor, descriptor);
    }
}
