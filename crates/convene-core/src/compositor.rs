//! # Compositor Module
//!
//! End-to-end discovery pass: resolve candidate modules, load their
//! components, order them.
//!
//! Discovery failures (absent modules, failed activations) are collected on
//! the result. A dependency cycle fails the whole pass.

use crate::graph::ModuleGraph;
use crate::ordering::{ManualOrdering, OrderEngine, OrderedSet};
use crate::registry::{Activator, ComponentRegistry};
use crate::resolver::{CandidateResolver, ResolutionSummary, ResolverOptions};
use crate::{ConveneError, EnvironmentScope, ModuleName};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Output of one discovery pass.
#[derive(Debug)]
pub struct Composition<T> {
    /// Counts from the resolver.
    pub summary: ResolutionSummary,
    /// Accepted modules, in the order their components were loaded.
    pub modules: Vec<ModuleName>,
    /// `ModuleUnavailable` for each absent module, then `Activation`
    /// failures in load order.
    pub failures: Vec<ConveneError>,
    /// The final plan.
    pub ordered: OrderedSet<T>,
}

/// Runs resolve → load → order.
pub struct Compositor;

impl Compositor {
    /// Compose a plan for `roots` over `graph`.
    ///
    /// Discovered components whose identity is also named in `manual` are
    /// dropped: the manual entry takes their place.
    pub fn compose<T, A>(
        graph: &ModuleGraph,
        roots: &BTreeSet<ModuleName>,
        options: &ResolverOptions,
        activator: &A,
        manual: ManualOrdering<T>,
        scope: EnvironmentScope,
    ) -> Result<Composition<T>, ConveneError>
    where
        A: Activator<T> + ?Sized,
    {
        let resolution = CandidateResolver::resolve_with(roots, graph, options);
        let summary = resolution.summary();
        let modules = resolution.candidate_names();

        let load = ComponentRegistry::load(resolution.candidates().iter().copied(), activator);

        let manual_ids = manual.ids();
        let before = load.entries.len();
        let discovered: Vec<_> = load
            .entries
            .into_iter()
            .filter(|e| !manual_ids.contains(e.id()))
            .collect();
        if discovered.len() != before {
            debug!(
                replaced = before - discovered.len(),
                "discovered components replaced by manual entries"
            );
        }

        let mut failures: Vec<ConveneError> = resolution
            .absent()
            .iter()
            .cloned()
            .map(ConveneError::ModuleUnavailable)
            .collect();
        failures.extend(load.failures);

        let ordered = OrderEngine::order(manual, discovered, scope)?;

        info!(
            modules = modules.len(),
            components = ordered.len(),
            failures = failures.len(),
            scope = %scope,
            "composition complete"
        );

        Ok(Composition {
            summary,
            modules,
            failures,
            ordered,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
