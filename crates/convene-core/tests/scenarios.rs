//! # Pipeline Scenarios
//!
//! End-to-end checks grouped by stage.
//!
//! ## Stages
//! - S0: Candidate resolution
//! - S1: Component loading
//! - S2: Ordering
//! - S3: Dispatch

use convene_core::{
    BoxError, CandidateResolver, ComponentDescriptor, ComponentId, ComponentKind, ConveneError,
    DependencyEdge, Entry, EnvironmentScope, ManualOrdering, Module, ModuleGraph, ModuleName,
    OrderEngine, ReferenceClassification,
};
use std::collections::BTreeSet;

fn roots(names: &[&str]) -> BTreeSet<ModuleName> {
    names.iter().map(|n| ModuleName::new(*n)).collect()
}

fn names(modules: &[&Module]) -> Vec<String> {
    modules.iter().map(|m| m.name.as_str().to_string()).collect()
}

// =============================================================================
// STAGE S0: CANDIDATE RESOLUTION
// =============================================================================

mod s0_resolution {
    use super::*;

    /// S0.1: Dependent modules come first, foundational ones last.
    #[test]
    fn reverse_discovery_order() {
        let graph = ModuleGraph::new([
            Module::new("A"),
            Module::new("B").with_reference("A"),
            Module::new("C"),
        ]);

        let resolution = CandidateResolver::resolve(&roots(&["A"]), &graph);

        assert_eq!(names(resolution.candidates()), vec!["B", "A"]);
    }

    /// S0.2: Runtime namespaces never become candidates.
    #[test]
    fn runtime_namespaces_are_noise() {
        let graph = ModuleGraph::new([
            Module::new("Plugin.Sdk"),
            Module::new("System.Text").with_reference("Plugin.Sdk"),
            Module::new("Acme.Extensions").with_reference("System.Text"),
            Module::new("Acme.Plugin").with_reference("Plugin.Sdk"),
        ]);

        let resolution = CandidateResolver::resolve(&roots(&["Plugin.Sdk"]), &graph);

        assert_eq!(names(resolution.candidates()), vec!["Acme.Plugin", "Plugin.Sdk"]);
        assert_eq!(
            resolution.classification(&ModuleName::new("Acme.Extensions")),
            ReferenceClassification::NotCandidate
        );
    }

    /// S0.3: A cycle that reaches the root carries every member.
    #[test]
    fn cycle_members_share_candidacy() {
        let graph = ModuleGraph::new([
            Module::new("Root"),
            Module::new("Left").with_reference("Right"),
            Module::new("Right")
                .with_reference("Left")
                .with_reference("Root"),
            Module::new("Outside").with_reference("Left"),
        ]);

        let resolution = CandidateResolver::resolve(&roots(&["Root"]), &graph);

        assert_eq!(
            names(resolution.candidates()),
            vec!["Outside", "Right", "Left", "Root"]
        );
    }

    /// S0.4: Absent modules are reported and tolerated.
    #[test]
    fn absent_references_are_reported() {
        let graph = ModuleGraph::new([Module::new("App")
            .with_reference("Gone")
            .with_reference("Sdk")]);

        let resolution = CandidateResolver::resolve(&roots(&["Sdk"]), &graph);

        assert_eq!(names(resolution.candidates()), vec!["App"]);
        assert_eq!(resolution.absent(), &[ModuleName::new("gone")]);
    }
}

// =============================================================================
// STAGE S1: COMPONENT LOADING
// =============================================================================

mod s1_loading {
    use super::*;
    use convene_core::{ComponentRegistry, RegistryLoad};

    /// S1.1: Loading follows resolver order and deduplicates identities.
    #[test]
    fn loads_candidates_in_order() {
        let graph = ModuleGraph::new([
            Module::new("Core").with_component(ComponentDescriptor::new("core::Log")),
            Module::new("Web")
                .with_reference("Core")
                .with_component(ComponentDescriptor::new("web::Routes"))
                .with_component(ComponentDescriptor::new("core::Log")),
        ]);
        let resolution = CandidateResolver::resolve(&roots(&["Core"]), &graph);
        let activator = |id: &ComponentId| -> Result<String, BoxError> { Ok(id.to_string()) };

        let load: RegistryLoad<String> =
            ComponentRegistry::load(resolution.candidates().iter().copied(), &activator);

        let ids: Vec<_> = load.entries.iter().map(|e| e.id().as_str()).collect();
        assert_eq!(ids, vec!["web::Routes", "core::Log"]);
    }
}

// =============================================================================
// STAGE S2: ORDERING
// =============================================================================

mod s2_ordering {
    use super::*;

    fn entry(id: &str) -> Entry<()> {
        Entry::new(ComponentDescriptor::new(id), ())
    }

    fn ids<T>(set: &convene_core::OrderedSet<T>) -> Vec<String> {
        set.ids().iter().map(|id| id.as_str().to_string()).collect()
    }

    /// S2.1: DependsOn pulls the target ahead.
    #[test]
    fn depends_on_reorders() {
        let discovered = vec![
            entry("P"),
            Entry::new(
                ComponentDescriptor::new("Q").with_edge(DependencyEdge::depends_on("R")),
                (),
            ),
            entry("R"),
        ];

        let set = OrderEngine::order(ManualOrdering::new(), discovered, EnvironmentScope::Undefined)
            .expect("order");

        assert_eq!(ids(&set), vec!["P", "R", "Q"]);
    }

    /// S2.2: Mutual dependency is a cycle, not a partial order.
    #[test]
    fn mutual_dependency_is_fatal() {
        let discovered = vec![
            Entry::new(
                ComponentDescriptor::new("X").with_edge(DependencyEdge::depends_on("Y")),
                (),
            ),
            Entry::new(
                ComponentDescriptor::new("Y").with_edge(DependencyEdge::depends_on("X")),
                (),
            ),
        ];

        let result = OrderEngine::order(
            ManualOrdering::new(),
            discovered,
            EnvironmentScope::Undefined,
        );

        let err = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert_eq!(err, "Dependency cycle detected: X -> Y -> X");
    }

    /// S2.3: Test-only components drop out of live plans.
    #[test]
    fn live_plan_excludes_unit_test_components() {
        let discovered = vec![
            entry("app"),
            Entry::new(
                ComponentDescriptor::new("fixtures").with_scope(EnvironmentScope::UnitTest),
                (),
            ),
        ];

        let live = OrderEngine::order(
            ManualOrdering::new(),
            discovered.clone(),
            EnvironmentScope::Live,
        )
        .expect("order");
        let test = OrderEngine::order(ManualOrdering::new(), discovered, EnvironmentScope::UnitTest)
            .expect("order");

        assert_eq!(ids(&live), vec!["app"]);
        assert_eq!(ids(&test), vec!["app", "fixtures"]);
    }
}

// =============================================================================
// STAGE S3: DISPATCH
// =============================================================================

mod s3_dispatch {
    use super::*;
    use convene_core::{Composition, Compositor, Dispatcher, Item, ResolverOptions};

    #[derive(Default)]
    struct Services {
        registered: Vec<String>,
    }

    /// S3.1: A composed plan dispatches in dependency order.
    #[test]
    fn compose_then_dispatch() {
        let graph = ModuleGraph::new([
            Module::new("Host").with_component(ComponentDescriptor::new("host::Db")),
            Module::new("Plugin").with_reference("Host").with_component(
                ComponentDescriptor::new("plugin::Cache")
                    .with_kind(ComponentKind::Callback)
                    .with_edge(DependencyEdge::after("host::Db")),
            ),
        ]);
        let activator = |id: &ComponentId| -> Result<Item<Services>, BoxError> {
            let label = id.to_string();
            Ok(Item::callback(move |ctx: &mut Services| {
                ctx.registered.push(label.clone());
                Ok(())
            }))
        };

        let composition: Composition<Item<Services>> = Compositor::compose(
            &graph,
            &roots(&["Host"]),
            &ResolverOptions::default(),
            &activator,
            ManualOrdering::new(),
            EnvironmentScope::Live,
        )
        .expect("compose");
        let mut services = Services::default();
        let report = Dispatcher::default()
            .run(&composition.ordered, &mut services)
            .expect("dispatch");

        assert_eq!(services.registered, vec!["host::Db", "plugin::Cache"]);
        assert_eq!(report.invoked.len(), 2);
    }

    /// S3.2: The failing item is named in the error.
    #[test]
    fn failure_names_the_item() {
        let entries = vec![Entry::new(
            ComponentDescriptor::new("broken"),
            Item::callback(|_: &mut Services| Err("refused".into())),
        )];
        let ordered = OrderEngine::order(
            ManualOrdering::new(),
            entries,
            EnvironmentScope::Undefined,
        )
        .expect("order");

        let result = Dispatcher::default().run(&ordered, &mut Services::default());

        assert!(matches!(
            result,
            Err(ConveneError::Invocation { ref id, .. }) if id.as_str() == "broken"
        ));
    }
}
