//! # Module Candidate Resolver
//!
//! Decides which modules in a reference graph are relevant to a root set.
//!
//! - Roots are `Reference`
//! - A module that reaches a root through its references is `Candidate`
//! - Everything else is `NotCandidate`
//! - Denylisted runtime namespaces are `NotCandidate` without traversal
//!
//! Classification is a memoized depth-first traversal. An edge back into a
//! module that is still being classified contributes `Unknown` and the
//! remaining edges are explored. Results that depend on such an edge stay
//! provisional until the strongly connected group they belong to completes,
//! at which point every member receives the group's classification. Cycles
//! are never an error at this layer.
//!
//! The memo table is owned by a single `resolve` call.

use crate::graph::{Module, ModuleGraph};
use crate::primitives::{DEFAULT_DENIED_PREFIXES, prefix_matches};
use crate::{ModuleName, ReferenceClassification};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, trace};

// =============================================================================
// OPTIONS
// =============================================================================

/// Tunables for a resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// Module name prefixes that are never candidates.
    pub denied_prefixes: Vec<String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            denied_prefixes: DEFAULT_DENIED_PREFIXES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
        }
    }
}

impl ResolverOptions {
    /// Options with an explicit denylist.
    #[must_use]
    pub fn with_denied_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            denied_prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Check a module name against the denylist.
    #[must_use]
    pub fn is_denied(&self, name: &ModuleName) -> bool {
        let folded = name.key();
        self.denied_prefixes
            .iter()
            .any(|prefix| prefix_matches(&folded, prefix))
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Counts over a finished resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolutionSummary {
    pub modules: usize,
    pub candidates: usize,
    pub references: usize,
    pub not_candidates: usize,
    pub absent: usize,
}

/// Result of classifying a module graph against a root set.
#[derive(Debug, Clone)]
pub struct Resolution<'g> {
    /// Accepted modules, reverse input order.
    candidates: Vec<&'g Module>,
    /// Every name that was classified, including absent and denied references.
    classifications: BTreeMap<ModuleName, ReferenceClassification>,
    /// Referenced names with no module in the graph.
    absent: Vec<ModuleName>,
    /// Size of the graph this resolution was computed over.
    module_count: usize,
}

impl<'g> Resolution<'g> {
    /// Accepted modules (`Candidate` or `Reference`), most dependent first.
    #[must_use]
    pub fn candidates(&self) -> &[&'g Module] {
        &self.candidates
    }

    /// Names of the accepted modules, in `candidates()` order.
    #[must_use]
    pub fn candidate_names(&self) -> Vec<ModuleName> {
        self.candidates.iter().map(|m| m.name.clone()).collect()
    }

    /// Classification of a name, `Unknown` if it was never reached.
    #[must_use]
    pub fn classification(&self, name: &ModuleName) -> ReferenceClassification {
        self.classifications
            .get(name)
            .copied()
            .unwrap_or(ReferenceClassification::Unknown)
    }

    /// All classifications in deterministic (case-insensitive name) order.
    #[must_use]
    pub fn classifications(&self) -> &BTreeMap<ModuleName, ReferenceClassification> {
        &self.classifications
    }

    /// Referenced modules that were not available, sorted by name.
    #[must_use]
    pub fn absent(&self) -> &[ModuleName] {
        &self.absent
    }

    /// Count classifications over the graph's own modules.
    #[must_use]
    pub fn summary(&self) -> ResolutionSummary {
        let mut summary = ResolutionSummary {
            modules: self.module_count,
            absent: self.absent.len(),
            ..ResolutionSummary::default()
        };
        for module in self.candidates.iter() {
            match self.classification(&module.name) {
                ReferenceClassification::Reference => summary.references += 1,
                _ => summary.candidates += 1,
            }
        }
        summary.not_candidates = self
            .module_count
            .saturating_sub(summary.candidates + summary.references);
        summary
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Classifies modules against a root set of reference names.
pub struct CandidateResolver;

impl CandidateResolver {
    /// Resolve with the default denylist.
    pub fn resolve<'g>(roots: &BTreeSet<ModuleName>, graph: &'g ModuleGraph) -> Resolution<'g> {
        Self::resolve_with(roots, graph, &ResolverOptions::default())
    }

    /// Resolve with explicit options.
    ///
    /// Returns the accepted modules in reverse input order. An empty root
    /// set performs no traversal.
    pub fn resolve_with<'g>(
        roots: &BTreeSet<ModuleName>,
        graph: &'g ModuleGraph,
        options: &ResolverOptions,
    ) -> Resolution<'g> {
        if roots.is_empty() {
            debug!("empty root set, skipping candidate resolution");
            return Resolution {
                candidates: Vec::new(),
                classifications: BTreeMap::new(),
                absent: Vec::new(),
                module_count: graph.len(),
            };
        }

        let mut table = ClassificationTable::new(graph, roots, options);
        for module in graph.modules() {
            if !table.is_settled(&module.name) {
                table.classify(&module.name);
            }
        }

        let mut candidates: Vec<&'g Module> = graph
            .modules()
            .iter()
            .filter(|m| table.settled(&m.name).is_accepted())
            .collect();
        candidates.reverse();

        let classifications = table.into_classifications();
        let absent = classifications
            .keys()
            .filter(|name| !graph.contains(name) && !roots.contains(*name))
            .filter(|name| !options.is_denied(name))
            .cloned()
            .collect();

        let resolution = Resolution {
            candidates,
            classifications,
            absent,
            module_count: graph.len(),
        };

        info!(
            modules = graph.len(),
            accepted = resolution.candidates.len(),
            absent = resolution.absent.len(),
            "candidate resolution complete"
        );
        resolution
    }
}

// =============================================================================
// CLASSIFICATION TABLE (per call)
// =============================================================================

/// A module currently on the traversal stack or waiting for its group.
#[derive(Debug, Clone, Copy)]
struct OpenVisit {
    /// Discovery index.
    index: usize,
    /// A root was reached from this module.
    found: bool,
}

/// What classifying one name reports to its caller.
#[derive(Debug, Clone, Copy)]
struct Visit {
    classification: ReferenceClassification,
    /// Lowest discovery index of an open module reachable from here.
    /// `usize::MAX` when the result is final.
    low: usize,
}

impl Visit {
    fn settled(classification: ReferenceClassification) -> Self {
        Self {
            classification,
            low: usize::MAX,
        }
    }
}

struct ClassificationTable<'a> {
    graph: &'a ModuleGraph,
    roots: &'a BTreeSet<ModuleName>,
    options: &'a ResolverOptions,

    /// Final classifications: folded name -> classification
    settled: BTreeMap<String, ReferenceClassification>,

    /// Folded name -> original spelling, for output
    names: BTreeMap<String, ModuleName>,

    /// Modules visited but not yet settled
    open: BTreeMap<String, OpenVisit>,

    /// Open modules in discovery order
    stack: Vec<String>,

    next_index: usize,
}

impl<'a> ClassificationTable<'a> {
    fn new(
        graph: &'a ModuleGraph,
        roots: &'a BTreeSet<ModuleName>,
        options: &'a ResolverOptions,
    ) -> Self {
        Self {
            graph,
            roots,
            options,
            settled: BTreeMap::new(),
            names: BTreeMap::new(),
            open: BTreeMap::new(),
            stack: Vec::new(),
            next_index: 0,
        }
    }

    fn is_settled(&self, name: &ModuleName) -> bool {
        self.settled.contains_key(&name.key())
    }

    fn settled(&self, name: &ModuleName) -> ReferenceClassification {
        self.settled
            .get(&name.key())
            .copied()
            .unwrap_or(ReferenceClassification::Unknown)
    }

    fn settle(&mut self, name: &ModuleName, classification: ReferenceClassification) -> Visit {
        let key = name.key();
        self.names.entry(key.clone()).or_insert_with(|| name.clone());
        self.settled.insert(key, classification);
        Visit::settled(classification)
    }

    fn classify(&mut self, name: &ModuleName) -> Visit {
        let key = name.key();

        if let Some(&classification) = self.settled.get(&key) {
            return Visit::settled(classification);
        }

        if let Some(open) = self.open.get(&key) {
            trace!(module = %name, "reference cycle, edge contributes unknown");
            let classification = if open.found {
                ReferenceClassification::Candidate
            } else {
                ReferenceClassification::Unknown
            };
            return Visit {
                classification,
                low: open.index,
            };
        }

        if self.options.is_denied(name) {
            return self.settle(name, ReferenceClassification::NotCandidate);
        }

        if self.roots.contains(name) {
            return self.settle(name, ReferenceClassification::Reference);
        }

        let graph = self.graph;
        let Some(module) = graph.get(name) else {
            debug!(module = %name, "referenced module unavailable, skipping");
            return self.settle(name, ReferenceClassification::NotCandidate);
        };

        let index = self.next_index;
        self.next_index = self.next_index.saturating_add(1);
        self.names.entry(key.clone()).or_insert_with(|| name.clone());
        self.open.insert(key.clone(), OpenVisit { index, found: false });
        self.stack.push(key.clone());

        let mut low = index;
        let mut found = false;

        for reference in &module.references {
            // A module referencing itself says nothing about reachability.
            if reference == name {
                continue;
            }

            let visit = self.classify(reference);
            low = low.min(visit.low);

            if visit.classification.is_accepted() && !found {
                found = true;
                if let Some(open) = self.open.get_mut(&key) {
                    open.found = true;
                }
            }
        }

        let classification = if found {
            ReferenceClassification::Candidate
        } else {
            ReferenceClassification::NotCandidate
        };

        if low < index {
            // Part of a group rooted further down the stack; settled later.
            return Visit {
                classification: if found {
                    ReferenceClassification::Candidate
                } else {
                    ReferenceClassification::Unknown
                },
                low,
            };
        }

        // Root of its group: every open module above it shares the result.
        while let Some(member) = self.stack.pop() {
            self.open.remove(&member);
            let done = member == key;
            self.settled.insert(member, classification);
            if done {
                break;
            }
        }

        Visit::settled(classification)
    }

    fn into_classifications(self) -> BTreeMap<ModuleName, ReferenceClassification> {
        let Self { settled, names, .. } = self;
        settled
            .into_iter()
            .filter_map(|(key, classification)| {
                names.get(&key).map(|name| (name.clone(), classification))
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ReferenceClassification::*;

    fn roots(names: &[&str]) -> BTreeSet<ModuleName> {
        names.iter().map(|n| ModuleName::new(*n)).collect()
    }

    fn names(resolution: &Resolution<'_>) -> Vec<String> {
        resolution
            .candidates()
            .iter()
            .map(|m| m.name.to_string())
            .collect()
    }

    #[test]
    fn scenario_reverse_discovery_order() {
        let graph = ModuleGraph::new([
            Module::new("A"),
            Module::new("B").with_reference("A"),
            Module::new("C"),
        ]);

        let resolution = CandidateResolver::resolve(&roots(&["A"]), &graph);

        assert_eq!(names(&resolution), vec!["B", "A"]);
        assert_eq!(resolution.classification(&"A".into()), Reference);
        assert_eq!(resolution.classification(&"B".into()), Candidate);
        assert_eq!(resolution.classification(&"C".into()), NotCandidate);
    }

    #[test]
    fn empty_roots_yield_nothing() {
        let graph = ModuleGraph::new([Module::new("A"), Module::new("B").with_reference("A")]);

        let resolution = CandidateResolver::resolve(&BTreeSet::new(), &graph);

        assert!(resolution.candidates().is_empty());
        assert!(resolution.classifications().is_empty());
    }

    #[test]
    fn transitive_candidates() {
        let graph = ModuleGraph::new([
            Module::new("app").with_reference("web"),
            Module::new("web").with_reference("core"),
            Module::new("core"),
            Module::new("cli").with_reference("util"),
            Module::new("util"),
        ]);

        let resolution = CandidateResolver::resolve(&roots(&["core"]), &graph);

        assert_eq!(names(&resolution), vec!["core", "web", "app"]);
        assert_eq!(resolution.classification(&"cli".into()), NotCandidate);
    }

    #[test]
    fn cycle_member_reached_through_group() {
        // B is explored from A while A is still open; B still reaches R via A.
        let graph = ModuleGraph::new([
            Module::new("A").with_reference("B").with_reference("R"),
            Module::new("B").with_reference("A"),
            Module::new("R"),
        ]);

        let resolution = CandidateResolver::resolve(&roots(&["R"]), &graph);

        assert_eq!(resolution.classification(&"A".into()), Candidate);
        assert_eq!(resolution.classification(&"B".into()), Candidate);
        assert_eq!(names(&resolution), vec!["R", "B", "A"]);
    }

    #[test]
    fn cycle_without_root_is_not_candidate() {
        let graph = ModuleGraph::new([
            Module::new("X").with_reference("Y"),
            Module::new("Y").with_reference("Z"),
            Module::new("Z").with_reference("X"),
            Module::new("R"),
        ]);

        let resolution = CandidateResolver::resolve(&roots(&["R"]), &graph);

        for name in ["X", "Y", "Z"] {
            assert_eq!(resolution.classification(&name.into()), NotCandidate);
        }
        assert_eq!(names(&resolution), vec!["R"]);
    }

    #[test]
    fn self_reference_alone_decides_nothing() {
        let graph = ModuleGraph::new([
            Module::new("loop").with_reference("loop"),
            Module::new("wired").with_reference("wired").with_reference("R"),
            Module::new("R"),
        ]);

        let resolution = CandidateResolver::resolve(&roots(&["R"]), &graph);

        assert_eq!(resolution.classification(&"loop".into()), NotCandidate);
        assert_eq!(resolution.classification(&"wired".into()), Candidate);
    }

    #[test]
    fn denylisted_modules_are_not_traversed() {
        // "std::rt" references the root, but denylisted modules never become candidates
        let graph = ModuleGraph::new([
            Module::new("std::rt").with_reference("R"),
            Module::new("app").with_reference("std::rt"),
            Module::new("R"),
        ]);

        let resolution = CandidateResolver::resolve(&roots(&["R"]), &graph);

        assert_eq!(resolution.classification(&"std::rt".into()), NotCandidate);
        assert_eq!(resolution.classification(&"app".into()), NotCandidate);
    }

    #[test]
    fn user_modules_named_like_runtime_crates() {
        let graph = ModuleGraph::new([
            Module::new("Core"),
            Module::new("Web").with_reference("Core"),
            Module::new("core-utils").with_reference("Web"),
            Module::new("std-extras").with_reference("core-utils"),
        ]);

        let resolution = CandidateResolver::resolve(&roots(&["Core"]), &graph);

        assert_eq!(resolution.classification(&"Core".into()), Reference);
        assert_eq!(
            names(&resolution),
            vec!["std-extras", "core-utils", "Web", "Core"]
        );
    }

    #[test]
    fn custom_denylist() {
        let graph = ModuleGraph::new([
            Module::new("vendor.blob").with_reference("R"),
            Module::new("std").with_reference("R"),
            Module::new("R"),
        ]);
        let options = ResolverOptions::with_denied_prefixes(["vendor."]);

        let resolution = CandidateResolver::resolve_with(&roots(&["R"]), &graph, &options);

        assert_eq!(resolution.classification(&"vendor.blob".into()), NotCandidate);
        assert_eq!(resolution.classification(&"std".into()), Candidate);
    }

    #[test]
    fn absent_references_are_skipped() {
        let graph = ModuleGraph::new([
            Module::new("app")
                .with_reference("missing")
                .with_reference("core"),
            Module::new("core"),
        ]);

        let resolution = CandidateResolver::resolve(&roots(&["core"]), &graph);

        assert_eq!(resolution.classification(&"app".into()), Candidate);
        assert_eq!(resolution.absent(), &[ModuleName::new("missing")]);
        assert_eq!(resolution.summary().absent, 1);
    }

    #[test]
    fn root_need_not_be_loaded() {
        let graph = ModuleGraph::new([Module::new("plugin").with_reference("Host.Abstractions")]);

        let resolution = CandidateResolver::resolve(&roots(&["host.abstractions"]), &graph);

        assert_eq!(names(&resolution), vec!["plugin"]);
        assert!(resolution.absent().is_empty());
    }

    #[test]
    fn roots_match_ignoring_case() {
        let graph = ModuleGraph::new([
            Module::new("Acme.Core"),
            Module::new("Acme.Web").with_reference("ACME.CORE"),
        ]);

        let resolution = CandidateResolver::resolve(&roots(&["acme.core"]), &graph);

        assert_eq!(names(&resolution), vec!["Acme.Web", "Acme.Core"]);
    }

    #[test]
    fn no_unknown_in_finished_resolution() {
        let graph = ModuleGraph::new([
            Module::new("a").with_reference("b"),
            Module::new("b").with_reference("c").with_reference("a"),
            Module::new("c").with_reference("b").with_reference("root"),
            Module::new("d").with_reference("a"),
            Module::new("root"),
        ]);

        let resolution = CandidateResolver::resolve(&roots(&["root"]), &graph);

        assert!(
            resolution
                .classifications()
                .values()
                .all(|c| *c != Unknown)
        );
        assert_eq!(names(&resolution), vec!["root", "d", "c", "b", "a"]);
    }

    #[test]
    fn summary_counts() {
        let graph = ModuleGraph::new([
            Module::new("A"),
            Module::new("B").with_reference("A"),
            Module::new("C"),
        ]);

        let summary = CandidateResolver::resolve(&roots(&["A"]), &graph).summary();

        assert_eq!(summary.modules, 3);
        assert_eq!(summary.references, 1);
        assert_eq!(summary.candidates, 1);
        assert_eq!(summary.not_candidates, 1);
    }

    #[test]
    fn resolution_is_deterministic() {
        let graph = ModuleGraph::new([
            Module::new("z").with_reference("m"),
            Module::new("m").with_reference("a"),
            Module::new("a"),
            Module::new("q").with_reference("a"),
        ]);

        let first = names(&CandidateResolver::resolve(&roots(&["a"]), &graph));
        let second = names(&CandidateResolver::resolve(&roots(&["a"]), &graph));

        assert_eq!(first, second);
        assert_eq!(first, vec!["q", "a", "m", "z"]);
    }
}
