//! # Dependency Ordering Engine
//!
//! Turns discovered components plus manual prepend/append lists into one
//! deterministic, dependency-respecting sequence.
//!
//! - Baseline order is `prepended ++ discovered ++ appended`
//! - `DependsOn(T)` / `DependentOf(T)` hints resolve to the concrete entries
//!   whose identity is `T`; hints with no matching entry are dropped
//! - Depth-first topological sort in baseline order; baseline position
//!   breaks ties
//! - A cycle among present entries is fatal: no partial order is returned
//! - Environment-scope filtering happens after sorting

use crate::primitives::{FINGERPRINT_PRIME, FINGERPRINT_SEED};
use crate::{ComponentId, ConveneError, Direction, Entry, EnvironmentScope};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace, warn};

// =============================================================================
// MANUAL ORDERING
// =============================================================================

/// Caller-declared entries placed before and after the discovered ones.
#[derive(Debug, Clone)]
pub struct ManualOrdering<T> {
    pub prepended: Vec<Entry<T>>,
    pub appended: Vec<Entry<T>>,
}

impl<T> Default for ManualOrdering<T> {
    fn default() -> Self {
        Self {
            prepended: Vec::new(),
            appended: Vec::new(),
        }
    }
}

impl<T> ManualOrdering<T> {
    /// No manual entries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry to the end of the prepended list.
    #[must_use]
    pub fn prepend(mut self, entry: Entry<T>) -> Self {
        self.prepended.push(entry);
        self
    }

    /// Add an entry to the end of the appended list.
    #[must_use]
    pub fn append(mut self, entry: Entry<T>) -> Self {
        self.appended.push(entry);
        self
    }

    /// Identities named in either list.
    #[must_use]
    pub fn ids(&self) -> BTreeSet<&ComponentId> {
        self.prepended
            .iter()
            .chain(self.appended.iter())
            .map(Entry::id)
            .collect()
    }
}

// =============================================================================
// ORDERED SET
// =============================================================================

/// The final, dependency-respecting sequence of entries.
#[derive(Debug, Clone)]
pub struct OrderedSet<T> {
    entries: Vec<Entry<T>>,
}

impl<T> OrderedSet<T> {
    /// Entries in execution order.
    #[must_use]
    pub fn entries(&self) -> &[Entry<T>] {
        &self.entries
    }

    /// Iterate entries in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, Entry<T>> {
        self.entries.iter()
    }

    /// Identities in execution order.
    #[must_use]
    pub fn ids(&self) -> Vec<&ComponentId> {
        self.entries.iter().map(Entry::id).collect()
    }

    /// Position of the first entry with this identity.
    #[must_use]
    pub fn position(&self, id: &ComponentId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert every payload, keeping order and descriptors.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> OrderedSet<U> {
        OrderedSet {
            entries: self.entries.into_iter().map(|e| e.map(&mut f)).collect(),
        }
    }

    /// Take the entries out.
    #[must_use]
    pub fn into_entries(self) -> Vec<Entry<T>> {
        self.entries
    }

    /// Order-sensitive fingerprint of the identity sequence.
    ///
    /// Two plans with the same identities in the same order always produce
    /// the same value.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hash = FINGERPRINT_SEED;
        for entry in &self.entries {
            for byte in entry.id().as_str().bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(FINGERPRINT_PRIME);
            }
            // Separator so ["ab", "c"] and ["a", "bc"] differ
            hash ^= 0xff;
            hash = hash.wrapping_mul(FINGERPRINT_PRIME);
        }
        hash
    }

    /// BLAKE3 digest of the identity sequence, as hex.
    ///
    /// Requires the `crypto-hash` feature.
    #[cfg(feature = "crypto-hash")]
    #[must_use]
    pub fn crypto_fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for entry in &self.entries {
            hasher.update(entry.id().as_str().as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl<T> IntoIterator for OrderedSet<T> {
    type Item = Entry<T>;
    type IntoIter = std::vec::IntoIter<Entry<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a OrderedSet<T> {
    type Item = &'a Entry<T>;
    type IntoIter = std::slice::Iter<'a, Entry<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// =============================================================================
// ORDER ENGINE
// =============================================================================

/// Visit state of one entry during the sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

/// Produces `OrderedSet`s.
pub struct OrderEngine;

impl OrderEngine {
    /// Order `prepended ++ discovered ++ appended` and keep the entries
    /// admitted by `scope`.
    ///
    /// Returns `ConveneError::Cycle` naming the identities on the first
    /// cycle found.
    pub fn order<T>(
        manual: ManualOrdering<T>,
        discovered: Vec<Entry<T>>,
        scope: EnvironmentScope,
    ) -> Result<OrderedSet<T>, ConveneError> {
        let ManualOrdering {
            prepended,
            appended,
        } = manual;
        let baseline: Vec<Entry<T>> = prepended
            .into_iter()
            .chain(discovered)
            .chain(appended)
            .collect();

        if baseline.iter().all(|e| e.descriptor.edges.is_empty()) {
            debug!(entries = baseline.len(), "no dependency hints, keeping baseline order");
            return Ok(Self::filter(baseline, scope));
        }

        let dependencies = Self::dependency_lookup(&baseline);
        let order = Self::topological_order(&baseline, &dependencies)?;

        let mut slots: Vec<Option<Entry<T>>> = baseline.into_iter().map(Some).collect();
        let sorted = order
            .into_iter()
            .filter_map(|i| slots.get_mut(i).and_then(Option::take))
            .collect();

        Ok(Self::filter(sorted, scope))
    }

    fn filter<T>(entries: Vec<Entry<T>>, scope: EnvironmentScope) -> OrderedSet<T> {
        let before = entries.len();
        let entries: Vec<_> = entries
            .into_iter()
            .filter(|e| e.descriptor.scope.admits(scope))
            .collect();
        if entries.len() != before {
            debug!(
                removed = before - entries.len(),
                scope = %scope,
                "entries filtered by environment scope"
            );
        }
        OrderedSet { entries }
    }

    /// For each baseline position, the positions it must run after.
    ///
    /// Sets keep dependencies deduplicated and in baseline order.
    fn dependency_lookup<T>(baseline: &[Entry<T>]) -> Vec<Vec<usize>> {
        let mut instances: BTreeMap<&ComponentId, Vec<usize>> = BTreeMap::new();
        for (i, entry) in baseline.iter().enumerate() {
            instances.entry(entry.id()).or_default().push(i);
        }

        let mut dependencies: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); baseline.len()];
        for (i, entry) in baseline.iter().enumerate() {
            for edge in &entry.descriptor.edges {
                let Some(targets) = instances.get(&edge.target) else {
                    trace!(
                        component = %entry.id(),
                        target = %edge.target,
                        "dependency target not present, dropping hint"
                    );
                    continue;
                };
                for &j in targets {
                    if j == i {
                        continue;
                    }
                    match edge.direction {
                        Direction::DependsOn => dependencies[i].insert(j),
                        Direction::DependentOf => dependencies[j].insert(i),
                    };
                }
            }
        }

        dependencies
            .into_iter()
            .map(|set| set.into_iter().collect())
            .collect()
    }

    /// Iterative depth-first sort: dependencies are emitted before dependents.
    fn topological_order<T>(
        baseline: &[Entry<T>],
        dependencies: &[Vec<usize>],
    ) -> Result<Vec<usize>, ConveneError> {
        let mut marks = vec![Mark::Unvisited; baseline.len()];
        let mut order = Vec::with_capacity(baseline.len());

        for start in 0..baseline.len() {
            if marks[start] != Mark::Unvisited {
                continue;
            }

            // (position, next dependency to look at)
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            marks[start] = Mark::Visiting;

            while let Some(&(node, cursor)) = stack.last() {
                let Some(&dep) = dependencies[node].get(cursor) else {
                    marks[node] = Mark::Visited;
                    order.push(node);
                    stack.pop();
                    continue;
                };

                if let Some(top) = stack.last_mut() {
                    top.1 = cursor.saturating_add(1);
                }

                match marks[dep] {
                    Mark::Visited => {}
                    Mark::Visiting => {
                        let members = Self::cycle_members(baseline, &stack, dep);
                        warn!(cycle = ?members, "dependency cycle detected");
                        return Err(ConveneError::Cycle { members });
                    }
                    Mark::Unvisited => {
                        marks[dep] = Mark::Visiting;
                        stack.push((dep, 0));
                    }
                }
            }
        }

        Ok(order)
    }

    /// Identities from the revisited entry down the stack and back to it.
    fn cycle_members<T>(
        baseline: &[Entry<T>],
        stack: &[(usize, usize)],
        revisited: usize,
    ) -> Vec<ComponentId> {
        let start = stack
            .iter()
            .position(|&(node, _)| node == revisited)
            .unwrap_or(0);
        stack[start..]
            .iter()
            .map(|&(node, _)| baseline[node].id().clone())
            .chain(std::iter::once(baseline[revisited].id().clone()))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
