//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the Convene engine:
//! - Identifiers (`ModuleName`, `ComponentId`, `Capability`)
//! - Component metadata (`EnvironmentScope`, `DependencyEdge`, `ComponentDescriptor`)
//! - Classification state (`ReferenceClassification`)
//! - Error types (`ConveneError`)
//!
//! ## Determinism Guarantees
//!
//! All identifier types implement `Ord` so they can key `BTreeMap`/`BTreeSet`.
//! `ModuleName` compares case-insensitively; `ComponentId` is exact.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Error type produced by user-supplied activators, components and callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// MODULE NAME
// =============================================================================

/// Name of a library module.
///
/// Equality, ordering and hashing ignore case. The original spelling is kept
/// for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleName(String);

impl ModuleName {
    /// Create a module name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name as originally spelled.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The lower-cased lookup key.
    #[must_use]
    pub fn key(&self) -> String {
        self.0.to_lowercase()
    }

    /// True if the name is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl PartialEq for ModuleName {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ModuleName {}

impl PartialOrd for ModuleName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModuleName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl Hash for ModuleName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ModuleName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// COMPONENT IDENTITY
// =============================================================================

/// Identity of a component type. Compared exactly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub String);

impl ComponentId {
    /// Create a component identity.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ComponentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A named contract an item fulfils, used to narrow a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(pub String);

impl Capability {
    /// Create a capability name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the capability as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Capability {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Capability {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// ENVIRONMENT SCOPE
// =============================================================================

/// Execution environment a component is restricted to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum EnvironmentScope {
    /// Matches every environment.
    #[default]
    Undefined,
    /// Production host.
    Live,
    /// Test host.
    UnitTest,
}

impl EnvironmentScope {
    /// Whether a component tagged `self` runs when `requested` is active.
    ///
    /// `Undefined` on either side admits the component.
    #[must_use]
    pub fn admits(self, requested: EnvironmentScope) -> bool {
        self == EnvironmentScope::Undefined
            || requested == EnvironmentScope::Undefined
            || self == requested
    }

    /// Stable lower-case name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            EnvironmentScope::Undefined => "undefined",
            EnvironmentScope::Live => "live",
            EnvironmentScope::UnitTest => "unit-test",
        }
    }
}

impl fmt::Display for EnvironmentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for EnvironmentScope {
    type Err = ConveneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "undefined" | "any" => Ok(EnvironmentScope::Undefined),
            "live" | "production" => Ok(EnvironmentScope::Live),
            "unit-test" | "unittest" | "unit_test" | "test" => Ok(EnvironmentScope::UnitTest),
            other => Err(ConveneError::InvalidManifest(format!(
                "unknown environment scope '{}'",
                other
            ))),
        }
    }
}

// =============================================================================
// DEPENDENCY EDGES
// =============================================================================

/// Direction of a dependency hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// This component must run after the target.
    DependsOn,
    /// The target must run after this component.
    DependentOf,
}

/// A dependency hint pointing at another component identity.
///
/// `before`/`after` hints normalize onto the two directions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub direction: Direction,
    pub target: ComponentId,
}

impl DependencyEdge {
    /// This component depends on `target`.
    #[must_use]
    pub fn depends_on(target: impl Into<ComponentId>) -> Self {
        Self {
            direction: Direction::DependsOn,
            target: target.into(),
        }
    }

    /// `target` depends on this component.
    #[must_use]
    pub fn dependent_of(target: impl Into<ComponentId>) -> Self {
        Self {
            direction: Direction::DependentOf,
            target: target.into(),
        }
    }

    /// Run after `target`.
    #[must_use]
    pub fn after(target: impl Into<ComponentId>) -> Self {
        Self::depends_on(target)
    }

    /// Run before `target`.
    #[must_use]
    pub fn before(target: impl Into<ComponentId>) -> Self {
        Self::dependent_of(target)
    }
}

// =============================================================================
// COMPONENT DESCRIPTOR
// =============================================================================

/// Whether an item implements the registration capability or is a plain function.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    #[default]
    Component,
    Callback,
}

/// Metadata declared for one component on a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub id: ComponentId,
    #[serde(default)]
    pub scope: EnvironmentScope,
    #[serde(default)]
    pub edges: Vec<DependencyEdge>,
    #[serde(default)]
    pub kind: ComponentKind,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

impl ComponentDescriptor {
    /// A descriptor with no edges, `Undefined` scope and `Component` kind.
    #[must_use]
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            scope: EnvironmentScope::Undefined,
            edges: Vec::new(),
            kind: ComponentKind::Component,
            capabilities: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: EnvironmentScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn with_edge(mut self, edge: DependencyEdge) -> Self {
        self.edges.push(edge);
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: ComponentKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<Capability>) -> Self {
        self.capabilities.push(capability.into());
        self
    }
}

/// A descriptor paired with the thing it describes.
///
/// `T` is whatever the activator produced, or a dispatchable item.
#[derive(Debug, Clone)]
pub struct Entry<T> {
    pub descriptor: ComponentDescriptor,
    pub payload: T,
}

impl<T> Entry<T> {
    /// Create an entry.
    #[must_use]
    pub fn new(descriptor: ComponentDescriptor, payload: T) -> Self {
        Self {
            descriptor,
            payload,
        }
    }

    /// Identity of the entry.
    #[must_use]
    pub fn id(&self) -> &ComponentId {
        &self.descriptor.id
    }

    /// Replace the payload, keeping the descriptor.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Entry<U> {
        Entry {
            descriptor: self.descriptor,
            payload: f(self.payload),
        }
    }
}

// =============================================================================
// REFERENCE CLASSIFICATION
// =============================================================================

/// Relevance of a module to the root reference set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceClassification {
    /// Not computed yet. Never present in a finished resolution.
    #[default]
    Unknown,
    /// Transitively reaches a root.
    Candidate,
    /// Never reaches a root.
    NotCandidate,
    /// Named in the root set.
    Reference,
}

impl ReferenceClassification {
    /// True for `Candidate` and `Reference`.
    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(
            self,
            ReferenceClassification::Candidate | ReferenceClassification::Reference
        )
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Convene engine.
///
/// Discovery-time variants (`InvalidManifest`, `ModuleUnavailable`,
/// `Activation`) are recovered by the caller that produced them.
/// `Cycle` and `Invocation` abort the call that raised them.
#[derive(Debug, Error)]
pub enum ConveneError {
    /// A manifest could not be parsed or failed validation.
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// A referenced module is not present in the module source.
    #[error("Module unavailable: {0}")]
    ModuleUnavailable(ModuleName),

    /// The activator failed to materialize a component.
    #[error("Activation of {id} failed: {reason}")]
    Activation { id: ComponentId, reason: String },

    /// Dependency ordering found a cycle among present components.
    #[error("Dependency cycle detected: {}", format_cycle(.members))]
    Cycle { members: Vec<ComponentId> },

    /// An invoked component or callback returned an error.
    #[error("Invocation of {id} failed: {source}")]
    Invocation {
        id: ComponentId,
        #[source]
        source: BoxError,
    },

    /// An item matched none of the requested capabilities.
    #[error("Unresolved capability for {0}")]
    UnresolvedCapability(ComponentId),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

fn format_cycle(members: &[ComponentId]) -> String {
    members
        .iter()
        .map(ComponentId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

// =============================================================================
// TESTS
// =============================================================================
