//! # convene-core
//!
//! The deterministic discovery and ordering engine for Convene - THE LOGIC.
//!
//! Given a graph of library modules and a set of root references, this
//! crate decides which modules are relevant, loads the components they
//! declare, and produces one dependency-respecting execution order filtered
//! by environment.
//!
//! ## Pipeline
//!
//! 1. `CandidateResolver`: classify modules by reachability to the roots
//! 2. `ComponentRegistry`: materialize declared components, deduplicated
//! 3. `OrderEngine`: topological sort over before/after hints plus manual
//!    prepend/append lists, then environment filtering
//! 4. `Dispatcher` / `AsyncDispatcher`: invoke the plan against a context
//!
//! `Compositor` runs steps 1-3 in one call.
//!
//! ## Architectural Constraints
//!
//! - Pure Rust, no network, no async unless the `async` feature is enabled
//! - `BTreeMap`/`BTreeSet` only: output order depends on input order alone
//! - Memo tables live inside a single call and are never shared
//! - Discovery failures are reported, ordering and dispatch failures are fatal

// =============================================================================
// MODULES
// =============================================================================

pub mod compositor;
pub mod dispatcher;
#[cfg(feature = "async")]
pub mod dispatcher_async;
pub mod formats;
pub mod graph;
pub mod ordering;
pub mod primitives;
pub mod registry;
pub mod resolver;
pub mod source;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    BoxError, Capability, ComponentDescriptor, ComponentId, ComponentKind, ConveneError,
    DependencyEdge, Direction, Entry, EnvironmentScope, ModuleName, ReferenceClassification,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use compositor::{Composition, Compositor};
pub use graph::{Module, ModuleGraph};
pub use ordering::{ManualOrdering, OrderEngine, OrderedSet};
pub use registry::{Activator, ComponentRegistry, RegistryLoad};
pub use resolver::{CandidateResolver, Resolution, ResolutionSummary, ResolverOptions};

// =============================================================================
// RE-EXPORTS: Dispatch
// =============================================================================

pub use dispatcher::{Callback, Component, DispatchReport, DispatchRequest, Dispatcher, Item};
#[cfg(feature = "async")]
pub use dispatcher_async::{AsyncCallback, AsyncComponent, AsyncDispatcher, AsyncItem, BoxFuture};

// =============================================================================
// RE-EXPORTS: Sources & Formats
// =============================================================================

pub use formats::{ComponentSpec, ModuleDocument, ModuleManifest};
pub use source::{DirectorySource, ManifestSource, ModuleSource, StaticSource};
