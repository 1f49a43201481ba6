//! # Composition Dispatcher
//!
//! Walks an `OrderedSet` of items and invokes each one against a typed
//! context, strictly in order.
//!
//! Items come in two variants: components implementing [`Component`] and
//! plain [`Callback`] functions. A [`DispatchRequest`] narrows which items
//! run by capability. Incompatible items are skipped and reported. The first
//! invocation error stops the dispatch.

use crate::ordering::OrderedSet;
use crate::{BoxError, Capability, ComponentDescriptor, ComponentId, ComponentKind, ConveneError};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

// =============================================================================
// ITEMS
// =============================================================================

/// A unit of configuration behavior that registers itself on a context.
pub trait Component<C>: Send + Sync {
    /// Apply this component to `context`.
    fn register(&self, context: &mut C) -> Result<(), BoxError>;
}

/// A plain function taking the context.
pub struct Callback<C> {
    f: Arc<dyn Fn(&mut C) -> Result<(), BoxError> + Send + Sync>,
}

impl<C> Callback<C> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut C) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Invoke the function.
    pub fn call(&self, context: &mut C) -> Result<(), BoxError> {
        (self.f)(context)
    }
}

impl<C> Clone for Callback<C> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<C> fmt::Debug for Callback<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback")
    }
}

/// A dispatchable item.
pub enum Item<C> {
    Component(Arc<dyn Component<C>>),
    Callback(Callback<C>),
}

impl<C> Item<C> {
    /// Wrap a component.
    pub fn component(component: impl Component<C> + 'static) -> Self {
        Item::Component(Arc::new(component))
    }

    /// Wrap a function.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&mut C) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Item::Callback(Callback::new(f))
    }

    /// Variant of this item.
    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        match self {
            Item::Component(_) => ComponentKind::Component,
            Item::Callback(_) => ComponentKind::Callback,
        }
    }

    /// Invoke the item against `context`.
    pub fn invoke(&self, context: &mut C) -> Result<(), BoxError> {
        match self {
            Item::Component(component) => component.register(context),
            Item::Callback(callback) => callback.call(context),
        }
    }
}

impl<C> Clone for Item<C> {
    fn clone(&self) -> Self {
        match self {
            Item::Component(component) => Item::Component(Arc::clone(component)),
            Item::Callback(callback) => Item::Callback(callback.clone()),
        }
    }
}

impl<C> fmt::Debug for Item<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Component(_) => f.write_str("Item::Component"),
            Item::Callback(_) => f.write_str("Item::Callback"),
        }
    }
}

// =============================================================================
// REQUEST & REPORT
// =============================================================================

/// Which items a dispatch may run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DispatchRequest {
    /// Run every item.
    #[default]
    All,
    /// Run components declaring one of `components`, and callbacks
    /// declaring one of `callbacks`.
    Only {
        components: BTreeSet<Capability>,
        callbacks: BTreeSet<Capability>,
    },
}

impl DispatchRequest {
    /// Check an item of `kind` described by `descriptor`.
    #[must_use]
    pub fn admits(&self, kind: ComponentKind, descriptor: &ComponentDescriptor) -> bool {
        match self {
            DispatchRequest::All => true,
            DispatchRequest::Only {
                components,
                callbacks,
            } => {
                let wanted = match kind {
                    ComponentKind::Component => components,
                    ComponentKind::Callback => callbacks,
                };
                descriptor.capabilities.iter().any(|c| wanted.contains(c))
            }
        }
    }
}

/// What happened during one dispatch.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Identities invoked successfully, in order.
    pub invoked: Vec<ComponentId>,
    /// `UnresolvedCapability` for every skipped item.
    pub skipped: Vec<ConveneError>,
    /// Dispatch stopped early on a cancellation request.
    pub cancelled: bool,
}

impl DispatchReport {
    /// Every item ran and nothing was skipped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && !self.cancelled
    }

    pub(crate) fn skip(&mut self, id: &ComponentId) {
        let err = ConveneError::UnresolvedCapability(id.clone());
        error!(component = %id, error = %err, "item matches no requested capability, skipping");
        self.skipped.push(err);
    }
}

pub(crate) fn invocation_failed(id: &ComponentId, source: BoxError) -> ConveneError {
    error!(component = %id, error = %source, "invocation failed, aborting dispatch");
    ConveneError::Invocation {
        id: id.clone(),
        source,
    }
}

// =============================================================================
// DISPATCHER
// =============================================================================

/// Sequential dispatcher.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    request: DispatchRequest,
}

impl Dispatcher {
    #[must_use]
    pub fn new(request: DispatchRequest) -> Self {
        Self { request }
    }

    /// The active request.
    #[must_use]
    pub fn request(&self) -> &DispatchRequest {
        &self.request
    }

    /// Invoke every admitted item of `ordered` against `context`, in order.
    ///
    /// Stops at the first invocation error and returns it as
    /// `ConveneError::Invocation`.
    pub fn run<C>(
        &self,
        ordered: &OrderedSet<Item<C>>,
        context: &mut C,
    ) -> Result<DispatchReport, ConveneError> {
        let mut report = DispatchReport::default();

        for entry in ordered {
            if !self.request.admits(entry.payload.kind(), &entry.descriptor) {
                report.skip(entry.id());
                continue;
            }

            debug!(component = %entry.id(), "invoking");
            entry
                .payload
                .invoke(context)
                .map_err(|e| invocation_failed(entry.id(), e))?;
            report.invoked.push(entry.id().clone());
        }

        info!(
            invoked = report.invoked.len(),
            skipped = report.skipped.len(),
            "dispatch complete"
        );
        Ok(report)
    }
}

// =============================================================================
// TESTS
// =============================================================================
