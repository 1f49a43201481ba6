//! # Async Composition Dispatcher
//!
//! Async counterpart of [`crate::dispatcher`], enabled by the `async`
//! feature.
//!
//! Items are awaited one at a time, in order. An optional
//! `CancellationToken` is checked between invocations; a cancelled dispatch
//! stops where it is and reports `cancelled`. Nothing already invoked is
//! rolled back.

use crate::dispatcher::{DispatchReport, DispatchRequest, Item, invocation_failed};
use crate::ordering::OrderedSet;
use crate::{BoxError, ComponentKind, ConveneError};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// =============================================================================
// ITEMS
// =============================================================================

/// A component whose registration is asynchronous.
#[async_trait]
pub trait AsyncComponent<C>: Send + Sync {
    /// Apply this component to `context`.
    async fn register(&self, context: &mut C) -> Result<(), BoxError>;
}

type AsyncCallbackFn<C> =
    dyn for<'a> Fn(&'a mut C) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync;

/// A function taking the context and returning a boxed future.
pub struct AsyncCallback<C> {
    f: Arc<AsyncCallbackFn<C>>,
}

impl<C> AsyncCallback<C> {
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut C) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Invoke the function.
    pub fn call<'a>(&self, context: &'a mut C) -> BoxFuture<'a, Result<(), BoxError>> {
        (self.f)(context)
    }
}

impl<C> Clone for AsyncCallback<C> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<C> fmt::Debug for AsyncCallback<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AsyncCallback")
    }
}

/// A dispatchable item for the async dispatcher.
///
/// `Sync` carries a synchronous item, so one plan can mix both.
pub enum AsyncItem<C> {
    Component(Arc<dyn AsyncComponent<C>>),
    Callback(AsyncCallback<C>),
    Sync(Item<C>),
}

impl<C> AsyncItem<C> {
    /// Wrap an async component.
    pub fn component(component: impl AsyncComponent<C> + 'static) -> Self {
        AsyncItem::Component(Arc::new(component))
    }

    /// Wrap an async function.
    pub fn callback<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut C) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync + 'static,
    {
        AsyncItem::Callback(AsyncCallback::new(f))
    }

    /// Variant of this item. Wrapped synchronous items report their own.
    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        match self {
            AsyncItem::Component(_) => ComponentKind::Component,
            AsyncItem::Callback(_) => ComponentKind::Callback,
            AsyncItem::Sync(item) => item.kind(),
        }
    }

    /// Invoke the item against `context`.
    pub async fn invoke(&self, context: &mut C) -> Result<(), BoxError> {
        match self {
            AsyncItem::Component(component) => component.register(context).await,
            AsyncItem::Callback(callback) => callback.call(context).await,
            AsyncItem::Sync(item) => item.invoke(context),
        }
    }
}

impl<C> From<Item<C>> for AsyncItem<C> {
    fn from(item: Item<C>) -> Self {
        AsyncItem::Sync(item)
    }
}

impl<C> Clone for AsyncItem<C> {
    fn clone(&self) -> Self {
        match self {
            AsyncItem::Component(component) => AsyncItem::Component(Arc::clone(component)),
            AsyncItem::Callback(callback) => AsyncItem::Callback(callback.clone()),
            AsyncItem::Sync(item) => AsyncItem::Sync(item.clone()),
        }
    }
}

impl<C> fmt::Debug for AsyncItem<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsyncItem::Component(_) => f.write_str("AsyncItem::Component"),
            AsyncItem::Callback(_) => f.write_str("AsyncItem::Callback"),
            AsyncItem::Sync(item) => write!(f, "AsyncItem::Sync({:?})", item),
        }
    }
}

// =============================================================================
// DISPATCHER
// =============================================================================

/// Sequential async dispatcher with cooperative cancellation.
#[derive(Debug, Clone, Default)]
pub struct AsyncDispatcher {
    request: DispatchRequest,
    cancel: Option<CancellationToken>,
}

impl AsyncDispatcher {
    #[must_use]
    pub fn new(request: DispatchRequest) -> Self {
        Self {
            request,
            cancel: None,
        }
    }

    /// Check `token` before each invocation.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Await every admitted item of `ordered` against `context`, in order.
    ///
    /// Same failure rules as [`crate::Dispatcher::run`]. A cancellation
    /// observed between two items ends the dispatch with `Ok` and
    /// `report.cancelled` set.
    pub async fn run<C>(
        &self,
        ordered: &OrderedSet<AsyncItem<C>>,
        context: &mut C,
    ) -> Result<DispatchReport, ConveneError> {
        let mut report = DispatchReport::default();

        for entry in ordered {
            if self.is_cancelled() {
                warn!(
                    next = %entry.id(),
                    invoked = report.invoked.len(),
                    "dispatch cancelled"
                );
                report.cancelled = true;
                break;
            }

            if !self.request.admits(entry.payload.kind(), &entry.descriptor) {
                report.skip(entry.id());
                continue;
            }

            debug!(component = %entry.id(), "invoking");
            entry
                .payload
                .invoke(context)
                .await
                .map_err(|e| invocation_failed(entry.id(), e))?;
            report.invoked.push(entry.id().clone());
        }

        info!(
            invoked = report.invoked.len(),
            skipped = report.skipped.len(),
            cancelled = report.cancelled,
            "async dispatch complete"
        );
        Ok(report)
    }
}
