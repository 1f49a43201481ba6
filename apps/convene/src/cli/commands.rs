//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Every component named by a manifest is materialized as a tracing item
//! that appends its id to a [`RunContext`].

use crate::config::{ConveneConfig, STARTER_CONFIG};
use convene_core::{
    AsyncDispatcher, AsyncItem, BoxError, CandidateResolver, Component, ComponentDescriptor,
    ComponentId, ComponentKind, Composition, Compositor, ConveneError, DispatchReport,
    DispatchRequest, Entry, EnvironmentScope, Item, ManualOrdering, ModuleGraph, OrderedSet,
};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// =============================================================================
// RUN CONTEXT
// =============================================================================

/// Context handed to every dispatched item.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Ids of the items that ran, in order.
    pub log: Vec<String>,
}

/// Registration-capable item that records its id.
#[derive(Debug, Clone)]
pub struct TracingComponent {
    id: ComponentId,
}

impl Component<RunContext> for TracingComponent {
    fn register(&self, context: &mut RunContext) -> Result<(), BoxError> {
        info!(component = %self.id, "component registered");
        context.log.push(self.id.to_string());
        Ok(())
    }
}

/// Materialize `id` according to the kind declared in `graph`.
pub fn activate(graph: &ModuleGraph, id: &ComponentId) -> Result<Item<RunContext>, BoxError> {
    let kind = graph
        .find_component(id)
        .map(|d| d.kind)
        .unwrap_or_default();
    Ok(match kind {
        ComponentKind::Component => Item::component(TracingComponent { id: id.clone() }),
        ComponentKind::Callback => {
            let id = id.clone();
            Item::callback(move |context: &mut RunContext| {
                info!(callback = %id, "callback invoked");
                context.log.push(id.to_string());
                Ok(())
            })
        }
    })
}

// =============================================================================
// PLAN
// =============================================================================

/// Manual entries: declared descriptors when a module has one, bare
/// descriptors otherwise.
fn manual_ordering(
    graph: &ModuleGraph,
    config: &ConveneConfig,
) -> Result<ManualOrdering<Item<RunContext>>, ConveneError> {
    let entry = |id: ComponentId| -> Result<Entry<Item<RunContext>>, ConveneError> {
        let descriptor = graph
            .find_component(&id)
            .cloned()
            .unwrap_or_else(|| ComponentDescriptor::new(id.clone()));
        let item = activate(graph, &id).map_err(|e| ConveneError::Activation {
            id: id.clone(),
            reason: e.to_string(),
        })?;
        Ok(Entry::new(descriptor, item))
    };

    Ok(ManualOrdering {
        prepended: config
            .prepend_ids()
            .into_iter()
            .map(&entry)
            .collect::<Result<_, _>>()?,
        appended: config
            .append_ids()
            .into_iter()
            .map(&entry)
            .collect::<Result<_, _>>()?,
    })
}

/// Load modules and compose the plan for `scope`.
pub fn build_plan(
    config: &ConveneConfig,
    scope: EnvironmentScope,
) -> Result<Composition<Item<RunContext>>, ConveneError> {
    let graph = config.module_source().load_graph()?;
    let manual = manual_ordering(&graph, config)?;
    let activator = |id: &ComponentId| activate(&graph, id);

    let composition = Compositor::compose(
        &graph,
        &config.roots(),
        &config.resolver_options(),
        &activator,
        manual,
        scope,
    )?;

    for failure in &composition.failures {
        warn!(error = %failure, "discovery failure");
    }
    Ok(composition)
}

/// Dispatch `ordered` until done, failed or cancelled.
pub async fn dispatch_plan(
    ordered: OrderedSet<Item<RunContext>>,
    request: DispatchRequest,
    cancel: CancellationToken,
) -> Result<(RunContext, DispatchReport), ConveneError> {
    let ordered = ordered.map(AsyncItem::from);
    let mut context = RunContext::default();
    let report = AsyncDispatcher::new(request)
        .with_cancellation(cancel)
        .run(&ordered, &mut context)
        .await?;
    Ok((context, report))
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn ids_of(ordered: &OrderedSet<Item<RunContext>>) -> Vec<String> {
    ordered.ids().iter().map(|id| id.to_string()).collect()
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show what the module source contains.
pub fn cmd_status(config: &ConveneConfig, json_mode: bool) -> Result<(), ConveneError> {
    let graph = config.module_source().load_graph()?;

    if json_mode {
        print_json(&serde_json::json!({
            "source": config.source_label(),
            "module_count": graph.len(),
            "reference_count": graph.edge_count(),
            "component_count": graph.component_count(),
            "roots": config.roots,
        }));
        return Ok(());
    }

    println!("Convene Status");
    println!("==============");
    println!("Source:     {}", config.source_label());
    println!();
    println!("Modules:    {}", graph.len());
    println!("References: {}", graph.edge_count());
    println!("Components: {}", graph.component_count());
    println!("Roots:      {}", config.roots.join(", "));

    Ok(())
}

// =============================================================================
// RESOLVE COMMAND
// =============================================================================

/// Classify modules against the configured roots.
pub fn cmd_resolve(
    config: &ConveneConfig,
    json_mode: bool,
    verbose: bool,
) -> Result<(), ConveneError> {
    let graph = config.module_source().load_graph()?;
    let roots = config.roots();
    let resolution = CandidateResolver::resolve_with(&roots, &graph, &config.resolver_options());
    let summary = resolution.summary();

    if json_mode {
        let candidates: Vec<_> = resolution
            .candidates()
            .iter()
            .map(|m| {
                serde_json::json!({
                    "name": m.name,
                    "version": m.version,
                    "classification": resolution.classification(&m.name),
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "candidates": candidates,
            "absent": resolution.absent(),
            "summary": summary,
        }));
        return Ok(());
    }

    if roots.is_empty() {
        println!("No root references given (use --root or `roots` in convene.toml).");
        return Ok(());
    }

    println!("Candidate Modules");
    println!("=================");
    for module in resolution.candidates() {
        println!(
            "  {:<40} {:?}",
            module.name.as_str(),
            resolution.classification(&module.name)
        );
    }
    println!();
    println!(
        "Modules: {}  References: {}  Candidates: {}  Not candidates: {}  Absent: {}",
        summary.modules,
        summary.references,
        summary.candidates,
        summary.not_candidates,
        summary.absent
    );

    if verbose && !resolution.absent().is_empty() {
        println!();
        println!("Absent modules:");
        for name in resolution.absent() {
            println!("  {}", name);
        }
    }

    Ok(())
}

// =============================================================================
// ORDER COMMAND
// =============================================================================

/// Print the ordered component plan.
pub fn cmd_order(
    config: &ConveneConfig,
    scope: EnvironmentScope,
    json_mode: bool,
    verbose: bool,
) -> Result<(), ConveneError> {
    let composition = build_plan(config, scope)?;

    if json_mode {
        let plan: Vec<_> = composition
            .ordered
            .iter()
            .map(|e| serde_json::json!({
                "id": e.id(),
                "kind": e.descriptor.kind,
                "scope": e.descriptor.scope,
            }))
            .collect();
        let failures: Vec<String> = composition.failures.iter().map(|e| e.to_string()).collect();
        print_json(&serde_json::json!({
            "environment": scope.name(),
            "modules": composition.modules,
            "plan": plan,
            "failures": failures,
        }));
        return Ok(());
    }

    println!("Component Plan ({})", scope);
    println!("==============");
    for (position, entry) in composition.ordered.iter().enumerate() {
        println!(
            "  {:>3}. {:<40} {:<9} {}",
            position + 1,
            entry.id().as_str(),
            entry.descriptor.scope.name(),
            if entry.descriptor.kind == ComponentKind::Callback { "callback" } else { "component" }
        );
    }
    if composition.ordered.is_empty() {
        println!("  (empty)");
    }

    if verbose || !composition.failures.is_empty() {
        println!();
        println!("Discovery failures: {}", composition.failures.len());
        for failure in &composition.failures {
            println!("  {}", failure);
        }
    }

    Ok(())
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Dispatch the plan. Ctrl+C cancels between items.
pub async fn cmd_run(
    config: &ConveneConfig,
    scope: EnvironmentScope,
    request: DispatchRequest,
    json_mode: bool,
) -> Result<(), ConveneError> {
    let composition = build_plan(config, scope)?;

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping after the current item");
                cancel.cancel();
            }
        })
    };

    let result = dispatch_plan(composition.ordered, request, cancel).await;
    watcher.abort();
    let (context, report) = result?;

    if json_mode {
        let skipped: Vec<String> = report.skipped.iter().map(|e| e.to_string()).collect();
        print_json(&serde_json::json!({
            "environment": scope.name(),
            "invoked": context.log,
            "skipped": skipped,
            "cancelled": report.cancelled,
        }));
        return Ok(());
    }

    println!("Dispatched {} item(s)", report.invoked.len());
    for id in &context.log {
        println!("  ran     {}", id);
    }
    for skipped in &report.skipped {
        println!("  skipped {}", skipped);
    }
    if report.cancelled {
        println!("Cancelled before completion.");
    }

    Ok(())
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Print the plan fingerprint and BLAKE3 digest.
pub fn cmd_hash(
    config: &ConveneConfig,
    scope: EnvironmentScope,
    json_mode: bool,
) -> Result<(), ConveneError> {
    let composition = build_plan(config, scope)?;
    let ordered = &composition.ordered;

    if json_mode {
        print_json(&serde_json::json!({
            "environment": scope.name(),
            "components": ids_of(ordered),
            "fingerprint": format!("{:016x}", ordered.fingerprint()),
            "blake3": ordered.crypto_fingerprint(),
        }));
        return Ok(());
    }

    println!("Plan:        {} component(s), {}", ordered.len(), scope);
    println!("Fingerprint: {:016x}", ordered.fingerprint());
    println!("BLAKE3:      {}", ordered.crypto_fingerprint());

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Write a starter config file.
pub fn cmd_init(path: &Path, force: bool) -> Result<(), ConveneError> {
    if path.exists() && !force {
        return Err(ConveneError::IoError(format!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        )));
    }

    std::fs::write(path, STARTER_CONFIG)
        .map_err(|e| ConveneError::IoError(format!("{}: {}", path.display(), e)))?;
    println!("Wrote starter configuration to {}", path.display());
    Ok(())
}
