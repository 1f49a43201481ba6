//! # Convene CLI Module
//!
//! This module implements the CLI interface for Convene.
//!
//! ## Available Commands
//!
//! - `status` - Show what the module source contains
//! - `resolve` - Classify modules against root references
//! - `order` - Print the ordered component plan
//! - `run` - Dispatch the plan against a recording context
//! - `hash` - Fingerprint the plan
//! - `init` - Write a starter `convene.toml`

mod commands;

use crate::config::{ConveneConfig, DEFAULT_CONFIG_FILE, ENVIRONMENT_VAR, Overrides};
use clap::{Args, Parser, Subcommand};
use convene_core::{Capability, ConveneError, DispatchRequest, EnvironmentScope};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Convene - plugin discovery and ordering
///
/// Finds the modules relevant to a set of root references, loads the
/// components they declare and orders them by their dependency hints.
#[derive(Parser, Debug)]
#[command(name = "convene")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file [default: convene.toml]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Manifest listing every module (TOML or JSON)
    #[arg(short = 'M', long, global = true)]
    pub manifest: Option<PathBuf>,

    /// Directory with one module.toml per subdirectory
    #[arg(short = 'D', long, global = true)]
    pub modules_dir: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Root references and the target environment.
#[derive(Args, Debug, Clone, Default)]
pub struct PlanArgs {
    /// Root reference name (repeatable)
    #[arg(short, long = "root")]
    pub roots: Vec<String>,

    /// Environment: undefined, live or unit-test
    #[arg(short, long)]
    pub environment: Option<String>,

    /// Component id to place before the discovered ones (repeatable)
    #[arg(long)]
    pub prepend: Vec<String>,

    /// Component id to place after the discovered ones (repeatable)
    #[arg(long)]
    pub append: Vec<String>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show module source status
    Status,

    /// Classify modules against root references
    Resolve {
        /// Root reference name (repeatable)
        #[arg(short, long = "root")]
        roots: Vec<String>,
    },

    /// Print the ordered component plan
    Order {
        #[command(flatten)]
        plan: PlanArgs,
    },

    /// Dispatch the plan against a recording context
    Run {
        #[command(flatten)]
        plan: PlanArgs,

        /// Only run components declaring this capability (repeatable)
        #[arg(long = "component-capability")]
        component_capabilities: Vec<String>,

        /// Only run callbacks declaring this capability (repeatable)
        #[arg(long = "callback-capability")]
        callback_capabilities: Vec<String>,
    },

    /// Fingerprint the plan (order-sensitive hash plus BLAKE3)
    Hash {
        #[command(flatten)]
        plan: PlanArgs,
    },

    /// Write a starter convene.toml
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Build a dispatch request from capability flags. No flags means `All`.
#[must_use]
pub fn dispatch_request(components: &[String], callbacks: &[String]) -> DispatchRequest {
    if components.is_empty() && callbacks.is_empty() {
        return DispatchRequest::All;
    }
    DispatchRequest::Only {
        components: components.iter().map(Capability::new).collect(),
        callbacks: callbacks.iter().map(Capability::new).collect(),
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Load the config file and apply global and plan flags.
pub fn load_config(cli: &Cli, plan: &PlanArgs) -> Result<ConveneConfig, ConveneError> {
    let (path, explicit) = match &cli.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    Ok(ConveneConfig::load(&path, explicit)?.with_overrides(Overrides {
        manifest: cli.manifest.clone(),
        modules_dir: cli.modules_dir.clone(),
        roots: plan.roots.clone(),
        environment: plan.environment.clone(),
        prepend: plan.prepend.clone(),
        append: plan.append.clone(),
    }))
}

fn scope_of(config: &ConveneConfig, plan: &PlanArgs) -> Result<EnvironmentScope, ConveneError> {
    let from_env = std::env::var(ENVIRONMENT_VAR).ok();
    config.scope(plan.environment.as_deref(), from_env.as_deref())
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), ConveneError> {
    let json_mode = cli.json_mode;
    let verbose = cli.verbose;

    match &cli.command {
        Some(Commands::Init { force }) => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            cmd_init(&path, *force)
        }
        Some(Commands::Resolve { roots }) => {
            let plan = PlanArgs {
                roots: roots.clone(),
                ..PlanArgs::default()
            };
            let config = load_config(&cli, &plan)?;
            cmd_resolve(&config, json_mode, verbose)
        }
        Some(Commands::Order { plan }) => {
            let config = load_config(&cli, plan)?;
            let scope = scope_of(&config, plan)?;
            cmd_order(&config, scope, json_mode, verbose)
        }
        Some(Commands::Run {
            plan,
            component_capabilities,
            callback_capabilities,
        }) => {
            let config = load_config(&cli, plan)?;
            let scope = scope_of(&config, plan)?;
            let request = dispatch_request(component_capabilities, callback_capabilities);
            cmd_run(&config, scope, request, json_mode).await
        }
        Some(Commands::Hash { plan }) => {
            let config = load_config(&cli, plan)?;
            let scope = scope_of(&config, plan)?;
            cmd_hash(&config, scope, json_mode)
        }
        Some(Commands::Status) | None => {
            // No subcommand - show status by default
            let config = load_config(&cli, &PlanArgs::default())?;
            cmd_status(&config, json_mode)
        }
    }
}
