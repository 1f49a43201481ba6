//! # Convene - Plugin Discovery & Ordering
//!
//! The main binary for the Convene discovery and ordering engine.
//!
//! This application provides:
//! - CLI interface over module manifests
//! - Candidate resolution, component ordering and plan fingerprints
//! - Async dispatch of a plan with Ctrl+C cancellation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     apps/convene (THE BINARY)                   │
//! │                                                                 │
//! │  ┌─────────────┐    ┌──────────────┐    ┌──────────────────┐   │
//! │  │   CLI       │    │ convene.toml │    │ Async dispatch   │   │
//! │  │  (clap)     │    │ (serde+toml) │    │ (tokio)          │   │
//! │  └──────┬──────┘    └──────┬───────┘    └────────┬─────────┘   │
//! │         │                  │                     │             │
//! │         └──────────────────┼─────────────────────┘             │
//! │                            ▼                                   │
//! │                    ┌───────────────┐                           │
//! │                    │ convene-core  │                           │
//! │                    │ (THE LOGIC)   │                           │
//! │                    └───────────────┘                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! convene init
//! convene status --modules-dir ./modules
//! convene resolve -r Acme.Sdk
//! convene order -r Acme.Sdk -e live --prepend boot::Config
//! convene run -r Acme.Sdk -e unit-test
//! convene hash -r Acme.Sdk --json-mode
//! ```

use clap::Parser;
use convene::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing. CONVENE_LOG_FORMAT=json switches to JSON lines.
    let log_format = std::env::var("CONVENE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "convene=info,convene_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner (never in JSON mode, stdout stays parseable)
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Convene startup banner.
fn print_banner() {
    println!(
        r#"
   ___ ___  _ ___   _____ _ __   ___
  / __/ _ \| '_ \ \ / / _ \ '_ \ / _ \
 | (_| (_) | | | \ V /  __/ | | |  __/
  \___\___/|_| |_|\_/ \___|_| |_|\___|

  Plugin Discovery & Ordering v{}

  Deterministic • Scoped • Cycle-checked
"#,
        env!("CARGO_PKG_VERSION")
    );
}
