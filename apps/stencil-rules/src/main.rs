//! # stencilrules
//!
//! The binary for the Stencil Set Rules Engine.
//!
//! ## Usage
//!
//! ```bash
//! # What is loaded
//! stencilrules --config bpmn/stencilrules.toml status
//!
//! # Rule queries
//! stencilrules connect --edge SequenceFlow --source Task --target Task
//! stencilrules contain --container Pool --contained Lane
//! stencilrules morphs --stencil EndEvent --json-mode
//! ```

use clap::Parser;
use stencil_rules::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // STENCILRULES_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("STENCILRULES_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "stencil_rules=debug"
    } else {
        "stencil_rules=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr so that --json-mode output stays parseable.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
