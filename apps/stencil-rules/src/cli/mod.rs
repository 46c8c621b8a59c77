//! # Stencil Rules CLI Module
//!
//! This module implements the CLI interface for the rules engine.
//!
//! ## Available Commands
//!
//! - `status` - Show loaded stencil sets, extensions and catalog size
//! - `connect` - Check whether an edge may connect two stencils
//! - `contain` - Check whether one stencil may contain another
//! - `morphs` - List the stencils a stencil can morph into
//! - `connect-morph` - Pick the edge stencil to join two stencils
//! - `layout` - Show the layout weights of a stencil
//! - `edges` - List edge stencils leaving or entering a stencil
//! - `endpoints` - List node stencils an edge may reach

mod commands;

use crate::config::WorkspaceConfig;
use crate::error::CliError;
use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Stencil Set Rules Engine
///
/// Answers connection, containment, cardinality, morphing and layout
/// questions about diagram stencils.
#[derive(Parser, Debug)]
#[command(name = "stencilrules")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the workspace config
    #[arg(short, long, global = true, default_value = "stencilrules.toml")]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show loaded stencil sets and extensions
    Status,

    /// Check whether an edge may connect a source to a target
    Connect {
        /// Edge stencil
        #[arg(short, long)]
        edge: String,

        /// Source stencil
        #[arg(short, long)]
        source: Option<String>,

        /// Target stencil
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Check whether a stencil may contain another
    Contain {
        /// Container stencil
        #[arg(long)]
        container: String,

        /// Contained stencil
        #[arg(long)]
        contained: String,
    },

    /// List the stencils a stencil can be morphed into
    Morphs {
        /// Stencil to morph
        #[arg(short, long)]
        stencil: String,
    },

    /// Pick the edge stencil that joins a source to a target
    ConnectMorph {
        /// Source stencil
        #[arg(short, long)]
        source: String,

        /// Target stencil
        #[arg(short, long)]
        target: String,
    },

    /// Show the layout weights of a stencil
    Layout {
        /// Stencil to inspect
        #[arg(short, long)]
        stencil: String,

        /// Connecting edge stencil
        #[arg(short, long)]
        edge: Option<String>,
    },

    /// List edge stencils that may leave a source or enter a target
    #[command(group(ArgGroup::new("end").required(true).args(["source", "target"])))]
    Edges {
        /// Source stencil
        #[arg(short, long)]
        source: Option<String>,

        /// Target stencil
        #[arg(short, long)]
        target: Option<String>,
    },

    /// List node stencils an edge may connect to a source or from a target
    #[command(group(ArgGroup::new("end").required(true).args(["source", "target"])))]
    Endpoints {
        /// Edge stencil
        #[arg(short, long)]
        edge: String,

        /// Source stencil; lists possible targets
        #[arg(short, long)]
        source: Option<String>,

        /// Target stencil; lists possible sources
        #[arg(short, long)]
        target: Option<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments, writing to stdout.
pub fn execute(cli: Cli) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute_to(cli, &mut out)
}

/// Execute the CLI with parsed arguments, writing to `out`.
pub fn execute_to(cli: Cli, out: &mut impl std::io::Write) -> Result<(), CliError> {
    let config = WorkspaceConfig::load(&cli.config)?;
    let engine = config.build_engine()?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Status) | None => cmd_status(&engine, json_mode, out),
        Some(Commands::Connect {
            edge,
            source,
            target,
        }) => cmd_connect(
            &engine,
            json_mode,
            &edge,
            source.as_deref(),
            target.as_deref(),
            out,
        ),
        Some(Commands::Contain {
            container,
            contained,
        }) => cmd_contain(&engine, json_mode, &container, &contained, out),
        Some(Commands::Morphs { stencil }) => cmd_morphs(&engine, json_mode, &stencil, out),
        Some(Commands::ConnectMorph { source, target }) => {
            cmd_connect_morph(&engine, json_mode, &source, &target, out)
        }
        Some(Commands::Layout { stencil, edge }) => {
            cmd_layout(&engine, json_mode, &stencil, edge.as_deref(), out)
        }
        Some(Commands::Edges { source, target }) => {
            cmd_edges(&engine, json_mode, source.as_deref(), target.as_deref(), out)
        }
        Some(Commands::Endpoints {
            edge,
            source,
            target,
        }) => cmd_endpoints(
            &engine,
            json_mode,
            &edge,
            source.as_deref(),
            target.as_deref(),
            out,
        ),
    }
}
