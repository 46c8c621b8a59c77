//! # CLI Errors

use stencil_rules_core::RulesError;
use thiserror::Error;

/// Errors surfaced by the `stencilrules` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// The rules engine refused a request.
    #[error(transparent)]
    Rules(#[from] RulesError),

    /// A file could not be read or written.
    #[error("I/O error: {0}")]
    Io(String),

    /// The workspace configuration is malformed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A stencil name did not resolve against the loaded catalog.
    #[error("Unknown stencil: {0}")]
    UnknownStencil(String),
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
