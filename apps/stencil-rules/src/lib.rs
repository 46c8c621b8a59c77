//! # stencil-rules
//!
//! Command-line front end of the Stencil Set Rules Engine: loads a workspace
//! of stencil set documents and answers rule queries against it.

pub mod cli;
pub mod config;
pub mod error;

pub use config::WorkspaceConfig;
pub use error::CliError;
