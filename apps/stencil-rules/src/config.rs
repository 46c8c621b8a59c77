//! # Workspace Configuration
//!
//! A `stencilrules.toml` lists the stencil set and extension documents to
//! load:
//!
//! ```toml
//! [[stencil_sets]]
//! path = "bpmn.json"
//!
//! [[extensions]]
//! path = "bpmn-extension.json"
//! ```
//!
//! Relative paths resolve against the directory of the config file. Stencil
//! sets load first, in file order, then extensions.

use crate::error::CliError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stencil_rules_core::{ExtensionSource, RuleEngine, StencilSetSource};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of the TOML config (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Maximum size of a stencil set or extension document (50 MB).
const MAX_SOURCE_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), CliError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| CliError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(CliError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize `path` and make sure it names a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, CliError> {
    let canonical = path.canonicalize().map_err(|e| {
        CliError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(CliError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Read a bounded text file.
fn read_bounded(path: &Path, max_size: u64) -> Result<String, CliError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, max_size)?;
    std::fs::read_to_string(&validated)
        .map_err(|e| CliError::Io(format!("Read '{}': {}", path.display(), e)))
}

// =============================================================================
// CONFIG FILE
// =============================================================================

/// One `[[stencil_sets]]` or `[[extensions]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub path: PathBuf,
}

/// Parsed `stencilrules.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub stencil_sets: Vec<SourceEntry>,
    #[serde(default)]
    pub extensions: Vec<SourceEntry>,
    /// Directory relative paths resolve against. Not part of the file.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl WorkspaceConfig {
    /// Parse TOML text. Relative paths resolve against `base_dir`.
    pub fn from_toml(text: &str, base_dir: impl Into<PathBuf>) -> Result<Self, CliError> {
        let mut config: Self =
            toml::from_str(text).map_err(|e| CliError::Config(e.to_string()))?;
        config.base_dir = base_dir.into();
        Ok(config)
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = read_bounded(path, MAX_CONFIG_FILE_SIZE)?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        tracing::debug!(config = %path.display(), "loaded workspace config");
        Self::from_toml(&text, base_dir)
    }

    /// Absolute or config-relative location of an entry.
    pub fn resolve_path(&self, entry: &SourceEntry) -> PathBuf {
        if entry.path.is_absolute() {
            entry.path.clone()
        } else {
            self.base_dir.join(&entry.path)
        }
    }

    /// Load every listed document into a fresh engine.
    pub fn build_engine(&self) -> Result<RuleEngine, CliError> {
        if self.stencil_sets.is_empty() {
            return Err(CliError::Config("no [[stencil_sets]] configured".to_string()));
        }

        let mut engine = RuleEngine::new();
        for entry in &self.stencil_sets {
            let path = self.resolve_path(entry);
            let text = read_bounded(&path, MAX_SOURCE_FILE_SIZE)?;
            let source = StencilSetSource::from_json(&text)?;
            tracing::info!(
                path = %path.display(),
                namespace = %source.namespace,
                stencils = source.stencils.len(),
                "stencil set read"
            );
            engine.load_stencil_set(source)?;
        }
        for entry in &self.extensions {
            let path = self.resolve_path(entry);
            let text = read_bounded(&path, MAX_SOURCE_FILE_SIZE)?;
            let extension = ExtensionSource::from_json(&text)?;
            tracing::info!(
                path = %path.display(),
                namespace = %extension.namespace,
                extends = %extension.extends,
                "extension read"
            );
            engine.load_extension(extension)?;
        }
        Ok(engine)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sets_and_extensions() {
        let config = WorkspaceConfig::from_toml(
            r#"
            [[stencil_sets]]
            path = "bpmn.json"

            [[extensions]]
            path = "ext/bpmn-ext.json"
            "#,
            "/work",
        )
        .expect("parse");
        assert_eq!(config.stencil_sets.len(), 1);
        assert_eq!(
            config.resolve_path(&config.extensions[0]),
            PathBuf::from("/work/ext/bpmn-ext.json")
        );
    }

    #[test]
    fn absolute_paths_are_kept() {
        let config = WorkspaceConfig::from_toml(
            "[[stencil_sets]]\npath = \"/abs/set.json\"\n",
            "/work",
        )
        .expect("parse");
        assert_eq!(
            config.resolve_path(&config.stencil_sets[0]),
            PathBuf::from("/abs/set.json")
        );
    }

    #[test]
    fn empty_config_has_nothing_to_load() {
        let config = WorkspaceConfig::from_toml("", ".").expect("parse");
        assert!(matches!(config.build_engine(), Err(CliError::Config(_))));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let result = WorkspaceConfig::from_toml("[[stencil_sets]\npath=", ".");
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
