//! YAML Aggregator Definition Loader with Extends Support
//!
//! Definitions can inherit from a base file through the `extends` keyword, so
//! queries sharing a key layout only restate what differs.
//!
//! ```yaml
//! # keyed_base.yaml
//! input_width: 3
//! output_width: 3
//! pass_through:
//!   - { output: 0, input: 0 }
//!
//! # totals.yaml
//! extends: keyed_base.yaml
//! aggregates:
//!   - { output: 1, input: 1, function: SUM }
//!   - { output: 2, input: 2, function: MAX }
//! ```
//!
//! Mappings merge recursively with the derived file winning; sequences and
//! scalars in the derived file replace the base value.

use super::definition::AggregatorDefinition;
use crate::velostream::sql::error::AggregationError;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Raw YAML document before `extends` is resolved
#[derive(Debug, Clone, Deserialize)]
struct RawDefinitionFile {
    extends: Option<String>,
    #[serde(flatten)]
    body: serde_yaml::Value,
}

/// Errors that can occur while loading a definition file
#[derive(Error, Debug)]
pub enum YamlConfigError {
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("YAML parsing error in {file}: {error}")]
    ParseError {
        file: PathBuf,
        error: serde_yaml::Error,
    },

    #[error("IO error reading {file}: {error}")]
    IoError {
        file: PathBuf,
        error: std::io::Error,
    },

    #[error("Circular dependency detected: {chain:?}")]
    CircularDependency { chain: Vec<PathBuf> },

    #[error("Invalid aggregator definition in {file}: {message}")]
    InvalidDefinition { file: PathBuf, message: String },
}

impl From<YamlConfigError> for AggregationError {
    fn from(error: YamlConfigError) -> Self {
        AggregationError::config_load(error.to_string())
    }
}

/// Loads aggregator definitions, resolving `extends` chains
pub struct DefinitionLoader {
    /// Base directory for resolving relative paths
    base_dir: PathBuf,
    /// Files currently being resolved, for cycle detection
    loading_stack: HashSet<PathBuf>,
}

impl DefinitionLoader {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            loading_stack: HashSet::new(),
        }
    }

    /// Load a definition file and everything it extends
    pub fn load<P: AsRef<Path>>(
        &mut self,
        file_path: P,
    ) -> Result<AggregatorDefinition, YamlConfigError> {
        let path = self.resolve_path(file_path.as_ref());
        if !path.exists() {
            return Err(YamlConfigError::FileNotFound { path });
        }

        let document = self.load_document(&path)?;
        let definition = AggregatorDefinition::from_yaml_value(document).map_err(|e| {
            YamlConfigError::InvalidDefinition {
                file: path.clone(),
                message: e.to_string(),
            }
        })?;
        log::debug!(
            "Loaded aggregator definition from {} ({} aggregates)",
            path.display(),
            definition.aggregates.len()
        );
        Ok(definition)
    }

    fn load_document(&mut self, path: &Path) -> Result<serde_yaml::Value, YamlConfigError> {
        let canonical = path.canonicalize().map_err(|e| YamlConfigError::IoError {
            file: path.to_path_buf(),
            error: e,
        })?;

        if self.loading_stack.contains(&canonical) {
            let mut chain: Vec<PathBuf> = self.loading_stack.iter().cloned().collect();
            chain.push(canonical);
            return Err(YamlConfigError::CircularDependency { chain });
        }
        self.loading_stack.insert(canonical.clone());
        let result = self.resolve_document(&canonical);
        self.loading_stack.remove(&canonical);
        result
    }

    fn resolve_document(&mut self, path: &Path) -> Result<serde_yaml::Value, YamlConfigError> {
        let content = fs::read_to_string(path).map_err(|e| YamlConfigError::IoError {
            file: path.to_path_buf(),
            error: e,
        })?;
        let raw: RawDefinitionFile =
            serde_yaml::from_str(&content).map_err(|e| YamlConfigError::ParseError {
                file: path.to_path_buf(),
                error: e,
            })?;

        match raw.extends {
            Some(extends) => {
                let base_path = match path.parent() {
                    Some(parent) => parent.join(&extends),
                    None => self.base_dir.join(&extends),
                };
                let base = self.load_document(&base_path)?;
                Ok(merge_documents(&base, &raw.body))
            }
            None => Ok(raw.body),
        }
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Overlay `derived` on `base`: mappings merge key by key, anything else is replaced
fn merge_documents(base: &serde_yaml::Value, derived: &serde_yaml::Value) -> serde_yaml::Value {
    match (base, derived) {
        (serde_yaml::Value::Mapping(base_map), serde_yaml::Value::Mapping(derived_map)) => {
            let mut merged = base_map.clone();
            for (key, derived_value) in derived_map {
                let value = match base_map.get(key) {
                    Some(base_value) => merge_documents(base_value, derived_value),
                    None => derived_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            serde_yaml::Value::Mapping(merged)
        }
        _ => derived.clone(),
    }
}

/// Load a single definition file, resolving relative paths from the working directory
pub fn load_aggregator_definition<P: AsRef<Path>>(
    file_path: P,
) -> Result<AggregatorDefinition, YamlConfigError> {
    let path = file_path.as_ref();
    let base_dir = match path.parent() {
        Some(parent) if path.is_absolute() => parent,
        _ => Path::new("."),
    };
    DefinitionLoader::new(base_dir).load(path)
}
