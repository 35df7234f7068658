//! Definition sources
//!
//! Feature and model definitions are persisted outside the reranker. A
//! `DefinitionSource` hands them over as two lists; `JsonFileSource` keeps
//! them as JSON arrays in `features.json` and `models.json`.

use crate::model::ModelDefinition;
use crate::registry::LtrRegistry;
use ltrank_core::{LtrError, LtrResult};
use ltrank_features::FeatureDefinition;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default feature definitions file name
pub const FEATURES_FILE: &str = "features.json";

/// Default model definitions file name
pub const MODELS_FILE: &str = "models.json";

/// Provider of persisted definitions
pub trait DefinitionSource: Send + Sync {
    /// All feature definitions
    fn feature_definitions(&self) -> LtrResult<Vec<FeatureDefinition>>;

    /// All model definitions
    fn model_definitions(&self) -> LtrResult<Vec<ModelDefinition>>;
}

/// Definitions stored as JSON arrays in two files
///
/// A missing file reads as an empty list.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    features_path: PathBuf,
    models_path: PathBuf,
}

impl JsonFileSource {
    /// Use explicit file paths
    pub fn new(features_path: impl Into<PathBuf>, models_path: impl Into<PathBuf>) -> Self {
        JsonFileSource {
            features_path: features_path.into(),
            models_path: models_path.into(),
        }
    }

    /// Use `features.json` and `models.json` inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(FEATURES_FILE), dir.join(MODELS_FILE))
    }

    /// Path of the feature definitions file
    pub fn features_path(&self) -> &Path {
        &self.features_path
    }

    /// Path of the model definitions file
    pub fn models_path(&self) -> &Path {
        &self.models_path
    }

    /// Write the registry's current definitions to both files
    pub fn persist(&self, registry: &LtrRegistry) -> LtrResult<()> {
        write_json(&self.features_path, &registry.export_features())?;
        write_json(&self.models_path, &registry.export_models())
    }
}

impl DefinitionSource for JsonFileSource {
    fn feature_definitions(&self) -> LtrResult<Vec<FeatureDefinition>> {
        read_json(&self.features_path)
    }

    fn model_definitions(&self) -> LtrResult<Vec<ModelDefinition>> {
        read_json(&self.models_path)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> LtrResult<Vec<T>> {
    if !path.exists() {
        debug!(target: "ltrank::registry", path = %path.display(), "Definitions file missing");
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        LtrError::Serialization(format!(
            "Failed to parse definitions file '{}': {}",
            path.display(),
            e
        ))
    })
}

fn write_json<T: Serialize>(path: &Path, items: &[T]) -> LtrResult<()> {
    let content = serde_json::to_string_pretty(items)?;
    std::fs::write(path, content)?;
    debug!(
        target: "ltrank::registry",
        path = %path.display(),
        count = items.len(),
        "Wrote definitions file"
    );
    Ok(())
}
