//! Feature store
//!
//! A named, insertion-ordered collection of features. A feature's index is
//! the size of the store when it was added, so indices are dense and stable
//! for the lifetime of the store.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut store = FeatureStore::new(DEFAULT_FEATURE_STORE_NAME);
//! store.add(&FeatureDefinition::new("c1", "ValueFeature", params))?;
//! let c1 = store.get("c1");
//! ```

use crate::feature::{Feature, FeatureDefinition};
use ltrank_core::{LtrError, LtrResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Name of the store used when a definition names none
pub const DEFAULT_FEATURE_STORE_NAME: &str = "_DEFAULT_";

/// Insertion-ordered mapping of feature name to feature
#[derive(Debug, Clone)]
pub struct FeatureStore {
    name: String,
    features: Vec<Arc<Feature>>,
    /// Feature name -> position in `features`
    by_name: HashMap<String, usize>,
}

impl FeatureStore {
    /// Create an empty store
    pub fn new(name: impl Into<String>) -> Self {
        FeatureStore {
            name: name.into(),
            features: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Store name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a feature built from `def`
    ///
    /// # Errors
    ///
    /// - `DuplicateFeature` if a feature with the same name exists; the
    ///   store is left unchanged
    /// - `FeatureConfig` if the definition is invalid
    pub fn add(&mut self, def: &FeatureDefinition) -> LtrResult<Arc<Feature>> {
        if self.by_name.contains_key(&def.name) {
            return Err(LtrError::DuplicateFeature {
                store: self.name.clone(),
                name: def.name.clone(),
            });
        }
        let index = self.features.len();
        let feature = Arc::new(Feature::from_definition(def, index)?);
        self.by_name.insert(def.name.clone(), index);
        self.features.push(Arc::clone(&feature));
        debug!(
            target: "ltrank::features",
            store = %self.name,
            feature = %def.name,
            index,
            "Added feature"
        );
        Ok(feature)
    }

    /// Look up a feature by name
    pub fn get(&self, name: &str) -> Option<&Arc<Feature>> {
        self.by_name.get(name).map(|&i| &self.features[i])
    }

    /// Whether a feature with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All features in index order
    pub fn features(&self) -> &[Arc<Feature>] {
        &self.features
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Persisted form of every feature, in index order
    pub fn to_definitions(&self) -> Vec<FeatureDefinition> {
        self.features
            .iter()
            .map(|f| f.to_definition(Some(&self.name)))
            .collect()
    }
}
