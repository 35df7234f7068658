//! Model store
//!
//! Name-keyed collection of validated models. Cloning a store clones the
//! map of `Arc`s, not the models.

use crate::model::ScoringModel;
use ltrank_core::{LtrError, LtrResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Name-keyed collection of models
#[derive(Debug, Clone, Default)]
pub struct ModelStore {
    models: HashMap<String, Arc<ScoringModel>>,
}

impl ModelStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a model
    ///
    /// # Errors
    ///
    /// `DuplicateModel` if a model with the same name exists and `replace`
    /// is false.
    pub fn add(&mut self, model: Arc<ScoringModel>, replace: bool) -> LtrResult<()> {
        if !replace && self.models.contains_key(model.name()) {
            return Err(LtrError::DuplicateModel(model.name().to_string()));
        }
        self.models.insert(model.name().to_string(), model);
        Ok(())
    }

    /// Look up a model
    pub fn get(&self, name: &str) -> Option<&Arc<ScoringModel>> {
        self.models.get(name)
    }

    /// Remove a model, returning it if it existed
    pub fn delete(&mut self, name: &str) -> Option<Arc<ScoringModel>> {
        self.models.remove(name)
    }

    /// Remove every model
    pub fn clear(&mut self) {
        self.models.clear();
    }

    /// All models, sorted by name
    pub fn models(&self) -> Vec<Arc<ScoringModel>> {
        let mut models: Vec<_> = self.models.values().cloned().collect();
        models.sort_by(|a, b| a.name().cmp(b.name()));
        models
    }

    /// Number of models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
