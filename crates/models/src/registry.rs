//! Feature store and model registry
//!
//! The registry holds an immutable `RegistrySnapshot` behind an `Arc`.
//! Readers clone the `Arc` and never observe a half-applied update. Writers
//! are serialized, build a new snapshot from the current one and swap it in;
//! a failed update leaves the current snapshot untouched.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let registry = LtrRegistry::new();
//! registry.add_features(&feature_defs)?;
//! registry.add_models(&model_defs, false)?;
//!
//! let model = registry.get_model("svm")?;
//! ```

use crate::model::{ModelDefinition, ScoringModel};
use crate::model_store::ModelStore;
use crate::source::DefinitionSource;
use ltrank_core::{LtrError, LtrResult};
use ltrank_features::{FeatureDefinition, FeatureStore, DEFAULT_FEATURE_STORE_NAME};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Name that selects every entry in delete operations
pub const DELETE_ALL: &str = "*";

// ============================================================================
// RegistrySnapshot
// ============================================================================

/// Immutable view of all feature stores and models
///
/// The default store (`_DEFAULT_`) is always present, possibly empty.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    feature_stores: HashMap<String, Arc<FeatureStore>>,
    models: ModelStore,
}

impl Default for RegistrySnapshot {
    fn default() -> Self {
        RegistrySnapshot {
            feature_stores: with_default_store(HashMap::new()),
            models: ModelStore::new(),
        }
    }
}

/// Add an empty default store unless one exists
fn with_default_store(
    mut stores: HashMap<String, Arc<FeatureStore>>,
) -> HashMap<String, Arc<FeatureStore>> {
    stores
        .entry(DEFAULT_FEATURE_STORE_NAME.to_string())
        .or_insert_with(|| Arc::new(FeatureStore::new(DEFAULT_FEATURE_STORE_NAME)));
    stores
}

impl RegistrySnapshot {
    /// Look up a feature store
    pub fn feature_store(&self, name: &str) -> Option<&Arc<FeatureStore>> {
        self.feature_stores.get(name)
    }

    /// Feature store names, sorted
    pub fn feature_store_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.feature_stores.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up a model
    pub fn model(&self, name: &str) -> Option<&Arc<ScoringModel>> {
        self.models.get(name)
    }

    /// The model store
    pub fn models(&self) -> &ModelStore {
        &self.models
    }

    fn build_stores(
        mut stores: HashMap<String, Arc<FeatureStore>>,
        defs: &[FeatureDefinition],
    ) -> LtrResult<HashMap<String, Arc<FeatureStore>>> {
        let mut touched: HashMap<String, FeatureStore> = HashMap::new();
        for def in defs {
            let name = def.store.as_deref().unwrap_or(DEFAULT_FEATURE_STORE_NAME);
            let store = touched.entry(name.to_string()).or_insert_with(|| {
                stores
                    .get(name)
                    .map(|existing| (**existing).clone())
                    .unwrap_or_else(|| FeatureStore::new(name))
            });
            store.add(def)?;
        }
        for (name, store) in touched {
            stores.insert(name, Arc::new(store));
        }
        Ok(stores)
    }

    fn build_models(
        &self,
        mut models: ModelStore,
        defs: &[ModelDefinition],
        replace: bool,
    ) -> LtrResult<ModelStore> {
        for def in defs {
            let store_name = def.store.as_deref().unwrap_or(DEFAULT_FEATURE_STORE_NAME);
            let store = self
                .feature_store(store_name)
                .ok_or_else(|| LtrError::UnknownFeatureStore(store_name.to_string()))?;
            let model = ScoringModel::from_definition(def, store)?;
            models.add(Arc::new(model), replace)?;
        }
        Ok(models)
    }
}

// ============================================================================
// LtrRegistry
// ============================================================================

/// Copy-on-write registry of feature stores and models
///
/// # Thread Safety
///
/// All methods take `&self`. Reads cost one read-lock acquisition and an
/// `Arc` clone.
#[derive(Debug, Default)]
pub struct LtrRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
    /// Serializes writers so concurrent updates do not lose each other
    write_lock: Mutex<()>,
}

impl LtrRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.current.read())
    }

    fn install(&self, snapshot: RegistrySnapshot) {
        *self.current.write() = Arc::new(snapshot);
    }

    /// Add features; stores are created on demand
    ///
    /// All-or-nothing: on error no feature of the batch is added.
    pub fn add_features(&self, defs: &[FeatureDefinition]) -> LtrResult<()> {
        let _guard = self.write_lock.lock();
        let current = self.snapshot();
        let feature_stores = RegistrySnapshot::build_stores(current.feature_stores.clone(), defs)?;
        self.install(RegistrySnapshot {
            feature_stores,
            models: current.models.clone(),
        });
        info!(target: "ltrank::registry", count = defs.len(), "Added features");
        Ok(())
    }

    /// Add models
    ///
    /// All-or-nothing: on error no model of the batch is added.
    ///
    /// # Errors
    ///
    /// - `UnknownFeatureStore` if a model names a store that does not exist
    /// - `DuplicateModel` if a name is taken and `replace` is false
    /// - `ModelConfig` if a definition is invalid
    pub fn add_models(&self, defs: &[ModelDefinition], replace: bool) -> LtrResult<()> {
        let _guard = self.write_lock.lock();
        let current = self.snapshot();
        let models = current.build_models(current.models.clone(), defs, replace)?;
        self.install(RegistrySnapshot {
            feature_stores: current.feature_stores.clone(),
            models,
        });
        info!(target: "ltrank::registry", count = defs.len(), replace, "Added models");
        Ok(())
    }

    /// Delete a feature store, or every store with `"*"`
    ///
    /// Models keep the features they were built with. The default store is
    /// emptied rather than removed. Returns whether any feature or store was
    /// removed.
    pub fn delete_feature_store(&self, name: &str) -> bool {
        let _guard = self.write_lock.lock();
        let current = self.snapshot();
        let mut feature_stores = current.feature_stores.clone();
        let dropped: Vec<Arc<FeatureStore>> = if name == DELETE_ALL {
            feature_stores.drain().map(|(_, store)| store).collect()
        } else {
            feature_stores.remove(name).into_iter().collect()
        };
        let removed = dropped
            .iter()
            .any(|store| store.name() != DEFAULT_FEATURE_STORE_NAME || !store.is_empty());
        if removed {
            self.install(RegistrySnapshot {
                feature_stores: with_default_store(feature_stores),
                models: current.models.clone(),
            });
            info!(target: "ltrank::registry", store = name, "Deleted feature store");
        }
        removed
    }

    /// Delete a model, or every model with `"*"`
    ///
    /// Returns whether anything was removed.
    pub fn delete_model(&self, name: &str) -> bool {
        let _guard = self.write_lock.lock();
        let current = self.snapshot();
        let mut models = current.models.clone();
        let removed = if name == DELETE_ALL {
            let any = !models.is_empty();
            models.clear();
            any
        } else {
            models.delete(name).is_some()
        };
        if removed {
            self.install(RegistrySnapshot {
                feature_stores: current.feature_stores.clone(),
                models,
            });
            info!(target: "ltrank::registry", model = name, "Deleted model");
        }
        removed
    }

    /// Look up a model
    ///
    /// # Errors
    ///
    /// `UnknownModel` if no model has this name.
    pub fn get_model(&self, name: &str) -> LtrResult<Arc<ScoringModel>> {
        self.snapshot()
            .model(name)
            .cloned()
            .ok_or_else(|| LtrError::UnknownModel(name.to_string()))
    }

    /// Look up a feature store
    pub fn feature_store(&self, name: &str) -> Option<Arc<FeatureStore>> {
        self.snapshot().feature_store(name).cloned()
    }

    /// Every feature definition, stores sorted by name, features in index order
    pub fn export_features(&self) -> Vec<FeatureDefinition> {
        let snapshot = self.snapshot();
        snapshot
            .feature_store_names()
            .into_iter()
            .filter_map(|name| snapshot.feature_store(name))
            .flat_map(|store| store.to_definitions())
            .collect()
    }

    /// Every model definition, sorted by model name
    pub fn export_models(&self) -> Vec<ModelDefinition> {
        self.snapshot()
            .models()
            .models()
            .iter()
            .map(|m| m.to_definition())
            .collect()
    }

    /// Replace the registry content with the definitions of `source`
    ///
    /// Features are loaded before models. On error the registry is unchanged.
    pub fn load_from(&self, source: &dyn DefinitionSource) -> LtrResult<()> {
        let feature_defs = source.feature_definitions()?;
        let model_defs = source.model_definitions()?;

        let _guard = self.write_lock.lock();
        let mut snapshot = RegistrySnapshot {
            feature_stores: RegistrySnapshot::build_stores(
                with_default_store(HashMap::new()),
                &feature_defs,
            )?,
            models: ModelStore::new(),
        };
        snapshot.models = snapshot.build_models(ModelStore::new(), &model_defs, false)?;
        self.install(snapshot);
        info!(
            target: "ltrank::registry",
            features = feature_defs.len(),
            models = model_defs.len(),
            "Loaded definitions"
        );
        Ok(())
    }
}
