//! Scoring query: a model bound to one request
//!
//! `ScoringQuery::new(model)` starts unbound; the `with_*` builders attach
//! external feature info, the first-pass query text, the raw request
//! parameters and an optional feature logger. `create_weight` then binds
//! the query to an index.
//!
//! Which features get weights depends on the logger:
//!
//! - no logger: the model features only
//! - logger on the model's store: every store feature, in one pass, with
//!   the model features located by store index
//! - logger on another store: the model features, followed by every
//!   feature of the logging store; only the latter are logged

use crate::logger::FeatureLogger;
use crate::weight::ModelWeight;
use ltrank_core::{ExternalParams, IndexReader, LtrError, LtrResult, RequestParams};
use ltrank_features::{FeatureContext, FeatureStore};
use ltrank_models::ScoringModel;
use rustc_hash::FxHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::warn;

/// A scoring model bound to the inputs of one request
#[derive(Debug, Clone)]
pub struct ScoringQuery {
    model: Arc<ScoringModel>,
    efi: ExternalParams,
    original_query: Option<String>,
    request: RequestParams,
    logger: Option<FeatureLogger>,
    logging_store: Option<Arc<FeatureStore>>,
}

impl ScoringQuery {
    /// Unbound query for `model`
    pub fn new(model: Arc<ScoringModel>) -> Self {
        ScoringQuery {
            model,
            efi: ExternalParams::new(),
            original_query: None,
            request: RequestParams::new(),
            logger: None,
            logging_store: None,
        }
    }

    /// Builder: external feature info
    pub fn with_external_params(mut self, efi: ExternalParams) -> Self {
        self.efi = efi;
        self
    }

    /// Builder: text of the first-pass query
    pub fn with_original_query(mut self, query: impl Into<String>) -> Self {
        self.original_query = Some(query.into());
        self
    }

    /// Builder: raw request parameters
    pub fn with_request(mut self, request: RequestParams) -> Self {
        self.request = request;
        self
    }

    /// Builder: log feature vectors of the documents kept by a rescore
    ///
    /// A logger targeting a store other than the model's also needs that
    /// store, see `with_logging_store`.
    pub fn with_feature_logger(mut self, logger: FeatureLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Builder: the store named by a logger that targets another store
    pub fn with_logging_store(mut self, store: Arc<FeatureStore>) -> Self {
        self.logging_store = Some(store);
        self
    }

    /// The model
    pub fn model(&self) -> &Arc<ScoringModel> {
        &self.model
    }

    /// External feature info
    pub fn external_params(&self) -> &ExternalParams {
        &self.efi
    }

    /// Text of the first-pass query, if set
    pub fn original_query(&self) -> Option<&str> {
        self.original_query.as_deref()
    }

    /// Raw request parameters
    pub fn request(&self) -> &RequestParams {
        &self.request
    }

    /// The feature logger, if feature vectors are requested
    pub fn feature_logger(&self) -> Option<&FeatureLogger> {
        self.logger.as_ref()
    }

    /// Whether feature vectors are requested
    pub fn features_requested(&self) -> bool {
        self.logger.is_some()
    }

    /// Name of the store vectors are logged against, when it is not the
    /// model's own
    pub fn other_logging_store(&self) -> Option<&str> {
        self.logger
            .as_ref()
            .and_then(FeatureLogger::store)
            .filter(|store| *store != self.model.store_name())
    }

    /// Stable identifier of this query, used to key cached feature vectors
    ///
    /// Equal for queries with the same model, query text, external feature
    /// info and logging store.
    pub fn query_id(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.model.name().hash(&mut hasher);
        self.model.to_string().hash(&mut hasher);
        self.original_query.hash(&mut hasher);
        let mut efi: Vec<(&String, &String)> = self.efi.iter().collect();
        efi.sort();
        efi.hash(&mut hasher);
        self.other_logging_store().hash(&mut hasher);
        hasher.finish()
    }

    /// Bind the query to `reader`
    ///
    /// # Errors
    ///
    /// Propagates feature binding errors (`RequiredParameterMissing`,
    /// `FeatureConfig`).
    pub fn create_weight(&self, reader: Arc<dyn IndexReader>) -> LtrResult<ModelWeight> {
        let ctx = FeatureContext {
            reader: Arc::clone(&reader),
            needs_scores: true,
            request: &self.request,
            original_query: self.original_query.as_deref(),
            efi: &self.efi,
        };
        let model_features = self.model.features();

        if !self.features_requested() {
            let extracted = model_features
                .iter()
                .map(|mf| mf.feature().create_weight(&ctx))
                .collect::<LtrResult<Vec<_>>>()?;
            let slots = (0..extracted.len()).collect();
            return Ok(ModelWeight::new(Arc::clone(&self.model), reader, extracted, slots, 0..0));
        }

        if let Some(store_name) = self.other_logging_store() {
            let mut extracted = model_features
                .iter()
                .map(|mf| mf.feature().create_weight(&ctx))
                .collect::<LtrResult<Vec<_>>>()?;
            let slots = (0..extracted.len()).collect();
            let logged_from = extracted.len();
            match self.logging_store.as_ref().filter(|s| s.name() == store_name) {
                Some(store) => {
                    for feature in store.features() {
                        extracted.push(feature.create_weight(&ctx)?);
                    }
                }
                None => warn!(
                    target: "ltrank::rescore",
                    model = self.model.name(),
                    logging_store = store_name,
                    "Logging store not attached, logging empty vectors"
                ),
            }
            let logged = logged_from..extracted.len();
            return Ok(ModelWeight::new(Arc::clone(&self.model), reader, extracted, slots, logged));
        }

        // One pass over the store; model features are located by store index
        let position: HashMap<usize, usize> = model_features
            .iter()
            .enumerate()
            .map(|(pos, mf)| (mf.store_index(), pos))
            .collect();
        let all_features = self.model.all_features();
        let mut slots: Vec<Option<usize>> = vec![None; model_features.len()];
        let mut extracted = Vec::with_capacity(all_features.len());
        for feature in all_features {
            if let Some(&pos) = position.get(&feature.index()) {
                slots[pos] = Some(extracted.len());
            }
            extracted.push(feature.create_weight(&ctx)?);
        }
        let slots = slots.into_iter().collect::<Option<Vec<_>>>().ok_or_else(|| {
            LtrError::ModelConfig(format!(
                "model {} uses features missing from store {}",
                self.model.name(),
                self.model.store_name()
            ))
        })?;

        let logged = 0..extracted.len();
        Ok(ModelWeight::new(Arc::clone(&self.model), reader, extracted, slots, logged))
    }
}
