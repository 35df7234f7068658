//! Reranking engine
//!
//! `LtrEngine` owns the long-lived pieces of the reranker: the definition
//! registry, the thread module and the feature vector cache. Each request
//! turns into a `Rescorer` through `prepare`.

use crate::cache::{FeatureVectorCache, LruFeatureVectorCache};
use crate::config::{LtrConfig, CONFIG_FILE_NAME};
use crate::logger::FeatureVector;
use crate::query::ScoringQuery;
use crate::request::RerankDirective;
use crate::rescorer::Rescorer;
use ltrank_concurrency::ThreadModule;
use ltrank_core::{
    DocId, Explanation, IndexReader, LtrError, LtrResult, RequestParams, TopDocs,
};
use ltrank_models::{JsonFileSource, LtrRegistry};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Registry, worker pool and feature vector cache shared by all requests
pub struct LtrEngine {
    config: LtrConfig,
    registry: Arc<LtrRegistry>,
    thread_module: Arc<ThreadModule>,
    cache: Arc<LruFeatureVectorCache>,
}

impl LtrEngine {
    /// Start an engine with an empty registry
    ///
    /// When `definitions_dir` is set, its `features.json` and `models.json`
    /// are loaded.
    ///
    /// # Errors
    ///
    /// Invalid config, or definitions that fail to load.
    pub fn new(config: LtrConfig) -> LtrResult<Self> {
        Self::with_registry(config, Arc::new(LtrRegistry::new()))
    }

    /// Start an engine over an existing registry
    pub fn with_registry(config: LtrConfig, registry: Arc<LtrRegistry>) -> LtrResult<Self> {
        config.validate()?;
        if let Some(dir) = &config.definitions_dir {
            registry.load_from(&JsonFileSource::in_dir(dir))?;
        }
        let thread_module = Arc::new(ThreadModule::new(config.thread_module.clone())?);
        let cache = Arc::new(LruFeatureVectorCache::new(config.feature_vector_cache_size));

        info!(
            target: "ltrank::engine",
            models = registry.snapshot().models().len(),
            parallel = thread_module.is_parallel(),
            cache_size = config.feature_vector_cache_size,
            "Engine started"
        );

        Ok(LtrEngine {
            config,
            registry,
            thread_module,
            cache,
        })
    }

    /// Start an engine rooted at `dir`
    ///
    /// Writes a default `ltrank.toml` into `dir` if none exists, reads it,
    /// and loads definitions from `dir` unless the config names another
    /// directory.
    pub fn open(dir: &Path) -> LtrResult<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        LtrConfig::write_default_if_missing(&config_path)?;
        let mut config = LtrConfig::from_file(&config_path)?;
        if config.definitions_dir.is_none() {
            config.definitions_dir = Some(dir.to_path_buf());
        }
        Self::new(config)
    }

    /// The config the engine was started with
    pub fn config(&self) -> &LtrConfig {
        &self.config
    }

    /// The definition registry
    pub fn registry(&self) -> &Arc<LtrRegistry> {
        &self.registry
    }

    /// The thread module
    pub fn thread_module(&self) -> &Arc<ThreadModule> {
        &self.thread_module
    }

    /// The feature vector cache
    pub fn cache(&self) -> &Arc<LruFeatureVectorCache> {
        &self.cache
    }

    /// Parse rerank local parameters using the configured default window
    pub fn parse_directive(&self, params: &RequestParams) -> LtrResult<RerankDirective> {
        RerankDirective::from_local_params(params, self.config.default_rerank_docs)
    }

    /// Build the rescorer for one request
    ///
    /// # Errors
    ///
    /// - `UnknownModel` if the directive names no registered model
    /// - `UnknownFeatureStore` if vectors are logged against a store that
    ///   does not exist
    pub fn prepare(
        &self,
        directive: &RerankDirective,
        original_query: Option<&str>,
        request: &RequestParams,
    ) -> LtrResult<Rescorer> {
        let snapshot = self.registry.snapshot();
        let model = snapshot
            .model(&directive.model)
            .cloned()
            .ok_or_else(|| LtrError::UnknownModel(directive.model.clone()))?;
        let mut query = ScoringQuery::new(model)
            .with_external_params(directive.efi.clone())
            .with_request(request.clone());
        if let Some(text) = original_query {
            query = query.with_original_query(text);
        }
        if let Some(logger) = directive.feature_logger() {
            query = query.with_feature_logger(logger);
        }
        let logging_store = match query.other_logging_store() {
            Some(name) => Some(
                snapshot
                    .feature_store(name)
                    .cloned()
                    .ok_or_else(|| LtrError::UnknownFeatureStore(name.to_string()))?,
            ),
            None => None,
        };
        if let Some(store) = logging_store {
            query = query.with_logging_store(store);
        }
        let cache: Arc<dyn FeatureVectorCache> = self.cache.clone();
        Ok(Rescorer::new(query)
            .with_thread_module(Arc::clone(&self.thread_module))
            .with_cache(cache))
    }

    /// Rerank the top `directive.rerank_docs` of `first_pass`
    pub fn rerank(
        &self,
        directive: &RerankDirective,
        reader: Arc<dyn IndexReader>,
        first_pass: TopDocs,
        original_query: Option<&str>,
        request: &RequestParams,
    ) -> LtrResult<TopDocs> {
        self.prepare(directive, original_query, request)?
            .rescore(reader, first_pass, directive.rerank_docs)
    }

    /// Explain the model score of global document `doc`
    pub fn explain(
        &self,
        directive: &RerankDirective,
        reader: Arc<dyn IndexReader>,
        doc: DocId,
        original_score: Option<f32>,
        original_query: Option<&str>,
        request: &RequestParams,
    ) -> LtrResult<Explanation> {
        self.prepare(directive, original_query, request)?
            .explain(reader, doc, original_score)
    }

    /// Feature vector logged for `doc` by the query with `query_id`
    pub fn feature_vector(&self, query_id: u64, doc: DocId) -> Option<FeatureVector> {
        self.cache.get(query_id, doc)
    }

    /// Write the registry's definitions to `definitions_dir`
    ///
    /// Does nothing when no directory is configured.
    pub fn persist(&self) -> LtrResult<()> {
        match &self.config.definitions_dir {
            Some(dir) => JsonFileSource::in_dir(dir).persist(&self.registry),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for LtrEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LtrEngine")
            .field("config", &self.config)
            .field("thread_module", &self.thread_module)
            .field("cache", &self.cache)
            .finish()
    }
}
