//! ltrank - Learning-to-rank reranking for first-pass search results
//!
//! ltrank rescores the top documents of a first-pass search with a trained
//! model. Features are computed per document, normalized, and combined by a
//! linear model or a regression tree ensemble; the best documents are kept
//! and, on request, their feature vectors are logged.
//!
//! # Quick Start
//!
//! ```ignore
//! use ltrank::{LtrConfig, LtrEngine, RequestParams};
//!
//! let engine = LtrEngine::new(LtrConfig::default())?;
//! engine.registry().add_features(&features)?;
//! engine.registry().add_models(&models, false)?;
//!
//! let directive = engine.parse_directive(&local_params)?;
//! let reranked = engine.rerank(&directive, reader, first_pass, Some("ipad"), &request)?;
//! ```
//!
//! # Crates
//!
//! - `ltrank_core`: documents, index view, explanations, errors
//! - `ltrank_features`: features, normalizers, feature stores
//! - `ltrank_models`: scoring models and the definition registry
//! - `ltrank_concurrency`: worker pool and concurrency limits
//! - `ltrank_rescore`: rescoring, feature logging, engine

pub use ltrank_concurrency;
pub use ltrank_core;
pub use ltrank_features;
pub use ltrank_models;
pub use ltrank_rescore;

pub use ltrank_concurrency::{AbortSignal, ThreadModule, ThreadModuleConfig};
pub use ltrank_core::{
    DocId, Explanation, ExternalParams, InMemoryIndex, IndexReader, LtrError, LtrResult, Params,
    RequestParams, ScoreDoc, SegmentContext, TopDocs,
};
pub use ltrank_features::{FeatureDefinition, FeatureStore, NormalizerDefinition};
pub use ltrank_models::{
    DefinitionSource, JsonFileSource, LtrRegistry, ModelDefinition, ModelFeatureDefinition,
    ScoringModel,
};
pub use ltrank_rescore::{
    FeatureFormat, FeatureLogger, FeatureVector, FeatureVectorCache, LruFeatureVectorCache,
    LtrConfig, LtrEngine, RerankDirective, Rescorer, ScoringQuery,
};
