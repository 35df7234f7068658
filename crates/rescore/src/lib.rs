//! Reranking for ltrank
//!
//! This crate turns a registered model into a second-pass reranker:
//! - ScoringQuery / ModelWeight / ModelScorer: a model bound to a request,
//!   an index, and one segment
//! - Rescorer: reorders the top first-pass candidates, sequentially or on
//!   the thread module
//! - FeatureLogger / FeatureVectorCache: feature vectors of the kept documents
//! - RerankDirective: parsing of the rerank request parameters
//! - LtrEngine / LtrConfig: the long-lived engine and its `ltrank.toml`
//!
//! # Scoring flow
//!
//! ```text
//! RerankDirective -> ScoringQuery -> ModelWeight -> ModelScorer (per segment)
//!                                         |
//!                           Rescorer: partition, score, top-k, log
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod engine;
pub mod logger;
pub mod query;
pub mod request;
pub mod rescorer;
pub mod scorer;
pub mod weight;

#[cfg(test)]
mod test_support;

pub use cache::{FeatureVectorCache, LruFeatureVectorCache};
pub use config::{LtrConfig, CONFIG_FILE_NAME, DEFAULT_FEATURE_VECTOR_CACHE_SIZE};
pub use engine::LtrEngine;
pub use logger::{
    FeatureFormat, FeatureLogger, FeatureVector, DEFAULT_FEATURE_SEPARATOR,
    DEFAULT_KEY_VALUE_SEPARATOR,
};
pub use query::ScoringQuery;
pub use request::{
    RerankDirective, DEFAULT_RERANK_DOCS, FEATURE_VECTOR_PARAM, FV_FORMAT_PARAM, FV_STORE_PARAM,
    FV_WRITER_PARAM, MODEL_PARAM, RERANK_DOCS_PARAM,
};
pub use rescorer::Rescorer;
pub use scorer::{FeatureInfo, ModelScorer};
pub use weight::ModelWeight;
