//! Error types for ltrank
//!
//! This module defines all error types used throughout the reranker.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use thiserror::Error;

/// Result type alias for ltrank operations
pub type LtrResult<T> = std::result::Result<T, LtrError>;

/// Error types for the reranker
#[derive(Debug, Error)]
pub enum LtrError {
    /// Malformed or inconsistent feature definition
    #[error("Feature configuration error: {0}")]
    FeatureConfig(String),

    /// Malformed or inconsistent model definition
    #[error("Model configuration error: {0}")]
    ModelConfig(String),

    /// A feature with this name is already present in the store
    #[error("Duplicate feature '{name}' in feature store '{store}'")]
    DuplicateFeature {
        /// Feature store name
        store: String,
        /// Feature name
        name: String,
    },

    /// A model with this name is already registered
    #[error("Duplicate model '{0}'")]
    DuplicateModel(String),

    /// A feature required an external parameter that the request did not supply
    #[error("Feature '{feature}' requires external parameter '{param}' that was not passed in request")]
    RequiredParameterMissing {
        /// Feature name
        feature: String,
        /// Missing parameter (macro) name
        param: String,
    },

    /// The requested model is not registered
    #[error("cannot find model {0}")]
    UnknownModel(String),

    /// The requested feature store does not exist
    #[error("missing feature store [{0}]")]
    UnknownFeatureStore(String),

    /// Malformed rerank request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid thread module settings
    #[error("Thread module configuration error: {0}")]
    ThreadModuleConfig(String),

    /// A segment scoring task failed; the whole rescore is aborted
    #[error("Scoring task failed: {0}")]
    ScoringTask(String),

    /// The rescore was aborted while waiting for a permit or a task result
    #[error("Rescore interrupted")]
    Interrupted,

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl LtrError {
    /// Whether the error is caused by the request or by submitted definitions
    /// and should be surfaced to the caller as a bad request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LtrError::FeatureConfig(_)
                | LtrError::ModelConfig(_)
                | LtrError::DuplicateFeature { .. }
                | LtrError::DuplicateModel(_)
                | LtrError::RequiredParameterMissing { .. }
                | LtrError::UnknownModel(_)
                | LtrError::UnknownFeatureStore(_)
                | LtrError::InvalidRequest(_)
        )
    }
}

impl From<serde_json::Error> for LtrError {
    fn from(e: serde_json::Error) -> Self {
        LtrError::Serialization(e.to_string())
    }
}
