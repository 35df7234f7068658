//! Rerank directive parsing
//!
//! A rerank request arrives as local parameters:
//!
//! | parameter    | meaning                                              |
//! |--------------|------------------------------------------------------|
//! | `model`      | model name (required)                                |
//! | `reRankDocs` | number of first-pass documents to rerank             |
//! | `efi.NAME`   | external feature info `NAME`                         |
//! | `fv`         | `true` to log feature vectors of kept documents      |
//! | `fvStore`    | store the vectors are logged against                 |
//! | `fvFormat`   | `dense` or `sparse`                                  |
//! | `fvWriter`   | `csv` or `json`                                      |

use crate::logger::FeatureLogger;
use ltrank_core::{extract_efi_params, ExternalParams, LtrError, LtrResult, RequestParams};

/// Model name parameter
pub const MODEL_PARAM: &str = "model";
/// Rerank window parameter
pub const RERANK_DOCS_PARAM: &str = "reRankDocs";
/// Feature vector request parameter
pub const FEATURE_VECTOR_PARAM: &str = "fv";
/// Feature vector store parameter
pub const FV_STORE_PARAM: &str = "fvStore";
/// Feature vector format parameter
pub const FV_FORMAT_PARAM: &str = "fvFormat";
/// Feature vector encoding parameter
pub const FV_WRITER_PARAM: &str = "fvWriter";

/// Rerank window used when the request does not set one
pub const DEFAULT_RERANK_DOCS: usize = 200;

/// A parsed rerank request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RerankDirective {
    /// Model to rerank with
    pub model: String,
    /// Number of first-pass documents to rerank
    pub rerank_docs: usize,
    /// External feature info
    pub efi: ExternalParams,
    /// Whether feature vectors of kept documents are logged
    pub feature_vectors: bool,
    /// Store the vectors are logged against (model store when absent)
    pub fv_store: Option<String>,
    /// `dense` or `sparse`
    pub fv_format: Option<String>,
    /// `csv` or `json`
    pub fv_writer: Option<String>,
}

impl RerankDirective {
    /// Directive for `model` with default settings
    pub fn new(model: impl Into<String>) -> Self {
        RerankDirective {
            model: model.into(),
            rerank_docs: DEFAULT_RERANK_DOCS,
            efi: ExternalParams::new(),
            feature_vectors: false,
            fv_store: None,
            fv_format: None,
            fv_writer: None,
        }
    }

    /// Parse local parameters
    ///
    /// `default_rerank_docs` applies when `reRankDocs` is absent.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if the model is missing, `reRankDocs` is not a
    /// positive integer or `fv` is not a boolean.
    pub fn from_local_params(
        params: &RequestParams,
        default_rerank_docs: usize,
    ) -> LtrResult<Self> {
        let model = params
            .get(MODEL_PARAM)
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .ok_or_else(|| LtrError::InvalidRequest("Must provide model in the request".to_string()))?;

        let rerank_docs = match params.get(RERANK_DOCS_PARAM) {
            None => default_rerank_docs,
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(n) if n > 0 => n as usize,
                _ => {
                    return Err(LtrError::InvalidRequest(format!(
                        "{} must be a positive integer, got '{}'",
                        RERANK_DOCS_PARAM, raw
                    )))
                }
            },
        };

        let feature_vectors = match params.get(FEATURE_VECTOR_PARAM).map(|v| v.trim()) {
            None => false,
            Some(v) if v.eq_ignore_ascii_case("true") => true,
            Some(v) if v.eq_ignore_ascii_case("false") => false,
            Some(v) => {
                return Err(LtrError::InvalidRequest(format!(
                    "{} must be true or false, got '{}'",
                    FEATURE_VECTOR_PARAM, v
                )))
            }
        };

        let optional = |key: &str| {
            params
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(RerankDirective {
            model: model.to_string(),
            rerank_docs,
            efi: extract_efi_params(params),
            feature_vectors,
            fv_store: optional(FV_STORE_PARAM),
            fv_format: optional(FV_FORMAT_PARAM),
            fv_writer: optional(FV_WRITER_PARAM),
        })
    }

    /// Logger for the requested feature vectors, if any
    pub fn feature_logger(&self) -> Option<FeatureLogger> {
        if !self.feature_vectors {
            return None;
        }
        let logger = FeatureLogger::from_formats(self.fv_writer.as_deref(), self.fv_format.as_deref())?;
        Some(match &self.fv_store {
            Some(store) => logger.with_store(store.clone()),
            None => logger,
        })
    }
}
