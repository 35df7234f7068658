//! Core types and traits for ltrank
//!
//! This crate defines the foundational types used throughout the reranker:
//! - DocId / ScoreDoc / TopDocs: first-pass candidates and rerank output
//! - SegmentContext / IndexReader: the view of the index the reranker consumes
//! - Explanation: score explanation trees
//! - Params / ExternalParams / DocInfo: definition parameters, request-level
//!   external feature info, and per-document extra info
//! - LtrError: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod explain;
pub mod index;
pub mod params;
pub mod types;

pub use error::{LtrError, LtrResult};
pub use explain::Explanation;
pub use index::{InMemoryIndex, IndexReader, SegmentContext};
pub use params::{
    extract_efi_params, param_bool, param_f32, param_str, to_f32, DocInfo, ExternalParams,
    Params, RequestParams, EFI_PREFIX, ORIGINAL_DOC_SCORE,
};
pub use types::{DocId, ScoreDoc, TopDocs, NO_MORE_DOCS};
