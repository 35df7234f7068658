//! Features for ltrank
//!
//! This crate provides:
//! - Feature: a named, store-indexed signal computed per document
//! - FeatureWeight / FeatureScorer: per-request and per-segment evaluation
//! - Normalizer: transforms applied to raw feature values before scoring
//! - FeatureStore: insertion-ordered collection of features
//!
//! Feature kinds are a closed set selected by class tag. Java-style package
//! prefixes in class tags (`org.apache.solr.ltr.feature.ValueFeature`) are
//! accepted and stripped.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod feature;
pub mod normalizer;
pub mod store;

pub use feature::{
    Feature, FeatureContext, FeatureDefinition, FeatureKind, FeatureScorer, FeatureWeight,
    ValueSource, DEFAULT_VALUE_PARAM,
};
pub use normalizer::{Normalizer, NormalizerDefinition};
pub use store::{FeatureStore, DEFAULT_FEATURE_STORE_NAME};

/// Strip a dotted package prefix from a class tag
pub fn simple_class_name(class: &str) -> &str {
    class.rsplit('.').next().unwrap_or(class)
}
