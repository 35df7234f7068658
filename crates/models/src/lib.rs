//! Scoring models for ltrank
//!
//! This crate provides:
//! - ModelFeature: a store feature paired with its normalizer
//! - ScoringModel: named model over an ordered list of model features
//! - LinearModel / TreeEnsembleModel: the scoring algorithms
//! - ModelStore: name-keyed collection of models
//! - LtrRegistry: copy-on-write snapshot of feature stores and models
//! - DefinitionSource / JsonFileSource: where definitions are loaded from
//!
//! Models are validated on construction and immutable afterwards. Updating a
//! model means replacing it in the registry.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod linear;
pub mod model;
pub mod model_feature;
pub mod model_store;
pub mod registry;
pub mod source;
pub mod trees;

pub use linear::LinearModel;
pub use model::{ModelAlgorithm, ModelDefinition, ScoringAlgorithm, ScoringModel};
pub use model_feature::{ModelFeature, ModelFeatureDefinition};
pub use model_store::ModelStore;
pub use registry::{LtrRegistry, RegistrySnapshot, DELETE_ALL};
pub use source::{DefinitionSource, JsonFileSource, FEATURES_FILE, MODELS_FILE};
pub use trees::{RegressionTree, TreeEnsembleModel, TreeNode, NODE_SPLIT_SLACK};
