//! Scoring models
//!
//! A `ScoringModel` binds an algorithm to an ordered list of model features
//! drawn from one feature store. The algorithm sees the normalized values of
//! the model features in that order.
//!
//! Model kinds are selected by class tag:
//! - `LinearModel`, `RankSVMModel`: weighted sum of feature values
//! - `MultipleAdditiveTreesModel`, `LambdaMARTModel`: weighted sum of
//!   regression tree outputs

use crate::linear::LinearModel;
use crate::model_feature::{ModelFeature, ModelFeatureDefinition};
use crate::trees::TreeEnsembleModel;
use ltrank_core::{Explanation, LtrError, LtrResult, Params};
use ltrank_features::{simple_class_name, Feature, FeatureStore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// ModelDefinition
// ============================================================================

/// Persisted form of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// Model name
    pub name: String,
    /// Class tag, e.g. `LinearModel`
    pub class: String,
    /// Feature store the model's features come from (default store when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    /// Model features in scoring order
    #[serde(default)]
    pub features: Vec<ModelFeatureDefinition>,
    /// Algorithm parameters
    #[serde(default)]
    pub params: Params,
}

// ============================================================================
// ScoringAlgorithm
// ============================================================================

/// Evaluation of a model over normalized feature values
///
/// # Thread Safety
///
/// Algorithms are immutable and shared across scoring tasks.
pub trait ScoringAlgorithm: Send + Sync + fmt::Display {
    /// Score one document from its normalized model feature values
    fn score(&self, normalized: &[f32]) -> f32;

    /// Per-component explanations, given one explanation per model feature
    /// whose value is the normalized feature value
    fn explain_details(&self, feature_explanations: &[Explanation]) -> Vec<Explanation>;

    /// Check structural consistency
    fn validate(&self, model_name: &str) -> LtrResult<()>;
}

/// The closed set of model algorithms
#[derive(Debug, Clone, PartialEq)]
pub enum ModelAlgorithm {
    /// Weighted sum of feature values
    Linear(LinearModel),
    /// Additive regression trees
    TreeEnsemble(TreeEnsembleModel),
}

impl ModelAlgorithm {
    fn inner(&self) -> &dyn ScoringAlgorithm {
        match self {
            ModelAlgorithm::Linear(m) => m,
            ModelAlgorithm::TreeEnsemble(m) => m,
        }
    }
}

impl ScoringAlgorithm for ModelAlgorithm {
    fn score(&self, normalized: &[f32]) -> f32 {
        self.inner().score(normalized)
    }

    fn explain_details(&self, feature_explanations: &[Explanation]) -> Vec<Explanation> {
        self.inner().explain_details(feature_explanations)
    }

    fn validate(&self, model_name: &str) -> LtrResult<()> {
        self.inner().validate(model_name)
    }
}

impl fmt::Display for ModelAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.inner(), f)
    }
}

// ============================================================================
// ScoringModel
// ============================================================================

/// A validated model bound to a feature store
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringModel {
    name: String,
    class: String,
    store_name: String,
    features: Vec<ModelFeature>,
    all_features: Vec<Arc<Feature>>,
    params: Params,
    algorithm: ModelAlgorithm,
}

impl ScoringModel {
    /// Assemble and validate a model
    pub fn new(
        name: impl Into<String>,
        class: impl Into<String>,
        store_name: impl Into<String>,
        features: Vec<ModelFeature>,
        all_features: Vec<Arc<Feature>>,
        params: Params,
        algorithm: ModelAlgorithm,
    ) -> LtrResult<Self> {
        let model = ScoringModel {
            name: name.into(),
            class: class.into(),
            store_name: store_name.into(),
            features,
            all_features,
            params,
            algorithm,
        };
        model.validate()?;
        Ok(model)
    }

    /// Build a model from its definition, resolving features in `store`
    ///
    /// # Errors
    ///
    /// `ModelConfig` for unknown classes, features missing from the store,
    /// duplicated features, invalid normalizers and algorithm validation
    /// failures.
    pub fn from_definition(def: &ModelDefinition, store: &FeatureStore) -> LtrResult<Self> {
        if def.name.is_empty() {
            return Err(LtrError::ModelConfig(format!(
                "model of class {} has no name",
                def.class
            )));
        }

        let mut seen = HashSet::with_capacity(def.features.len());
        let mut features = Vec::with_capacity(def.features.len());
        for feature_def in &def.features {
            if !seen.insert(feature_def.name.as_str()) {
                return Err(LtrError::ModelConfig(format!(
                    "duplicated feature {} in model {}",
                    feature_def.name, def.name
                )));
            }
            let feature = store.get(&feature_def.name).ok_or_else(|| {
                LtrError::ModelConfig(format!(
                    "in model {} feature {} not found in store {}",
                    def.name,
                    feature_def.name,
                    store.name()
                ))
            })?;
            features.push(ModelFeature::from_definition(
                Arc::clone(feature),
                feature_def,
            )?);
        }

        let class = simple_class_name(&def.class);
        let algorithm = match class {
            "LinearModel" | "RankSVMModel" => {
                ModelAlgorithm::Linear(LinearModel::from_params(&def.name, &features, &def.params)?)
            }
            "MultipleAdditiveTreesModel" | "LambdaMARTModel" => ModelAlgorithm::TreeEnsemble(
                TreeEnsembleModel::from_params(&def.name, &features, &def.params)?,
            ),
            other => {
                return Err(LtrError::ModelConfig(format!(
                    "Model type does not exist {}",
                    other
                )))
            }
        };

        Self::new(
            def.name.clone(),
            class,
            store.name(),
            features,
            store.features().to_vec(),
            def.params.clone(),
            algorithm,
        )
    }

    fn validate(&self) -> LtrResult<()> {
        if self.store_name.is_empty() {
            return Err(LtrError::ModelConfig(format!(
                "no feature store declared for model {}",
                self.name
            )));
        }
        if self.features.is_empty() {
            return Err(LtrError::ModelConfig(format!(
                "no features declared for model {}",
                self.name
            )));
        }
        let mut seen = HashSet::with_capacity(self.features.len());
        for feature in &self.features {
            if !seen.insert(feature.name()) {
                return Err(LtrError::ModelConfig(format!(
                    "duplicated feature {} in model {}",
                    feature.name(),
                    self.name
                )));
            }
        }
        self.algorithm.validate(&self.name)
    }

    /// Model name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class tag the model was declared with
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Name of the feature store the model reads from
    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    /// Model features in scoring order
    pub fn features(&self) -> &[ModelFeature] {
        &self.features
    }

    /// Every feature of the store, as of model construction
    pub fn all_features(&self) -> &[Arc<Feature>] {
        &self.all_features
    }

    /// Definition parameters
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The scoring algorithm
    pub fn algorithm(&self) -> &ModelAlgorithm {
        &self.algorithm
    }

    /// Normalize raw model feature values in place
    pub fn normalize_in_place(&self, values: &mut [f32]) {
        for (value, feature) in values.iter_mut().zip(&self.features) {
            *value = feature.normalizer().normalize(*value);
        }
    }

    /// Score normalized model feature values
    pub fn score(&self, normalized: &[f32]) -> f32 {
        self.algorithm.score(normalized)
    }

    /// Wrap the raw explanation of model feature `idx` in its normalization
    pub fn normalizer_explanation(&self, explanation: Explanation, idx: usize) -> Explanation {
        match self.features.get(idx) {
            Some(feature) => feature.normalizer().explain(explanation),
            None => explanation,
        }
    }

    /// Explain `final_score` from per-feature (normalized) explanations
    pub fn explain(&self, final_score: f32, feature_explanations: &[Explanation]) -> Explanation {
        Explanation::with_details(
            final_score,
            format!("{} model applied to features, sum of:", self),
            self.algorithm.explain_details(feature_explanations),
        )
    }

    /// Persisted form of this model
    pub fn to_definition(&self) -> ModelDefinition {
        ModelDefinition {
            name: self.name.clone(),
            class: self.class.clone(),
            store: Some(self.store_name.clone()),
            features: self.features.iter().map(ModelFeature::to_definition).collect(),
            params: self.params.clone(),
        }
    }
}

impl fmt::Display for ScoringModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(name={},{})", self.class, self.name, self.algorithm)
    }
}
