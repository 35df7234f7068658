//! Model features
//!
//! A model refers to store features by name. Each reference may carry a
//! normalizer; features without one use the identity.

use ltrank_core::LtrResult;
use ltrank_features::{Feature, Normalizer, NormalizerDefinition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Persisted form of a model feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFeatureDefinition {
    /// Name of the feature in the model's store
    pub name: String,
    /// Normalizer applied before scoring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub norm: Option<NormalizerDefinition>,
}

impl ModelFeatureDefinition {
    /// Reference a feature without normalization
    pub fn new(name: impl Into<String>) -> Self {
        ModelFeatureDefinition {
            name: name.into(),
            norm: None,
        }
    }

    /// Builder: set the normalizer
    pub fn with_norm(mut self, norm: NormalizerDefinition) -> Self {
        self.norm = Some(norm);
        self
    }
}

/// A store feature paired with its normalizer
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFeature {
    feature: Arc<Feature>,
    normalizer: Normalizer,
}

impl ModelFeature {
    /// Pair a feature with a normalizer
    pub fn new(feature: Arc<Feature>, normalizer: Normalizer) -> Self {
        ModelFeature {
            feature,
            normalizer,
        }
    }

    /// Resolve the normalizer of `def` for an already located feature
    pub fn from_definition(feature: Arc<Feature>, def: &ModelFeatureDefinition) -> LtrResult<Self> {
        let normalizer = match &def.norm {
            Some(norm) => Normalizer::from_definition(norm)?,
            None => Normalizer::Identity,
        };
        Ok(Self::new(feature, normalizer))
    }

    /// The referenced feature
    pub fn feature(&self) -> &Arc<Feature> {
        &self.feature
    }

    /// Feature name
    pub fn name(&self) -> &str {
        self.feature.name()
    }

    /// Index of the feature in its store
    pub fn store_index(&self) -> usize {
        self.feature.index()
    }

    /// Normalizer applied to the raw value
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Persisted form; identity normalizers are omitted
    pub fn to_definition(&self) -> ModelFeatureDefinition {
        ModelFeatureDefinition {
            name: self.name().to_string(),
            norm: (!self.normalizer.is_identity()).then(|| self.normalizer.to_definition()),
        }
    }
}
