//! Linear model
//!
//! score = sum of weight[i] * value[i] over the model features. Weights are
//! given as a map from feature name to float under the `weights` param;
//! numeric strings are accepted.

use crate::model::ScoringAlgorithm;
use crate::model_feature::ModelFeature;
use ltrank_core::{to_f32, Explanation, LtrError, LtrResult, Params};
use serde_json::Value;
use std::fmt;

/// Weighted sum of model feature values
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    /// Model feature names, in scoring order
    names: Vec<String>,
    /// Weight per model feature; None when the definition lacks one
    weights: Vec<Option<f32>>,
}

impl LinearModel {
    /// Read weights for `features` from the `weights` param
    pub fn from_params(model_name: &str, features: &[ModelFeature], params: &Params) -> LtrResult<Self> {
        let declared = match params.get("weights") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(other) => {
                return Err(LtrError::ModelConfig(format!(
                    "Model {} has invalid weights {}",
                    model_name, other
                )))
            }
        };

        let mut weights = Vec::with_capacity(features.len());
        for feature in features {
            let weight = match declared.and_then(|map| map.get(feature.name())) {
                None | Some(Value::Null) => None,
                Some(value) => Some(to_f32(value).ok_or_else(|| {
                    LtrError::ModelConfig(format!(
                        "Model {} has non-numeric weight {} for feature {}",
                        model_name,
                        value,
                        feature.name()
                    ))
                })?),
            };
            weights.push(weight);
        }

        Ok(LinearModel {
            names: features.iter().map(|f| f.name().to_string()).collect(),
            weights,
        })
    }

    /// Weight of model feature `idx`
    pub fn weight(&self, idx: usize) -> Option<f32> {
        self.weights.get(idx).copied().flatten()
    }
}

impl ScoringAlgorithm for LinearModel {
    fn score(&self, normalized: &[f32]) -> f32 {
        normalized
            .iter()
            .zip(&self.weights)
            .map(|(value, weight)| value * weight.unwrap_or(0.0))
            .sum()
    }

    fn explain_details(&self, feature_explanations: &[Explanation]) -> Vec<Explanation> {
        feature_explanations
            .iter()
            .enumerate()
            .map(|(i, feature)| {
                let weight = self.weight(i).unwrap_or(0.0);
                Explanation::with_details(
                    feature.value * weight,
                    "prod of:",
                    vec![
                        Explanation::new(weight, "weight on feature"),
                        feature.clone(),
                    ],
                )
            })
            .collect()
    }

    fn validate(&self, model_name: &str) -> LtrResult<()> {
        let missing: Vec<&str> = self
            .names
            .iter()
            .zip(&self.weights)
            .filter(|(_, w)| w.is_none())
            .map(|(name, _)| name.as_str())
            .collect();
        if !self.names.is_empty() && missing.len() == self.names.len() {
            return Err(LtrError::ModelConfig(format!(
                "Model {} doesn't contain any weights",
                model_name
            )));
        }
        if !missing.is_empty() {
            return Err(LtrError::ModelConfig(format!(
                "Model {} lacks weight(s) for [{}]",
                model_name,
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

impl fmt::Display for LinearModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("featureWeights=[")?;
        for (i, (name, weight)) in self.names.iter().zip(&self.weights).enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match weight {
                Some(w) => write!(f, "{}={:?}", name, w)?,
                None => write!(f, "{}=null", name)?,
            }
        }
        f.write_str("]")
    }
}
