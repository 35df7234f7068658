//! Feature value normalizers
//!
//! A normalizer is a pure, stateless transform applied to a raw feature value
//! before the model sees it:
//! - Identity: the value unchanged (default when a model feature has no norm)
//! - MinMax: `(v - min) / (max - min)`
//! - Standard: `(v - avg) / std`

use crate::simple_class_name;
use ltrank_core::{param_f32, Explanation, LtrError, LtrResult, Params};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Persisted form of a normalizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizerDefinition {
    /// Class tag, e.g. `MinMaxNormalizer`
    pub class: String,
    /// Class-specific parameters
    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,
}

/// Transform applied to a raw feature value
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Normalizer {
    /// Value unchanged
    #[default]
    Identity,
    /// Scale into the `[min, max]` range
    MinMax {
        /// Lower bound of the raw values
        min: f32,
        /// Upper bound of the raw values
        max: f32,
    },
    /// Standard score
    Standard {
        /// Mean of the raw values
        avg: f32,
        /// Standard deviation of the raw values
        std: f32,
    },
}

impl Normalizer {
    /// Build and validate a normalizer from its definition
    pub fn from_definition(def: &NormalizerDefinition) -> LtrResult<Self> {
        let float = |key: &str| {
            param_f32(&def.params, key)
                .map_err(|e| LtrError::ModelConfig(format!("{}: {}", def.class, e)))
        };

        let normalizer = match simple_class_name(&def.class) {
            "IdentityNormalizer" | "Identity" => Normalizer::Identity,
            "MinMaxNormalizer" => {
                let (min, max) = match (float("min")?, float("max")?) {
                    (Some(min), Some(max)) => (min, max),
                    _ => {
                        return Err(LtrError::ModelConfig(format!(
                            "MinMaxNormalizer requires both 'min' and 'max', got {:?}",
                            def.params
                        )))
                    }
                };
                Normalizer::MinMax { min, max }
            }
            "StandardNormalizer" => Normalizer::Standard {
                avg: float("avg")?.unwrap_or(0.0),
                std: float("std")?.unwrap_or(1.0),
            },
            other => {
                return Err(LtrError::ModelConfig(format!(
                    "unknown normalizer class {}",
                    other
                )))
            }
        };
        normalizer.validate()?;
        Ok(normalizer)
    }

    fn validate(&self) -> LtrResult<()> {
        match *self {
            Normalizer::MinMax { min, max } if max - min == 0.0 => {
                Err(LtrError::ModelConfig(format!(
                    "MinMax Normalizer delta must not be zero | min = {:?},max = {:?}",
                    min, max
                )))
            }
            Normalizer::Standard { avg, std } if std <= 0.0 => {
                Err(LtrError::ModelConfig(format!(
                    "Standard Normalizer standard deviation must be positive | avg = {:?},std = {:?}",
                    avg, std
                )))
            }
            _ => Ok(()),
        }
    }

    /// Apply the transform
    pub fn normalize(&self, value: f32) -> f32 {
        match *self {
            Normalizer::Identity => value,
            Normalizer::MinMax { min, max } => (value - min) / (max - min),
            Normalizer::Standard { avg, std } => (value - avg) / std,
        }
    }

    /// Whether this is the identity transform
    pub fn is_identity(&self) -> bool {
        matches!(self, Normalizer::Identity)
    }

    /// Wrap the explanation of a raw value in the explanation of its
    /// normalization. Identity returns the explanation unchanged.
    pub fn explain(&self, explanation: Explanation) -> Explanation {
        if self.is_identity() {
            return explanation;
        }
        let normalized = self.normalize(explanation.value);
        Explanation::with_details(
            normalized,
            format!("normalized using {}", self),
            vec![explanation],
        )
    }

    /// Persisted form of this normalizer
    pub fn to_definition(&self) -> NormalizerDefinition {
        let mut params = Params::new();
        let class = match *self {
            Normalizer::Identity => "IdentityNormalizer",
            Normalizer::MinMax { min, max } => {
                params.insert("min".into(), float_value(min));
                params.insert("max".into(), float_value(max));
                "MinMaxNormalizer"
            }
            Normalizer::Standard { avg, std } => {
                params.insert("avg".into(), float_value(avg));
                params.insert("std".into(), float_value(std));
                "StandardNormalizer"
            }
        };
        NormalizerDefinition {
            class: class.to_string(),
            params,
        }
    }
}

fn float_value(v: f32) -> Value {
    serde_json::Number::from_f64(v as f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

impl fmt::Display for Normalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Normalizer::Identity => write!(f, "IdentityNormalizer()"),
            Normalizer::MinMax { min, max } => {
                write!(f, "MinMaxNormalizer(min={:?},max={:?})", min, max)
            }
            Normalizer::Standard { avg, std } => {
                write!(f, "StandardNormalizer(avg={:?},std={:?})", avg, std)
            }
        }
    }
}
