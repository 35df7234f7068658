//! Model fixtures shared by the unit tests of this crate

use ltrank_core::Params;
use ltrank_features::{FeatureDefinition, FeatureStore, NormalizerDefinition};
use ltrank_models::{ModelDefinition, ModelFeatureDefinition, ScoringModel};
use serde_json::{json, Value};
use std::sync::Arc;

pub(crate) const STORE: &str = "test";

pub(crate) fn params(value: Value) -> Params {
    value.as_object().cloned().unwrap_or_default()
}

/// Store of constant value features
pub(crate) fn value_store(features: &[(&str, f32)]) -> FeatureStore {
    let mut store = FeatureStore::new(STORE);
    for (name, value) in features {
        store
            .add(&FeatureDefinition::new(
                *name,
                "ValueFeature",
                params(json!({ "value": value })),
            ))
            .unwrap();
    }
    store
}

/// Linear model over `weights` (model feature order), resolved in `store`
pub(crate) fn linear_over(store: &FeatureStore, weights: &[(&str, f32)]) -> Arc<ScoringModel> {
    let mut weight_map = serde_json::Map::new();
    for (name, w) in weights {
        weight_map.insert(name.to_string(), json!(w));
    }
    let def = ModelDefinition {
        name: "linear".to_string(),
        class: "LinearModel".to_string(),
        store: Some(store.name().to_string()),
        features: weights
            .iter()
            .map(|(name, _)| ModelFeatureDefinition::new(*name))
            .collect(),
        params: params(json!({ "weights": weight_map })),
    };
    Arc::new(ScoringModel::from_definition(&def, store).unwrap())
}

/// Linear model using every feature of a value store
pub(crate) fn linear_model(features: &[(&str, f32)], weights: &[f32]) -> Arc<ScoringModel> {
    let store = value_store(features);
    let named: Vec<(&str, f32)> = features
        .iter()
        .zip(weights)
        .map(|((name, _), w)| (*name, *w))
        .collect();
    linear_over(&store, &named)
}

/// Linear model with unit weights over field value features named after
/// their fields
pub(crate) fn field_model(fields: &[&str], default_value: f32) -> Arc<ScoringModel> {
    let mut store = FeatureStore::new(STORE);
    for field in fields {
        store
            .add(&FeatureDefinition::new(
                *field,
                "FieldValueFeature",
                params(json!({ "field": field, "defaultValue": default_value })),
            ))
            .unwrap();
    }
    let weights: Vec<(&str, f32)> = fields.iter().map(|f| (*f, 1.0)).collect();
    linear_over(&store, &weights)
}

/// Linear model over one value feature (5.0) normalized into [0, 10]
pub(crate) fn minmax_model() -> Arc<ScoringModel> {
    let store = value_store(&[("c", 5.0)]);
    let def = ModelDefinition {
        name: "minmax".to_string(),
        class: "LinearModel".to_string(),
        store: Some(STORE.to_string()),
        features: vec![ModelFeatureDefinition::new("c").with_norm(NormalizerDefinition {
            class: "MinMaxNormalizer".to_string(),
            params: params(json!({ "min": 0.0, "max": 10.0 })),
        })],
        params: params(json!({ "weights": { "c": 1.0 } })),
    };
    Arc::new(ScoringModel::from_definition(&def, &store).unwrap())
}

/// Single tree: `f <= 0.5` scores 50.0, otherwise -10.0
pub(crate) fn split_tree_model(store: &FeatureStore) -> Arc<ScoringModel> {
    let def = ModelDefinition {
        name: "trees".to_string(),
        class: "LambdaMARTModel".to_string(),
        store: Some(store.name().to_string()),
        features: vec![ModelFeatureDefinition::new("f")],
        params: params(json!({
            "trees": [{
                "weight": 1.0,
                "root": {
                    "feature": "f",
                    "threshold": 0.5,
                    "left": { "value": 50.0 },
                    "right": { "value": -10.0 }
                }
            }]
        })),
    };
    Arc::new(ScoringModel::from_definition(&def, store).unwrap())
}
