//! Shared fixtures for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

pub use ltrank::{
    FeatureDefinition, IndexReader, InMemoryIndex, LtrConfig, LtrEngine, LtrError, LtrRegistry,
    ModelDefinition, ModelFeatureDefinition, NormalizerDefinition, Params, RequestParams,
    ScoreDoc, ThreadModuleConfig, TopDocs,
};
pub use serde_json::{json, Value};
use std::sync::Arc;

pub const STORE: &str = "store1";

// ============================================================================
// Definitions
// ============================================================================

pub fn params(value: Value) -> Params {
    value.as_object().cloned().unwrap_or_default()
}

pub fn value_feature(name: &str, value: f32) -> FeatureDefinition {
    FeatureDefinition::new(name, "ValueFeature", params(json!({ "value": value }))).with_store(STORE)
}

pub fn field_feature(name: &str, field: &str) -> FeatureDefinition {
    FeatureDefinition::new(name, "FieldValueFeature", params(json!({ "field": field })))
        .with_store(STORE)
}

pub fn efi_feature(name: &str, efi: &str) -> FeatureDefinition {
    FeatureDefinition::new(
        name,
        "ValueFeature",
        params(json!({ "value": format!("${{{}}}", efi) })),
    )
    .with_store(STORE)
}

/// Linear model over `weights`, features in the given order
pub fn linear(name: &str, weights: &[(&str, f32)]) -> ModelDefinition {
    let mut weight_map = serde_json::Map::new();
    for (feature, w) in weights {
        weight_map.insert(feature.to_string(), json!(w));
    }
    ModelDefinition {
        name: name.to_string(),
        class: "LinearModel".to_string(),
        store: Some(STORE.to_string()),
        features: weights
            .iter()
            .map(|(feature, _)| ModelFeatureDefinition::new(*feature))
            .collect(),
        params: params(json!({ "weights": weight_map })),
    }
}

/// Tree ensemble model over `features` with the given `trees` JSON
pub fn trees(name: &str, features: &[&str], trees: Value) -> ModelDefinition {
    ModelDefinition {
        name: name.to_string(),
        class: "MultipleAdditiveTreesModel".to_string(),
        store: Some(STORE.to_string()),
        features: features
            .iter()
            .map(|f| ModelFeatureDefinition::new(*f))
            .collect(),
        params: params(json!({ "trees": trees })),
    }
}

// ============================================================================
// Engines and indexes
// ============================================================================

/// Engine loaded with `features` and `models`
pub fn engine_with(
    config: LtrConfig,
    features: &[FeatureDefinition],
    models: &[ModelDefinition],
) -> LtrEngine {
    let engine = LtrEngine::new(config).unwrap();
    engine.registry().add_features(features).unwrap();
    engine.registry().add_models(models, false).unwrap();
    engine
}

pub fn parallel_config(max_threads: usize, max_query_threads: usize) -> LtrConfig {
    LtrConfig {
        thread_module: ThreadModuleConfig::default().with_threads(max_threads, max_query_threads),
        ..LtrConfig::default()
    }
}

pub fn reader(index: InMemoryIndex) -> Arc<dyn IndexReader> {
    Arc::new(index)
}

/// First pass of `docs`, all scored 1.0
pub fn first_pass(docs: impl IntoIterator<Item = u32>) -> TopDocs {
    TopDocs::from_hits(docs.into_iter().map(|d| ScoreDoc::new(d, 1.0)).collect())
}

pub fn local_params(pairs: &[(&str, &str)]) -> RequestParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Deterministic pseudo-random field values for `docs` documents
pub fn lcg_values(docs: u32, seed: u64) -> Vec<(u32, f32)> {
    let mut state = seed;
    (0..docs)
        .map(|doc| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (doc, ((state >> 33) % 1000) as f32 / 10.0)
        })
        .collect()
}
