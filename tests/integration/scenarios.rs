//! Reference Scenarios
//!
//! Small fixed inputs with known rerank and logging outcomes.

use crate::common::*;
use ltrank::FeatureVector;

fn constant_engine() -> LtrEngine {
    engine_with(
        LtrConfig::default(),
        &[
            value_feature("c1", 1.0),
            value_feature("c2", 2.0),
            value_feature("c3", 3.0),
        ],
        &[linear("sum", &[("c1", 1.0), ("c2", 1.0), ("c3", 1.0)])],
    )
}

// ============================================================================
// Linear model
// ============================================================================

#[test]
fn linear_constant_features_score_six() {
    let engine = constant_engine();
    let directive = engine.parse_directive(&local_params(&[("model", "sum")])).unwrap();
    let top = engine
        .rerank(
            &directive,
            reader(InMemoryIndex::new(&[4]).unwrap()),
            first_pass(0..4),
            None,
            &RequestParams::new(),
        )
        .unwrap();

    assert_eq!(top.len(), 4);
    assert!(top.hits.iter().all(|h| h.score == 6.0));
    // equal scores keep ascending doc order
    assert_eq!(top.doc_ids(), vec![0, 1, 2, 3]);
}

#[test]
fn linear_constant_features_logged_as_csv() {
    let engine = constant_engine();
    let directive = engine
        .parse_directive(&local_params(&[("model", "sum"), ("fv", "true")]))
        .unwrap();
    let rescorer = engine.prepare(&directive, Some("q"), &RequestParams::new()).unwrap();
    let query_id = rescorer.query().query_id();
    rescorer
        .rescore(reader(InMemoryIndex::new(&[4]).unwrap()), first_pass([2]), 1)
        .unwrap();

    let vector = engine.feature_vector(query_id, 2).unwrap();
    assert_eq!(vector, FeatureVector::Csv("c1=1.0,c2=2.0,c3=3.0".to_string()));
    assert_eq!(vector.to_string(), "c1=1.0,c2=2.0,c3=3.0");
}

#[test]
fn linear_constant_features_logged_as_json() {
    let engine = constant_engine();
    let directive = engine
        .parse_directive(&local_params(&[
            ("model", "sum"),
            ("fv", "true"),
            ("fvWriter", "json"),
            ("fvFormat", "dense"),
        ]))
        .unwrap();
    let rescorer = engine.prepare(&directive, None, &RequestParams::new()).unwrap();
    let query_id = rescorer.query().query_id();
    rescorer
        .rescore(reader(InMemoryIndex::new(&[4]).unwrap()), first_pass([0]), 1)
        .unwrap();

    let vector = engine.feature_vector(query_id, 0).unwrap();
    assert_eq!(vector.get("c2"), Some(2.0));
    assert_eq!(vector.to_string(), r#"{"c1":1.0,"c2":2.0,"c3":3.0}"#);
}

#[test]
fn logging_covers_store_features_outside_the_model() {
    let engine = engine_with(
        LtrConfig::default(),
        &[
            value_feature("c1", 1.0),
            value_feature("c2", 2.0),
            value_feature("c3", 3.0),
        ],
        &[linear("partial", &[("c3", 2.0)])],
    );
    let directive = engine
        .parse_directive(&local_params(&[("model", "partial"), ("fv", "true")]))
        .unwrap();
    let rescorer = engine.prepare(&directive, None, &RequestParams::new()).unwrap();
    let query_id = rescorer.query().query_id();
    let top = rescorer
        .rescore(reader(InMemoryIndex::new(&[2]).unwrap()), first_pass([1]), 1)
        .unwrap();

    assert_eq!(top.hits[0].score, 6.0);
    assert_eq!(
        engine.feature_vector(query_id, 1),
        Some(FeatureVector::Csv("c1=1.0,c2=2.0,c3=3.0".to_string()))
    );
}

/// store1: pop (field), bias (constant), rare (field set on docs 0 and 5);
/// store "logging": one (constant), pop_copy (field). Model "m" scores pop.
fn logging_engine() -> LtrEngine {
    engine_with(
        LtrConfig::default(),
        &[
            field_feature("pop", "pop"),
            value_feature("bias", 0.5),
            field_feature("rare", "rare"),
            FeatureDefinition::new("one", "ValueFeature", params(json!({ "value": 1.0 })))
                .with_store("logging"),
            FeatureDefinition::new("pop_copy", "FieldValueFeature", params(json!({ "field": "pop" })))
                .with_store("logging"),
        ],
        &[linear("m", &[("pop", 1.0)])],
    )
}

fn logging_index() -> InMemoryIndex {
    let pop: Vec<(u32, f32)> = (0..8).map(|d| (d, d as f32 + 1.0)).collect();
    InMemoryIndex::new(&[4, 4])
        .unwrap()
        .with_field("pop", &pop)
        .with_field("rare", &[(0, 2.0), (5, 1e-5)])
}

/// Rerank through the engine and read back the vectors of `docs`
fn rerank_and_log(
    engine: &LtrEngine,
    pairs: &[(&str, &str)],
    docs: &[u32],
) -> (TopDocs, Vec<Option<FeatureVector>>) {
    let directive = engine.parse_directive(&local_params(pairs)).unwrap();
    let query_id = engine
        .prepare(&directive, Some("q"), &RequestParams::new())
        .unwrap()
        .query()
        .query_id();
    let top = engine
        .rerank(
            &directive,
            reader(logging_index()),
            first_pass(0..8),
            Some("q"),
            &RequestParams::new(),
        )
        .unwrap();
    let vectors = docs
        .iter()
        .map(|&doc| engine.feature_vector(query_id, doc))
        .collect();
    (top, vectors)
}

#[test]
fn directive_logs_sparse_vectors_of_kept_documents() {
    let engine = logging_engine();
    let (top, vectors) = rerank_and_log(
        &engine,
        &[("model", "m"), ("reRankDocs", "3"), ("fv", "true"), ("fvFormat", "sparse")],
        &[7, 5, 0],
    );

    assert_eq!(top.doc_ids(), vec![7, 6, 5]);
    assert_eq!(vectors[0], Some(FeatureVector::Csv("pop=8.0,bias=0.5".to_string())));
    assert_eq!(
        vectors[1],
        Some(FeatureVector::Csv("pop=6.0,bias=0.5,rare=1.0E-5".to_string()))
    );
    // not kept, not logged
    assert_eq!(vectors[2], None);
}

#[test]
fn directive_logs_dense_vectors_with_defaults() {
    let engine = logging_engine();
    let (top, vectors) = rerank_and_log(
        &engine,
        &[("model", "m"), ("reRankDocs", "3"), ("fv", "true"), ("fvFormat", "dense"), ("fvWriter", "csv")],
        &[7, 5],
    );

    assert_eq!(top.doc_ids(), vec![7, 6, 5]);
    assert_eq!(
        vectors[0],
        Some(FeatureVector::Csv("pop=8.0,bias=0.5,rare=0.0".to_string()))
    );
    assert_eq!(
        vectors[1],
        Some(FeatureVector::Csv("pop=6.0,bias=0.5,rare=1.0E-5".to_string()))
    );
}

#[test]
fn directive_logs_vectors_against_another_store() {
    let engine = logging_engine();
    let (top, vectors) = rerank_and_log(
        &engine,
        &[
            ("model", "m"),
            ("reRankDocs", "2"),
            ("fv", "true"),
            ("fvStore", "logging"),
            ("fvWriter", "json"),
            ("fvFormat", "dense"),
        ],
        &[7, 6],
    );

    // scores still come from the model's store
    assert_eq!(top.doc_ids(), vec![7, 6]);
    assert_eq!(top.hits[0].score, 8.0);

    let vector = vectors[0].clone().unwrap();
    assert_eq!(vector.to_string(), r#"{"one":1.0,"pop_copy":8.0}"#);
    assert_eq!(vector.get("pop"), None);
    assert_eq!(vectors[1].as_ref().and_then(|v| v.get("pop_copy")), Some(7.0));
}

#[test]
fn logging_against_unknown_store_is_client_error() {
    let engine = logging_engine();
    let directive = engine
        .parse_directive(&local_params(&[("model", "m"), ("fv", "true"), ("fvStore", "nope")]))
        .unwrap();
    let err = engine
        .prepare(&directive, None, &RequestParams::new())
        .unwrap_err();
    assert!(matches!(err, LtrError::UnknownFeatureStore(_)));
    assert!(err.is_client_error());
}

// ============================================================================
// Tree ensemble
// ============================================================================

#[test]
fn single_split_tree_routes_by_threshold() {
    let engine = engine_with(
        LtrConfig::default(),
        &[field_feature("f", "f")],
        &[trees(
            "tree",
            &["f"],
            json!([{
                "weight": 1.0,
                "root": {
                    "feature": "f",
                    "threshold": 0.5,
                    "left": { "value": 50.0 },
                    "right": { "value": -10.0 }
                }
            }]),
        )],
    );
    let index = InMemoryIndex::new(&[2]).unwrap().with_field("f", &[(0, 1.0), (1, 0.0)]);
    let top = engine
        .rerank(
            &ltrank::RerankDirective::new("tree"),
            reader(index),
            first_pass([0, 1]),
            None,
            &RequestParams::new(),
        )
        .unwrap();

    assert_eq!(top.doc_ids(), vec![1, 0]);
    assert_eq!(top.hits[0].score, 50.0);
    assert_eq!(top.hits[1].score, -10.0);
}

#[test]
fn tree_explanation_shows_path() {
    let engine = engine_with(
        LtrConfig::default(),
        &[field_feature("f", "f")],
        &[trees(
            "tree",
            &["f"],
            json!([{
                "weight": 2.0,
                "root": {
                    "feature": "f",
                    "threshold": 0.5,
                    "left": { "value": 5.0 },
                    "right": { "value": 1.0 }
                }
            }]),
        )],
    );
    let index = InMemoryIndex::new(&[2]).unwrap().with_field("f", &[(0, 1.0), (1, 0.0)]);
    let expl = engine
        .explain(
            &ltrank::RerankDirective::new("tree"),
            reader(index),
            1,
            None,
            None,
            &RequestParams::new(),
        )
        .unwrap();
    assert_eq!(expl.value, 10.0);
}

// ============================================================================
// Definitions and requests
// ============================================================================

#[test]
fn duplicate_feature_rejected_store_keeps_one() {
    let registry = LtrRegistry::new();
    registry.add_features(&[value_feature("c1", 1.0)]).unwrap();

    let err = registry.add_features(&[value_feature("c1", 5.0)]).unwrap_err();
    assert!(matches!(err, LtrError::DuplicateFeature { .. }));
    assert_eq!(registry.feature_store(STORE).unwrap().len(), 1);
}

#[test]
fn efi_values_flow_into_features() {
    let engine = engine_with(
        LtrConfig::default(),
        &[field_feature("pop", "pop"), efi_feature("boost", "boost")],
        &[linear("boosted", &[("pop", 1.0), ("boost", 1.0)])],
    );
    let index = InMemoryIndex::new(&[3]).unwrap().with_field("pop", &[(0, 1.0), (1, 3.0), (2, 2.0)]);
    let directive = engine
        .parse_directive(&local_params(&[("model", "boosted"), ("efi.boost", "10")]))
        .unwrap();
    let top = engine
        .rerank(&directive, reader(index), first_pass(0..3), None, &RequestParams::new())
        .unwrap();

    assert_eq!(top.doc_ids(), vec![1, 2, 0]);
    assert_eq!(top.hits[0].score, 13.0);
}

#[test]
fn rerank_window_limits_output() {
    let engine = constant_engine();
    let directive = engine
        .parse_directive(&local_params(&[("model", "sum"), ("reRankDocs", "2")]))
        .unwrap();
    let top = engine
        .rerank(
            &directive,
            reader(InMemoryIndex::new(&[10]).unwrap()),
            first_pass(0..10),
            None,
            &RequestParams::new(),
        )
        .unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top.total_hits, 10);
}

#[test]
fn bad_requests_are_client_errors() {
    let engine = constant_engine();

    let err = engine.parse_directive(&local_params(&[])).unwrap_err();
    assert!(err.is_client_error());

    let err = engine
        .prepare(&ltrank::RerankDirective::new("nope"), None, &RequestParams::new())
        .unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(err.to_string(), "cannot find model nope");

    let err = engine
        .rerank(
            &ltrank::RerankDirective::new("sum"),
            reader(InMemoryIndex::new(&[2]).unwrap()),
            first_pass([0, 5]),
            None,
            &RequestParams::new(),
        )
        .unwrap_err();
    assert!(err.is_client_error());
}
