//! Property Tests
//!
//! Randomized checks of model arithmetic, logging formats and top-k
//! selection through the public API.

use crate::common::*;
use ltrank::{FeatureVector, RerankDirective};
use proptest::prelude::*;
use std::sync::Arc;

fn leaf_trees(leaves: &[(f32, f32)]) -> Value {
    Value::Array(
        leaves
            .iter()
            .map(|(weight, value)| json!({ "weight": weight, "root": { "value": value } }))
            .collect(),
    )
}

/// Parse a `name=value,...` vector into pairs
fn csv_pairs(vector: &FeatureVector) -> Vec<(String, String)> {
    match vector {
        FeatureVector::Csv(s) if s.is_empty() => Vec::new(),
        FeatureVector::Csv(s) => s
            .split(',')
            .map(|pair| {
                let (name, value) = pair.split_once('=').unwrap();
                (name.to_string(), value.to_string())
            })
            .collect(),
        FeatureVector::Map(_) => panic!("expected csv"),
    }
}

fn is_subsequence<T: PartialEq>(small: &[T], big: &[T]) -> bool {
    let mut it = big.iter();
    small.iter().all(|x| it.any(|y| y == x))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn single_leaf_ensemble_sums_weighted_values(
        leaves in prop::collection::vec((-4.0f32..4.0, -100.0f32..100.0), 1..8),
    ) {
        let engine = engine_with(
            LtrConfig::default(),
            &[value_feature("c", 1.0)],
            &[trees("leaves", &["c"], leaf_trees(&leaves))],
        );
        let top = engine
            .rerank(
                &RerankDirective::new("leaves"),
                reader(InMemoryIndex::new(&[1]).unwrap()),
                first_pass([0]),
                None,
                &RequestParams::new(),
            )
            .unwrap();
        let expected: f32 = leaves.iter().map(|(w, v)| w * v).sum();
        prop_assert!((top.hits[0].score - expected).abs() <= 1e-3 * (1.0 + expected.abs()));
    }

    #[test]
    fn unresolved_split_feature_contributes_zero(leaf in -50.0f32..50.0) {
        let engine = engine_with(
            LtrConfig::default(),
            &[value_feature("c", 1.0)],
            &[trees(
                "ghost",
                &["c"],
                json!([
                    {
                        "weight": 1.0,
                        "root": {
                            "feature": "not_in_model",
                            "threshold": 0.0,
                            "left": { "value": 1.0 },
                            "right": { "value": 2.0 }
                        }
                    },
                    { "weight": 1.0, "root": { "value": leaf } }
                ]),
            )],
        );
        let top = engine
            .rerank(
                &RerankDirective::new("ghost"),
                reader(InMemoryIndex::new(&[1]).unwrap()),
                first_pass([0]),
                None,
                &RequestParams::new(),
            )
            .unwrap();
        prop_assert_eq!(top.hits[0].score, leaf);
    }

    #[test]
    fn sparse_vector_is_subsequence_of_dense(
        column_a in prop::collection::btree_map(0u32..32, -5.0f32..5.0, 0..32),
        column_b in prop::collection::btree_map(0u32..32, -5.0f32..5.0, 0..32),
    ) {
        let index = InMemoryIndex::new(&[16, 16]).unwrap()
            .with_field("a", &column_a.into_iter().collect::<Vec<_>>())
            .with_field("b", &column_b.into_iter().collect::<Vec<_>>());
        let reader = reader(index);
        let engine = engine_with(
            LtrConfig::default(),
            &[field_feature("a", "a"), value_feature("k", 0.5), field_feature("b", "b")],
            &[linear("m", &[("a", 1.0), ("b", 1.0)])],
        );

        let mut logged = Vec::new();
        for format in ["sparse", "dense"] {
            let directive = engine
                .parse_directive(&local_params(&[
                    ("model", "m"),
                    ("reRankDocs", "32"),
                    ("fv", "true"),
                    ("fvFormat", format),
                ]))
                .unwrap();
            let rescorer = engine.prepare(&directive, None, &RequestParams::new()).unwrap();
            let query_id = rescorer.query().query_id();
            let top = rescorer.rescore(Arc::clone(&reader), first_pass(0..32), 32).unwrap();
            let vectors: Vec<_> = top
                .doc_ids()
                .into_iter()
                .map(|doc| (doc, csv_pairs(&engine.feature_vector(query_id, doc).unwrap())))
                .collect();
            logged.push(vectors);
        }

        let (sparse, dense) = (&logged[0], &logged[1]);
        prop_assert_eq!(sparse.len(), dense.len());
        for ((doc_s, s), (doc_d, d)) in sparse.iter().zip(dense) {
            prop_assert_eq!(doc_s, doc_d);
            prop_assert_eq!(d.len(), 3);
            prop_assert!(is_subsequence(s, d));
        }
    }

    #[test]
    fn top_k_keeps_best_by_score_then_doc(
        values in prop::collection::vec(-20i32..20, 1..60),
        k in 1usize..70,
    ) {
        let column: Vec<(u32, f32)> = values
            .iter()
            .enumerate()
            .map(|(doc, v)| (doc as u32, *v as f32))
            .collect();
        let docs = values.len() as u32;
        let index = InMemoryIndex::new(&[docs]).unwrap().with_field("s", &column);
        let engine = engine_with(
            LtrConfig::default(),
            &[field_feature("s", "s")],
            &[linear("m", &[("s", 1.0)])],
        );
        let top = engine
            .prepare(&RerankDirective::new("m"), None, &RequestParams::new())
            .unwrap()
            .rescore(reader(index), first_pass((0..docs).rev()), k)
            .unwrap();

        let mut expected = column.clone();
        expected.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        expected.truncate(k.min(column.len()));
        let got: Vec<(u32, f32)> = top.hits.iter().map(|h| (h.doc, h.score)).collect();
        prop_assert_eq!(got, expected);
    }
}
