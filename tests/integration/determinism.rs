//! Parallel vs Sequential Rescoring
//!
//! Output must not depend on the thread module settings or on task
//! scheduling.

use crate::common::*;
use std::sync::Arc;
use std::thread;

const SEGMENTS: [u32; 6] = [40, 7, 120, 1, 60, 33];

fn index(seed: u64) -> InMemoryIndex {
    let docs: u32 = SEGMENTS.iter().sum();
    InMemoryIndex::new(&SEGMENTS).unwrap()
        .with_field("a", &lcg_values(docs, seed))
        .with_field("b", &lcg_values(docs, seed ^ 0x9e37_79b9))
}

fn features() -> Vec<FeatureDefinition> {
    vec![
        field_feature("a", "a"),
        field_feature("b", "b"),
        value_feature("bias", 0.25),
    ]
}

fn models() -> Vec<ModelDefinition> {
    vec![
        linear("lin", &[("a", 0.7), ("b", -0.3), ("bias", 1.0)]),
        trees(
            "mart",
            &["a", "b"],
            json!([
                {
                    "weight": 1.0,
                    "root": {
                        "feature": "a",
                        "threshold": 50.0,
                        "left": {
                            "feature": "b",
                            "threshold": 20.0,
                            "left": { "value": 1.0 },
                            "right": { "value": 3.0 }
                        },
                        "right": { "value": 2.0 }
                    }
                },
                { "weight": 0.5, "root": { "value": 0.1 } }
            ]),
        ),
    ]
}

fn rerank_all(engine: &LtrEngine, model: &str, reader: Arc<dyn IndexReader>) -> TopDocs {
    let directive = engine
        .parse_directive(&local_params(&[("model", model), ("reRankDocs", "100")]))
        .unwrap();
    let docs: u32 = SEGMENTS.iter().sum();
    engine
        .rerank(
            &directive,
            reader,
            first_pass((0..docs).rev().step_by(2)),
            None,
            &RequestParams::new(),
        )
        .unwrap()
}

#[test]
fn parallel_matches_sequential_for_each_model() {
    let sequential = engine_with(LtrConfig::default(), &features(), &models());
    let parallel = engine_with(parallel_config(4, 3), &features(), &models());
    let reader = reader(index(7));

    for model in ["lin", "mart"] {
        let a = rerank_all(&sequential, model, Arc::clone(&reader));
        let b = rerank_all(&parallel, model, Arc::clone(&reader));
        assert_eq!(a.len(), 100, "{}", model);
        assert_eq!(a, b, "{}", model);
    }
}

#[test]
fn repeated_parallel_runs_are_identical() {
    let engine = engine_with(parallel_config(3, 2), &features(), &models());
    let reader = reader(index(11));
    let baseline = rerank_all(&engine, "lin", Arc::clone(&reader));
    for _ in 0..10 {
        assert_eq!(rerank_all(&engine, "lin", Arc::clone(&reader)), baseline);
    }
}

#[test]
fn concurrent_requests_share_the_thread_module() {
    let engine = Arc::new(engine_with(parallel_config(4, 2), &features(), &models()));
    let reader = reader(index(23));
    let expected = rerank_all(&engine, "mart", Arc::clone(&reader));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let reader = Arc::clone(&reader);
            thread::spawn(move || rerank_all(&engine, "mart", reader))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
    assert_eq!(engine.thread_module().global_semaphore().available_permits(), 4);
}

#[test]
fn logged_vectors_agree_between_modes() {
    let params = local_params(&[("model", "lin"), ("reRankDocs", "20"), ("fv", "true")]);
    let reader = reader(index(3));
    let docs: u32 = SEGMENTS.iter().sum();

    let mut logged = Vec::new();
    for config in [LtrConfig::default(), parallel_config(4, 4)] {
        let engine = engine_with(config, &features(), &models());
        let directive = engine.parse_directive(&params).unwrap();
        let rescorer = engine.prepare(&directive, Some("q"), &RequestParams::new()).unwrap();
        let query_id = rescorer.query().query_id();
        let top = rescorer
            .rescore(Arc::clone(&reader), first_pass(0..docs), 20)
            .unwrap();
        let vectors: Vec<_> = top
            .doc_ids()
            .into_iter()
            .map(|doc| engine.feature_vector(query_id, doc).unwrap())
            .collect();
        logged.push((top, vectors));
    }
    assert_eq!(logged[0], logged[1]);
}
