//! Registry Lifecycle
//!
//! Definitions added, replaced, deleted and persisted through the engine.

use crate::common::*;
use ltrank::{JsonFileSource, RerankDirective};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[test]
fn model_replacement_takes_effect_for_new_requests() {
    let engine = engine_with(
        LtrConfig::default(),
        &[field_feature("pop", "pop")],
        &[linear("m", &[("pop", 1.0)])],
    );
    let index = reader(InMemoryIndex::new(&[3]).unwrap().with_field("pop", &[(0, 1.0), (1, 2.0), (2, 3.0)]));
    let directive = RerankDirective::new("m");

    let before = engine
        .rerank(&directive, Arc::clone(&index), first_pass(0..3), None, &RequestParams::new())
        .unwrap();
    assert_eq!(before.doc_ids(), vec![2, 1, 0]);

    let err = engine
        .registry()
        .add_models(&[linear("m", &[("pop", -1.0)])], false)
        .unwrap_err();
    assert!(matches!(err, LtrError::DuplicateModel(_)));

    engine
        .registry()
        .add_models(&[linear("m", &[("pop", -1.0)])], true)
        .unwrap();
    let after = engine
        .rerank(&directive, index, first_pass(0..3), None, &RequestParams::new())
        .unwrap();
    assert_eq!(after.doc_ids(), vec![0, 1, 2]);
}

#[test]
fn prepared_rescorer_survives_model_deletion() {
    let engine = engine_with(
        LtrConfig::default(),
        &[value_feature("c", 2.0)],
        &[linear("m", &[("c", 1.5)])],
    );
    let rescorer = engine
        .prepare(&RerankDirective::new("m"), None, &RequestParams::new())
        .unwrap();

    assert!(engine.registry().delete_model("m"));
    assert!(engine.registry().feature_store(STORE).is_some());
    assert!(engine.registry().delete_feature_store("*"));

    let top = rescorer
        .rescore(reader(InMemoryIndex::new(&[1]).unwrap()), first_pass([0]), 1)
        .unwrap();
    assert_eq!(top.hits[0].score, 3.0);

    let err = engine
        .prepare(&RerankDirective::new("m"), None, &RequestParams::new())
        .unwrap_err();
    assert!(matches!(err, LtrError::UnknownModel(_)));
}

#[test]
fn model_over_missing_store_rejected() {
    let engine = LtrEngine::new(LtrConfig::default()).unwrap();
    let err = engine
        .registry()
        .add_models(&[linear("m", &[("c", 1.0)])], false)
        .unwrap_err();
    assert!(matches!(err, LtrError::UnknownFeatureStore(_)));
}

#[test]
fn definitions_round_trip_through_json_files() {
    let dir = TempDir::new().unwrap();
    let config = LtrConfig {
        definitions_dir: Some(dir.path().to_path_buf()),
        ..LtrConfig::default()
    };

    {
        let engine = LtrEngine::new(config.clone()).unwrap();
        engine
            .registry()
            .add_features(&[value_feature("c1", 1.0), field_feature("pop", "pop")])
            .unwrap();
        engine
            .registry()
            .add_models(
                &[
                    linear("lin", &[("c1", 2.0), ("pop", 1.0)]),
                    trees("tree", &["pop"], json!([{ "weight": 1.0, "root": { "value": 4.0 } }])),
                ],
                false,
            )
            .unwrap();
        engine.persist().unwrap();
    }

    let source = JsonFileSource::in_dir(dir.path());
    assert!(source.features_path().exists());
    assert!(source.models_path().exists());

    let engine = LtrEngine::new(config).unwrap();
    let registry = engine.registry();
    assert_eq!(registry.export_features().len(), 2);
    assert_eq!(registry.export_models().len(), 2);

    let index = reader(InMemoryIndex::new(&[2]).unwrap().with_field("pop", &[(1, 10.0)]));
    let top = engine
        .rerank(&RerankDirective::new("lin"), index, first_pass(0..2), None, &RequestParams::new())
        .unwrap();
    assert_eq!(top.doc_ids(), vec![1, 0]);
    assert_eq!(top.hits[0].score, 12.0);
}

#[test]
fn open_creates_default_config() {
    let dir = TempDir::new().unwrap();
    let engine = LtrEngine::open(dir.path()).unwrap();
    assert_eq!(engine.config().default_rerank_docs, 200);
    assert!(dir.path().join(ltrank::ltrank_rescore::CONFIG_FILE_NAME).exists());
}

#[test]
fn corrupt_definitions_fail_startup() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("models.json"), "{ not json").unwrap();
    let err = LtrEngine::new(LtrConfig {
        definitions_dir: Some(dir.path().to_path_buf()),
        ..LtrConfig::default()
    })
    .unwrap_err();
    assert!(matches!(err, LtrError::Serialization(_)));
}

#[test]
fn readers_see_consistent_snapshots_during_writes() {
    let registry = Arc::new(LtrRegistry::new());
    registry.add_features(&[value_feature("c", 1.0)]).unwrap();

    let writer = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for i in 0..50 {
                let name = format!("m{}", i);
                registry.add_models(&[linear(&name, &[("c", 1.0)])], false).unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..200 {
                    let count = registry.snapshot().models().len();
                    assert!(count >= last);
                    last = count;
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(registry.export_models().len(), 50);
}
