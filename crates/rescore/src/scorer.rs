//! Per-segment model scorer
//!
//! A `ModelScorer` drives the feature cursors of one segment over ascending
//! target documents and feeds the model. Two traversal strategies produce
//! identical feature values:
//!
//! - Dense: at most one active cursor, advanced directly
//! - Sparse: a k-way merge over a min-heap of cursors keyed by doc id; only
//!   cursors behind the target are advanced and only cursors sitting on the
//!   target are read
//!
//! The strategy is fixed when the scorer is created. Scratch state (feature
//! info table, normalization buffer, doc info) belongs to one scorer and is
//! never shared.

use crate::weight::ModelWeight;
use ltrank_core::{DocId, DocInfo, NO_MORE_DOCS};
use ltrank_features::FeatureScorer;
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

// ============================================================================
// FeatureInfo
// ============================================================================

/// Value of one extracted feature for the current document
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInfo {
    name: String,
    value: f32,
    default_value: f32,
    used: bool,
}

impl FeatureInfo {
    /// Unused feature holding its default value
    pub fn new(name: impl Into<String>, default_value: f32) -> Self {
        FeatureInfo {
            name: name.into(),
            value: default_value,
            default_value,
            used: false,
        }
    }

    /// Feature name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw (unnormalized) value, or the default value if the feature did not fire
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Whether the feature fired on the current document
    pub fn is_used(&self) -> bool {
        self.used
    }

    /// Record that the feature fired with `value`
    pub fn set(&mut self, value: f32) {
        self.value = value;
        self.used = true;
    }

    /// Back to (default value, unused)
    pub fn reset(&mut self) {
        self.value = self.default_value;
        self.used = false;
    }
}

// ============================================================================
// Traversal
// ============================================================================

struct Cursor {
    /// Position of the feature in the weight's extracted features
    slot: usize,
    scorer: Box<dyn FeatureScorer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strategy {
    Dense,
    Sparse,
}

impl Strategy {
    pub(crate) fn for_arity(active_cursors: usize) -> Self {
        if active_cursors <= 1 {
            Strategy::Dense
        } else {
            Strategy::Sparse
        }
    }
}

enum Traversal {
    Dense(Vec<Cursor>),
    Sparse {
        cursors: Vec<Cursor>,
        /// (current doc, cursor position); exhausted cursors are dropped
        queue: BinaryHeap<Reverse<(DocId, usize)>>,
    },
}

impl Traversal {
    fn new(cursors: Vec<Cursor>, strategy: Strategy) -> Self {
        match strategy {
            Strategy::Dense => Traversal::Dense(cursors),
            Strategy::Sparse => {
                let queue = cursors
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.scorer.doc_id() != NO_MORE_DOCS)
                    .map(|(i, c)| Reverse((c.scorer.doc_id(), i)))
                    .collect();
                Traversal::Sparse { cursors, queue }
            }
        }
    }

    fn advance(&mut self, target: DocId) {
        match self {
            Traversal::Dense(cursors) => {
                for cursor in cursors.iter_mut() {
                    if cursor.scorer.doc_id() < target {
                        cursor.scorer.advance(target);
                    }
                }
            }
            Traversal::Sparse { cursors, queue } => {
                while let Some(&Reverse((doc, i))) = queue.peek() {
                    if doc >= target {
                        break;
                    }
                    queue.pop();
                    let next = cursors[i].scorer.advance(target);
                    if next != NO_MORE_DOCS {
                        queue.push(Reverse((next, i)));
                    }
                }
            }
        }
    }

    /// Read the cursors positioned on `target` into `infos`
    fn collect(&mut self, target: DocId, doc_info: &DocInfo, infos: &mut [FeatureInfo]) {
        match self {
            Traversal::Dense(cursors) => {
                for cursor in cursors.iter() {
                    if cursor.scorer.doc_id() == target {
                        infos[cursor.slot].set(cursor.scorer.score(doc_info));
                    }
                }
            }
            Traversal::Sparse { cursors, queue } => {
                let mut on_target: SmallVec<[usize; 8]> = SmallVec::new();
                while let Some(&Reverse((doc, i))) = queue.peek() {
                    if doc != target {
                        break;
                    }
                    queue.pop();
                    on_target.push(i);
                }
                for i in on_target {
                    let cursor = &cursors[i];
                    infos[cursor.slot].set(cursor.scorer.score(doc_info));
                    queue.push(Reverse((target, i)));
                }
            }
        }
    }
}

// ============================================================================
// ModelScorer
// ============================================================================

/// Scores the documents of one segment with the query's model
///
/// Targets passed to `advance` must be segment-local and non-decreasing.
pub struct ModelScorer<'w> {
    weight: &'w ModelWeight,
    traversal: Traversal,
    strategy: Strategy,
    target: Option<DocId>,
    doc_info: DocInfo,
    infos: Vec<FeatureInfo>,
    normalized: Vec<f32>,
}

impl<'w> ModelScorer<'w> {
    pub(crate) fn new(
        weight: &'w ModelWeight,
        cursors: Vec<(usize, Box<dyn FeatureScorer>)>,
        strategy: Strategy,
    ) -> Self {
        let cursors = cursors
            .into_iter()
            .map(|(slot, scorer)| Cursor { slot, scorer })
            .collect();
        ModelScorer {
            weight,
            traversal: Traversal::new(cursors, strategy),
            strategy,
            target: None,
            doc_info: DocInfo::new(),
            infos: weight.new_feature_infos(),
            normalized: vec![0.0; weight.model().features().len()],
        }
    }

    /// Whether the k-way merge traversal is in use
    pub fn is_sparse(&self) -> bool {
        self.strategy == Strategy::Sparse
    }

    /// Current target document, `NO_MORE_DOCS` before the first advance
    pub fn doc_id(&self) -> DocId {
        self.target.unwrap_or(NO_MORE_DOCS)
    }

    /// Move to segment-local document `target`
    ///
    /// The model scores every target, whether or not any feature fires on it.
    pub fn advance(&mut self, target: DocId) -> DocId {
        self.traversal.advance(target);
        self.target = Some(target);
        target
    }

    /// Attach extra per-document info read by features
    pub fn set_doc_info(&mut self, key: impl Into<String>, value: f32) {
        self.doc_info.set(key, value);
    }

    /// Attach the first-pass score of the current document
    pub fn set_original_score(&mut self, score: f32) {
        self.doc_info.set_original_score(score);
    }

    /// Score the current target
    pub fn score(&mut self) -> f32 {
        for info in &mut self.infos {
            info.reset();
        }
        if let Some(target) = self.target {
            self.traversal.collect(target, &self.doc_info, &mut self.infos);
        }

        let model = self.weight.model();
        let slots = self.weight.model_slots();
        for ((normalized, &slot), feature) in self
            .normalized
            .iter_mut()
            .zip(slots)
            .zip(model.features())
        {
            let info = &self.infos[slot];
            *normalized = if info.is_used() {
                feature.normalizer().normalize(info.value())
            } else {
                info.value()
            };
        }
        model.score(&self.normalized)
    }

    /// Feature info table of the last scored document
    ///
    /// Ordered like the weight's extracted features (store order when all
    /// store features are extracted).
    pub fn feature_infos(&self) -> &[FeatureInfo] {
        &self.infos
    }
}
