//! Model weight: a scoring query bound to an index

use crate::scorer::{FeatureInfo, ModelScorer, Strategy};
use ltrank_core::{DocId, DocInfo, Explanation, IndexReader, LtrError, LtrResult, SegmentContext};
use ltrank_features::{FeatureScorer, FeatureWeight};
use ltrank_models::ScoringModel;
use std::ops::Range;
use std::sync::Arc;

/// Feature weights of one request against one index
///
/// Holds a weight per extracted feature, for each model feature the
/// position of its weight among the extracted ones, and the contiguous range
/// of extracted features whose values are logged. Shared read-only across
/// segment scoring tasks.
pub struct ModelWeight {
    model: Arc<ScoringModel>,
    reader: Arc<dyn IndexReader>,
    extracted: Vec<FeatureWeight>,
    model_slots: Vec<usize>,
    logged: Range<usize>,
}

impl ModelWeight {
    pub(crate) fn new(
        model: Arc<ScoringModel>,
        reader: Arc<dyn IndexReader>,
        extracted: Vec<FeatureWeight>,
        model_slots: Vec<usize>,
        logged: Range<usize>,
    ) -> Self {
        ModelWeight {
            model,
            reader,
            extracted,
            model_slots,
            logged,
        }
    }

    /// The model being applied
    pub fn model(&self) -> &Arc<ScoringModel> {
        &self.model
    }

    /// The index being scored
    pub fn reader(&self) -> &Arc<dyn IndexReader> {
        &self.reader
    }

    /// Weights of every extracted feature
    pub fn extracted_weights(&self) -> &[FeatureWeight] {
        &self.extracted
    }

    /// For each model feature, its position in `extracted_weights`
    pub fn model_slots(&self) -> &[usize] {
        &self.model_slots
    }

    /// Positions in `extracted_weights` of the logged features
    pub fn logged_range(&self) -> Range<usize> {
        self.logged.clone()
    }

    pub(crate) fn new_feature_infos(&self) -> Vec<FeatureInfo> {
        self.extracted
            .iter()
            .map(|w| FeatureInfo::new(w.name(), w.default_value()))
            .collect()
    }

    pub(crate) fn feature_cursors(
        &self,
        segment: &SegmentContext,
    ) -> LtrResult<Vec<(usize, Box<dyn FeatureScorer>)>> {
        let mut cursors = Vec::with_capacity(self.extracted.len());
        for (slot, weight) in self.extracted.iter().enumerate() {
            if let Some(scorer) = weight.scorer(segment)? {
                cursors.push((slot, scorer));
            }
        }
        Ok(cursors)
    }

    /// Scorer for the documents of `segment`
    ///
    /// Always returns a scorer, even when no feature can fire in the
    /// segment: the model still scores every document from default values.
    pub fn scorer(&self, segment: &SegmentContext) -> LtrResult<ModelScorer<'_>> {
        let cursors = self.feature_cursors(segment)?;
        let strategy = Strategy::for_arity(cursors.len());
        Ok(ModelScorer::new(self, cursors, strategy))
    }

    /// Explain the model score of global document `doc`
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if `doc` is outside the index.
    pub fn explain(&self, doc: DocId, original_score: Option<f32>) -> LtrResult<Explanation> {
        let segment = *self.reader.segment_for(doc).ok_or_else(|| {
            LtrError::InvalidRequest(format!("document {} is outside the index", doc))
        })?;
        let local = segment.local(doc);

        let mut scorer = self.scorer(&segment)?;
        scorer.advance(local);
        let mut info = DocInfo::new();
        if let Some(score) = original_score {
            scorer.set_original_score(score);
            info.set_original_score(score);
        }
        let final_score = scorer.score();
        let infos = scorer.feature_infos();

        let mut feature_explanations = Vec::with_capacity(self.model_slots.len());
        for (idx, &slot) in self.model_slots.iter().enumerate() {
            let raw = self.extracted[slot].explain(&segment, local, &info)?;
            let explanation = if infos[slot].is_used() {
                self.model.normalizer_explanation(raw, idx)
            } else {
                raw
            };
            feature_explanations.push(explanation);
        }
        Ok(self.model.explain(final_score, &feature_explanations))
    }
}

impl std::fmt::Debug for ModelWeight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelWeight")
            .field("model", &self.model.name())
            .field("extracted", &self.extracted.len())
            .field("model_slots", &self.model_slots)
            .field("logged", &self.logged)
            .finish()
    }
}
