//! Reranking of first-pass results
//!
//! # Algorithm
//!
//! 1. Top-N of zero or no candidates: the input is returned unchanged.
//! 2. Top-N is clamped to the number of candidates.
//! 3. Candidates are sorted by ascending doc id (feature cursors only move
//!    forward).
//! 4. Candidates are split into contiguous per-segment runs.
//! 5. Each run is scored by its own `ModelScorer`, sequentially or as one
//!    task per run on the thread module. The first-pass score is injected
//!    into the doc info of each document.
//! 6. Results are merged in segment order into a bounded heap of the K best:
//!    the first K go in as they come, afterwards a result replaces the
//!    worst retained one only if its score is strictly greater.
//! 7. The kept results are sorted by score descending, doc id ascending.
//!    A NaN score, whatever its sign bit, ranks above every number.
//! 8. Feature vectors are logged for the kept documents only.
//!
//! Merging in segment order makes the output independent of how tasks were
//! scheduled.

use crate::cache::FeatureVectorCache;
use crate::query::ScoringQuery;
use crate::scorer::FeatureInfo;
use crate::weight::ModelWeight;
use ltrank_concurrency::{AbortSignal, ThreadModule};
use ltrank_core::{
    DocId, Explanation, IndexReader, LtrError, LtrResult, ScoreDoc, SegmentContext, TopDocs,
};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

// ============================================================================
// Segment runs
// ============================================================================

/// Candidates of one segment, in ascending doc id order
#[derive(Debug, Clone)]
struct SegmentRun {
    segment: SegmentContext,
    hits: Vec<ScoreDoc>,
}

/// Split doc-sorted hits into per-segment runs
fn partition(reader: &dyn IndexReader, hits: &[ScoreDoc]) -> LtrResult<Vec<SegmentRun>> {
    let mut runs: Vec<SegmentRun> = Vec::new();
    for hit in hits {
        match runs.last_mut() {
            Some(run) if run.segment.contains(hit.doc) => run.hits.push(*hit),
            _ => {
                let segment = reader.segment_for(hit.doc).ok_or_else(|| {
                    LtrError::InvalidRequest(format!(
                        "document {} is outside the index (max doc {})",
                        hit.doc,
                        reader.max_doc()
                    ))
                })?;
                runs.push(SegmentRun {
                    segment: *segment,
                    hits: vec![*hit],
                });
            }
        }
    }
    Ok(runs)
}

/// A rescored document
#[derive(Debug, Clone)]
struct Scored {
    doc: DocId,
    score: f32,
    /// Infos of the logged features, captured only when vectors are logged
    features: Option<Box<[FeatureInfo]>>,
}

/// Score used for ranking: NaN is made positive so it orders above +inf
fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        score.abs()
    } else {
        score
    }
}

impl Scored {
    /// Ranking order: higher score first, then lower doc id
    fn rank_cmp(&self, other: &Self) -> Ordering {
        rank_key(other.score)
            .total_cmp(&rank_key(self.score))
            .then_with(|| self.doc.cmp(&other.doc))
    }
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.rank_cmp(other) == Ordering::Equal
    }
}

impl Eq for Scored {}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scored {
    /// Greater means ranked better
    fn cmp(&self, other: &Self) -> Ordering {
        other.rank_cmp(self)
    }
}

fn score_run(weight: &ModelWeight, run: &SegmentRun, capture: bool) -> LtrResult<Vec<Scored>> {
    let logged = weight.logged_range();
    let mut scorer = weight.scorer(&run.segment)?;
    let mut scored = Vec::with_capacity(run.hits.len());
    for hit in &run.hits {
        scorer.advance(run.segment.local(hit.doc));
        scorer.set_original_score(hit.score);
        let score = scorer.score();
        scored.push(Scored {
            doc: hit.doc,
            score,
            features: capture.then(|| scorer.feature_infos()[logged.clone()].into()),
        });
    }
    Ok(scored)
}

// ============================================================================
// Top-K selection
// ============================================================================

/// The K best results seen so far; the root is the worst retained one
struct TopK {
    k: usize,
    heap: BinaryHeap<Reverse<Scored>>,
}

impl TopK {
    fn new(k: usize) -> Self {
        TopK {
            k,
            heap: BinaryHeap::with_capacity(k),
        }
    }

    fn offer(&mut self, scored: Scored) {
        if self.heap.len() < self.k {
            self.heap.push(Reverse(scored));
            return;
        }
        if let Some(mut worst) = self.heap.peek_mut() {
            if rank_key(scored.score).total_cmp(&rank_key(worst.0.score)) == Ordering::Greater {
                *worst = Reverse(scored);
            }
        }
    }

    /// Kept results, best first
    fn into_sorted(self) -> Vec<Scored> {
        let mut kept: Vec<Scored> = self.heap.into_iter().map(|Reverse(s)| s).collect();
        kept.sort_by(Scored::rank_cmp);
        kept
    }
}

// ============================================================================
// Rescorer
// ============================================================================

/// Reranks first-pass results with a scoring query
pub struct Rescorer {
    query: Arc<ScoringQuery>,
    thread_module: Option<Arc<ThreadModule>>,
    cache: Option<Arc<dyn FeatureVectorCache>>,
    abort: AbortSignal,
}

impl Rescorer {
    /// Sequential rescorer without feature vector storage
    pub fn new(query: ScoringQuery) -> Self {
        Rescorer {
            query: Arc::new(query),
            thread_module: None,
            cache: None,
            abort: AbortSignal::new(),
        }
    }

    /// Builder: score segments on `thread_module` when it allows parallelism
    pub fn with_thread_module(mut self, thread_module: Arc<ThreadModule>) -> Self {
        self.thread_module = Some(thread_module);
        self
    }

    /// Builder: where logged feature vectors are stored
    pub fn with_cache(mut self, cache: Arc<dyn FeatureVectorCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Builder: signal that interrupts blocking waits of a parallel rescore
    pub fn with_abort_signal(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }

    /// The scoring query
    pub fn query(&self) -> &ScoringQuery {
        &self.query
    }

    /// Rerank `first_pass` and keep the `top_n` best
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if a candidate is outside the index
    /// - feature binding errors such as `RequiredParameterMissing`
    /// - `ScoringTask` if scoring a segment fails; no partial result is kept
    /// - `Interrupted` if the abort signal fires while waiting
    pub fn rescore(
        &self,
        reader: Arc<dyn IndexReader>,
        first_pass: TopDocs,
        top_n: usize,
    ) -> LtrResult<TopDocs> {
        if top_n == 0 || first_pass.hits.is_empty() {
            return Ok(first_pass);
        }
        let start = Instant::now();
        let TopDocs {
            total_hits,
            mut hits,
            ..
        } = first_pass;
        let top_n = top_n.min(hits.len());
        hits.sort_by_key(|h| h.doc);

        let runs = partition(reader.as_ref(), &hits)?;
        let weight = self.query.create_weight(reader)?;

        let logger = self.query.feature_logger();
        if logger.is_some() && self.cache.is_none() {
            warn!(
                target: "ltrank::rescore",
                model = self.query.model().name(),
                "Feature vectors requested without a cache, not logging"
            );
        }
        let capture = logger.is_some() && self.cache.is_some();

        let parallel = self
            .thread_module
            .as_ref()
            .filter(|tm| tm.is_parallel() && runs.len() > 1);
        let segment_count = runs.len();
        let scored = match parallel {
            Some(tm) => self.score_parallel(tm, weight, runs, capture)?,
            None => runs
                .iter()
                .map(|run| score_run(&weight, run, capture))
                .collect::<LtrResult<Vec<_>>>()?,
        };

        let mut top = TopK::new(top_n);
        for scored in scored.into_iter().flatten() {
            top.offer(scored);
        }
        let kept = top.into_sorted();

        if let (Some(logger), Some(cache)) = (logger, &self.cache) {
            let query_id = self.query.query_id();
            for scored in &kept {
                if let Some(features) = &scored.features {
                    cache.put(query_id, scored.doc, logger.make_feature_vector(features));
                }
            }
        }

        debug!(
            target: "ltrank::rescore",
            model = self.query.model().name(),
            candidates = hits.len(),
            segments = segment_count,
            kept = kept.len(),
            parallel = parallel.is_some(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Rescore complete"
        );

        let hits = kept
            .into_iter()
            .map(|s| ScoreDoc::new(s.doc, s.score))
            .collect();
        Ok(TopDocs::new(total_hits, hits))
    }

    fn score_parallel(
        &self,
        thread_module: &ThreadModule,
        weight: ModelWeight,
        runs: Vec<SegmentRun>,
        capture: bool,
    ) -> LtrResult<Vec<Vec<Scored>>> {
        let weight = Arc::new(weight);
        let query_permits = thread_module.create_query_semaphore();
        let mut handles = Vec::with_capacity(runs.len());

        for run in runs {
            let query_permit = query_permits.acquire(&self.abort)?;
            let global_permit = thread_module.acquire_global(&self.abort)?;
            let weight = Arc::clone(&weight);
            let handle = thread_module.submit(move || {
                let _permits = (query_permit, global_permit);
                let start = Instant::now();
                let scored = score_run(&weight, &run, capture).map_err(|e| {
                    LtrError::ScoringTask(format!("segment {}: {}", run.segment.ord, e))
                })?;
                debug!(
                    target: "ltrank::rescore",
                    segment = run.segment.ord,
                    docs = run.hits.len(),
                    elapsed_us = start.elapsed().as_micros() as u64,
                    "Segment scored"
                );
                Ok(scored)
            })?;
            handles.push(handle);
        }

        // Joined in submission (segment) order; the first failure wins
        handles
            .into_iter()
            .map(|handle| handle.join(&self.abort))
            .collect()
    }

    /// Explain the model score of global document `doc`
    pub fn explain(
        &self,
        reader: Arc<dyn IndexReader>,
        doc: DocId,
        original_score: Option<f32>,
    ) -> LtrResult<Explanation> {
        self.query.create_weight(reader)?.explain(doc, original_score)
    }
}

impl std::fmt::Debug for Rescorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rescorer")
            .field("model", &self.query.model().name())
            .field("parallel", &self.thread_module.as_ref().map(|tm| tm.is_parallel()))
            .field("cache", &self.cache.is_some())
            .finish()
    }
}
