//! Document and result types
//!
//! Documents are identified by a global (index-wide) doc id. Segments map a
//! contiguous range of global ids onto segment-local ids starting at zero.

use serde::{Deserialize, Serialize};

/// Global document identifier
pub type DocId = u32;

/// Cursor sentinel: the cursor is exhausted
pub const NO_MORE_DOCS: DocId = DocId::MAX;

/// A document together with its current score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreDoc {
    /// Global document id
    pub doc: DocId,
    /// Score (first-pass score before rescoring, model score after)
    pub score: f32,
}

impl ScoreDoc {
    /// Create a new ScoreDoc
    pub fn new(doc: DocId, score: f32) -> Self {
        ScoreDoc { doc, score }
    }
}

/// A ranked result list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopDocs {
    /// Total number of documents that matched the first-pass query
    pub total_hits: usize,
    /// Ranked hits
    pub hits: Vec<ScoreDoc>,
    /// Highest score among `hits`, if any
    pub max_score: Option<f32>,
}

impl TopDocs {
    /// Create a TopDocs; `max_score` is taken from the first hit
    pub fn new(total_hits: usize, hits: Vec<ScoreDoc>) -> Self {
        let max_score = hits.first().map(|h| h.score);
        TopDocs {
            total_hits,
            hits,
            max_score,
        }
    }

    /// Build from first-pass hits, counting them as the total
    pub fn from_hits(hits: Vec<ScoreDoc>) -> Self {
        Self::new(hits.len(), hits)
    }

    /// Whether there are no hits
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Number of hits
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Document ids in rank order
    pub fn doc_ids(&self) -> Vec<DocId> {
        self.hits.iter().map(|h| h.doc).collect()
    }
}
