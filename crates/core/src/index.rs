//! Index view consumed by the reranker
//!
//! The reranker does not execute queries. It only needs to know how the
//! global document id space is partitioned into segments, and (for features
//! that read per-document values) a sparse per-segment column of values.
//!
//! `InMemoryIndex` is a small implementation used by tests, benches and
//! callers that already hold their doc values in memory.

use crate::error::{LtrError, LtrResult};
use crate::types::DocId;
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// SegmentContext
// ============================================================================

/// A contiguous partition of the global doc id space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentContext {
    /// Position of the segment in the reader's segment list
    pub ord: usize,
    /// First global doc id of the segment
    pub doc_base: DocId,
    /// Number of documents in the segment
    pub max_doc: u32,
}

impl SegmentContext {
    /// Create a new SegmentContext
    pub fn new(ord: usize, doc_base: DocId, max_doc: u32) -> Self {
        SegmentContext {
            ord,
            doc_base,
            max_doc,
        }
    }

    /// One past the last global doc id of the segment
    pub fn end(&self) -> DocId {
        self.doc_base + self.max_doc
    }

    /// Whether the global doc id falls in this segment
    pub fn contains(&self, doc: DocId) -> bool {
        doc >= self.doc_base && doc < self.end()
    }

    /// Convert a global doc id to a segment-local one
    pub fn local(&self, doc: DocId) -> DocId {
        doc - self.doc_base
    }
}

// ============================================================================
// IndexReader
// ============================================================================

/// Read-only view of a segmented index
///
/// # Thread Safety
///
/// Readers are shared across segment scoring tasks and must be Send + Sync.
pub trait IndexReader: Send + Sync {
    /// Segments in ascending doc id order
    fn segments(&self) -> &[SegmentContext];

    /// Sparse doc-value column for `field` in `segment`
    ///
    /// Entries are `(segment-local doc id, value)` sorted by doc id.
    /// Returns None if no document in the segment has a value.
    fn doc_values(&self, _segment: &SegmentContext, _field: &str) -> Option<Arc<[(DocId, f32)]>> {
        None
    }

    /// Total number of documents across all segments
    fn max_doc(&self) -> u32 {
        self.segments().last().map(|s| s.end()).unwrap_or(0)
    }

    /// Find the segment holding a global doc id
    fn segment_for(&self, doc: DocId) -> Option<&SegmentContext> {
        let segments = self.segments();
        let idx = segments.partition_point(|s| s.end() <= doc);
        segments.get(idx).filter(|s| s.contains(doc))
    }
}

// ============================================================================
// InMemoryIndex
// ============================================================================

/// Segment layout plus per-field sparse doc values, held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndex {
    segments: Vec<SegmentContext>,
    /// field -> per-segment column (indexed by segment ord)
    columns: HashMap<String, Vec<Option<Arc<[(DocId, f32)]>>>>,
}

impl InMemoryIndex {
    /// Create an index with consecutive segments of the given sizes
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if the sizes add up to more than `u32::MAX` documents.
    pub fn new(segment_sizes: &[u32]) -> LtrResult<Self> {
        let mut segments = Vec::with_capacity(segment_sizes.len());
        let mut doc_base: DocId = 0;
        for (ord, &size) in segment_sizes.iter().enumerate() {
            segments.push(SegmentContext::new(ord, doc_base, size));
            doc_base = doc_base.checked_add(size).ok_or_else(|| {
                LtrError::InvalidRequest(format!(
                    "segment {} of {} documents overflows the doc id space",
                    ord, size
                ))
            })?;
        }
        Ok(InMemoryIndex {
            segments,
            columns: HashMap::new(),
        })
    }

    /// Builder: add a doc-value field given as `(global doc id, value)` pairs
    ///
    /// Values for documents outside the index are ignored.
    pub fn with_field(mut self, field: &str, values: &[(DocId, f32)]) -> Self {
        let mut per_segment: Vec<Vec<(DocId, f32)>> = vec![Vec::new(); self.segments.len()];
        for &(doc, value) in values {
            if let Some(segment) = self.segment_for(doc) {
                per_segment[segment.ord].push((segment.local(doc), value));
            }
        }
        let column = per_segment
            .into_iter()
            .map(|mut entries| {
                if entries.is_empty() {
                    None
                } else {
                    entries.sort_by_key(|(doc, _)| *doc);
                    entries.dedup_by_key(|(doc, _)| *doc);
                    Some(Arc::from(entries))
                }
            })
            .collect();
        self.columns.insert(field.to_string(), column);
        self
    }
}

impl IndexReader for InMemoryIndex {
    fn segments(&self) -> &[SegmentContext] {
        &self.segments
    }

    fn doc_values(&self, segment: &SegmentContext, field: &str) -> Option<Arc<[(DocId, f32)]>> {
        self.columns
            .get(field)
            .and_then(|column| column.get(segment.ord))
            .and_then(|entries| entries.clone())
    }
}
