//! Feature definitions, weights and scorers
//!
//! Lifecycle of a feature during a rerank request:
//!
//! 1. `Feature` - immutable definition owned by a `FeatureStore`
//! 2. `FeatureWeight` - the feature bound to one request (index reader,
//!    external feature info); created once per request
//! 3. `FeatureScorer` - forward-only cursor over the documents of one
//!    segment for which the feature fires
//!
//! A weight returns no scorer when the feature cannot fire in a segment.
//! Callers then use the feature's default value.

use crate::simple_class_name;
use ltrank_core::{
    param_bool, param_f32, param_str, DocId, DocInfo, Explanation, ExternalParams, IndexReader,
    LtrError, LtrResult, Params, RequestParams, SegmentContext, NO_MORE_DOCS,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Common parameter: value used when the feature does not fire
pub const DEFAULT_VALUE_PARAM: &str = "defaultValue";

// ============================================================================
// FeatureDefinition
// ============================================================================

/// Persisted form of a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDefinition {
    /// Feature name, unique within its store
    pub name: String,
    /// Class tag, e.g. `ValueFeature`
    pub class: String,
    /// Class-specific parameters
    #[serde(default)]
    pub params: Params,
    /// Store the feature belongs to (default store when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
}

impl FeatureDefinition {
    /// Create a definition for the default store
    pub fn new(name: impl Into<String>, class: impl Into<String>, params: Params) -> Self {
        FeatureDefinition {
            name: name.into(),
            class: class.into(),
            params,
            store: None,
        }
    }

    /// Builder: set the store
    pub fn with_store(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }
}

// ============================================================================
// Feature
// ============================================================================

/// Configured value of a `ValueFeature`
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSource {
    /// Numeric constant
    Constant(f32),
    /// String that may reference external feature info as `${name}` or
    /// `${name:default}`; parsed as a float after expansion
    Template(String),
}

/// Kind of computation a feature performs
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureKind {
    /// Same value for every document
    Value {
        /// Configured value
        value: ValueSource,
        /// Fail the request when the value references missing external info
        required: bool,
    },
    /// First-pass score of the document
    OriginalScore,
    /// Per-document value read from a doc-value column
    FieldValue {
        /// Column name
        field: String,
    },
}

impl FeatureKind {
    /// Class tag of this kind
    pub fn class_name(&self) -> &'static str {
        match self {
            FeatureKind::Value { .. } => "ValueFeature",
            FeatureKind::OriginalScore => "OriginalScoreFeature",
            FeatureKind::FieldValue { .. } => "FieldValueFeature",
        }
    }
}

/// A named signal computed per document
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    name: String,
    index: usize,
    kind: FeatureKind,
    params: Params,
    default_value: f32,
}

impl Feature {
    /// Build a feature from its definition
    ///
    /// `index` is the position the feature takes in its store.
    pub fn from_definition(def: &FeatureDefinition, index: usize) -> LtrResult<Self> {
        if def.name.is_empty() {
            return Err(LtrError::FeatureConfig(format!(
                "feature of class {} has no name",
                def.class
            )));
        }
        let config_err = |msg: String| LtrError::FeatureConfig(format!("{}: {}", def.name, msg));

        let default_value = param_f32(&def.params, DEFAULT_VALUE_PARAM)
            .map_err(config_err)?
            .unwrap_or(0.0);

        let kind = match simple_class_name(&def.class) {
            "ValueFeature" => {
                let value = match def.params.get("value") {
                    Some(Value::Number(n)) => n
                        .as_f64()
                        .map(|v| ValueSource::Constant(v as f32))
                        .ok_or_else(|| config_err(format!("invalid 'value' {}", n)))?,
                    Some(Value::String(s)) if s.trim().is_empty() => {
                        return Err(config_err("Empty field 'value' in params".to_string()))
                    }
                    Some(Value::String(s)) => ValueSource::Template(s.clone()),
                    Some(other) => {
                        return Err(config_err(format!(
                            "Invalid type for 'value' in params: {}",
                            other
                        )))
                    }
                    None => return Err(config_err("missing 'value' in params".to_string())),
                };
                let required = param_bool(&def.params, "required")
                    .map_err(config_err)?
                    .unwrap_or(false);
                FeatureKind::Value { value, required }
            }
            "OriginalScoreFeature" => FeatureKind::OriginalScore,
            "FieldValueFeature" => {
                let field = param_str(&def.params, "field")
                    .map_err(config_err)?
                    .filter(|f| !f.is_empty())
                    .ok_or_else(|| config_err("missing 'field' in params".to_string()))?;
                FeatureKind::FieldValue {
                    field: field.to_string(),
                }
            }
            other => {
                return Err(LtrError::FeatureConfig(format!(
                    "unknown feature class {} for feature {}",
                    other, def.name
                )))
            }
        };

        Ok(Feature {
            name: def.name.clone(),
            index,
            kind,
            params: def.params.clone(),
            default_value,
        })
    }

    /// Feature name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of the feature in its store
    pub fn index(&self) -> usize {
        self.index
    }

    /// Feature kind
    pub fn kind(&self) -> &FeatureKind {
        &self.kind
    }

    /// Definition parameters
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Value used when the feature does not fire
    pub fn default_value(&self) -> f32 {
        self.default_value
    }

    /// Persisted form of this feature
    pub fn to_definition(&self, store: Option<&str>) -> FeatureDefinition {
        FeatureDefinition {
            name: self.name.clone(),
            class: self.kind.class_name().to_string(),
            params: self.params.clone(),
            store: store.map(str::to_string),
        }
    }

    /// Bind the feature to a request
    ///
    /// # Errors
    ///
    /// - `RequiredParameterMissing` if a required value references external
    ///   feature info the request did not supply
    /// - `FeatureConfig` if the expanded value is not a float
    pub fn create_weight(self: &Arc<Self>, ctx: &FeatureContext<'_>) -> LtrResult<FeatureWeight> {
        let source = match &self.kind {
            FeatureKind::Value {
                value: ValueSource::Constant(v),
                ..
            } => WeightSource::Constant(Some(*v)),
            FeatureKind::Value {
                value: ValueSource::Template(template),
                required,
            } => match expand_macros(template, ctx.efi) {
                Ok(expanded) => {
                    let v = expanded.trim().parse::<f32>().map_err(|_| {
                        LtrError::FeatureConfig(format!(
                            "{}: value '{}' cannot be converted to float",
                            self.name, expanded
                        ))
                    })?;
                    WeightSource::Constant(Some(v))
                }
                Err(param) if *required => {
                    return Err(LtrError::RequiredParameterMissing {
                        feature: self.name.clone(),
                        param,
                    })
                }
                Err(_) => WeightSource::Constant(None),
            },
            FeatureKind::OriginalScore => WeightSource::OriginalScore,
            FeatureKind::FieldValue { field } => WeightSource::Field(field.clone()),
        };

        Ok(FeatureWeight {
            feature: Arc::clone(self),
            reader: Arc::clone(&ctx.reader),
            source,
        })
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [name={}, params={}]",
            self.kind.class_name(),
            self.name,
            Value::Object(self.params.clone())
        )
    }
}

/// Expand `${name}` and `${name:default}` references against `efi`
///
/// Returns the name of the first reference that has neither a value nor a
/// default.
fn expand_macros(template: &str, efi: &ExternalParams) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated reference is literal text
            out.push_str(&rest[start..]);
            return Ok(out);
        };
        let reference = &after[..end];
        let (name, default) = match reference.split_once(':') {
            Some((name, default)) => (name, Some(default)),
            None => (reference, None),
        };
        match efi.get(name).map(String::as_str).or(default) {
            Some(value) => out.push_str(value),
            None => return Err(name.to_string()),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

// ============================================================================
// FeatureContext / FeatureWeight
// ============================================================================

/// Request-level inputs available when binding features
pub struct FeatureContext<'a> {
    /// Index being reranked
    pub reader: Arc<dyn IndexReader>,
    /// Whether scores (not only matches) are needed
    pub needs_scores: bool,
    /// Raw request parameters
    pub request: &'a RequestParams,
    /// Text of the first-pass query, if known
    pub original_query: Option<&'a str>,
    /// External feature info
    pub efi: &'a ExternalParams,
}

enum WeightSource {
    /// None: the value referenced missing external info
    Constant(Option<f32>),
    OriginalScore,
    Field(String),
}

/// A feature bound to one request
///
/// Shared read-only across segment scoring tasks.
pub struct FeatureWeight {
    feature: Arc<Feature>,
    reader: Arc<dyn IndexReader>,
    source: WeightSource,
}

impl FeatureWeight {
    /// The bound feature
    pub fn feature(&self) -> &Arc<Feature> {
        &self.feature
    }

    /// Feature name
    pub fn name(&self) -> &str {
        self.feature.name()
    }

    /// Position of the feature in its store
    pub fn index(&self) -> usize {
        self.feature.index()
    }

    /// Value used when the feature does not fire
    pub fn default_value(&self) -> f32 {
        self.feature.default_value()
    }

    /// Cursor over the documents of `segment` for which the feature fires
    ///
    /// Returns None when the feature cannot fire anywhere in the segment.
    pub fn scorer(&self, segment: &SegmentContext) -> LtrResult<Option<Box<dyn FeatureScorer>>> {
        let scorer: Option<Box<dyn FeatureScorer>> = match &self.source {
            WeightSource::Constant(Some(value)) => Some(Box::new(AllDocsScorer::new(
                segment.max_doc,
                AllDocsValue::Fixed(*value),
            ))),
            WeightSource::Constant(None) => None,
            WeightSource::OriginalScore => Some(Box::new(AllDocsScorer::new(
                segment.max_doc,
                AllDocsValue::OriginalScore(self.default_value()),
            ))),
            WeightSource::Field(field) => self
                .reader
                .doc_values(segment, field)
                .map(|column| Box::new(ColumnScorer::new(column)) as Box<dyn FeatureScorer>),
        };
        Ok(scorer)
    }

    /// Explain the raw value of the feature for a segment-local document
    pub fn explain(
        &self,
        segment: &SegmentContext,
        doc: DocId,
        info: &DocInfo,
    ) -> LtrResult<Explanation> {
        if let Some(mut scorer) = self.scorer(segment)? {
            if scorer.doc_id() < doc {
                scorer.advance(doc);
            }
            if scorer.doc_id() == doc {
                return Ok(Explanation::new(scorer.score(info), self.feature.to_string()));
            }
        }
        Ok(Explanation::new(
            self.default_value(),
            format!("{} (not matched, default value)", self.feature),
        ))
    }
}

// ============================================================================
// FeatureScorer
// ============================================================================

/// Forward-only cursor over the segment-local documents a feature fires on
///
/// A cursor starts positioned on its first document (or `NO_MORE_DOCS`).
pub trait FeatureScorer: Send {
    /// Current document
    fn doc_id(&self) -> DocId;

    /// Move to the first document `>= target` and return it
    ///
    /// Returns `NO_MORE_DOCS` when the cursor is exhausted.
    fn advance(&mut self, target: DocId) -> DocId;

    /// Feature value for the current document
    fn score(&self, info: &DocInfo) -> f32;
}

enum AllDocsValue {
    Fixed(f32),
    /// Read from DocInfo; the f32 is the fallback
    OriginalScore(f32),
}

/// Matches every document of the segment
struct AllDocsScorer {
    doc: DocId,
    max_doc: u32,
    value: AllDocsValue,
}

impl AllDocsScorer {
    fn new(max_doc: u32, value: AllDocsValue) -> Self {
        AllDocsScorer {
            doc: if max_doc == 0 { NO_MORE_DOCS } else { 0 },
            max_doc,
            value,
        }
    }
}

impl FeatureScorer for AllDocsScorer {
    fn doc_id(&self) -> DocId {
        self.doc
    }

    fn advance(&mut self, target: DocId) -> DocId {
        self.doc = if target < self.max_doc {
            target
        } else {
            NO_MORE_DOCS
        };
        self.doc
    }

    fn score(&self, info: &DocInfo) -> f32 {
        match self.value {
            AllDocsValue::Fixed(v) => v,
            AllDocsValue::OriginalScore(fallback) => info.original_score().unwrap_or(fallback),
        }
    }
}

/// Walks a sorted sparse doc-value column
struct ColumnScorer {
    column: Arc<[(DocId, f32)]>,
    pos: usize,
}

impl ColumnScorer {
    fn new(column: Arc<[(DocId, f32)]>) -> Self {
        ColumnScorer { column, pos: 0 }
    }
}

impl FeatureScorer for ColumnScorer {
    fn doc_id(&self) -> DocId {
        self.column
            .get(self.pos)
            .map(|(doc, _)| *doc)
            .unwrap_or(NO_MORE_DOCS)
    }

    fn advance(&mut self, target: DocId) -> DocId {
        let remaining = &self.column[self.pos.min(self.column.len())..];
        self.pos += remaining.partition_point(|(doc, _)| *doc < target);
        self.doc_id()
    }

    fn score(&self, _info: &DocInfo) -> f32 {
        self.column.get(self.pos).map(|(_, v)| *v).unwrap_or(0.0)
    }
}
