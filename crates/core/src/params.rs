//! Parameter maps
//!
//! - `Params`: free-form JSON parameters attached to feature, normalizer and
//!   model definitions
//! - `ExternalParams`: external feature info ("efi") supplied by the caller
//!   with a request, e.g. query intent values
//! - `DocInfo`: extra per-document values injected before a document is
//!   scored, such as its first-pass score

use serde_json::Value;
use std::collections::HashMap;

/// Free-form definition parameters
pub type Params = serde_json::Map<String, Value>;

/// External feature info: parameter name -> raw value
pub type ExternalParams = HashMap<String, String>;

/// Raw request parameters
pub type RequestParams = HashMap<String, String>;

/// Prefix marking external feature info in request parameters
pub const EFI_PREFIX: &str = "efi.";

/// DocInfo key holding the first-pass score of the document being scored
pub const ORIGINAL_DOC_SCORE: &str = "ORIGINAL_DOC_SCORE";

/// Collect `efi.<name>=<value>` request parameters into an ExternalParams map
pub fn extract_efi_params(params: &RequestParams) -> ExternalParams {
    params
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(EFI_PREFIX)
                .filter(|name| !name.is_empty())
                .map(|name| (name.to_string(), value.clone()))
        })
        .collect()
}

/// Convert a JSON number or numeric string to f32
pub fn to_f32(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|v| v as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    }
}

/// Read an optional float parameter
///
/// Returns `Err` with a description when the parameter is present but not
/// convertible to a float.
pub fn param_f32(params: &Params, key: &str) -> Result<Option<f32>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => to_f32(value)
            .map(Some)
            .ok_or_else(|| format!("'{}' cannot be converted to float: {}", key, value)),
    }
}

/// Read an optional boolean parameter (JSON bool or "true"/"false")
pub fn param_bool(params: &Params, key: &str) -> Result<Option<bool>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) => match s.trim() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(format!("'{}' cannot be converted to bool: {}", key, s)),
        },
        Some(other) => Err(format!("'{}' cannot be converted to bool: {}", key, other)),
    }
}

/// Read an optional string parameter
pub fn param_str<'a>(params: &'a Params, key: &str) -> Result<Option<&'a str>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(format!("'{}' must be a string: {}", key, other)),
    }
}

// ============================================================================
// DocInfo
// ============================================================================

/// Extra per-document values made available to feature scorers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocInfo {
    values: HashMap<String, f32>,
}

impl DocInfo {
    /// Create an empty DocInfo
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value
    pub fn set(&mut self, key: impl Into<String>, value: f32) {
        self.values.insert(key.into(), value);
    }

    /// Get a value
    pub fn get(&self, key: &str) -> Option<f32> {
        self.values.get(key).copied()
    }

    /// Set the first-pass score of the current document
    pub fn set_original_score(&mut self, score: f32) {
        self.set(ORIGINAL_DOC_SCORE, score);
    }

    /// First-pass score of the current document
    pub fn original_score(&self) -> Option<f32> {
        self.get(ORIGINAL_DOC_SCORE)
    }

    /// Remove all values
    pub fn clear(&mut self) {
        self.values.clear();
    }
}
