//! Feature vector logging
//!
//! A `FeatureLogger` turns the feature info table of a scored document into
//! a `FeatureVector`. Two independent choices shape the output:
//!
//! - `FeatureFormat`: dense vectors emit every extracted feature (unfired
//!   ones with their default value), sparse vectors only the fired ones.
//!   Both keep store order.
//! - encoding: `csv` renders `name=value,name=value`, `json` keeps ordered
//!   `(name, value)` pairs that serialize as a JSON object. CSV values use
//!   `1.0`/`1.0E-5` style float text.

use crate::scorer::FeatureInfo;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use tracing::warn;

/// Default CSV separator between a feature name and its value
pub const DEFAULT_KEY_VALUE_SEPARATOR: char = '=';

/// Default CSV separator between features
pub const DEFAULT_FEATURE_SEPARATOR: char = ',';

/// Which features a logged vector contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureFormat {
    /// Every extracted feature
    Dense,
    /// Only features that fired
    #[default]
    Sparse,
}

impl FeatureFormat {
    /// Parse a format name
    ///
    /// Missing, empty and `sparse` select Sparse, `dense` selects Dense.
    /// Anything else falls back to Sparse with a warning.
    pub fn parse(format: Option<&str>) -> Self {
        match format {
            None | Some("") | Some("sparse") => FeatureFormat::Sparse,
            Some("dense") => FeatureFormat::Dense,
            Some(other) => {
                warn!(target: "ltrank::logger", format = other, "Unknown feature format, using sparse");
                FeatureFormat::Sparse
            }
        }
    }

    fn includes(self, info: &FeatureInfo) -> bool {
        self == FeatureFormat::Dense || info.is_used()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Encoding {
    Csv {
        key_value_separator: char,
        feature_separator: char,
    },
    Map,
}

/// A logged feature vector
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureVector {
    /// `name=value,...` string
    Csv(String),
    /// Ordered feature name/value pairs
    Map(Vec<(String, f32)>),
}

impl FeatureVector {
    /// Whether no feature was logged
    pub fn is_empty(&self) -> bool {
        match self {
            FeatureVector::Csv(s) => s.is_empty(),
            FeatureVector::Map(pairs) => pairs.is_empty(),
        }
    }

    /// Value logged for `name`
    pub fn get(&self, name: &str) -> Option<f32> {
        match self {
            FeatureVector::Map(pairs) => pairs.iter().find(|(n, _)| n == name).map(|(_, v)| *v),
            FeatureVector::Csv(_) => None,
        }
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FeatureVector::Csv(s) => serializer.serialize_str(s),
            FeatureVector::Map(pairs) => {
                let mut map = serializer.serialize_map(Some(pairs.len()))?;
                for (name, value) in pairs {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureVector::Csv(s) => f.write_str(s),
            FeatureVector::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

/// Builds feature vectors for documents kept by a rescore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLogger {
    format: FeatureFormat,
    encoding: Encoding,
    store: Option<String>,
}

impl FeatureLogger {
    /// CSV logger with the default separators
    pub fn csv(format: FeatureFormat) -> Self {
        FeatureLogger {
            format,
            encoding: Encoding::Csv {
                key_value_separator: DEFAULT_KEY_VALUE_SEPARATOR,
                feature_separator: DEFAULT_FEATURE_SEPARATOR,
            },
            store: None,
        }
    }

    /// Logger producing name/value maps
    pub fn map(format: FeatureFormat) -> Self {
        FeatureLogger {
            format,
            encoding: Encoding::Map,
            store: None,
        }
    }

    /// Select a logger from request strings
    ///
    /// `string_format` is `csv` (also when missing or empty) or `json`. An
    /// unknown string format yields no logger.
    pub fn from_formats(string_format: Option<&str>, feature_format: Option<&str>) -> Option<Self> {
        let format = FeatureFormat::parse(feature_format);
        match string_format {
            None | Some("") | Some("csv") => Some(Self::csv(format)),
            Some("json") => Some(Self::map(format)),
            Some(other) => {
                warn!(
                    target: "ltrank::logger",
                    string_format = other,
                    feature_format = ?feature_format,
                    "Unknown feature logger string format, features will not be logged"
                );
                None
            }
        }
    }

    /// Builder: CSV separators (ignored by map loggers)
    pub fn with_separators(mut self, key_value: char, feature: char) -> Self {
        if let Encoding::Csv {
            key_value_separator,
            feature_separator,
        } = &mut self.encoding
        {
            *key_value_separator = key_value;
            *feature_separator = feature;
        }
        self
    }

    /// Builder: feature store the vectors are logged against
    ///
    /// Without a store, vectors are logged against the model's own store.
    pub fn with_store(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }

    /// Dense or sparse
    pub fn format(&self) -> FeatureFormat {
        self.format
    }

    /// Store the vectors are logged against, if set
    pub fn store(&self) -> Option<&str> {
        self.store.as_deref()
    }

    /// Build the vector for one document
    pub fn make_feature_vector(&self, infos: &[FeatureInfo]) -> FeatureVector {
        let logged = infos.iter().filter(|info| self.format.includes(info));
        match &self.encoding {
            Encoding::Csv {
                key_value_separator,
                feature_separator,
            } => {
                let mut out = String::new();
                for info in logged {
                    if !out.is_empty() {
                        out.push(*feature_separator);
                    }
                    out.push_str(info.name());
                    out.push(*key_value_separator);
                    push_float(&mut out, info.value());
                }
                FeatureVector::Csv(out)
            }
            Encoding::Map => FeatureVector::Map(
                logged
                    .map(|info| (info.name().to_string(), info.value()))
                    .collect(),
            ),
        }
    }
}

/// Append `value` the way CSV consumers of logged vectors expect it
///
/// Shortest round-trip digits. Magnitudes in `[1e-3, 1e7)` are written as a
/// plain decimal with at least one fractional digit (`0.5`, `3.0`); others
/// in computerized scientific notation (`1.0E-5`, `1.2345E7`).
fn push_float(out: &mut String, value: f32) {
    if value.is_nan() {
        out.push_str("NaN");
        return;
    }
    if value.is_sign_negative() {
        out.push('-');
    }
    let magnitude = value.abs();
    if magnitude.is_infinite() {
        out.push_str("Infinity");
        return;
    }
    if magnitude == 0.0 {
        out.push_str("0.0");
        return;
    }

    // `{:e}` yields the shortest digits as `d[.ddd]e[-]x`
    let sci = format!("{:e}", magnitude);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let (lead, rest) = digits.split_at(1);

    if (1e-3..1e7).contains(&magnitude) {
        if exponent < 0 {
            out.push_str("0.");
            for _ in 0..(-exponent - 1) {
                out.push('0');
            }
            out.push_str(&digits);
        } else {
            let int_len = exponent as usize + 1;
            if digits.len() > int_len {
                out.push_str(&digits[..int_len]);
                out.push('.');
                out.push_str(&digits[int_len..]);
            } else {
                out.push_str(&digits);
                for _ in digits.len()..int_len {
                    out.push('0');
                }
                out.push_str(".0");
            }
        }
    } else {
        out.push_str(lead);
        out.push('.');
        out.push_str(if rest.is_empty() { "0" } else { rest });
        out.push('E');
        out.push_str(&exponent.to_string());
    }
}
