//! Normalisation of payloads exchanged with the payroll backend.
//!
//! The backend is not strict about its JSON: monetary values arrive
//! as numbers or as decimal strings, identifiers as integers or
//! strings, and list endpoints answer either with a bare array or
//! with a paginated `{results, count, next, previous}` object.  The
//! helpers in this module absorb those differences at the boundary
//! so the rest of the crate only ever sees one typed shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Parses a decimal-like JSON value.  Numbers are taken as-is,
/// strings are trimmed and parsed; anything else yields `None`.
pub fn parse_decimal(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|parsed| parsed.is_finite()),
        _ => None,
    }
}

/// Deserialises a required monetary field, treating missing or
/// non-numeric input as zero.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_decimal).unwrap_or(0.0))
}

/// Deserialises an optional monetary field.  Non-numeric input is
/// reported as absent, which the evaluator later treats as zero.
pub fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_decimal))
}

/// Deserialises an identifier sent either as a string or a number.
pub fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or numeric identifier, found {other}"
        ))),
    }
}

/// A page of records, normalised from either response shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of records on the server, when the response was
    /// paginated.  Bare arrays carry no total.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl<T> Page<T> {
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: None,
        }
    }
}

impl<T> From<Vec<T>> for Page<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items, total: None }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageRepr<T> {
    Paginated {
        results: Vec<T>,
        #[serde(default)]
        count: Option<u64>,
    },
    Bare(Vec<T>),
}

impl<'de, T> Deserialize<'de> for Page<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match PageRepr::deserialize(deserializer)? {
            PageRepr::Paginated { results, count } => Page {
                items: results,
                total: count,
            },
            PageRepr::Bare(items) => Page { items, total: None },
        })
    }
}
