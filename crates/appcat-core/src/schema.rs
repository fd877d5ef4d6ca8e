//! Field kinds and the coercion rules applied to raw storefront values.
//!
//! Each attribute of [`AppAttributes`](crate::record::AppAttributes) is
//! declared with one of the marker types below. The marker fixes both the
//! Rust type stored in the record and the coercion applied to the incoming
//! JSON, so a field can't be declared with one type and filled with another.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::{Error, Result};

/// Wire format of every date-like storefront attribute.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// The declared type of an attribute, as listed in the field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  Integer,
  Float,
  Text,
  Boolean,
  Timestamp,
  TextList,
  TextSet,
}

/// A typed coercion from a raw JSON value.
pub trait Coerce {
  type Value;
  const KIND: FieldKind;

  fn coerce(field: &str, value: Value) -> Result<Self::Value>;
}

/// Coerce through `K`, treating JSON `null` as an absent attribute.
pub(crate) fn coerce_field<K: Coerce>(
  field: &str,
  value: Value,
) -> Result<Option<K::Value>> {
  match value {
    Value::Null => Ok(None),
    other => K::coerce(field, other).map(Some),
  }
}

fn mismatch(field: &str, expected: &'static str, value: &Value) -> Error {
  Error::InvalidFieldValue {
    field: field.to_owned(),
    expected,
    value: value.to_string(),
  }
}

/// Truncate toward zero; `None` if the result doesn't fit an `i64`.
pub(crate) fn truncate(f: f64) -> Option<i64> {
  if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
    Some(f.trunc() as i64)
  } else {
    None
  }
}

/// Parse an integer from text, accepting a float literal and truncating it.
pub(crate) fn parse_integer(s: &str) -> Option<i64> {
  let s = s.trim();
  s.parse::<i64>()
    .ok()
    .or_else(|| s.parse::<f64>().ok().and_then(truncate))
}

/// Parse a storefront timestamp (`YYYY-MM-DDTHH:MM:SSZ`, always UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
  NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
    .ok()
    .map(|naive| naive.and_utc())
}

// ─── Markers ─────────────────────────────────────────────────────────────────

/// 64-bit integer; numeric strings and floats are truncated.
pub struct Integer;

impl Coerce for Integer {
  type Value = i64;
  const KIND: FieldKind = FieldKind::Integer;

  fn coerce(field: &str, value: Value) -> Result<i64> {
    let parsed = match &value {
      Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
      Value::String(s) => parse_integer(s),
      _ => None,
    };
    parsed.ok_or_else(|| mismatch(field, "integer", &value))
  }
}

/// 64-bit float; integers and numeric strings are widened.
pub struct Float;

impl Coerce for Float {
  type Value = f64;
  const KIND: FieldKind = FieldKind::Float;

  fn coerce(field: &str, value: Value) -> Result<f64> {
    let parsed = match &value {
      Value::Number(n) => n.as_f64(),
      Value::String(s) => s.trim().parse::<f64>().ok(),
      _ => None,
    };
    parsed
      .filter(|f| f.is_finite())
      .ok_or_else(|| mismatch(field, "float", &value))
  }
}

pub struct Text;

impl Coerce for Text {
  type Value = String;
  const KIND: FieldKind = FieldKind::Text;

  fn coerce(field: &str, value: Value) -> Result<String> {
    match value {
      Value::String(s) => Ok(s),
      other => Err(mismatch(field, "string", &other)),
    }
  }
}

pub struct Boolean;

impl Coerce for Boolean {
  type Value = bool;
  const KIND: FieldKind = FieldKind::Boolean;

  fn coerce(field: &str, value: Value) -> Result<bool> {
    match value {
      Value::Bool(b) => Ok(b),
      other => Err(mismatch(field, "boolean", &other)),
    }
  }
}

/// Absolute instant parsed from [`TIMESTAMP_FORMAT`].
pub struct Timestamp;

impl Coerce for Timestamp {
  type Value = DateTime<Utc>;
  const KIND: FieldKind = FieldKind::Timestamp;

  fn coerce(field: &str, value: Value) -> Result<DateTime<Utc>> {
    let parsed = match &value {
      Value::String(s) => parse_timestamp(s),
      _ => None,
    };
    parsed.ok_or_else(|| Error::MalformedTimestamp {
      field: field.to_owned(),
      value: match value {
        Value::String(s) => s,
        other => other.to_string(),
      },
    })
  }
}

/// Sequence of strings where order carries no meaning. Numeric elements are
/// kept as their decimal text.
pub struct TextList;

impl Coerce for TextList {
  type Value = Vec<String>;
  const KIND: FieldKind = FieldKind::TextList;

  fn coerce(field: &str, value: Value) -> Result<Vec<String>> {
    text_elements(field, value)
  }
}

/// Set of strings where uniqueness matters (e.g. `supportedDevices`).
pub struct TextSet;

impl Coerce for TextSet {
  type Value = BTreeSet<String>;
  const KIND: FieldKind = FieldKind::TextSet;

  fn coerce(field: &str, value: Value) -> Result<BTreeSet<String>> {
    Ok(text_elements(field, value)?.into_iter().collect())
  }
}

fn text_elements(field: &str, value: Value) -> Result<Vec<String>> {
  let Value::Array(items) = value else {
    return Err(mismatch(field, "list of strings", &value));
  };
  items
    .into_iter()
    .map(|item| match item {
      Value::String(s) => Ok(s),
      Value::Number(n) => Ok(n.to_string()),
      other => Err(mismatch(field, "list of strings", &other)),
    })
    .collect()
}
