//! Error types for `appcat-core`.

use thiserror::Error;

use crate::query::IndexName;

#[derive(Debug, Error)]
pub enum Error {
  // ── Record construction ───────────────────────────────────────────────────
  #[error("invalid app id: {0}")]
  InvalidKey(String),

  #[error("unknown attribute: {0:?}")]
  UnknownField(String),

  #[error("malformed timestamp for {field}: {value:?}")]
  MalformedTimestamp { field: String, value: String },

  #[error("cannot coerce {field} to {expected}: {value}")]
  InvalidFieldValue {
    field:    String,
    expected: &'static str,
    value:    String,
  },

  // ── Writes ────────────────────────────────────────────────────────────────
  #[error("record ({app_id}, {country}) already exists")]
  Conflict { app_id: i64, country: String },

  // ── Query building ────────────────────────────────────────────────────────
  #[error("invalid price range: {0}")]
  InvalidRange(String),

  #[error("query needs {wanted} but is already pinned to {pinned}")]
  IncompatibleIndex { pinned: IndexName, wanted: IndexName },

  #[error("device name {0:?} matches no device family")]
  InvalidDeviceName(String),

  #[error("attribute {0:?} has no declared index")]
  UnindexedAttribute(String),

  #[error("{attribute} can only be compared to {expected}")]
  InvalidOperand {
    attribute: String,
    expected:  &'static str,
  },

  #[error("query selects no index")]
  NoIndex,

  #[error("query against {0} has no partition key equality")]
  MissingPartitionKey(IndexName),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
