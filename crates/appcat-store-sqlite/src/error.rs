//! Error type for `appcat-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Schema, query-validation, and conflict errors from `appcat-core`.
  #[error(transparent)]
  Core(#[from] appcat_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

impl Error {
  pub fn is_conflict(&self) -> bool {
    matches!(self, Self::Core(appcat_core::Error::Conflict { .. }))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
