//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

/// Key and query-building errors are the caller's fault; anything else from
/// core means the store broke.
impl From<appcat_core::Error> for ApiError {
  fn from(e: appcat_core::Error) -> Self {
    use appcat_core::Error as E;
    match e {
      E::InvalidKey(_)
      | E::InvalidRange(_)
      | E::IncompatibleIndex { .. }
      | E::InvalidDeviceName(_)
      | E::UnindexedAttribute(_)
      | E::InvalidOperand { .. }
      | E::NoIndex
      | E::MissingPartitionKey(_) => Self::BadRequest(e.to_string()),
      other => Self::store(other),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
