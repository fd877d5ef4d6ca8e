//! Handlers for `/apps/{app_id}/{country}`.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/apps/{app_id}/{country}` | 404 if not found |
//! | `DELETE` | `/apps/{app_id}/{country}` | 204, also when absent |

use std::sync::Arc;

use appcat_core::{
  record::{AppRecord, IntoAppId},
  store::AppStore,
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};

use crate::error::ApiError;

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /apps/{app_id}/{country}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path((app_id, country)): Path<(String, String)>,
) -> Result<Json<AppRecord>, ApiError>
where
  S: AppStore,
{
  let app_id = app_id.into_app_id()?;
  let record = store
    .get(app_id, &country)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("app {app_id} not found in {country}")))?;
  Ok(Json(record))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /apps/{app_id}/{country}`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path((app_id, country)): Path<(String, String)>,
) -> Result<StatusCode, ApiError>
where
  S: AppStore,
{
  let app_id = app_id.into_app_id()?;
  store
    .delete(app_id, &country)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
