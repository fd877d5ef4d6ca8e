//! Handlers for the index-backed query endpoints.
//!
//! Both endpoints go through the query builder, so invalid ranges, unknown
//! device names and index conflicts are rejected with 400 before the store
//! is touched.

use std::sync::Arc;

use appcat_core::{
  query::IndexQuery,
  record::AppRecord,
  store::{AppStore, AppStoreExt},
};
use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct PriceParams {
  pub currency: String,
  pub low:      f64,
  /// Omit for an exact-price match.
  pub high:     Option<f64>,
}

/// `GET /apps/by-price?currency=USD&low=1.5[&high=3.5]`
pub async fn by_price<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<PriceParams>,
) -> Result<Json<Vec<AppRecord>>, ApiError>
where
  S: AppStore,
{
  let query = store
    .find()
    .by_price(params.currency, params.low, params.high)
    .build()?;
  run(&*store, &query).await
}

#[derive(Debug, Deserialize)]
pub struct DeviceParams {
  pub name: String,
}

/// `GET /apps/by-device?name=iPad2Wifi`
pub async fn by_device<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<DeviceParams>,
) -> Result<Json<Vec<AppRecord>>, ApiError>
where
  S: AppStore,
{
  let query = store.find().by_device(params.name).build()?;
  run(&*store, &query).await
}

async fn run<S>(store: &S, query: &IndexQuery) -> Result<Json<Vec<AppRecord>>, ApiError>
where
  S: AppStore,
{
  let records = store
    .query(query)
    .await
    .map_err(ApiError::store)?
    .collect::<Result<Vec<_>, _>>()?;
  tracing::debug!(index = %query.index, hits = records.len(), "query served");
  Ok(Json(records))
}
