//! JSON REST API for the app catalog.
//!
//! Exposes an axum [`Router`] backed by any [`appcat_core::store::AppStore`].
//! TLS and other transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", appcat_api::api_router(store.clone()))
//! ```

pub mod apps;
pub mod error;
pub mod search;

use std::sync::Arc;

use appcat_core::store::AppStore;
use axum::{Router, routing::get};

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: AppStore + 'static,
{
  Router::new()
    // Queries
    .route("/apps/by-price", get(search::by_price::<S>))
    .route("/apps/by-device", get(search::by_device::<S>))
    // Point operations
    .route("/apps/{app_id}/{country}", get(apps::get_one::<S>).delete(apps::delete_one::<S>))
    .with_state(store)
}
