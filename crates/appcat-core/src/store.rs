//! The `AppStore` trait: the contract every storage backend fulfils.
//!
//! Backends own durability and never reinterpret record fields. They answer
//! point operations on the composite key `(app_id, country)` and queries
//! pinned to a declared secondary index; there is no scan operation.

use std::future::Future;

use crate::{
  query::{IndexQuery, QueryBuilder, Records},
  record::AppRecord,
};

/// Abstraction over a catalog storage backend.
///
/// `upsert` must be safe to call concurrently for different keys. Reads may
/// run alongside writes and see a table in the middle of an ingestion run;
/// no cross-record snapshot is promised.
pub trait AppStore: Send + Sync {
  type Error: std::error::Error + From<crate::Error> + Send + Sync + 'static;

  /// Point lookup. A miss is `Ok(None)`, not an error.
  fn get<'a>(
    &'a self,
    app_id: i64,
    country: &'a str,
  ) -> impl Future<Output = Result<Option<AppRecord>, Self::Error>> + Send + 'a;

  /// Write the full record image for its key.
  ///
  /// With `overwrite == false` an existing record fails the write with
  /// [`crate::Error::Conflict`]; with `overwrite == true` it is replaced
  /// wholesale, never merged.
  fn upsert<'a>(
    &'a self,
    record: &'a AppRecord,
    overwrite: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove a record. Deleting an absent key succeeds.
  fn delete<'a>(
    &'a self,
    app_id: i64,
    country: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Run a query against its index. Implementations must call
  /// [`IndexQuery::validate`] before touching storage.
  fn query<'a>(
    &'a self,
    query: &'a IndexQuery,
  ) -> impl Future<Output = Result<Records, Self::Error>> + Send + 'a;
}

/// Entry point for fluent queries on any store.
pub trait AppStoreExt: AppStore {
  fn find(&self) -> QueryBuilder<'_, Self> { QueryBuilder::new(self) }
}

impl<S: AppStore + ?Sized> AppStoreExt for S {}
