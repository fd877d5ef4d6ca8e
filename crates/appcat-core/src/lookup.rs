//! The external storefront lookup contract.
//!
//! A lookup answers "what does the storefront know about this app in this
//! country": `Ok(None)` when it knows nothing, otherwise the first raw result.

use std::future::Future;

use crate::record::RawAttributes;

pub trait Lookup: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn lookup<'a>(
    &'a self,
    app_id: i64,
    country: &'a str,
  ) -> impl Future<Output = Result<Option<RawAttributes>, Self::Error>> + Send + 'a;
}
