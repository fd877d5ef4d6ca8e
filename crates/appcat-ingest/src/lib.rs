//! Storefront ingestion for the app catalog.
//!
//! Fetches raw metadata for every `(app_id, country)` pair from the
//! storefront lookup endpoint, builds records through `appcat-core`, and
//! upserts them into any [`appcat_core::store::AppStore`].

pub mod config;
pub mod error;
pub mod lookup;
pub mod pipeline;

pub use error::{Error, Result};
pub use lookup::StorefrontClient;
pub use pipeline::{IngestOptions, IngestReport, Ingestor};
