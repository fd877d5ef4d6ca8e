//! Core types and trait definitions for the app catalog.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! owns the record schema, the device-family derivation, the query builder,
//! and the traits storage backends and storefront clients implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod device;
pub mod error;
pub mod lookup;
pub mod query;
pub mod record;
pub mod schema;
pub mod store;

pub use error::{Error, Result};
