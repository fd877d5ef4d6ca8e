//! SQLite backend for the app catalog.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The declared secondary indexes are
//! plain SQL indexes, and every query names its index with `INDEXED BY`, so
//! SQLite fails the statement instead of falling back to a table scan.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
