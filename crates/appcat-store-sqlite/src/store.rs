//! [`SqliteStore`], the SQLite implementation of [`AppStore`].

use std::path::Path;

use appcat_core::{
  query::{IndexQuery, Records},
  record::AppRecord,
  store::AppStore,
};
use rusqlite::{ErrorCode, OptionalExtension as _};
use tracing::debug;

use crate::{
  Error, Result,
  encode::{RawRow, select},
  schema::SCHEMA,
};

const INSERT: &str = "INSERT INTO apps (
    app_id, country, currency, price,
    supports_phone, supports_pad, supports_pod,
    phone_devices, pad_devices, pod_devices,
    record_json
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

const REPLACE: &str = "INSERT OR REPLACE INTO apps (
    app_id, country, currency, price,
    supports_phone, supports_pad, supports_pod,
    phone_devices, pad_devices, pod_devices,
    record_json
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A catalog store backed by a single SQLite file.
///
/// Cloning shares the underlying connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of stored records.
  pub async fn len(&self) -> Result<usize> {
    let count: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM apps", [], |r| r.get(0))?))
      .await?;
    Ok(count.try_into().unwrap_or_default())
  }

  pub async fn is_empty(&self) -> Result<bool> { Ok(self.len().await? == 0) }
}

// ─── AppStore impl ───────────────────────────────────────────────────────────

impl AppStore for SqliteStore {
  type Error = Error;

  async fn get(&self, app_id: i64, country: &str) -> Result<Option<AppRecord>> {
    let country = country.to_owned();

    let image: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT record_json FROM apps WHERE app_id = ?1 AND country = ?2",
            rusqlite::params![app_id, country],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    Ok(image.as_deref().map(AppRecord::from_json).transpose()?)
  }

  async fn upsert(&self, record: &AppRecord, overwrite: bool) -> Result<()> {
    let row = RawRow::from_record(record)?;
    let sql = if overwrite { REPLACE } else { INSERT };

    let written: bool = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          sql,
          rusqlite::params![
            row.app_id,
            row.country,
            row.currency,
            row.price,
            row.supports_phone,
            row.supports_pad,
            row.supports_pod,
            row.phone_devices,
            row.pad_devices,
            row.pod_devices,
            row.record_json,
          ],
        );
        match result {
          Ok(_) => Ok(true),
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::ConstraintViolation =>
          {
            Ok(false)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !written {
      return Err(Error::Core(appcat_core::Error::Conflict {
        app_id:  record.app_id(),
        country: record.country().to_owned(),
      }));
    }

    debug!(app_id = record.app_id(), country = record.country(), overwrite, "upserted record");
    Ok(())
  }

  async fn delete(&self, app_id: i64, country: &str) -> Result<()> {
    let country = country.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM apps WHERE app_id = ?1 AND country = ?2",
          rusqlite::params![app_id, country],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Matching images are read in one statement; each is decoded only when
  /// the returned [`Records`] is advanced.
  async fn query(&self, query: &IndexQuery) -> Result<Records> {
    query.validate()?;
    let select = select(query);
    debug!(index = %query.index, sql = %select.sql, "index query");

    let images: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&select.sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(select.params), |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(Records::new(
      images.into_iter().map(|image| AppRecord::from_json(&image)),
    ))
  }
}
