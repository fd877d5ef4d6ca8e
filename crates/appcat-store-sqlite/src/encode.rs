//! Encoding between catalog types and SQLite columns, and translation of an
//! [`IndexQuery`] into SQL.
//!
//! Device subsets are stored as compact JSON arrays; flags as `1` or `NULL`.
//! The `record_json` column holds the full image and is the only column read
//! back; the others exist to be indexed and filtered on.

use std::collections::BTreeSet;

use appcat_core::{
  device::DeviceFamily,
  query::{Attribute, IndexQuery, Operand, Predicate},
  record::AppRecord,
};
use rusqlite::types::Value;

use crate::Result;

// ─── Rows ────────────────────────────────────────────────────────────────────

/// Column values for one `apps` row, ready to bind.
pub struct RawRow {
  pub app_id:         i64,
  pub country:        String,
  pub currency:       Option<String>,
  pub price:          Option<f64>,
  pub supports_phone: Option<i64>,
  pub supports_pad:   Option<i64>,
  pub supports_pod:   Option<i64>,
  pub phone_devices:  Option<String>,
  pub pad_devices:    Option<String>,
  pub pod_devices:    Option<String>,
  pub record_json:    String,
}

impl RawRow {
  pub fn from_record(record: &AppRecord) -> Result<Self> {
    let flag = |family: DeviceFamily| record.supports(family).then_some(1_i64);
    let subset = |family: DeviceFamily| {
      record
        .devices()
        .devices(family)
        .map(encode_devices)
        .transpose()
    };

    Ok(Self {
      app_id:         record.app_id(),
      country:        record.country().to_owned(),
      currency:       record.currency().map(str::to_owned),
      price:          record.price(),
      supports_phone: flag(DeviceFamily::Phone),
      supports_pad:   flag(DeviceFamily::Pad),
      supports_pod:   flag(DeviceFamily::Pod),
      phone_devices:  subset(DeviceFamily::Phone)?,
      pad_devices:    subset(DeviceFamily::Pad)?,
      pod_devices:    subset(DeviceFamily::Pod)?,
      record_json:    record.to_json()?,
    })
  }
}

fn encode_devices(devices: &BTreeSet<String>) -> Result<String> {
  Ok(serde_json::to_string(devices)?)
}

// ─── Queries ─────────────────────────────────────────────────────────────────

pub fn column(attribute: Attribute) -> &'static str {
  // Column names are the stored attribute names.
  attribute.name()
}

fn bind(operand: &Operand) -> Value {
  match operand {
    Operand::Text(s) => Value::Text(s.clone()),
    Operand::Number(n) => Value::Real(*n),
    Operand::Flag(b) => Value::Integer(i64::from(*b)),
  }
}

/// A prepared `SELECT` for an index query: SQL text plus positional params.
#[derive(Debug)]
pub struct Select {
  pub sql:    String,
  pub params: Vec<Value>,
}

/// Translate a validated query. The statement is pinned to the query's index
/// with `INDEXED BY`.
pub fn select(query: &IndexQuery) -> Select {
  let mut conds = Vec::with_capacity(query.predicates.len());
  let mut params = Vec::new();

  for predicate in &query.predicates {
    let col = column(predicate.attribute());
    match predicate {
      Predicate::Eq(_, operand) => {
        params.push(bind(operand));
        conds.push(format!("{col} = ?{}", params.len()));
      }
      Predicate::Between(_, low, high) => {
        params.push(Value::Real(*low));
        params.push(Value::Real(*high));
        conds.push(format!("{col} BETWEEN ?{} AND ?{}", params.len() - 1, params.len()));
      }
      Predicate::Contains(_, member) => {
        params.push(Value::Text(member.clone()));
        conds.push(format!(
          "EXISTS (SELECT 1 FROM json_each(apps.{col}) WHERE json_each.value = ?{})",
          params.len()
        ));
      }
    }
  }

  let sql = format!(
    "SELECT record_json FROM apps INDEXED BY \"{}\" WHERE {}",
    query.index.as_str(),
    conds.join(" AND ")
  );
  Select { sql, params }
}
