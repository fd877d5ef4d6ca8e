//! Runtime configuration, deserialised with the `config` crate.
//!
//! Sources, lowest precedence first: built-in defaults, the TOML file, then
//! `APPCAT_*` environment variables (`__` separates nested keys, e.g.
//! `APPCAT_LOOKUP__TIMEOUT_SECS=10`).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// SQLite file holding the catalog; a leading `~/` is expanded.
  pub store_path: PathBuf,
  pub lookup:     LookupConfig,
  pub ingest:     IngestSettings,
  pub server:     ServerConfig,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("appcat.sqlite3"),
      lookup:     LookupConfig::default(),
      ingest:     IngestSettings::default(),
      server:     ServerConfig::default(),
    }
  }
}

/// Storefront lookup endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
  pub url:          String,
  pub timeout_secs: u64,
}

impl Default for LookupConfig {
  fn default() -> Self {
    Self {
      url:          "https://itunes.apple.com/lookup".to_owned(),
      timeout_secs: 30,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
  /// Maximum pairs in flight at once.
  pub concurrency:      usize,
  /// Extra attempts after a failed lookup.
  pub max_retries:      u32,
  /// Delay before the first retry; doubled for each further attempt.
  pub retry_backoff_ms: u64,
  /// Used when `appcat ingest` is run without `--ids`.
  pub app_ids:          Vec<i64>,
  /// Used when `appcat ingest` is run without `--countries`.
  pub countries:        Vec<String>,
}

impl Default for IngestSettings {
  fn default() -> Self {
    Self {
      concurrency:      4,
      max_retries:      2,
      retry_backoff_ms: 250,
      app_ids:          Vec::new(),
      countries:        Vec::new(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host: String,
  pub port: u16,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self { host: "127.0.0.1".to_owned(), port: 8080 }
  }
}

impl Settings {
  /// Load settings from `path` (optional) layered under the environment.
  pub fn load(path: &Path) -> Result<Self> {
    Self::from_file(config::File::from(path).required(false))
  }

  fn from_file<S>(file: S) -> Result<Self>
  where
    S: config::Source + Send + Sync + 'static,
  {
    let settings = config::Config::builder()
      .add_source(file)
      .add_source(
        config::Environment::with_prefix("APPCAT")
          .prefix_separator("_")
          .separator("__")
          .list_separator(",")
          .with_list_parse_key("ingest.app_ids")
          .with_list_parse_key("ingest.countries")
          .try_parsing(true),
      )
      .build()?;
    Ok(settings.try_deserialize()?)
  }

  /// `store_path` with a leading `~/` expanded to `$HOME`.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
