//! Error type for `appcat-ingest`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("lookup request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
