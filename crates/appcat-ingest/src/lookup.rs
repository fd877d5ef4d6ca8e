//! [`StorefrontClient`], the HTTP implementation of [`Lookup`].
//!
//! Issues `GET <url>?id=<app_id>&country=<country>` and reads the
//! `results` array of the JSON response. Only the first result is used.

use std::time::Duration;

use appcat_core::{lookup::Lookup, record::RawAttributes};
use serde::Deserialize;
use tracing::debug;

use crate::{Result, config::LookupConfig};

#[derive(Debug, Deserialize)]
struct LookupResponse {
  #[serde(default)]
  results: Vec<RawAttributes>,
}

#[derive(Debug, Clone)]
pub struct StorefrontClient {
  http: reqwest::Client,
  url:  String,
}

impl StorefrontClient {
  pub fn new(config: &LookupConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { http, url: config.url.clone() })
  }
}

impl Lookup for StorefrontClient {
  type Error = crate::Error;

  async fn lookup(&self, app_id: i64, country: &str) -> Result<Option<RawAttributes>> {
    let response = self
      .http
      .get(&self.url)
      .query(&[("id", app_id.to_string()), ("country", country.to_owned())])
      .send()
      .await?
      .error_for_status()?;

    let body: LookupResponse = response.json().await?;
    debug!(app_id, country, results = body.results.len(), "storefront lookup");
    Ok(body.results.into_iter().next())
  }
}
