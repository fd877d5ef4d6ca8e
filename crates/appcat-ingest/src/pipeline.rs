//! The ingestion pipeline.
//!
//! For every `(app_id, country)` pair in the Cartesian product of the inputs,
//! in order: look the pair up, skip it if the storefront returns nothing,
//! otherwise build an [`AppRecord`] and upsert it with overwrite enabled.
//!
//! Pairs are independent. A failure at any stage is logged and recorded in
//! the [`IngestReport`]; it never aborts the remaining pairs. At most
//! `concurrency` pairs are in flight at once.

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use appcat_core::{
  lookup::Lookup,
  record::{AppRecord, RawAttributes},
  store::AppStore,
};
use serde::Serialize;
use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::IngestSettings;

// ─── Options & report ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct IngestOptions {
  pub concurrency:   usize,
  pub max_retries:   u32,
  pub retry_backoff: Duration,
}

impl Default for IngestOptions {
  fn default() -> Self { Self::from(&IngestSettings::default()) }
}

impl From<&IngestSettings> for IngestOptions {
  fn from(settings: &IngestSettings) -> Self {
    Self {
      concurrency:   settings.concurrency.max(1),
      max_retries:   settings.max_retries,
      retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
    }
  }
}

/// Where a pair failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  Lookup,
  Build,
  Store,
  /// The worker task itself died.
  Task,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Lookup => "lookup",
      Self::Build => "build",
      Self::Store => "store",
      Self::Task => "task",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairFailure {
  pub app_id:  i64,
  pub country: String,
  pub stage:   Stage,
  pub message: String,
}

/// Outcome counts for one run. `attempted` counts pairs dispatched; every
/// dispatched pair ends up in exactly one of `written`, `skipped`, `failed`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
  pub attempted: usize,
  pub written:   usize,
  pub skipped:   usize,
  pub failed:    Vec<PairFailure>,
  /// The run stopped dispatching early because it was cancelled.
  pub cancelled: bool,
}

enum Outcome {
  Written,
  Skipped,
  Failed(Stage, String),
}

impl IngestReport {
  fn record(&mut self, app_id: i64, country: String, outcome: Outcome) {
    match outcome {
      Outcome::Written => self.written += 1,
      Outcome::Skipped => self.skipped += 1,
      Outcome::Failed(stage, message) => {
        self.failed.push(PairFailure { app_id, country, stage, message })
      }
    }
  }
}

// ─── Ingestor ────────────────────────────────────────────────────────────────

pub struct Ingestor<L, S> {
  lookup:  Arc<L>,
  store:   Arc<S>,
  options: IngestOptions,
}

impl<L, S> Ingestor<L, S>
where
  L: Lookup + 'static,
  S: AppStore + 'static,
{
  pub fn new(lookup: Arc<L>, store: Arc<S>, options: IngestOptions) -> Self {
    Self { lookup, store, options }
  }

  /// Ingest every pair to completion.
  pub async fn ingest(&self, app_ids: &[i64], countries: &[String]) -> IngestReport {
    self.ingest_until(app_ids, countries, CancellationToken::new()).await
  }

  /// Ingest until done or until `cancel` fires. Cancellation stops new pairs
  /// from being dispatched; pairs already in flight run to completion.
  pub async fn ingest_until(
    &self,
    app_ids: &[i64],
    countries: &[String],
    cancel: CancellationToken,
  ) -> IngestReport {
    let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut pairs: HashMap<tokio::task::Id, (i64, String)> = HashMap::new();
    let mut report = IngestReport::default();

    info!(
      app_ids = app_ids.len(),
      countries = countries.len(),
      concurrency = self.options.concurrency,
      "starting ingestion"
    );

    'dispatch: for &app_id in app_ids {
      for country in countries {
        let permit = tokio::select! {
          biased;
          _ = cancel.cancelled() => {
            report.cancelled = true;
            break 'dispatch;
          }
          permit = semaphore.clone().acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => break 'dispatch,
          },
        };

        report.attempted += 1;
        let lookup = self.lookup.clone();
        let store = self.store.clone();
        let options = self.options.clone();
        let cancel = cancel.clone();
        let task_country = country.clone();

        let handle = tasks.spawn(async move {
          let _permit = permit;
          ingest_pair(&*lookup, &*store, &options, &cancel, app_id, &task_country).await
        });
        pairs.insert(handle.id(), (app_id, country.clone()));

        while let Some(joined) = tasks.try_join_next_with_id() {
          settle(&mut report, &mut pairs, joined);
        }
      }
    }

    while let Some(joined) = tasks.join_next_with_id().await {
      settle(&mut report, &mut pairs, joined);
    }

    info!(
      attempted = report.attempted,
      written = report.written,
      skipped = report.skipped,
      failed = report.failed.len(),
      cancelled = report.cancelled,
      "ingestion finished"
    );
    report
  }
}

fn settle(
  report: &mut IngestReport,
  pairs: &mut HashMap<tokio::task::Id, (i64, String)>,
  joined: Result<(tokio::task::Id, Outcome), tokio::task::JoinError>,
) {
  let (id, outcome) = match joined {
    Ok((id, outcome)) => (id, outcome),
    Err(e) => (e.id(), Outcome::Failed(Stage::Task, e.to_string())),
  };
  if let Some((app_id, country)) = pairs.remove(&id) {
    if let Outcome::Failed(Stage::Task, message) = &outcome {
      error!(app_id, country = %country, error = %message, "ingestion task died");
    }
    report.record(app_id, country, outcome);
  }
}

// ─── Per-pair work ───────────────────────────────────────────────────────────

async fn ingest_pair<L: Lookup, S: AppStore>(
  lookup: &L,
  store: &S,
  options: &IngestOptions,
  cancel: &CancellationToken,
  app_id: i64,
  country: &str,
) -> Outcome {
  let raw = match fetch(lookup, options, cancel, app_id, country).await {
    Ok(Some(raw)) => raw,
    Ok(None) => {
      debug!(app_id, country, "no storefront result; skipping");
      return Outcome::Skipped;
    }
    Err(e) => {
      warn!(app_id, country, error = %e, "lookup failed");
      return Outcome::Failed(Stage::Lookup, e.to_string());
    }
  };

  let record = match AppRecord::new(app_id, country, Some(raw)) {
    Ok(record) => record,
    Err(e) => {
      warn!(app_id, country, error = %e, "could not build record");
      return Outcome::Failed(Stage::Build, e.to_string());
    }
  };

  match store.upsert(&record, true).await {
    Ok(()) => Outcome::Written,
    Err(e) => {
      warn!(app_id, country, error = %e, "could not store record");
      Outcome::Failed(Stage::Store, e.to_string())
    }
  }
}

/// Look a pair up, retrying failed requests with exponential backoff.
async fn fetch<L: Lookup>(
  lookup: &L,
  options: &IngestOptions,
  cancel: &CancellationToken,
  app_id: i64,
  country: &str,
) -> Result<Option<RawAttributes>, L::Error> {
  let mut attempt = 0;
  loop {
    match lookup.lookup(app_id, country).await {
      Ok(found) => return Ok(found),
      Err(e) if attempt < options.max_retries && !cancel.is_cancelled() => {
        let delay = options.retry_backoff.saturating_mul(2_u32.saturating_pow(attempt));
        debug!(app_id, country, attempt, error = %e, ?delay, "lookup failed; retrying");
        tokio::select! {
          _ = cancel.cancelled() => return Err(e),
          _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
      }
      Err(e) => return Err(e),
    }
  }
}
