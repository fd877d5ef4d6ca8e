//! `appcat` binary.
//!
//! `appcat ingest` pulls storefront metadata into the catalog; `appcat serve`
//! exposes the catalog over HTTP. Both read `appcat.toml` (or `--config`)
//! layered under `APPCAT_*` environment variables.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, bail};
use appcat_ingest::{IngestOptions, Ingestor, StorefrontClient, config::Settings};
use appcat_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Mobile app metadata catalog")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "appcat.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Fetch every (app id, country) pair and upsert the results.
  Ingest {
    /// Comma-separated app ids; defaults to `ingest.app_ids`.
    #[arg(long, value_delimiter = ',')]
    ids:       Vec<i64>,
    /// Comma-separated storefront countries; defaults to `ingest.countries`.
    #[arg(long, value_delimiter = ',')]
    countries: Vec<String>,
  },
  /// Serve the catalog's JSON API.
  Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config).context("failed to load configuration")?;

  let store_path = settings.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  match cli.command {
    Command::Ingest { ids, countries } => ingest(&settings, store, ids, countries).await,
    Command::Serve => serve(&settings, store).await,
  }
}

async fn ingest(
  settings: &Settings,
  store: Arc<SqliteStore>,
  ids: Vec<i64>,
  countries: Vec<String>,
) -> anyhow::Result<()> {
  let ids = if ids.is_empty() { settings.ingest.app_ids.clone() } else { ids };
  let countries = if countries.is_empty() { settings.ingest.countries.clone() } else { countries };
  if ids.is_empty() || countries.is_empty() {
    bail!("nothing to ingest: pass --ids and --countries or set them in the config");
  }

  let lookup = StorefrontClient::new(&settings.lookup).context("failed to build HTTP client")?;
  let ingestor = Ingestor::new(Arc::new(lookup), store, IngestOptions::from(&settings.ingest));

  let cancel = CancellationToken::new();
  let on_signal = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      tracing::warn!("interrupted; finishing in-flight pairs");
      on_signal.cancel();
    }
  });

  let report = ingestor.ingest_until(&ids, &countries, cancel).await;
  println!("{}", serde_json::to_string_pretty(&report)?);
  Ok(())
}

async fn serve(settings: &Settings, store: Arc<SqliteStore>) -> anyhow::Result<()> {
  let app = appcat_api::api_router(store).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", settings.server.host, settings.server.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}
