//! Ecclesia donation server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the donation API over HTTP.
//!
//! # Reconciliation sweep
//!
//! To recompute every project's collected total from completed donations
//! and exit (e.g. from cron, or after restoring a backup):
//!
//! ```
//! cargo run -p ecclesia-api --bin server -- --reconcile
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use ecclesia_api::{AppState, ServerConfig};
use ecclesia_core::repository::ProjectRepository;
use ecclesia_store_sqlite::{ProjectRows, SiteConfigProjects, SqliteStore};
use ecclesia_stripe::{StripeConfig, StripeGateway};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Ecclesia donation server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Recompute all project collected totals and exit.
  #[arg(long)]
  reconcile: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("ECCLESIA"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Both project representations participate in aggregation.
  let repositories: Vec<Arc<dyn ProjectRepository>> = vec![
    Arc::new(ProjectRows::new(store.clone())),
    Arc::new(SiteConfigProjects::new(store.clone())),
  ];

  let mut stripe_cfg = StripeConfig::new(
    &server_cfg.stripe_secret_key,
    &server_cfg.stripe_webhook_secret,
  );
  stripe_cfg.currency = server_cfg.currency.clone();
  let gateway =
    StripeGateway::new(stripe_cfg).context("failed to build Stripe client")?;

  // Build application state.
  let state = AppState::new(
    Arc::new(store),
    Arc::new(gateway),
    repositories,
    server_cfg.api_config(),
  );

  // One-shot maintenance mode.
  if cli.reconcile {
    let report = state.reconciler.aggregator().reconcile_all().await;
    tracing::info!(
      reconciled = report.reconciled,
      failures = report.failures.len(),
      "reconciliation sweep finished"
    );
    for (project_id, error) in &report.failures {
      tracing::error!(%project_id, %error, "project failed to reconcile");
    }
    if !report.is_clean() {
      anyhow::bail!("{} project(s) failed to reconcile", report.failures.len());
    }
    return Ok(());
  }

  let app = ecclesia_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
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
