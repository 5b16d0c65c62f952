//! revwatch server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, starts the background review pipeline and serves the JSON API
//! under `/api` until Ctrl-C.

mod config;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use revwatch_http::{DiscordMessenger, HttpCrawler};
use revwatch_pipeline::{NotificationQueue, SystemClock, orchestrator::supervise};
use revwatch_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, sync::watch};
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::{ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "Review watcher and notifier")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
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
  let cfg = ServerConfig::load(&cli.config)?;

  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );
  let crawler = Arc::new(HttpCrawler::new(&cfg.scraper).context("scraper client")?);
  let messenger = Arc::new(DiscordMessenger::new(&cfg.discord).context("discord client")?);

  let queue = NotificationQueue::new();
  let clock = Arc::new(SystemClock);
  let (orchestrator, service) = revwatch_pipeline::build_with_queue(
    Arc::clone(&store),
    Arc::clone(&crawler),
    Arc::clone(&messenger),
    &cfg.pipeline,
    clock.clone(),
    queue.clone(),
  );

  // ── Background pipeline ──────────────────────────────────────────────────
  let (shutdown_tx, shutdown_rx) = watch::channel(false);
  let mut first = Some(orchestrator);
  let pipeline_cfg = cfg.pipeline.clone();
  let pipeline = tokio::spawn(supervise(
    move || {
      // Replacements drain the queue the API keeps enqueueing into.
      let orchestrator = first.take().unwrap_or_else(|| {
        revwatch_pipeline::build_with_queue(
          Arc::clone(&store),
          Arc::clone(&crawler),
          Arc::clone(&messenger),
          &pipeline_cfg,
          clock.clone(),
          queue.clone(),
        )
        .0
      });
      tokio::spawn(orchestrator.run(wait_for_shutdown(shutdown_rx.clone())))
    },
    Duration::from_secs(cfg.pipeline.idle_secs.max(1)),
  ));

  // ── HTTP API ─────────────────────────────────────────────────────────────
  let app = Router::new()
    .nest("/api", revwatch_api::api_router(Arc::new(service)))
    .layer(TraceLayer::new_for_http());

  let address = cfg.address();
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async move {
      if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
      }
      tracing::info!("shutting down");
      let _ = shutdown_tx.send(true);
    })
    .await
    .context("server error")?;

  pipeline.await.context("pipeline supervisor failed")?;
  Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
  while !*rx.borrow_and_update() {
    if rx.changed().await.is_err() {
      return;
    }
  }
}
