//! RootGuard server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `ROOTGUARD_*` environment variables, opens the SQLite store, starts the
//! periodic control loop and serves the REST API over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::Parser;
use rootguard_core::controller::Controller;
use rootguard_server::{ServerConfig, control_loop};
use rootguard_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, signal, sync::watch};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "RootGuard irrigation controller")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
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
    .add_source(
      config::Environment::with_prefix("ROOTGUARD")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("cors_origins"),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  if server_cfg.tick_interval_secs == 0 {
    anyhow::bail!("tick_interval_secs must be at least 1");
  }

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let controller = Arc::new(Controller::new(store));

  // Start the periodic driver.
  let (shutdown_tx, shutdown_rx) = watch::channel(false);
  let driver = if server_cfg.simulate {
    let simulator = control_loop::resume_simulator(&controller).await;
    Some(control_loop::spawn(
      controller.clone(),
      simulator,
      Duration::from_secs(server_cfg.tick_interval_secs),
      shutdown_rx,
    ))
  } else {
    tracing::info!("simulation disabled; control loop not started");
    None
  };

  let app = rootguard_server::router(controller, &server_cfg);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  // Let an in-flight tick finish before exiting.
  let _ = shutdown_tx.send(true);
  if let Some(driver) = driver {
    driver.await.context("control loop panicked")?;
  }

  tracing::info!("Server shut down gracefully");
  Ok(())
}

/// Resolve on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = signal::ctrl_c().await {
      tracing::error!(error = %e, "failed to listen for Ctrl+C");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        tracing::error!(error = %e, "failed to install SIGTERM handler");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
    () = terminate => tracing::info!("Received SIGTERM, shutting down..."),
  }
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
