//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start the config watcher when a config file is given
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::watcher::ConfigWatcher;
use crate::config::AppConfig;
use crate::http::HttpServer;
use crate::kv::{self, KvError};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("store backend: {0}")]
    Store(#[from] KvError),

    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("listener: {0}")]
    Io(#[from] std::io::Error),

    #[error("config watcher: {0}")]
    Watch(#[from] notify::Error),
}

/// Run the service until `shutdown` fires.
///
/// Logging must already be initialized. `config_path` enables hot reload.
pub async fn start(
    config: AppConfig,
    config_path: Option<&Path>,
    shutdown: &Shutdown,
) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = kv::from_config(&config.store)?;
    tracing::info!(backend = ?config.store.backend, key = %config.store.key, "Document store ready");

    if config.auth.admin_token.is_none() {
        tracing::warn!("No admin token configured; PUT /config will be refused");
    }

    // The watcher handle must outlive the server.
    let (_watcher, updates) = match config_path {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (Some(watcher.run()?), rx)
        }
        None => {
            let (_tx, rx) = mpsc::unbounded_channel();
            (None, rx)
        }
    };

    let bind = config.listener.bind_address.clone();
    let tls = config.listener.tls.clone();
    let server = HttpServer::new(config, store);

    match tls {
        Some(tls) => {
            let addr: SocketAddr = bind.parse().map_err(|_| StartupError::BindAddress(bind.clone()))?;
            server.run_tls(addr, &tls, updates, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&bind).await?;
            server.run(listener, updates, shutdown.subscribe()).await?;
        }
    }
    Ok(())
}
