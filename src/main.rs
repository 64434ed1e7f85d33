//! Site config service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Editor / site                ┌──────────────────────────────────────────┐
//!     ─────────────────────────────┼─▶ tower layers (request id, trace,       │
//!                                  │   timeout, CORS, metrics, body limit)    │
//!                                  │        │                                 │
//!                                  │        ├─▶ GET/PUT /config ──▶ kv store   │
//!                                  │        └─▶ POST /cloudinary/sign          │
//!                                  │                                          │
//!                                  │   config (TOML + env) ◀── watcher        │
//!                                  └──────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use site_config::config::loader::{from_env, load_config};
use site_config::lifecycle::{self, signals, Shutdown};
use site_config::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "site-config")]
#[command(about = "Stores the site configuration document and signs media uploads", long_about = None)]
struct Args {
    /// TOML config file. Without one, defaults plus environment are used.
    #[arg(short, long, env = "SITE_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Reload the config file when it changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => from_env()?,
    };

    init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        request_timeout_secs = config.timeouts.request_secs,
        "site-config starting"
    );

    let shutdown = Shutdown::new();
    signals::forward_signals(&shutdown);

    let watch_path = args.config.as_deref().filter(|_| args.watch);
    lifecycle::start(config, watch_path, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
