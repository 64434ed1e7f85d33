//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the document and signing handlers
//! - Wire up middleware (request id, tracing, timeout, CORS, metrics, body limit)
//! - Bind to a plain TCP listener or serve TLS via axum-server
//! - Swap in reloaded configuration without restarting

use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{AppConfig, TlsConfig};
use crate::http::config_store::{get_config, put_config};
use crate::http::middleware::{cors, track_metrics};
use crate::http::request::make_span;
use crate::http::response::not_found;
use crate::http::sign::sign_upload;
use crate::kv::KvStore;
use crate::lifecycle::shutdown::recv_shutdown;

/// Grace period for in-flight TLS connections on shutdown.
const TLS_DRAIN: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<AppConfig>>,
    pub kv: Arc<dyn KvStore>,
}

/// HTTP server for the document store and signing endpoints.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: AppConfig, kv: Arc<dyn KvStore>) -> Self {
        let state = AppState {
            config: Arc::new(ArcSwap::from_pointee(config.clone())),
            kv,
        };
        let router = Self::build_router(&config, state.clone());
        Self { router, state }
    }

    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        Router::new()
            .route("/config", get(get_config).put(put_config))
            .route("/cloudinary/sign", post(sign_upload))
            .fallback(not_found)
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(from_fn(track_metrics))
            .layer(from_fn_with_state(state.clone(), cors))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(make_span))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
            .with_state(state)
    }

    /// The fully layered router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<AppConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        spawn_config_updates(self.state.clone(), config_updates);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(recv_shutdown(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: &TlsConfig,
        config_updates: mpsc::UnboundedReceiver<AppConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
        tracing::info!(address = %addr, "HTTPS server starting");

        spawn_config_updates(self.state.clone(), config_updates);

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            recv_shutdown(shutdown).await;
            drain.graceful_shutdown(Some(TLS_DRAIN));
        });

        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Apply reloaded configs to the live state.
///
/// Listener, timeout, body-limit and store settings are fixed at startup;
/// a change to any of them is logged and needs a restart.
fn spawn_config_updates(state: AppState, mut updates: mpsc::UnboundedReceiver<AppConfig>) {
    tokio::spawn(async move {
        while let Some(next) = updates.recv().await {
            let current = state.config.load();
            if current.listener != next.listener
                || current.timeouts != next.timeouts
                || current.security != next.security
                || current.store != next.store
            {
                tracing::warn!("Reloaded config changes startup-only settings; restart to apply them");
            }
            state.config.store(Arc::new(next));
            tracing::info!("Configuration reloaded");
        }
    });
}

/// Load certificate and key PEM files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, io::Error> {
    if !cert_path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Certificate file not found: {:?}", cert_path),
        ));
    }
    if !key_path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Private key file not found: {:?}", key_path),
        ));
    }
    RustlsConfig::from_pem_file(cert_path, key_path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::memory::MemoryKv;

    #[tokio::test]
    async fn test_config_update_is_applied() {
        let server = HttpServer::new(AppConfig::default(), Arc::new(MemoryKv::new()));
        let state = server.state().clone();
        let (tx, rx) = mpsc::unbounded_channel();
        spawn_config_updates(state.clone(), rx);

        let mut next = AppConfig::default();
        next.auth.admin_token = Some("rotated".into());
        tx.send(next).unwrap();
        drop(tx);

        for _ in 0..50 {
            if state.config.load().auth.admin_token.as_deref() == Some("rotated") {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("config update was not applied");
    }

    #[tokio::test]
    async fn test_missing_certificate() {
        let err = load_tls_config(Path::new("/nonexistent/cert.pem"), Path::new("/nonexistent/key.pem"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
