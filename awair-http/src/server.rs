use crate::handlers;
use awair_core::ShutdownSignal;
use awair_core::config::SHUTDOWN_GRACE_PERIOD;
use awair_observability::ClimateMetrics;
use axum::{Router, routing::get};
use std::future::IntoFuture;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] io::Error),

    #[error("in-flight requests did not finish within {0:?}")]
    DrainTimeout(Duration),
}

/// Shared state for the scrape endpoint.
#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<ClimateMetrics>,
}

/// Build the Axum router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(handlers::metrics::metrics_handler))
        .route("/health", get(handlers::health::health_check))
        .with_state(state)
}

/// HTTP server exposing the registry. Bound eagerly so a port clash
/// surfaces before any task is spawned.
pub struct MetricsServer {
    listener: TcpListener,
    router: Router,
    grace: Duration,
}

impl MetricsServer {
    pub async fn bind(host: &str, port: u16, state: AppState) -> Result<Self, ServeError> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|source| ServeError::Bind {
                addr: format!("{host}:{port}"),
                source,
            })?;
        Ok(Self::new(listener, build_router(state)))
    }

    pub fn new(listener: TcpListener, router: Router) -> Self {
        Self {
            listener,
            router,
            grace: SHUTDOWN_GRACE_PERIOD,
        }
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` fires, then stop accepting and give in-flight
    /// requests up to the grace period.
    pub async fn run(self, mut shutdown: ShutdownSignal) -> Result<(), ServeError> {
        let addr = self.local_addr()?;
        let grace = self.grace;
        let mut drain = shutdown.clone();

        info!(listen = %addr, "Starting server");

        let serve = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .into_future();
        tokio::pin!(serve);

        tokio::select! {
            res = &mut serve => return res.map_err(ServeError::Serve),
            _ = drain.wait() => {}
        }

        match tokio::time::timeout(grace, serve).await {
            Ok(res) => {
                info!(listen = %addr, "Server stopped");
                res.map_err(ServeError::Serve)
            }
            Err(_) => {
                warn!(grace = ?grace, "Server did not drain in time, closing");
                Err(ServeError::DrainTimeout(grace))
            }
        }
    }
}
