//! HTTP surface of a simulated server.
//!
//! - `POST /serve` injects traffic into the model and answers its observation
//! - `GET /status` summarises recent load without side effects
//! - `GET /metrics` exposes gauges and counters for scraping

mod metrics;
mod routes;

use crate::feedback::SharedModel;
use crate::models::ServerModel;
use axum::{
    Router,
    routing::{get, post},
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::info;

pub use metrics::ServerMetrics;

#[derive(Clone)]
pub struct AppState {
    pub model: SharedModel,
    pub metrics: ServerMetrics,
    /// Delay each `/serve` answer by the latency it reports.
    pub simulate_latency: bool,
}

impl AppState {
    pub fn new(model: ServerModel, simulate_latency: bool) -> Result<Self, prometheus::Error> {
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            metrics: ServerMetrics::new()?,
            simulate_latency,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/serve", post(routes::serve))
        .route("/status", get(routes::status))
        .route("/metrics", get(routes::metrics))
        .with_state(state)
}

/// Serves the simulated server on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    info!(addr = ?listener.local_addr().ok(), "Simulated server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
