//! # Metrics Server
//!
//! This module defines the `MetricsServer`, an `axum`-based web server with
//! two routes:
//!
//! - `/metrics` runs one collection round and returns the container snapshot
//!   in the Prometheus text format, followed by the exporter's own metrics.
//!   If containers cannot be listed it answers `503` with the error.
//! - `/healthz` answers `ok`.
//!
//! The server stops accepting connections once the shutdown channel fires.

use crate::collection::Collector;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, trace};

#[derive(Clone)]
struct ServerState {
    collector: Arc<Collector>,
    prom_handle: PrometheusHandle,
}

/// A server that exposes metrics to a Prometheus scraper.
pub struct MetricsServer {
    listener: TcpListener,
    state: ServerState,
    shutdown_rx: watch::Receiver<bool>,
}

impl MetricsServer {
    /// Creates a new `MetricsServer` but does not spawn it.
    ///
    /// # Arguments
    ///
    /// * `listener` - A `TcpListener` that has already been bound to an address.
    /// * `collector` - Runs a collection round per scrape.
    /// * `prom_handle` - Renders the exporter's own metrics.
    /// * `shutdown_rx` - A watch channel receiver for graceful shutdown.
    pub fn new(
        listener: TcpListener,
        collector: Arc<Collector>,
        prom_handle: PrometheusHandle,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            listener,
            state: ServerState {
                collector,
                prom_handle,
            },
            shutdown_rx,
        }
    }

    /// Returns a future that runs the server until a shutdown signal is received.
    pub fn run(self) -> impl Future<Output = ()> {
        let app = Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/healthz", get(|| async { "ok" }))
            .with_state(self.state);

        let mut shutdown_rx = self.shutdown_rx;
        async move {
            let shutdown = async move {
                // A dropped sender also means shutdown.
                let _ = shutdown_rx.changed().await;
                trace!("Metrics server received shutdown signal.");
            };

            if let Err(e) = axum::serve(self.listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "Metrics server error");
            }
            trace!("Metrics server task finished.");
        }
    }
}

async fn metrics_handler(State(state): State<ServerState>) -> Response {
    let snapshot = match state.collector.collect().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            metrics::counter!("dockwatch_scrapes_total", "outcome" => "error").increment(1);
            return (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response();
        }
    };

    let mut body = match snapshot.render() {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "Failed to encode container metrics");
            metrics::counter!("dockwatch_scrapes_total", "outcome" => "error").increment(1);
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    metrics::counter!("dockwatch_scrapes_total", "outcome" => "success").increment(1);
    body.push_str(&state.prom_handle.render());

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        body,
    )
        .into_response()
}
