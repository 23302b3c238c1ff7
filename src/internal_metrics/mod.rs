//! # Internal Metrics Module
//!
//! This module wires up everything the exporter serves over HTTP.
//!
//! ## Components:
//!
//! - **`MetricsBuilder`**: installs the Prometheus recorder behind the
//!   `metrics` facade, binds the listener and spawns the server and the
//!   system collector on the `TaskManager`.
//!
//! - **`MetricsServer`**: (Defined in `server.rs`) An `axum`-based web server.
//!   Each scrape of `/metrics` runs one collection round and answers with the
//!   container snapshot followed by the exporter's own metrics.
//!
//! - **`SystemCollector`**: (Defined in `system.rs`) A background task that
//!   periodically updates the exporter's own CPU and memory gauges.

pub mod server;
pub mod system;

use crate::collection::Collector;
use crate::config::MetricsConfig;
use crate::internal_metrics::server::MetricsServer;
use crate::internal_metrics::system::SystemCollector;
use crate::task_manager::TaskManager;
use anyhow::{Context, Result};
use metrics::Unit;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Registers descriptions for the exporter's own metrics with the global
/// recorder.
pub fn describe_metrics() {
    metrics::describe_histogram!(
        "dockwatch_collection_duration_seconds",
        Unit::Seconds,
        "Time taken by one collection round, from listing containers to publishing."
    );
    metrics::describe_counter!(
        "dockwatch_collection_errors_total",
        Unit::Count,
        "Samples skipped during collection, labeled by family and error kind."
    );
    metrics::describe_gauge!(
        "dockwatch_containers_seen",
        Unit::Count,
        "Running containers listed by the last collection round."
    );
    metrics::describe_counter!(
        "dockwatch_scrapes_total",
        Unit::Count,
        "Scrapes of the metrics endpoint, labeled by outcome."
    );
    metrics::describe_gauge!(
        "process_cpu_usage_percent",
        Unit::Percent,
        "The percentage of CPU time the `dockwatch` process is currently using."
    );
    metrics::describe_gauge!(
        "process_memory_usage_bytes",
        Unit::Bytes,
        "The amount of physical memory (resident set size) the `dockwatch` process is using, in bytes."
    );
}

/// Builder for the exposition side of the application.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    /// Creates a new `MetricsBuilder` with the given configuration.
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Binds the listener and spawns the server (and, if enabled, the system
    /// collector) on `task_manager`.
    ///
    /// Returns the bound address, which differs from the configured one when
    /// port 0 was requested.
    pub fn build(self, collector: Arc<Collector>, task_manager: &TaskManager) -> Result<SocketAddr> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                DURATION_BUCKETS,
            )
            .context("Invalid histogram buckets")?
            .build_recorder();
        let handle = recorder.handle();

        let listener = std::net::TcpListener::bind(self.config.listen_address).with_context(|| {
            format!(
                "Failed to bind metrics server to {}",
                self.config.listen_address
            )
        })?;
        let addr = listener
            .local_addr()
            .context("Failed to get local address for metrics server")?;

        // The listener must be non-blocking to be used with Tokio.
        listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(listener)?;

        // Only one recorder per process; a second app in the same process
        // still serves container metrics.
        if let Err(e) = metrics::set_global_recorder(recorder) {
            warn!(error = %e, "Prometheus recorder already installed, self metrics go to the existing one");
        }
        describe_metrics();

        let server = MetricsServer::new(listener, collector, handle, task_manager.get_shutdown_rx());
        task_manager.spawn("MetricsServer", server.run());

        if self.config.system_metrics_enabled {
            let interval = Duration::from_secs(self.config.system_metrics_interval_seconds.max(1));
            let system_collector = SystemCollector::new(interval);
            task_manager.spawn(
                "SystemCollector",
                system_collector.run(task_manager.get_shutdown_rx()),
            );
        }

        info!(address = %addr, "Metrics server listening");
        Ok(addr)
    }
}
