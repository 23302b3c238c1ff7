//! The main application logic, decoupled from the entry point.

use crate::{
    collection::{Collector, CollectorSettings},
    config::Config,
    core::EntitySource,
    docker::DockerSource,
    fs::FileSystem,
    internal_metrics::MetricsBuilder,
    task_manager::TaskManager,
};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, instrument};

/// A handle to the running application.
pub struct App {
    task_manager: TaskManager,
    metrics_addr: SocketAddr,
    collector: Arc<Collector>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// Address the metrics server is bound to.
    pub fn metrics_addr(&self) -> SocketAddr {
        self.metrics_addr
    }

    pub fn collector(&self) -> Arc<Collector> {
        self.collector.clone()
    }

    /// Waits for the shutdown signal and then gracefully shuts down all tasks.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.task_manager.get_shutdown_rx();
        if !*shutdown_rx.borrow() {
            shutdown_rx.changed().await.ok();
        }
        info!("Shutdown signal received. Waiting for tasks to complete...");

        self.task_manager.shutdown().await;

        info!("All tasks shut down.");
        Ok(())
    }
}

/// Builder for the main application.
///
/// Tests replace the container runtime and the filesystem through the
/// override methods.
pub struct AppBuilder {
    config: Config,
    source_override: Option<Arc<dyn EntitySource>>,
    fs_override: Option<Arc<dyn FileSystem>>,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            source_override: None,
            fs_override: None,
        }
    }

    /// Overrides the container runtime for testing.
    pub fn source_override(mut self, source: Arc<dyn EntitySource>) -> Self {
        self.source_override = Some(source);
        self
    }

    /// Overrides the filesystem accounting files are read from.
    pub fn fs_override(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs_override = Some(fs);
        self
    }

    /// Builds and starts all application components, returning a runnable `App`.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;
        config.validate()?;
        let task_manager = TaskManager::new(shutdown_rx);

        let source: Arc<dyn EntitySource> = match self.source_override {
            Some(source) => source,
            None => Arc::new(DockerSource::connect(&config.docker).with_context(|| {
                format!(
                    "Failed to create Docker client for {}",
                    config.docker.socket_path
                )
            })?),
        };
        let collector = Arc::new(match self.fs_override {
            Some(fs) => Collector::new(source, fs, CollectorSettings::from_config(&config)),
            None => Collector::from_config(&config, source),
        });

        let metrics_addr =
            MetricsBuilder::new(config.metrics.clone()).build(collector.clone(), &task_manager)?;

        Ok(App {
            task_manager,
            metrics_addr,
            collector,
        })
    }
}
