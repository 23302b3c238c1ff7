//! dockwatch - Prometheus exporter for Docker container resource usage
//!
//! Reads each running container's memory, CPU and network counters from the
//! cgroup and proc filesystems whenever Prometheus scrapes `/metrics`.

use anyhow::Result;
use clap::Parser;
use dockwatch::{app::App, cli::Cli, config::Config};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        init_tracing("info");
        error!("Failed to load configuration: {:#}", err);
        std::process::exit(1);
    });

    init_tracing(&config.log_level);

    info!("dockwatch starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Listen Address: {}", config.metrics.listen_address);
    info!("Namespace: {}", config.metrics.namespace);
    info!("Docker Socket: {}", config.docker.socket_path);
    info!(
        "Families: {}",
        config
            .collection
            .families
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    info!("Sys Root: {}", config.collection.sys_root.display());
    info!("Proc Root: {}", config.collection.proc_root.display());
    info!("Concurrency: {}", config.collection.concurrency);
    info!("Entity Timeout: {}ms", config.collection.entity_timeout_ms);
    info!("System Metrics: {}", config.metrics.system_metrics_enabled);
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = App::builder(config).build(shutdown_rx).await?;

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
        }
        info!("Ctrl-C received, shutting down.");
        let _ = shutdown_tx.send(true);
    });

    app.run().await
}
