//! Test helpers for running the full application instance.

use super::fake_source::FakeSource;
use anyhow::Result;
use dockwatch::{app::App, config::Config, fs::MockFs};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::{sync::watch, task::JoinHandle, time::timeout};

/// A running application bound to an ephemeral port.
pub struct TestApp {
    pub source: FakeSource,
    pub fs: MockFs,
    shutdown_tx: watch::Sender<bool>,
    app_handle: JoinHandle<Result<()>>,
    metrics_addr: SocketAddr,
}

impl TestApp {
    pub async fn spawn(source: FakeSource, fs: MockFs) -> Result<Self> {
        let mut config = Config::default();
        config.metrics.listen_address = "127.0.0.1:0".parse()?;
        config.metrics.system_metrics_enabled = false;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let app = App::builder(config)
            .source_override(Arc::new(source.clone()))
            .fs_override(Arc::new(fs.clone()))
            .build(shutdown_rx)
            .await?;
        let metrics_addr = app.metrics_addr();
        let app_handle = tokio::spawn(app.run());

        Ok(Self {
            source,
            fs,
            shutdown_tx,
            app_handle,
            metrics_addr,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.metrics_addr, path)
    }

    /// Shuts down the application and waits for it to terminate.
    pub async fn shutdown(self, timeout_duration: Duration) -> Result<()> {
        self.shutdown_tx.send(true)?;
        timeout(timeout_duration, self.app_handle).await??
    }
}
