//! # System Metrics Collector
//!
//! The `SystemCollector` runs in a background task and periodically reports
//! the exporter's own CPU and memory use through the `metrics` facade, using
//! the `sysinfo` crate.

use std::time::Duration;
use sysinfo::{Pid, System};
use tokio::sync::watch;
use tokio::time;
use tracing::{error, trace};

/// A collector for the exporter process's own resource use.
pub struct SystemCollector {
    system: System,
    interval: Duration,
}

impl SystemCollector {
    pub fn new(interval: Duration) -> Self {
        Self {
            system: System::new(),
            interval,
        }
    }

    /// Refreshes the process gauges every interval until shutdown.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => pid,
            Err(e) => {
                error!(error = %e, "Failed to get current PID");
                return;
            }
        };

        let mut interval = time::interval(self.interval);
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    trace!("System collector received shutdown signal.");
                    break;
                }
                _ = interval.tick() => {
                    if !self.refresh(pid) {
                        error!(%pid, "Monitored process no longer found, system collector is stopping");
                        break;
                    }
                }
            }
        }
    }

    fn refresh(&mut self, pid: Pid) -> bool {
        self.system.refresh_cpu();
        if !self.system.refresh_process(pid) {
            return false;
        }
        if let Some(process) = self.system.process(pid) {
            metrics::gauge!("process_cpu_usage_percent").set(process.cpu_usage() as f64);
            metrics::gauge!("process_memory_usage_bytes").set(process.memory() as f64);
        }
        true
    }
}
