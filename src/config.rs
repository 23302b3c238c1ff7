//! Configuration management for dockwatch
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to layer built-in defaults, a `dockwatch.toml` file, `DOCKWATCH_`
//! environment variables and command-line flags, in that order.

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;

use crate::cli::Cli;
use crate::core::MetricFamily;

const DEFAULT_CONFIG_FILE: &str = "dockwatch.toml";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Configuration for the exposition endpoint.
    pub metrics: MetricsConfig,
    /// Configuration for the Docker client.
    pub docker: DockerConfig,
    /// Configuration for collection rounds.
    pub collection: CollectionConfig,
}

/// Configuration for the exposition endpoint.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Address the HTTP server binds to.
    pub listen_address: SocketAddr,
    /// Prefix of every container metric name.
    pub namespace: String,
    /// Report the exporter's own CPU and memory use.
    pub system_metrics_enabled: bool,
    /// Refresh interval of the exporter's own CPU and memory gauges.
    pub system_metrics_interval_seconds: u64,
}

/// Configuration for the Docker client.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DockerConfig {
    /// Unix socket of the Docker daemon.
    pub socket_path: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

/// Configuration for collection rounds.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CollectionConfig {
    /// Metric families to publish.
    pub families: Vec<MetricFamily>,
    /// Mount point of sysfs, holding the cgroup hierarchies.
    pub sys_root: PathBuf,
    /// Mount point of procfs.
    pub proc_root: PathBuf,
    /// Containers collected at the same time.
    pub concurrency: usize,
    /// Deadline for reading one container's files, in milliseconds.
    pub entity_timeout_ms: u64,
}

/// A loaded configuration that cannot be run.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("collection.families must name at least one family")]
    NoFamilies,
    #[error("collection.concurrency must be at least 1")]
    InvalidConcurrency,
    #[error("collection.entity_timeout_ms must be at least 1")]
    InvalidTimeout,
    #[error("metrics.namespace must not be empty")]
    EmptyNamespace,
    #[error("metrics.namespace '{0}' must match [a-zA-Z_:][a-zA-Z0-9_:]*")]
    InvalidNamespace(String),
}

/// Metric names are built as `<namespace>_<subsystem>_<name>`, so the
/// namespace has to be a valid metric name prefix on its own.
static NAMESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^[a-zA-Z_:][a-zA-Z0-9_:]*$").expect("namespace pattern is valid")
});

impl Config {
    /// Loads the application configuration.
    ///
    /// The file named by `--config` is read if given, otherwise
    /// `dockwatch.toml` in the working directory if it exists. Environment
    /// variables use `__` to reach nested keys, e.g.
    /// `DOCKWATCH_COLLECTION__CONCURRENCY=4`.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("DOCKWATCH_").split("__"))
            .merge(cli.clone())
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects settings a collector cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.families.is_empty() {
            return Err(ConfigError::NoFamilies);
        }
        if self.collection.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        if self.collection.entity_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.metrics.namespace.trim().is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        if !NAMESPACE.is_match(&self.metrics.namespace) {
            return Err(ConfigError::InvalidNamespace(self.metrics.namespace.clone()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics: MetricsConfig {
                listen_address: SocketAddr::from(([0, 0, 0, 0], 9417)),
                namespace: "dockwatch".to_string(),
                system_metrics_enabled: true,
                system_metrics_interval_seconds: 10,
            },
            docker: DockerConfig {
                socket_path: "/var/run/docker.sock".to_string(),
                timeout_seconds: 10,
            },
            collection: CollectionConfig {
                families: MetricFamily::ALL.to_vec(),
                sys_root: PathBuf::from("/sys"),
                proc_root: PathBuf::from("/proc"),
                concurrency: 8,
                entity_timeout_ms: 2000,
            },
        }
    }
}
