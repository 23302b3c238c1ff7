/// dockwatch - Prometheus exporter for Docker container resource usage
///
/// This library locates and parses the kernel accounting files of running
/// containers and publishes memory, CPU and network gauges, one collection
/// round per scrape.
pub mod app;
pub mod cli;
pub mod collection;
pub mod config;
pub mod core;
pub mod docker;
pub mod errors;
pub mod fs;
pub mod internal_metrics;
pub mod stats;
pub mod task_manager;

// Re-export core types for convenience
pub use core::*;
pub use errors::CollectError;
