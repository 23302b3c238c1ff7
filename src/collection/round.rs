//! Per-entity work of a collection round: locate, parse, aggregate.
//!
//! Everything here is synchronous and touches the filesystem only through
//! [`FileSystem`], so the collector can run it on the blocking pool.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::collection::families::{Metric, MetricSample};
use crate::core::{Entity, FamilySet, MetricFamily};
use crate::errors::CollectError;
use crate::fs::FileSystem;
use crate::stats::{
    interface_bytes, locate, memory_usage_bytes, parse_device_table, parse_key_value_stats,
    parse_scalar_seconds, InterfaceBytes, CPU_USAGE_CANDIDATES, MEMORY_STAT_CANDIDATES,
};

/// Roots of the pseudo-filesystems the accounting files live under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatPaths {
    pub sys_root: PathBuf,
    pub proc_root: PathBuf,
}

impl Default for StatPaths {
    fn default() -> Self {
        Self {
            sys_root: PathBuf::from("/sys"),
            proc_root: PathBuf::from("/proc"),
        }
    }
}

impl StatPaths {
    /// `<proc_root>/<pid>/net/dev`
    pub fn net_dev(&self, pid: i64) -> PathBuf {
        self.proc_root.join(pid.to_string()).join("net").join("dev")
    }
}

/// A sample that could not be produced.
#[derive(Debug)]
pub struct Failure {
    /// Family label; `entity` when the whole entity was lost.
    pub family: &'static str,
    pub error: CollectError,
}

impl Failure {
    pub fn new(family: MetricFamily, error: CollectError) -> Self {
        Self {
            family: family.as_str(),
            error,
        }
    }

    pub fn entity(error: CollectError) -> Self {
        Self {
            family: "entity",
            error,
        }
    }
}

/// What one entity contributed to a round.
#[derive(Debug, Default)]
pub struct EntityReport {
    pub samples: Vec<MetricSample>,
    pub failures: Vec<Failure>,
}

impl EntityReport {
    pub fn failed(failure: Failure) -> Self {
        Self {
            samples: Vec::new(),
            failures: vec![failure],
        }
    }
}

fn read(fs: &dyn FileSystem, path: &Path) -> Result<String, CollectError> {
    fs.read_to_string(path).map_err(|source| CollectError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Memory in use by the container, in bytes.
pub fn collect_memory(
    fs: &dyn FileSystem,
    paths: &StatPaths,
    entity: &Entity,
) -> Result<f64, CollectError> {
    let path = locate(
        fs,
        &paths.sys_root,
        MetricFamily::Memory,
        &entity.id,
        MEMORY_STAT_CANDIDATES,
    )?;
    let content = read(fs, &path)?;
    let stats = parse_key_value_stats(&content).map_err(|source| CollectError::Parse {
        path: path.clone(),
        source,
    })?;
    Ok(memory_usage_bytes(&stats))
}

/// Cumulative CPU time of the container, in seconds.
pub fn collect_cpu(
    fs: &dyn FileSystem,
    paths: &StatPaths,
    entity: &Entity,
) -> Result<f64, CollectError> {
    let path = locate(
        fs,
        &paths.sys_root,
        MetricFamily::Cpu,
        &entity.id,
        CPU_USAGE_CANDIDATES,
    )?;
    let content = read(fs, &path)?;
    parse_scalar_seconds(&content).map_err(|source| CollectError::Parse { path, source })
}

/// Byte counters of every interface in the container's network namespace.
///
/// Returns the path read so field conversion errors can name it.
pub fn collect_network(
    fs: &dyn FileSystem,
    paths: &StatPaths,
    entity: &Entity,
) -> Result<(PathBuf, Vec<InterfaceBytes>), CollectError> {
    let pid = entity.pid.ok_or_else(|| CollectError::MissingPid {
        id: entity.id.clone(),
    })?;

    let path = paths.net_dev(pid);
    let content = read(fs, &path)?;
    let table = parse_device_table(&content).map_err(|source| CollectError::Parse {
        path: path.clone(),
        source,
    })?;
    Ok((path, interface_bytes(&table)))
}

/// Runs every enabled file-backed family for one entity.
///
/// Presence is not handled here; it needs no file and is published by the
/// round directly. A failing family never affects the others.
pub fn collect_entity(
    fs: &dyn FileSystem,
    paths: &StatPaths,
    families: FamilySet,
    entity: &Entity,
) -> EntityReport {
    let mut report = EntityReport::default();
    let labels = vec![entity.name.clone(), entity.image.clone()];

    if families.contains(MetricFamily::Memory) {
        match collect_memory(fs, paths, entity) {
            Ok(value) => report.samples.push(MetricSample::new(
                Metric::MemoryUsageBytes,
                labels.clone(),
                value,
            )),
            Err(error) => report.failures.push(Failure::new(MetricFamily::Memory, error)),
        }
    }

    if families.contains(MetricFamily::Cpu) {
        match collect_cpu(fs, paths, entity) {
            Ok(value) => report.samples.push(MetricSample::new(
                Metric::CpuUsageSecondsTotal,
                labels.clone(),
                value,
            )),
            Err(error) => report.failures.push(Failure::new(MetricFamily::Cpu, error)),
        }
    }

    if families.contains(MetricFamily::Network) {
        match collect_network(fs, paths, entity) {
            Ok((path, interfaces)) => {
                debug!(container = %entity.name, interfaces = interfaces.len(), "Parsed network table");
                for bytes in interfaces {
                    let mut labels = labels.clone();
                    labels.push(bytes.interface);

                    let directions = [
                        (Metric::NetworkReceiveBytes, bytes.receive),
                        (Metric::NetworkTransmitBytes, bytes.transmit),
                    ];
                    for (metric, value) in directions {
                        match value {
                            Ok(value) => report
                                .samples
                                .push(MetricSample::new(metric, labels.clone(), value)),
                            Err(source) => report.failures.push(Failure::new(
                                MetricFamily::Network,
                                CollectError::Parse {
                                    path: path.clone(),
                                    source,
                                },
                            )),
                        }
                    }
                }
            }
            Err(error) => report.failures.push(Failure::new(MetricFamily::Network, error)),
        }
    }

    report
}
