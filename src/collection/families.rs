//! Published metric vectors and the snapshot that holds one round of them.

use std::collections::{BTreeMap, HashMap};

use prometheus::{proto, Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::core::{FamilySet, MetricFamily};

const SUBSYSTEM: &str = "docker";
const CONTAINER_SUBSYSTEM: &str = "docker_containers";

const CONTAINER_LABELS: &[&str] = &["name", "image"];
const INTERFACE_LABELS: &[&str] = &["name", "image", "interface"];

/// Every gauge vector a collector can publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Containers,
    MemoryUsageBytes,
    CpuUsageSecondsTotal,
    NetworkReceiveBytes,
    NetworkTransmitBytes,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Containers,
        Metric::MemoryUsageBytes,
        Metric::CpuUsageSecondsTotal,
        Metric::NetworkReceiveBytes,
        Metric::NetworkTransmitBytes,
    ];

    pub fn family(&self) -> MetricFamily {
        match self {
            Metric::Containers => MetricFamily::Presence,
            Metric::MemoryUsageBytes => MetricFamily::Memory,
            Metric::CpuUsageSecondsTotal => MetricFamily::Cpu,
            Metric::NetworkReceiveBytes | Metric::NetworkTransmitBytes => MetricFamily::Network,
        }
    }

    fn subsystem(&self) -> &'static str {
        match self {
            Metric::Containers => SUBSYSTEM,
            _ => CONTAINER_SUBSYSTEM,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Metric::Containers => "containers",
            Metric::MemoryUsageBytes => "memory_usage_bytes",
            Metric::CpuUsageSecondsTotal => "cpu_usage_seconds_total",
            Metric::NetworkReceiveBytes => "network_receive_bytes",
            Metric::NetworkTransmitBytes => "network_transmit_bytes",
        }
    }

    fn help(&self) -> &'static str {
        match self {
            Metric::Containers => "Running Docker containers",
            Metric::MemoryUsageBytes => "Container memory usage in bytes",
            Metric::CpuUsageSecondsTotal => "Container combined CPU time in seconds",
            Metric::NetworkReceiveBytes => "Container network receive in bytes",
            Metric::NetworkTransmitBytes => "Container network transmit in bytes",
        }
    }

    /// Label names, in the order `MetricSample::labels` must follow.
    pub fn label_names(&self) -> &'static [&'static str] {
        match self {
            Metric::NetworkReceiveBytes | Metric::NetworkTransmitBytes => INTERFACE_LABELS,
            _ => CONTAINER_LABELS,
        }
    }

    /// Fully qualified name under `namespace`.
    pub fn fq_name(&self, namespace: &str) -> String {
        [namespace, self.subsystem(), self.name()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("_")
    }

    fn opts(&self, namespace: &str) -> Opts {
        Opts::new(self.name(), self.help())
            .namespace(namespace)
            .subsystem(self.subsystem())
    }
}

/// One value produced for one entity, ready to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub metric: Metric,
    pub labels: Vec<String>,
    pub value: f64,
}

impl MetricSample {
    pub fn new(metric: Metric, labels: Vec<String>, value: f64) -> Self {
        Self {
            metric,
            labels,
            value,
        }
    }
}

/// A gathered series, used to inspect a snapshot without parsing its text.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

/// The metric vectors of one collection round.
///
/// Each round builds its own snapshot from empty, so label sets of containers
/// that have gone away never carry over.
pub struct Snapshot {
    registry: Registry,
    vectors: HashMap<Metric, GaugeVec>,
}

impl Snapshot {
    /// Creates empty vectors for every metric of the enabled families.
    pub fn new(namespace: &str, families: &FamilySet) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let mut vectors = HashMap::new();

        for metric in Metric::ALL
            .into_iter()
            .filter(|m| families.contains(m.family()))
        {
            let vector = GaugeVec::new(metric.opts(namespace), metric.label_names())?;
            registry.register(Box::new(vector.clone()))?;
            vectors.insert(metric, vector);
        }

        Ok(Self { registry, vectors })
    }

    /// A snapshot with no vectors, published before the first round.
    pub fn empty() -> Self {
        Self {
            registry: Registry::new(),
            vectors: HashMap::new(),
        }
    }

    /// Sets the gauge for the sample's label set.
    ///
    /// Samples of a family that is not enabled are dropped.
    pub fn publish(&self, sample: &MetricSample) -> Result<(), prometheus::Error> {
        let Some(vector) = self.vectors.get(&sample.metric) else {
            return Ok(());
        };

        let values: Vec<&str> = sample.labels.iter().map(String::as_str).collect();
        vector.get_metric_with_label_values(&values)?.set(sample.value);
        Ok(())
    }

    /// Renders the snapshot in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// All series currently held, sorted by name.
    pub fn series(&self) -> Vec<Series> {
        self.registry
            .gather()
            .iter()
            .flat_map(|family: &proto::MetricFamily| {
                family.get_metric().iter().map(move |metric| Series {
                    name: family.get_name().to_string(),
                    labels: metric
                        .get_label()
                        .iter()
                        .map(|pair| (pair.get_name().to_string(), pair.get_value().to_string()))
                        .collect(),
                    value: metric.get_gauge().get_value(),
                })
            })
            .collect()
    }

    /// Value of the series `name` whose labels include all of `labels`.
    pub fn value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.series()
            .into_iter()
            .find(|series| {
                series.name == name
                    && labels
                        .iter()
                        .all(|(k, v)| series.labels.get(*k).map(String::as_str) == Some(*v))
            })
            .map(|series| series.value)
    }

    pub fn is_empty(&self) -> bool {
        self.series().is_empty()
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("vectors", &self.vectors.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
