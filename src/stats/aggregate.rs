//! Derived values computed from parsed accounting tables.

use super::{DeviceTable, KeyValueStats, ParseError};

const BYTES_TOPIC: &str = "bytes";

/// Memory in use by a container: resident set plus page cache.
///
/// A missing field counts as zero.
pub fn memory_usage_bytes(stats: &KeyValueStats) -> f64 {
    let field = |key: &str| stats.get(key).copied().unwrap_or(0.0);
    field("rss") + field("cache")
}

/// Byte counters of one interface. Each direction converts on its own so a
/// bad receive value does not hide a good transmit value.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceBytes {
    pub interface: String,
    pub receive: Result<f64, ParseError>,
    pub transmit: Result<f64, ParseError>,
}

/// Converts the `bytes` topic of every interface in the table.
pub fn interface_bytes(table: &DeviceTable) -> Vec<InterfaceBytes> {
    table
        .interfaces()
        .map(|(interface, topics)| {
            let (receive, transmit) = topics
                .get(BYTES_TOPIC)
                .map(|d| (d.receive.as_str(), d.transmit.as_str()))
                .unwrap_or_default();

            InterfaceBytes {
                interface: interface.to_string(),
                receive: convert_field(interface, "receive", receive),
                transmit: convert_field(interface, "transmit", transmit),
            }
        })
        .collect()
}

fn convert_field(interface: &str, direction: &'static str, value: &str) -> Result<f64, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidField {
        interface: interface.to_string(),
        topic: BYTES_TOPIC.to_string(),
        direction,
        value: value.to_string(),
    })
}
