//! Location and parsing of kernel accounting files.
//!
//! Three text formats are understood:
//!
//! - flat `key value` tables (`memory.stat`), see [`key_value`]
//! - one nanosecond counter per line (`cpuacct.usage`), see [`scalar`]
//! - the two-line-header device table of `/proc/<pid>/net/dev`, see [`device_table`]
//!
//! The parsers are pure functions over the file content. [`locate`] resolves
//! which file to read and [`aggregate`] turns parsed tables into metric values.

pub mod aggregate;
pub mod device_table;
pub mod key_value;
pub mod locate;
pub mod scalar;

use thiserror::Error;

pub use aggregate::{interface_bytes, memory_usage_bytes, InterfaceBytes};
pub use device_table::{parse_device_table, DeviceTable, Direction};
pub use key_value::{parse_key_value_stats, KeyValueStats};
pub use locate::{locate, CPU_USAGE_CANDIDATES, MEMORY_STAT_CANDIDATES};
pub use scalar::parse_scalar_seconds;

/// Errors raised while parsing an accounting file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("line {line}: expected `<field> <value>`, got {content:?}")]
    MalformedLine { line: usize, content: String },

    #[error("invalid value {value:?} for field {key}")]
    InvalidValue { key: String, value: String },

    #[error("line {line}: invalid counter {content:?}")]
    InvalidScalar {
        line: usize,
        content: String,
        /// Seconds parsed from earlier lines. Never published.
        partial_seconds: f64,
    },

    #[error("invalid header line in device table: {header:?}")]
    MalformedHeader { header: String },

    #[error("device table header declares no receive topics")]
    MissingTopics,

    #[error("invalid {direction} {topic} value {value:?} for interface {interface}")]
    InvalidField {
        interface: String,
        topic: String,
        direction: &'static str,
        value: String,
    },
}

impl ParseError {
    /// Short label used when counting skipped samples.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::MalformedLine { .. } => "malformed_line",
            ParseError::InvalidValue { .. } => "invalid_value",
            ParseError::InvalidScalar { .. } => "invalid_scalar",
            ParseError::MalformedHeader { .. } => "malformed_header",
            ParseError::MissingTopics => "missing_topics",
            ParseError::InvalidField { .. } => "invalid_field",
        }
    }
}
