//! Errors raised while collecting container metrics.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::MetricFamily;
use crate::stats::ParseError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything that can go wrong in a collection round.
///
/// Only `Enumeration` and `Registry` abort a round. All other variants are
/// caught per entity and family, logged, and the sample is skipped.
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("failed to list running containers: {0}")]
    Enumeration(#[source] BoxError),

    #[error("no {family} stats file found for container {id}")]
    NotFound { family: MetricFamily, id: String },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("container {id} has no process id")]
    MissingPid { id: String },

    #[error("collection for container {id} timed out after {timeout:?}")]
    Timeout { id: String, timeout: Duration },

    #[error("collection task for container {id} failed: {reason}")]
    Task { id: String, reason: String },

    #[error("failed to build metric vectors: {0}")]
    Registry(#[from] prometheus::Error),
}

impl CollectError {
    /// Short label used when counting skipped samples.
    pub fn kind(&self) -> &'static str {
        match self {
            CollectError::Enumeration(_) => "enumeration",
            CollectError::NotFound { .. } => "not_found",
            CollectError::Read { .. } => "read",
            CollectError::Parse { source, .. } => source.kind(),
            CollectError::MissingPid { .. } => "missing_pid",
            CollectError::Timeout { .. } => "timeout",
            CollectError::Task { .. } => "task",
            CollectError::Registry(_) => "registry",
        }
    }
}
