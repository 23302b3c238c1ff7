//! Core domain types and service traits for dockwatch
//!
//! This module defines the entities a collection round works on, the
//! selectable metric families, and the trait through which the round
//! obtains its entity list.

use crate::errors::CollectError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A running container as seen by one collection round.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entity {
    /// Full container id, used to build cgroup paths.
    pub id: String,
    /// Container name without the runtime's leading `/`.
    pub name: String,
    /// Image reference the container was started from.
    pub image: String,
    /// Host pid of the container's init process, if the runtime reported one.
    pub pid: Option<i64>,
}

impl Entity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image: image.into(),
            pid: None,
        }
    }

    pub fn with_pid(mut self, pid: i64) -> Self {
        self.pid = Some(pid);
        self
    }
}

/// One selectable group of published metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricFamily {
    /// `containers` gauge, 1 per running container.
    Presence,
    /// `memory_usage_bytes` from `memory.stat`.
    Memory,
    /// `cpu_usage_seconds_total` from `cpuacct.usage`.
    Cpu,
    /// `network_{receive,transmit}_bytes` from `/proc/<pid>/net/dev`.
    Network,
}

impl MetricFamily {
    pub const ALL: [MetricFamily; 4] = [
        MetricFamily::Presence,
        MetricFamily::Memory,
        MetricFamily::Cpu,
        MetricFamily::Network,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricFamily::Presence => "presence",
            MetricFamily::Memory => "memory",
            MetricFamily::Cpu => "cpu",
            MetricFamily::Network => "network",
        }
    }
}

impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of families a collector publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FamilySet {
    bits: u8,
}

impl FamilySet {
    pub fn all() -> Self {
        Self::from_iter(MetricFamily::ALL)
    }

    pub fn contains(&self, family: MetricFamily) -> bool {
        self.bits & Self::bit(family) != 0
    }

    pub fn insert(&mut self, family: MetricFamily) {
        self.bits |= Self::bit(family);
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = MetricFamily> + '_ {
        MetricFamily::ALL.into_iter().filter(|f| self.contains(*f))
    }

    fn bit(family: MetricFamily) -> u8 {
        1 << family as u8
    }
}

impl FromIterator<MetricFamily> for FamilySet {
    fn from_iter<I: IntoIterator<Item = MetricFamily>>(iter: I) -> Self {
        let mut set = FamilySet::default();
        for family in iter {
            set.insert(family);
        }
        set
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// Lists the containers a round should collect for.
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// Returns every currently running container.
    ///
    /// # Returns
    /// * `Ok(Vec<Entity>)`, possibly empty
    /// * `Err(CollectError::Enumeration)` if the runtime could not be queried;
    ///   the round is aborted
    async fn list_active_entities(&self) -> Result<Vec<Entity>, CollectError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_set_membership() {
        let set: FamilySet = [MetricFamily::Memory, MetricFamily::Network]
            .into_iter()
            .collect();

        assert!(set.contains(MetricFamily::Memory));
        assert!(set.contains(MetricFamily::Network));
        assert!(!set.contains(MetricFamily::Cpu));
        assert!(!set.contains(MetricFamily::Presence));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![MetricFamily::Memory, MetricFamily::Network]
        );
    }

    #[test]
    fn test_family_set_all() {
        let set = FamilySet::all();
        assert_eq!(set.iter().count(), 4);
        assert!(!set.is_empty());
        assert!(FamilySet::default().is_empty());
    }

    #[test]
    fn test_entity_builder() {
        let entity = Entity::new("abc", "web", "nginx:1.27").with_pid(4242);
        assert_eq!(entity.pid, Some(4242));
        assert_eq!(entity.name, "web");
    }
}
