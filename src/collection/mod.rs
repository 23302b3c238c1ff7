//! # Collection
//!
//! The [`Collector`] runs one collection round per call to
//! [`Collector::collect`]:
//!
//! 1. start from an empty [`Snapshot`] of the enabled families
//! 2. list running containers through the [`EntitySource`]
//! 3. publish presence, then run the file-backed families of every container
//!    on the blocking pool, a bounded number at a time
//! 4. swap the filled snapshot in as the published one
//!
//! Only a failed listing aborts a round. Anything that goes wrong for a single
//! container and family is logged, counted and skipped.

pub mod families;
pub mod round;

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use futures::future::join_all;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error, info, instrument, warn};

use crate::config::Config;
use crate::core::{Entity, EntitySource, FamilySet, MetricFamily};
use crate::errors::CollectError;
use crate::fs::{FileSystem, RealFs};

pub use families::{Metric, MetricSample, Series, Snapshot};
pub use round::{EntityReport, Failure, StatPaths};

/// Tunables of a collector, resolved from configuration once at startup.
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub namespace: String,
    pub families: FamilySet,
    pub paths: StatPaths,
    /// Containers collected at the same time.
    pub concurrency: usize,
    /// Deadline for the file-backed families of one container.
    pub entity_timeout: Duration,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            namespace: "dockwatch".to_string(),
            families: FamilySet::all(),
            paths: StatPaths::default(),
            concurrency: 8,
            entity_timeout: Duration::from_millis(2000),
        }
    }
}

impl CollectorSettings {
    pub fn from_config(config: &Config) -> Self {
        let collection = &config.collection;
        Self {
            namespace: config.metrics.namespace.clone(),
            families: collection.families.iter().copied().collect(),
            paths: StatPaths {
                sys_root: collection.sys_root.clone(),
                proc_root: collection.proc_root.clone(),
            },
            concurrency: collection.concurrency.max(1),
            entity_timeout: Duration::from_millis(collection.entity_timeout_ms),
        }
    }
}

/// Collects container metrics on demand and keeps the last good snapshot.
pub struct Collector {
    source: Arc<dyn EntitySource>,
    fs: Arc<dyn FileSystem>,
    settings: Arc<CollectorSettings>,
    published: ArcSwap<Snapshot>,
    round_lock: Mutex<()>,
    /// Shared by every round, so reads still stuck from an earlier round
    /// count against `concurrency`.
    permits: Arc<Semaphore>,
}

impl Collector {
    pub fn new(
        source: Arc<dyn EntitySource>,
        fs: Arc<dyn FileSystem>,
        settings: CollectorSettings,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(settings.concurrency.max(1)));
        Self {
            source,
            fs,
            settings: Arc::new(settings),
            published: ArcSwap::from_pointee(Snapshot::empty()),
            round_lock: Mutex::new(()),
            permits,
        }
    }

    /// A collector reading the real `/sys` and `/proc` trees named in `config`.
    pub fn from_config(config: &Config, source: Arc<dyn EntitySource>) -> Self {
        Self::new(
            source,
            Arc::new(RealFs::new()),
            CollectorSettings::from_config(config),
        )
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    /// The snapshot of the last round that completed.
    pub fn published(&self) -> Arc<Snapshot> {
        self.published.load_full()
    }

    /// Runs one collection round and returns the snapshot it published.
    ///
    /// Rounds on the same collector are serialised. If listing containers
    /// fails the published snapshot is left as it was.
    #[instrument(skip_all)]
    pub async fn collect(&self) -> Result<Arc<Snapshot>, CollectError> {
        let _round = self.round_lock.lock().await;
        let started = Instant::now();

        let snapshot = Snapshot::new(&self.settings.namespace, &self.settings.families)?;

        let entities = match self.source.list_active_entities().await {
            Ok(entities) => entities,
            Err(e) => {
                error!(error = %e, "Failed to list containers, keeping previous snapshot");
                return Err(e);
            }
        };
        debug!(containers = entities.len(), "Listed running containers");
        metrics::gauge!("dockwatch_containers_seen").set(entities.len() as f64);

        if self.settings.families.contains(MetricFamily::Presence) {
            for entity in &entities {
                let sample = MetricSample::new(
                    Metric::Containers,
                    vec![entity.name.clone(), entity.image.clone()],
                    1.0,
                );
                self.publish(&snapshot, entity, &sample);
            }
        }

        let reports = join_all(entities.iter().map(|e| self.collect_entity(e.clone()))).await;

        let mut skipped = 0usize;
        for (entity, report) in entities.iter().zip(reports) {
            for sample in &report.samples {
                self.publish(&snapshot, entity, sample);
            }
            for failure in report.failures {
                skipped += 1;
                record_failure(entity, failure);
            }
        }

        let snapshot = Arc::new(snapshot);
        self.published.store(snapshot.clone());

        let elapsed = started.elapsed();
        metrics::histogram!("dockwatch_collection_duration_seconds").record(elapsed.as_secs_f64());
        info!(
            containers = entities.len(),
            skipped,
            elapsed_ms = elapsed.as_millis() as u64,
            "Collection round finished"
        );

        Ok(snapshot)
    }

    /// Runs the file-backed families of one entity on the blocking pool.
    ///
    /// The deadline covers waiting for a permit as well as the reads, so an
    /// entity queued behind stuck reads is skipped instead of stalling the
    /// round.
    async fn collect_entity(&self, entity: Entity) -> EntityReport {
        let id = entity.id.clone();
        let timeout = self.settings.entity_timeout;
        let permits = self.permits.clone();
        let fs = self.fs.clone();
        let settings = self.settings.clone();

        let work = async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|e| e.to_string())?;
            let report = tokio::task::spawn_blocking(move || {
                // held until the reads finish, even if the round stopped waiting
                let _permit = permit;
                round::collect_entity(fs.as_ref(), &settings.paths, settings.families, &entity)
            })
            .await
            .map_err(|e| e.to_string())?;
            Ok::<_, String>(report)
        };

        match tokio::time::timeout(timeout, work).await {
            Ok(Ok(report)) => report,
            Ok(Err(reason)) => EntityReport::failed(Failure::entity(CollectError::Task { id, reason })),
            Err(_) => EntityReport::failed(Failure::entity(CollectError::Timeout { id, timeout })),
        }
    }

    fn publish(&self, snapshot: &Snapshot, entity: &Entity, sample: &MetricSample) {
        if let Err(e) = snapshot.publish(sample) {
            warn!(container = %entity.name, metric = ?sample.metric, error = %e, "Failed to publish sample");
            metrics::counter!(
                "dockwatch_collection_errors_total",
                "family" => sample.metric.family().as_str(),
                "kind" => "registry"
            )
            .increment(1);
        }
    }
}

fn record_failure(entity: &Entity, failure: Failure) {
    let Failure { family, error } = failure;
    match &error {
        CollectError::Read { path, .. } | CollectError::Parse { path, .. } => {
            debug!(container = %entity.name, family, path = %path.display(), error = %error, "Skipping sample");
        }
        _ => {
            debug!(container = %entity.name, family, error = %error, "Skipping sample");
        }
    }
    metrics::counter!(
        "dockwatch_collection_errors_total",
        "family" => family,
        "kind" => error.kind()
    )
    .increment(1);
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFs;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(Vec<Entity>);

    #[async_trait]
    impl EntitySource for Fixed {
        async fn list_active_entities(&self) -> Result<Vec<Entity>, CollectError> {
            Ok(self.0.clone())
        }
    }

    struct SlowFs;

    impl FileSystem for SlowFs {
        fn read_to_string(&self, _path: &std::path::Path) -> std::io::Result<String> {
            std::thread::sleep(Duration::from_millis(300));
            Ok("1\n".to_string())
        }

        fn exists(&self, _path: &std::path::Path) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_presence_without_files() {
        let source = Arc::new(Fixed(vec![Entity::new("a", "web", "nginx")]));
        let collector = Collector::new(source, Arc::new(MockFs::new()), CollectorSettings::default());

        let snapshot = collector.collect().await.unwrap();

        assert_eq!(
            snapshot.value("dockwatch_docker_containers", &[("name", "web"), ("image", "nginx")]),
            Some(1.0)
        );
        assert_eq!(snapshot.series().len(), 1);
    }

    #[tokio::test]
    async fn test_timed_out_entity_keeps_presence() {
        let source = Arc::new(Fixed(vec![Entity::new("a", "web", "nginx")]));
        let settings = CollectorSettings {
            entity_timeout: Duration::from_millis(50),
            ..CollectorSettings::default()
        };
        let collector = Collector::new(source, Arc::new(SlowFs), settings);

        let snapshot = collector.collect().await.unwrap();

        let names: Vec<String> = snapshot.series().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["dockwatch_docker_containers"]);
    }

    /// Reads block for `delay` and record how many ran at the same time.
    #[derive(Default)]
    struct StuckFs {
        delay: Duration,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl StuckFs {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }
    }

    impl FileSystem for StuckFs {
        fn read_to_string(&self, path: &std::path::Path) -> std::io::Result<String> {
            if !path.to_string_lossy().contains("stuck") {
                return Ok("1\n".to_string());
            }
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok("1\n".to_string())
        }

        fn exists(&self, _path: &std::path::Path) -> bool {
            true
        }
    }

    fn single_file_settings() -> CollectorSettings {
        CollectorSettings {
            families: [MetricFamily::Presence, MetricFamily::Cpu].into_iter().collect(),
            concurrency: 1,
            entity_timeout: Duration::from_millis(50),
            ..CollectorSettings::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_waiting_for_a_permit_counts_against_the_timeout() {
        let source = Arc::new(Fixed(vec![
            Entity::new("stuck", "hung", "busybox"),
            Entity::new("ok", "web", "nginx"),
        ]));
        let fs = Arc::new(StuckFs::new(Duration::from_millis(1500)));
        let collector = Collector::new(source, fs, single_file_settings());

        let started = Instant::now();
        let snapshot = collector.collect().await.unwrap();

        assert!(
            started.elapsed() < Duration::from_millis(1000),
            "round took {:?}",
            started.elapsed()
        );
        assert_eq!(
            snapshot.value("dockwatch_docker_containers", &[("name", "web"), ("image", "nginx")]),
            Some(1.0)
        );
        assert_eq!(
            snapshot.value("dockwatch_docker_containers", &[("name", "hung"), ("image", "busybox")]),
            Some(1.0)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stuck_reads_stay_bounded_across_rounds() {
        let source = Arc::new(Fixed(vec![Entity::new("stuck", "hung", "busybox")]));
        let fs = Arc::new(StuckFs::new(Duration::from_millis(400)));
        let collector = Collector::new(source, fs.clone(), single_file_settings());

        for _ in 0..4 {
            let snapshot = collector.collect().await.unwrap();
            assert_eq!(snapshot.series().len(), 1);
        }
        // let the reads still running from the first round drain
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(fs.peak.load(Ordering::SeqCst), 1);
        assert_eq!(fs.running.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_published_starts_empty() {
        let collector = Collector::new(
            Arc::new(Fixed(Vec::new())),
            Arc::new(MockFs::new()),
            CollectorSettings::default(),
        );
        assert!(collector.published().is_empty());
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.metrics.namespace = "node".to_string();
        config.collection.families = vec![MetricFamily::Cpu];
        config.collection.entity_timeout_ms = 150;

        let settings = CollectorSettings::from_config(&config);

        assert_eq!(settings.namespace, "node");
        assert!(settings.families.contains(MetricFamily::Cpu));
        assert!(!settings.families.contains(MetricFamily::Memory));
        assert_eq!(settings.entity_timeout, Duration::from_millis(150));
    }
}
