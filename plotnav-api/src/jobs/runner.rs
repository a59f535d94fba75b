//! Asynchronous build-job runner.
//!
//! Submissions create jobs in a shared table and enqueue build requests on
//! a bounded channel; a pool of workers drains the channel, runs the
//! summary builder, and writes successful results to the cache store. Two
//! invariants matter here:
//!
//! - at most one build per cache key is in flight: a submission whose key
//!   already has a queued or running job is coalesced onto that job's id,
//!   so overlapping builds of one key cannot race each other's writes;
//! - a failed build never touches the store, so it can never clobber a
//!   previously good cache entry.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use plotnav_core::{Job, JobError, JobId, JobStatus};
use plotnav_registry::{build_summary, RegistryPool};
use plotnav_storage::{encode_summary, CacheKey, CacheStore};
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};

use crate::config::QueueConfig;

/// One queued unit of work.
struct BuildRequest {
    job_id: JobId,
    key: CacheKey,
}

/// Counters for build activity since startup.
#[derive(Debug, Default)]
struct JobMetrics {
    submitted: AtomicU64,
    coalesced: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Snapshot of runner metrics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobMetricsSnapshot {
    pub submitted: u64,
    pub coalesced: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// The asynchronous job runner: job table, build queue, and worker pool.
pub struct JobRunner {
    jobs: DashMap<JobId, Job>,
    /// Submission order, for oldest-terminal eviction.
    order: Mutex<VecDeque<JobId>>,
    /// Encoded cache key -> the job currently building it.
    inflight: DashMap<String, JobId>,
    tx: mpsc::Sender<BuildRequest>,
    metrics: JobMetrics,
    store: Arc<dyn CacheStore>,
    pool: Arc<RegistryPool>,
    job_table_capacity: usize,
}

impl JobRunner {
    /// Create the runner and its queue without spawning workers.
    fn build(
        config: &QueueConfig,
        store: Arc<dyn CacheStore>,
        pool: Arc<RegistryPool>,
    ) -> (Arc<Self>, mpsc::Receiver<BuildRequest>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let runner = Arc::new(Self {
            jobs: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            inflight: DashMap::new(),
            tx,
            metrics: JobMetrics::default(),
            store,
            pool,
            job_table_capacity: config.job_table_capacity,
        });
        (runner, rx)
    }

    /// Create the runner and spawn its worker pool.
    pub fn start(
        config: &QueueConfig,
        store: Arc<dyn CacheStore>,
        pool: Arc<RegistryPool>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Arc<Self> {
        let (runner, rx) = Self::build(config, store, pool);
        let rx = Arc::new(AsyncMutex::new(rx));
        for worker in 0..config.workers.max(1) {
            tokio::spawn(worker_loop(
                Arc::clone(&runner),
                Arc::clone(&rx),
                shutdown_rx.clone(),
                worker,
            ));
        }
        tracing::info!(workers = config.workers.max(1), "Build workers started");
        runner
    }

    /// Submit a build for `(repository, collection)`.
    ///
    /// Returns the id of a newly queued job, or the id of the in-flight job
    /// for the same cache key when the submission coalesces.
    pub fn submit(
        &self,
        repository: impl Into<String>,
        collection: impl Into<String>,
    ) -> Result<JobId, JobError> {
        let repository = repository.into();
        let collection = collection.into();
        let key = CacheKey::new(repository.clone(), collection.clone());
        let encoded = key.encode();

        // Insert the candidate job first so a concurrent submission that
        // finds it through the in-flight index sees a live job, then claim
        // the key atomically through the entry.
        let job = Job::new(repository, collection);
        let id = job.id;
        self.jobs.insert(id, job);
        match self.inflight.entry(encoded.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                let existing = *occupied.get();
                let live = self
                    .jobs
                    .get(&existing)
                    .is_some_and(|job| !job.status.is_terminal());
                if live && existing != id {
                    self.jobs.remove(&id);
                    self.metrics.coalesced.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(job_id = %existing, key = %encoded, "Coalesced submission onto in-flight build");
                    return Ok(existing);
                }
                occupied.insert(id);
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(id);
            }
        }
        if let Ok(mut order) = self.order.lock() {
            order.push_back(id);
        }
        self.evict_terminal_overflow();

        match self.tx.try_send(BuildRequest { job_id: id, key }) {
            Ok(()) => {
                self.metrics.submitted.fetch_add(1, Ordering::Relaxed);
                tracing::info!(job_id = %id, key = %encoded, "Queued summary build");
                Ok(id)
            }
            Err(err) => {
                self.jobs.remove(&id);
                self.inflight.remove_if(&encoded, |_, v| *v == id);
                match err {
                    mpsc::error::TrySendError::Full(_) => Err(JobError::QueueFull),
                    mpsc::error::TrySendError::Closed(_) => Err(JobError::QueueClosed),
                }
            }
        }
    }

    /// Current state of a job.
    pub fn status(&self, id: JobId) -> Result<Job, JobError> {
        self.jobs
            .get(&id)
            .map(|job| job.clone())
            .ok_or(JobError::NotFound { id })
    }

    pub fn metrics_snapshot(&self) -> JobMetricsSnapshot {
        JobMetricsSnapshot {
            submitted: self.metrics.submitted.load(Ordering::Relaxed),
            coalesced: self.metrics.coalesced.load(Ordering::Relaxed),
            succeeded: self.metrics.succeeded.load(Ordering::Relaxed),
            failed: self.metrics.failed.load(Ordering::Relaxed),
        }
    }

    /// Run one build request to a terminal job state.
    async fn execute(&self, request: BuildRequest) {
        let BuildRequest { job_id, key } = request;
        let encoded = key.encode();

        if let Err(e) = self.update_job(job_id, |job| job.transition(JobStatus::Running)) {
            tracing::warn!(job_id = %job_id, error = %e, "Skipping build for missing or finished job");
            self.inflight.remove_if(&encoded, |_, v| *v == job_id);
            return;
        }

        let recorded = match self.build_and_store(&key).await {
            Ok(total) => {
                self.metrics.succeeded.fetch_add(1, Ordering::Relaxed);
                tracing::info!(job_id = %job_id, key = %encoded, plots = total, "Summary build succeeded");
                self.update_job(job_id, |job| job.succeed(format!("Success: {total} plots")))
            }
            Err(message) => {
                self.metrics.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(job_id = %job_id, key = %encoded, error = %message, "Summary build failed");
                self.update_job(job_id, |job| job.fail(format!("Error: {message}")))
            }
        };
        if let Err(e) = recorded {
            tracing::error!(job_id = %job_id, error = %e, "Could not record job outcome");
        }

        self.inflight.remove_if(&encoded, |_, v| *v == job_id);
    }

    /// Build the summary and write it to the store. The store write is the
    /// last step, so any failure leaves the previous entry untouched.
    async fn build_and_store(&self, key: &CacheKey) -> Result<usize, String> {
        let registry = self.pool.get(key.repository()).map_err(|e| e.to_string())?;
        let summary = build_summary(registry.as_ref(), key.collection())
            .await
            .map_err(|e| e.to_string())?;
        let payload = encode_summary(&summary).map_err(|e| e.to_string())?;
        self.store
            .put(&key.encode(), payload)
            .await
            .map_err(|e| e.to_string())?;
        Ok(summary.total_refs())
    }

    fn update_job(
        &self,
        id: JobId,
        f: impl FnOnce(&mut Job) -> Result<(), JobError>,
    ) -> Result<(), JobError> {
        let mut entry = self.jobs.get_mut(&id).ok_or(JobError::NotFound { id })?;
        f(entry.value_mut())
    }

    /// Drop the oldest terminal jobs once the table exceeds its capacity.
    /// Non-terminal jobs are never evicted.
    fn evict_terminal_overflow(&self) {
        if self.jobs.len() <= self.job_table_capacity {
            return;
        }
        let Ok(mut order) = self.order.lock() else {
            return;
        };
        let mut retained = VecDeque::with_capacity(order.len());
        while let Some(id) = order.pop_front() {
            if self.jobs.len() <= self.job_table_capacity {
                retained.push_back(id);
                continue;
            }
            let terminal = self.jobs.get(&id).map(|job| job.status.is_terminal());
            match terminal {
                None => {}
                Some(true) => {
                    self.jobs.remove(&id);
                }
                Some(false) => retained.push_back(id),
            }
        }
        *order = retained;
    }
}

/// One build worker: drain the shared queue until shutdown.
async fn worker_loop(
    runner: Arc<JobRunner>,
    rx: Arc<AsyncMutex<mpsc::Receiver<BuildRequest>>>,
    mut shutdown_rx: watch::Receiver<bool>,
    worker: usize,
) {
    tracing::debug!(worker, "Build worker started");
    loop {
        let request = {
            let mut guard = rx.lock().await;
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        None
                    } else {
                        continue;
                    }
                }
                request = guard.recv() => request,
            }
        };
        let Some(request) = request else {
            break;
        };
        runner.execute(request).await;
    }
    tracing::debug!(worker, "Build worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotnav_core::{DatasetRecord, DatasetTypeInfo, PLOT_STORAGE_CLASS};
    use plotnav_registry::{MockRegistry, MockRegistryFactory, RegistryFactory};
    use plotnav_storage::{decode_summary, MemoryStore};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn fixture(
        repositories: &[&str],
    ) -> (Arc<MemoryStore>, Arc<RegistryPool>, Arc<MockRegistry>) {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(MockRegistry::new());
        let factory = Arc::new(MockRegistryFactory::new());
        for repo in repositories {
            factory.insert(*repo, Arc::clone(&registry));
        }
        let pool = Arc::new(RegistryPool::new(
            repositories.iter().copied().map(String::from),
            factory as Arc<dyn RegistryFactory>,
        ));
        (store, pool, registry)
    }

    fn plot_collection(registry: &MockRegistry, name: &str, refs: usize) {
        let records = (0..refs)
            .map(|i| DatasetRecord {
                dataset_type: "tractPlot".to_string(),
                data_id: BTreeMap::from([("tract".to_string(), serde_json::json!(i))]),
                id: format!("ref-{i}"),
            })
            .collect();
        registry.add_collection(
            name,
            vec![DatasetTypeInfo::new("tractPlot", PLOT_STORAGE_CLASS, ["tract"])],
            records,
        );
    }

    async fn drain_one(runner: &JobRunner, rx: &mut mpsc::Receiver<BuildRequest>) {
        let request = rx.try_recv().expect("a queued build request");
        runner.execute(request).await;
    }

    #[tokio::test]
    async fn successful_build_writes_store_and_reports_ref_count() {
        let (store, pool, registry) = fixture(&["main"]);
        plot_collection(&registry, "run1", 3);
        let (runner, mut rx) =
            JobRunner::build(&QueueConfig::development(), store.clone(), pool);

        let id = runner.submit("main", "run1").unwrap();
        assert_eq!(runner.status(id).unwrap().status, JobStatus::Queued);

        drain_one(&runner, &mut rx).await;

        let job = runner.status(id).unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.result.as_deref(), Some("Success: 3 plots"));

        let key = CacheKey::new("main", "run1").encode();
        let payload = store.get(&key).await.unwrap().expect("cache entry");
        let summary = decode_summary(&payload).unwrap();
        assert_eq!(summary.total_refs(), 3);
    }

    #[tokio::test]
    async fn failed_build_leaves_existing_entry_untouched() {
        let (store, pool, _registry) = fixture(&["main"]);
        let (runner, mut rx) =
            JobRunner::build(&QueueConfig::development(), store.clone(), pool);

        let key = CacheKey::new("main", "gone").encode();
        store.put(&key, b"previous good entry".to_vec()).await.unwrap();

        // The mock registry has no collection "gone", so the build fails.
        let id = runner.submit("main", "gone").unwrap();
        drain_one(&runner, &mut rx).await;

        let job = runner.status(id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        let result = job.result.expect("failure message");
        assert!(result.starts_with("Error: "));
        assert!(result.contains("gone"));

        assert_eq!(
            store.get(&key).await.unwrap(),
            Some(b"previous good entry".to_vec())
        );
    }

    #[tokio::test]
    async fn store_outage_fails_the_job_without_partial_writes() {
        let (store, pool, registry) = fixture(&["main"]);
        plot_collection(&registry, "run1", 1);
        store.set_unavailable(true);
        let (runner, mut rx) =
            JobRunner::build(&QueueConfig::development(), store.clone(), pool);

        let id = runner.submit("main", "run1").unwrap();
        drain_one(&runner, &mut rx).await;

        let job = runner.status(id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.result.unwrap().starts_with("Error: "));
    }

    #[tokio::test]
    async fn concurrent_submissions_for_one_key_coalesce() {
        let (store, pool, registry) = fixture(&["main"]);
        plot_collection(&registry, "run1", 1);
        let (runner, mut rx) = JobRunner::build(&QueueConfig::development(), store, pool);

        let first = runner.submit("main", "run1").unwrap();
        let second = runner.submit("main", "run1").unwrap();
        assert_eq!(first, second);
        assert_eq!(runner.metrics_snapshot().coalesced, 1);

        // Only one build request was actually queued.
        drain_one(&runner, &mut rx).await;
        assert!(rx.try_recv().is_err());

        // After the job finishes, a new submission starts a fresh build.
        let third = runner.submit("main", "run1").unwrap();
        assert_ne!(first, third);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_coalesce() {
        let (store, pool, registry) = fixture(&["main"]);
        plot_collection(&registry, "run1", 1);
        plot_collection(&registry, "run2", 1);
        let (runner, _rx) = JobRunner::build(&QueueConfig::development(), store, pool);

        let a = runner.submit("main", "run1").unwrap();
        let b = runner.submit("main", "run2").unwrap();
        assert_ne!(a, b);
        assert_eq!(runner.metrics_snapshot().coalesced, 0);
    }

    #[tokio::test]
    async fn unknown_job_id_is_not_found() {
        let (store, pool, _registry) = fixture(&["main"]);
        let (runner, _rx) = JobRunner::build(&QueueConfig::development(), store, pool);
        let id = plotnav_core::new_job_id();
        assert!(matches!(
            runner.status(id),
            Err(JobError::NotFound { id: missing }) if missing == id
        ));
    }

    #[tokio::test]
    async fn unregistered_repository_fails_the_build_not_the_submit() {
        let (store, pool, _registry) = fixture(&["main"]);
        let (runner, mut rx) = JobRunner::build(&QueueConfig::development(), store, pool);

        // Submission is accepted (route-level validation is the caller's
        // job); the build itself then fails cleanly.
        let id = runner.submit("other", "run1").unwrap();
        drain_one(&runner, &mut rx).await;
        let job = runner.status(id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.result.unwrap().contains("not registered"));
    }

    #[tokio::test]
    async fn full_queue_rejects_submission_and_rolls_back() {
        let (store, pool, registry) = fixture(&["main"]);
        plot_collection(&registry, "run1", 1);
        plot_collection(&registry, "run2", 1);
        let config = QueueConfig {
            workers: 1,
            queue_capacity: 1,
            job_table_capacity: 32,
        };
        let (runner, _rx) = JobRunner::build(&config, store, pool);

        runner.submit("main", "run1").unwrap();
        let err = runner.submit("main", "run2").unwrap_err();
        assert!(matches!(err, JobError::QueueFull));
        // The rejected job is not left behind in the table.
        assert_eq!(runner.metrics_snapshot().submitted, 1);
    }

    #[tokio::test]
    async fn terminal_jobs_are_evicted_past_capacity() {
        let (store, pool, registry) = fixture(&["main"]);
        let config = QueueConfig {
            workers: 1,
            queue_capacity: 64,
            job_table_capacity: 2,
        };
        for i in 0..5 {
            plot_collection(&registry, &format!("run{i}"), 1);
        }
        let (runner, mut rx) = JobRunner::build(&config, store, pool);

        let mut ids = Vec::new();
        for i in 0..5 {
            let id = runner.submit("main", format!("run{i}")).unwrap();
            drain_one(&runner, &mut rx).await;
            ids.push(id);
        }

        // Oldest terminal jobs were evicted; the most recent survive.
        assert!(runner.status(ids[0]).is_err());
        assert!(runner.status(ids[4]).is_ok());
    }

    #[tokio::test]
    async fn worker_pool_end_to_end_with_shutdown() {
        let (store, pool, registry) = fixture(&["main"]);
        plot_collection(&registry, "run1", 2);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runner = JobRunner::start(
            &QueueConfig::development(),
            store.clone(),
            pool,
            shutdown_rx,
        );

        let id = runner.submit("main", "run1").unwrap();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let job = runner.status(id).unwrap();
            if job.status.is_terminal() {
                assert_eq!(job.status, JobStatus::Succeeded);
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "build did not finish");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let _ = shutdown_tx.send(true);
        let key = CacheKey::new("main", "run1").encode();
        assert!(store.get(&key).await.unwrap().is_some());
    }
}
