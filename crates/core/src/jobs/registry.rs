//! Batch job registry.
//!
//! Jobs live in a TTL cache keyed by id. Counters are atomics; status and
//! the error list sit behind mutexes. Progress only moves forward.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use serde::Serialize;
use uuid::Uuid;

/// Lifecycle of a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, not started.
    Queued,
    /// Worker is running.
    Processing,
    /// Finished normally.
    Completed,
    /// Aborted by an infrastructure error.
    Failed,
}

impl JobStatus {
    /// Returns true for `Completed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One recorded row problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// Zero-based row index in the submitted payload.
    pub row: usize,
    /// Product name or SKU as submitted.
    pub product: String,
    /// What was wrong with the row.
    pub fields: String,
}

/// A running or finished batch job.
#[derive(Debug)]
pub struct BatchJob {
    id: Uuid,
    total: usize,
    created: AtomicUsize,
    updated: AtomicUsize,
    deleted: AtomicUsize,
    failed: AtomicUsize,
    progress: AtomicU8,
    status: Mutex<JobStatus>,
    errors: Mutex<Vec<RowError>>,
    started_at: DateTime<Utc>,
    finished_at: Mutex<Option<DateTime<Utc>>>,
}

/// Serializable point-in-time view of a job.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    /// Job id.
    pub id: Uuid,
    /// Current status.
    pub status: JobStatus,
    /// Rows submitted.
    pub total: usize,
    /// Products created.
    pub created: usize,
    /// Products updated.
    pub updated: usize,
    /// Products deleted.
    pub deleted: usize,
    /// Rows that failed.
    pub failed: usize,
    /// Percent complete, 0 to 100.
    pub progress: u8,
    /// Row-level problems.
    pub errors: Vec<RowError>,
    /// When the job was accepted.
    pub started_at: DateTime<Utc>,
    /// When the job reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BatchJob {
    fn new(total: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            total,
            created: AtomicUsize::new(0),
            updated: AtomicUsize::new(0),
            deleted: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            progress: AtomicU8::new(0),
            status: Mutex::new(JobStatus::Queued),
            errors: Mutex::new(Vec::new()),
            started_at: Utc::now(),
            finished_at: Mutex::new(None),
        }
    }

    /// Job id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Rows submitted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> JobStatus {
        *lock(&self.status)
    }

    /// Current progress.
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Acquire)
    }

    /// Adds to the created counter.
    pub fn add_created(&self, n: usize) {
        self.created.fetch_add(n, Ordering::AcqRel);
    }

    /// Adds to the updated counter.
    pub fn add_updated(&self, n: usize) {
        self.updated.fetch_add(n, Ordering::AcqRel);
    }

    /// Adds to the deleted counter.
    pub fn add_deleted(&self, n: usize) {
        self.deleted.fetch_add(n, Ordering::AcqRel);
    }

    /// Records a failed row.
    pub fn add_failure(&self, error: RowError) {
        self.failed.fetch_add(1, Ordering::AcqRel);
        lock(&self.errors).push(error);
    }

    /// Records a problem that did not fail its row.
    pub fn add_warning(&self, error: RowError) {
        lock(&self.errors).push(error);
    }

    /// Raises progress to `value`, capped at 99 until completion.
    ///
    /// Lower values than the current one are ignored.
    pub fn set_progress(&self, value: u8) {
        self.progress.fetch_max(value.min(99), Ordering::AcqRel);
    }

    /// Moves a queued job to processing. Returns false otherwise.
    pub fn set_processing(&self) -> bool {
        let mut status = lock(&self.status);
        if *status == JobStatus::Queued {
            *status = JobStatus::Processing;
            true
        } else {
            false
        }
    }

    /// Finishes the job. `Completed` pins progress at 100.
    ///
    /// Returns false if the job had already finished.
    pub fn complete(&self, outcome: JobStatus) -> bool {
        let mut status = lock(&self.status);
        if status.is_terminal() || !outcome.is_terminal() {
            return false;
        }
        if outcome == JobStatus::Completed {
            self.progress.store(100, Ordering::Release);
        }
        *status = outcome;
        *lock(&self.finished_at) = Some(Utc::now());
        true
    }

    /// Point-in-time copy of the job.
    #[must_use]
    pub fn snapshot(&self) -> JobSnapshot {
        let status = self.status();
        JobSnapshot {
            id: self.id,
            status,
            total: self.total,
            created: self.created.load(Ordering::Acquire),
            updated: self.updated.load(Ordering::Acquire),
            deleted: self.deleted.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
            progress: self.progress(),
            errors: lock(&self.errors).clone(),
            started_at: self.started_at,
            finished_at: *lock(&self.finished_at),
        }
    }
}

/// Process-wide job registry.
#[derive(Clone)]
pub struct JobRegistry {
    jobs: Cache<Uuid, Arc<BatchJob>>,
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("jobs", &self.jobs.entry_count())
            .finish()
    }
}

impl JobRegistry {
    /// Creates a registry whose entries expire `ttl` after creation.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            jobs: Cache::builder().time_to_live(ttl).build(),
        }
    }

    /// Registers a queued job for `total` rows.
    pub fn create(&self, total: usize) -> Arc<BatchJob> {
        let job = Arc::new(BatchJob::new(total));
        self.jobs.insert(job.id, Arc::clone(&job));
        job
    }

    /// Looks up a job.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<Arc<BatchJob>> {
        self.jobs.get(&id)
    }

    /// Runs `mutator` against a job. Returns false if the job is unknown.
    pub fn update(&self, id: Uuid, mutator: impl FnOnce(&BatchJob)) -> bool {
        self.get(id).map(|job| mutator(&job)).is_some()
    }

    /// Adds to a job's created counter.
    pub fn add_created(&self, id: Uuid, n: usize) -> bool {
        self.update(id, |job| job.add_created(n))
    }

    /// Adds to a job's updated counter.
    pub fn add_updated(&self, id: Uuid, n: usize) -> bool {
        self.update(id, |job| job.add_updated(n))
    }

    /// Adds to a job's deleted counter.
    pub fn add_deleted(&self, id: Uuid, n: usize) -> bool {
        self.update(id, |job| job.add_deleted(n))
    }

    /// Moves a job from queued to processing.
    pub fn set_processing(&self, id: Uuid) -> bool {
        self.get(id).is_some_and(|job| job.set_processing())
    }

    /// Finishes a job with `status`.
    pub fn complete(&self, id: Uuid, status: JobStatus) -> bool {
        self.get(id).is_some_and(|job| job.complete(status))
    }

    /// Drops a job before its TTL.
    pub fn remove(&self, id: Uuid) {
        self.jobs.invalidate(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn registry() -> JobRegistry {
        JobRegistry::new(Duration::from_secs(60))
    }

    #[test]
    fn test_lifecycle() {
        let registry = registry();
        let job = registry.create(3);
        assert_eq!(job.status(), JobStatus::Queued);
        assert_eq!(job.progress(), 0);

        assert!(registry.set_processing(job.id()));
        assert!(!registry.set_processing(job.id()));
        registry.add_created(job.id(), 2);
        registry.add_updated(job.id(), 1);
        job.add_failure(RowError {
            row: 2,
            product: "Pears".into(),
            fields: "category_not_found".into(),
        });

        assert!(registry.complete(job.id(), JobStatus::Completed));
        assert!(!registry.complete(job.id(), JobStatus::Failed));

        let snapshot = registry.get(job.id()).unwrap().snapshot();
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.progress, 100);
        assert_eq!(snapshot.created, 2);
        assert_eq!(snapshot.updated, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.errors.len(), 1);
        assert!(snapshot.finished_at.is_some());
    }

    #[test]
    fn test_progress_is_monotonic_and_capped() {
        let job = registry().create(1);
        job.set_progress(40);
        job.set_progress(10);
        assert_eq!(job.progress(), 40);
        job.set_progress(250);
        assert_eq!(job.progress(), 99);
    }

    #[test]
    fn test_failed_job_never_reports_100() {
        let registry = registry();
        let job = registry.create(1);
        job.set_processing();
        job.set_progress(95);
        assert!(job.complete(JobStatus::Failed));
        assert_eq!(job.progress(), 95);
    }

    #[test]
    fn test_warning_does_not_count_as_failure() {
        let job = registry().create(1);
        job.add_warning(RowError {
            row: 0,
            product: "Kale".into(),
            fields: "image download failed".into(),
        });
        let snapshot = job.snapshot();
        assert_eq!(snapshot.failed, 0);
        assert_eq!(snapshot.errors.len(), 1);
    }

    #[test]
    fn test_unknown_job() {
        let registry = registry();
        let id = Uuid::new_v4();
        assert!(registry.get(id).is_none());
        assert!(!registry.add_created(id, 1));
        assert!(!registry.complete(id, JobStatus::Completed));
    }

    #[test]
    fn test_remove() {
        let registry = registry();
        let job = registry.create(0);
        registry.remove(job.id());
        assert!(registry.get(job.id()).is_none());
    }

    #[test]
    fn test_concurrent_writers_keep_progress_monotonic() {
        let registry = registry();
        let job = registry.create(1_000);
        job.set_processing();

        let writers: Vec<_> = (0..8u8)
            .map(|w| {
                let job = Arc::clone(&job);
                thread::spawn(move || {
                    for step in 0..=90u8 {
                        job.set_progress(step.wrapping_add(w) % 91);
                        job.add_created(1);
                    }
                })
            })
            .collect();

        let reader = {
            let job = Arc::clone(&job);
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..10_000 {
                    let current = job.progress();
                    assert!(current >= last, "progress went from {last} to {current}");
                    last = current;
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(job.snapshot().created, 8 * 91);
        assert!(job.complete(JobStatus::Completed));
        assert_eq!(job.progress(), 100);
    }
}
