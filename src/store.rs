use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::job::Job;
use crate::serializer::SerializerError;

/// Errors surfaced by a [`JobStore`]. No operation retries internally; every
/// failure other than a skipped corrupt record in a batch fetch propagates to
/// the caller unmodified.
#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("no job found with id {0:?}")]
    NotFound(String),
    #[error("a job with id {0:?} already exists")]
    Conflict(String),
    #[error("stored state for job {id:?} could not be decoded")]
    CorruptRecord {
        id: String,
        #[source]
        source: SerializerError,
    },
    #[error("invalid job store configuration: {0}")]
    Configuration(String),
    #[error("failed to encode job state")]
    Serialization(#[from] SerializerError),
    #[error("job store backend unavailable")]
    Connectivity(#[from] mongodb::error::Error),
}

/// Durable persistence contract a scheduler relies on: keyed lookup, ordered
/// due-job retrieval, and conflict-safe mutation.
///
/// Implementations perform one backing-store round trip per call and may
/// block on I/O; they offer single-document atomicity only. Callers must not
/// assume atomicity across calls.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Fetch one job by id. Fails with [`JobStoreError::NotFound`] if no
    /// record exists, [`JobStoreError::CorruptRecord`] if its state does not
    /// decode.
    async fn lookup(&self, job_id: &str) -> Result<Job, JobStoreError>;

    /// All jobs whose `next_run_time` is defined and not later than `now`,
    /// ascending by run time. An empty store yields an empty vec.
    async fn get_pending(&self, now: DateTime<Utc>) -> Result<Vec<Job>, JobStoreError>;

    /// The earliest defined `next_run_time` across all jobs, or `None` when
    /// no job has one. Drives the scheduler's next wake-up.
    async fn get_next_run_time(&self) -> Result<Option<DateTime<Utc>>, JobStoreError>;

    /// Every stored job, ascending by `next_run_time`. Jobs without a run
    /// time carry no ordering guarantee relative to the rest.
    async fn get_all(&self) -> Result<Vec<Job>, JobStoreError>;

    /// Insert a new job keyed by `job.id`. Fails with
    /// [`JobStoreError::Conflict`] if the id is already taken; the check is
    /// atomic with the insert.
    async fn add(&self, job: &Job) -> Result<(), JobStoreError>;

    /// Replace the stored run time and state for `job.id`. Fails with
    /// [`JobStoreError::NotFound`] when nothing matched.
    async fn update(&self, job: &Job) -> Result<(), JobStoreError>;

    /// Delete the job keyed by `job_id`. Fails with
    /// [`JobStoreError::NotFound`] if it did not exist.
    async fn remove(&self, job_id: &str) -> Result<(), JobStoreError>;

    /// Delete every job unconditionally. Succeeds on an empty store.
    async fn remove_all(&self) -> Result<(), JobStoreError>;
}
