use bson::{spec::BinarySubtype, Binary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::Job;

/// Persisted shape of a job. `next_run_time` mirrors the value inside the
/// blob so due-job queries and ordering are served by the sparse index
/// without deserializing `job_state`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JobRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub next_run_time: Option<f64>,
    pub job_state: Binary,
}

impl JobRecord {
    pub(crate) fn new(job: &Job, state_blob: Vec<u8>) -> Self {
        Self {
            id: job.id.clone(),
            next_run_time: job.next_run_time.map(to_utc_timestamp),
            job_state: Binary {
                subtype: BinarySubtype::Generic,
                bytes: state_blob,
            },
        }
    }
}

/// UTC seconds since the epoch, with sub-second precision, as stored in
/// `next_run_time`.
pub(crate) fn to_utc_timestamp(instant: DateTime<Utc>) -> f64 {
    instant.timestamp_micros() as f64 / 1_000_000.0
}

pub(crate) fn from_utc_timestamp(timestamp: f64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros((timestamp * 1_000_000.0).round() as i64)
}
