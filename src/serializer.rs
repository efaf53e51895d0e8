use std::sync::Arc;

use thiserror::Error;

use crate::job::Job;

/// Failure to encode or decode a persisted job snapshot.
#[derive(Debug, Error)]
pub enum SerializerError {
    #[error("bincode encode failed: {0}")]
    BincodeEncode(#[from] bincode::error::EncodeError),
    #[error("bincode decode failed: {0}")]
    BincodeDecode(#[from] bincode::error::DecodeError),
    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encodes a [`Job`] snapshot to the opaque blob persisted in `job_state`,
/// and back. The store is agnostic to the blob's layout; swapping the
/// serializer changes the persisted format without touching the store.
pub trait StateSerializer: Send + Sync {
    fn serialize(&self, job: &Job) -> Result<Vec<u8>, SerializerError>;
    fn deserialize(&self, blob: &[u8]) -> Result<Job, SerializerError>;
}

/// Built-in blob formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SerializationFormat {
    /// Compact binary encoding. The default.
    #[default]
    Bincode,
    /// Self-describing JSON, for deployments that want inspectable records.
    Json,
}

impl SerializationFormat {
    pub(crate) fn serializer(self) -> Arc<dyn StateSerializer> {
        match self {
            SerializationFormat::Bincode => Arc::new(BincodeSerializer::default()),
            SerializationFormat::Json => Arc::new(JsonSerializer),
        }
    }
}

pub struct BincodeSerializer {
    config: bincode::config::Configuration,
}

impl Default for BincodeSerializer {
    fn default() -> Self {
        Self {
            config: bincode::config::standard(),
        }
    }
}

impl StateSerializer for BincodeSerializer {
    fn serialize(&self, job: &Job) -> Result<Vec<u8>, SerializerError> {
        Ok(bincode::serde::encode_to_vec(job, self.config)?)
    }

    fn deserialize(&self, blob: &[u8]) -> Result<Job, SerializerError> {
        let (job, _) = bincode::serde::decode_from_slice(blob, self.config)?;
        Ok(job)
    }
}

pub struct JsonSerializer;

impl StateSerializer for JsonSerializer {
    fn serialize(&self, job: &Job) -> Result<Vec<u8>, SerializerError> {
        Ok(serde_json::to_vec(job)?)
    }

    fn deserialize(&self, blob: &[u8]) -> Result<Job, SerializerError> {
        Ok(serde_json::from_slice(blob)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_job() -> Job {
        Job::new(
            "report",
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap()),
            vec![0xde, 0xad, 0xbe, 0xef],
        )
    }

    #[test]
    fn bincode_round_trip() {
        let serializer = BincodeSerializer::default();
        let job = sample_job();
        let blob = serializer.serialize(&job).unwrap();
        assert_eq!(serializer.deserialize(&blob).unwrap(), job);
    }

    #[test]
    fn json_round_trip() {
        let serializer = JsonSerializer;
        let job = sample_job();
        let blob = serializer.serialize(&job).unwrap();
        assert_eq!(serializer.deserialize(&blob).unwrap(), job);
    }

    #[test]
    fn paused_job_round_trip_keeps_none() {
        let serializer = BincodeSerializer::default();
        let job = Job::new("paused", None, Vec::new());
        let blob = serializer.serialize(&job).unwrap();
        let restored = serializer.deserialize(&blob).unwrap();
        assert_eq!(restored.next_run_time, None);
    }

    #[test]
    fn garbage_blob_fails_to_decode() {
        let garbage = [0xff, 0x00, 0x13, 0x37];
        assert!(BincodeSerializer::default().deserialize(&garbage).is_err());
        assert!(JsonSerializer.deserialize(&garbage).is_err());
    }
}
