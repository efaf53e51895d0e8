//! MongoDB-backed persistence for job schedulers.
//!
//! A scheduler hands this crate serialized job descriptors and gets back
//! ordered, conflict-safe access to them: keyed lookup, due-job retrieval
//! sorted by run time, insert-with-conflict-detection, update and removal
//! with existence checks, and a full wipe. Records live in one MongoDB
//! collection as `{ _id, next_run_time, job_state }`, with a sparse
//! ascending index on `next_run_time` so ordering queries never touch the
//! opaque state blob.
//!
//! ```no_run
//! use chrono::Utc;
//! use jobstore_mongodb::{Job, JobStore, JobStoreConfig, MongoJobStore};
//!
//! # async fn run() -> Result<(), jobstore_mongodb::JobStoreError> {
//! let store = MongoJobStore::connect(JobStoreConfig {
//!     uri: Some("mongodb://localhost:27017".to_string()),
//!     ..JobStoreConfig::default()
//! })
//! .await?;
//!
//! store
//!     .add(&Job::new("nightly-report", Some(Utc::now()), vec![1, 2, 3]))
//!     .await?;
//!
//! let due = store.get_pending(Utc::now()).await?;
//! assert_eq!(due.len(), 1);
//! # Ok(())
//! # }
//! ```

mod job;
mod mongo;
mod serializer;
mod store;
mod types;

pub use job::Job;
pub use mongo::{JobStoreConfig, MongoJobStore};
pub use serializer::{
    BincodeSerializer, JsonSerializer, SerializationFormat, SerializerError, StateSerializer,
};
pub use store::{JobStore, JobStoreError};
