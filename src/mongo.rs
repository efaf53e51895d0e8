use std::sync::Arc;

use async_trait::async_trait;
use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{
        ClientOptions, ConnectionString, FindOneOptions, FindOptions, IndexOptions, Tls,
        TlsOptions,
    },
    Client, Collection, IndexModel,
};
use serde::Deserialize;
use tracing::instrument;

use crate::job::Job;
use crate::serializer::{SerializationFormat, StateSerializer};
use crate::store::{JobStore, JobStoreError};
use crate::types::{from_utc_timestamp, to_utc_timestamp, JobRecord};

/// Construction options for [`MongoJobStore`].
///
/// `database` and `collection` must be non-empty. When `connection` is absent
/// the store establishes its own client from `uri`, applying `ca_file` to the
/// TLS options if given.
#[derive(Debug, Clone)]
pub struct JobStoreConfig {
    pub database: String,
    pub collection: String,
    /// Pre-established shared client. Takes precedence over `uri`.
    pub connection: Option<Client>,
    pub uri: Option<String>,
    pub ca_file: Option<String>,
    /// Format of the opaque `job_state` blob.
    pub serialization: SerializationFormat,
}

impl Default for JobStoreConfig {
    fn default() -> Self {
        Self {
            database: "scheduler".to_string(),
            collection: "jobs".to_string(),
            connection: None,
            uri: None,
            ca_file: None,
            serialization: SerializationFormat::default(),
        }
    }
}

/// A [`JobStore`] backed by a MongoDB collection.
///
/// One client is opened at construction and reused by every operation.
/// Uniqueness of job ids rides the collection's `_id` index, so `add` is
/// atomic with its conflict check.
#[derive(Clone)]
pub struct MongoJobStore {
    client: Client,
    collection: Collection<JobRecord>,
    serializer: Arc<dyn StateSerializer>,
}

impl MongoJobStore {
    pub async fn connect(config: JobStoreConfig) -> Result<Self, JobStoreError> {
        if config.database.is_empty() {
            return Err(JobStoreError::Configuration(
                "the database name must not be empty".to_string(),
            ));
        }
        if config.collection.is_empty() {
            return Err(JobStoreError::Configuration(
                "the collection name must not be empty".to_string(),
            ));
        }

        let client = match config.connection {
            Some(client) => client,
            None => {
                let uri = config.uri.as_deref().ok_or_else(|| {
                    JobStoreError::Configuration(
                        "either a pre-established connection or a connection uri is required"
                            .to_string(),
                    )
                })?;
                Self::new_client(uri, config.ca_file.as_deref()).await?
            }
        };

        let collection = client
            .database(&config.database)
            .collection(&config.collection);

        let store = Self {
            client,
            collection,
            serializer: config.serialization.serializer(),
        };
        store.ensure_run_time_index().await?;
        Ok(store)
    }

    async fn new_client(uri: &str, ca_file: Option<&str>) -> Result<Client, mongodb::error::Error> {
        match ca_file {
            Some(ca_file) => {
                let conn_str = ConnectionString::parse(uri)?;
                let mut options = ClientOptions::parse_connection_string(conn_str).await?;
                let mut tls_options = TlsOptions::default();
                tls_options.ca_file_path = Some(ca_file.into());
                options.tls = Some(Tls::Enabled(tls_options));
                Client::with_options(options)
            }
            None => Client::with_uri_str(uri).await,
        }
    }

    /// Sparse ascending index on `next_run_time`, so due-job queries and
    /// ordering never scan blobs.
    async fn ensure_run_time_index(&self) -> Result<(), mongodb::error::Error> {
        let index = IndexModel::builder()
            .keys(doc! { "next_run_time": 1 })
            .options(IndexOptions::builder().sparse(true).build())
            .build();
        self.collection.create_index(index, None).await?;
        Ok(())
    }

    /// Releases the underlying client. Skipping this (e.g. on process
    /// teardown) leaves no persistent state behind.
    pub async fn close(self) {
        self.client.shutdown().await;
    }

    async fn fetch_jobs(&self, filter: Document) -> Result<Vec<Job>, JobStoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "next_run_time": 1 })
            .build();
        let mut cursor = self.collection.find(filter, options).await?;

        let mut jobs = Vec::new();
        while cursor.advance().await? {
            let record = cursor.deserialize_current()?;
            match self.serializer.deserialize(&record.job_state.bytes) {
                Ok(job) => jobs.push(job),
                // A single undecodable record must not abort the batch.
                Err(error) => {
                    tracing::error!(job_id = %record.id, %error, "unable to restore job, skipping record");
                }
            }
        }
        Ok(jobs)
    }
}

/// Projection used by `get_next_run_time`; avoids pulling `job_state` over
/// the wire.
#[derive(Debug, Deserialize)]
struct RunTimeProjection {
    next_run_time: Option<f64>,
}

#[async_trait]
impl JobStore for MongoJobStore {
    #[instrument(skip_all, err, fields(job_id = %job_id))]
    async fn lookup(&self, job_id: &str) -> Result<Job, JobStoreError> {
        let record = self
            .collection
            .find_one(doc! { "_id": job_id }, None)
            .await?
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))?;

        self.serializer
            .deserialize(&record.job_state.bytes)
            .map_err(|source| JobStoreError::CorruptRecord {
                id: record.id,
                source,
            })
    }

    #[instrument(skip_all, err)]
    async fn get_pending(&self, now: DateTime<Utc>) -> Result<Vec<Job>, JobStoreError> {
        // BSON type bracketing keeps null/missing run times out of a numeric
        // $lte match, so paused jobs never show up as due.
        self.fetch_jobs(doc! { "next_run_time": { "$lte": to_utc_timestamp(now) } })
            .await
    }

    #[instrument(skip_all, err)]
    async fn get_next_run_time(&self) -> Result<Option<DateTime<Utc>>, JobStoreError> {
        let options = FindOneOptions::builder()
            .sort(doc! { "next_run_time": 1 })
            .projection(doc! { "next_run_time": 1 })
            .build();
        let record = self
            .collection
            .clone_with_type::<RunTimeProjection>()
            .find_one(doc! { "next_run_time": { "$ne": null } }, options)
            .await?;

        Ok(record
            .and_then(|record| record.next_run_time)
            .and_then(from_utc_timestamp))
    }

    #[instrument(skip_all, err)]
    async fn get_all(&self) -> Result<Vec<Job>, JobStoreError> {
        self.fetch_jobs(doc! {}).await
    }

    #[instrument(skip_all, err, fields(job_id = %job.id))]
    async fn add(&self, job: &Job) -> Result<(), JobStoreError> {
        let state_blob = self.serializer.serialize(job)?;
        let record = JobRecord::new(job, state_blob);

        match self.collection.insert_one(&record, None).await {
            Ok(_) => Ok(()),
            Err(error) if is_duplicate_key_error(&error) => {
                Err(JobStoreError::Conflict(job.id.clone()))
            }
            Err(error) => Err(error.into()),
        }
    }

    #[instrument(skip_all, err, fields(job_id = %job.id))]
    async fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        let state_blob = self.serializer.serialize(job)?;
        let record = JobRecord::new(job, state_blob);

        let result = self
            .collection
            .update_one(
                doc! { "_id": &job.id },
                doc! { "$set": {
                    "next_run_time": record.next_run_time,
                    "job_state": record.job_state,
                } },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            Err(JobStoreError::NotFound(job.id.clone()))
        } else {
            Ok(())
        }
    }

    #[instrument(skip_all, err, fields(job_id = %job_id))]
    async fn remove(&self, job_id: &str) -> Result<(), JobStoreError> {
        let result = self
            .collection
            .delete_one(doc! { "_id": job_id }, None)
            .await?;

        if result.deleted_count == 0 {
            Err(JobStoreError::NotFound(job_id.to_string()))
        } else {
            Ok(())
        }
    }

    #[instrument(skip_all, err)]
    async fn remove_all(&self) -> Result<(), JobStoreError> {
        self.collection.delete_many(doc! {}, None).await?;
        Ok(())
    }
}

fn is_duplicate_key_error(error: &mongodb::error::Error) -> bool {
    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        _ => false,
    }
}
