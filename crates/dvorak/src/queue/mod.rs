//! Job queue and result store
//!
//! The worker pops raw job envelopes from a [`JobQueue`] and publishes one
//! [`ResultRecord`] per job to a [`ResultStore`]. Redis backs both in
//! production; the in-memory versions serve local runs and tests.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub use crate::queue::memory::{MemoryQueue, MemoryResultStore, QueueSender};
pub use crate::queue::redis_queue::{RedisQueue, RedisResultStore};

mod memory;
mod redis_queue;

use crate::types::{Job, Submission};
use crate::verdict::ResultRecord;

/// Envelope type the judging core consumes
pub const JUDGE_JOB_TYPE: &str = "judge";

/// Errors that occur while talking to the queue or result store
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue transport error: {0}")]
    Transport(#[from] redis::RedisError),

    #[error("queue closed")]
    Closed,

    #[error("result store lock poisoned")]
    Poisoned,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A queued message as produced by the intake side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    #[serde(default)]
    pub payload: serde_json::Value,
}

impl JobEnvelope {
    /// Envelope for a judge job
    pub fn judge(job_id: impl Into<String>, submission: &Submission) -> Result<Self, QueueError> {
        Ok(Self {
            kind: JUDGE_JOB_TYPE.to_string(),
            job_id: Some(job_id.into()),
            payload: serde_json::to_value(submission)?,
        })
    }

    pub fn to_json(&self) -> Result<String, QueueError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Parse a raw queue entry into a judge job
///
/// Returns `Ok(None)` for envelopes of other types. A missing job ID is
/// replaced with a fresh UUID.
pub fn parse_job(raw: &str) -> Result<Option<Job>, QueueError> {
    let envelope: JobEnvelope = serde_json::from_str(raw)?;
    if envelope.kind != JUDGE_JOB_TYPE {
        debug!(kind = %envelope.kind, "ignoring non-judge envelope");
        return Ok(None);
    }

    let submission: Submission = serde_json::from_value(envelope.payload)?;
    let id = envelope
        .job_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Ok(Some(Job { id, submission }))
}

/// Source of raw job envelopes
#[async_trait]
pub trait JobQueue: Send + Sync + fmt::Debug {
    /// Wait until an entry is available and take it
    ///
    /// Returns [`QueueError::Closed`] once no more entries can arrive.
    async fn dequeue(&self) -> Result<String, QueueError>;
}

/// Keyed store for published results
#[async_trait]
pub trait ResultStore: Send + Sync + fmt::Debug {
    /// Store a record under its job ID, expiring after `ttl`
    async fn publish(&self, record: &ResultRecord, ttl: Duration) -> Result<(), QueueError>;

    /// Read the record for a job, `None` if absent or expired
    async fn fetch(&self, job_id: &str) -> Result<Option<ResultRecord>, QueueError>;
}
