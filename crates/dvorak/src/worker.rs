//! Queue consumer loop
//!
//! One job at a time: dequeue, judge, publish, repeat. A single job's
//! failure never ends the loop.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::judge::Judge;
use crate::queue::{JobQueue, QueueError, ResultStore, parse_job};
use crate::types::Job;
use crate::verdict::{ResultRecord, Verdict};

/// Message attached to the verdict of a job whose judging task panicked
pub const INTERNAL_ERROR_MESSAGE: &str = "internal judge error";

/// Errors that occur while processing one queue entry
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("malformed job envelope: {0}")]
    Malformed(#[source] QueueError),

    #[error("failed to publish result for job {job_id}: {source}")]
    Publish {
        job_id: String,
        #[source]
        source: QueueError,
    },
}

/// Consumes judge jobs and publishes their verdicts
#[derive(Debug, Clone)]
pub struct Worker {
    judge: Judge,
    queue: Arc<dyn JobQueue>,
    store: Arc<dyn ResultStore>,
    result_ttl: Duration,
    retry_delay: Duration,
}

impl Worker {
    /// Create a worker using the queue settings of the judge's config
    pub fn new(judge: Judge, queue: Arc<dyn JobQueue>, store: Arc<dyn ResultStore>) -> Self {
        let result_ttl = judge.config().queue.result_ttl();
        let retry_delay = judge.config().queue.retry_delay();
        Self {
            judge,
            queue,
            store,
            result_ttl,
            retry_delay,
        }
    }

    /// Run until the queue is closed
    ///
    /// Transport errors are retried after the configured delay; a Redis
    /// queue never closes, so this only returns for in-process queues.
    pub async fn run(&self) {
        self.run_until(std::future::pending()).await;
    }

    /// Run until the queue is closed or `shutdown` resolves
    ///
    /// Shutdown is only observed between jobs: a job already dequeued is
    /// judged, its sandbox destroyed and its verdict published first.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) {
        info!(
            ttl_secs = self.result_ttl.as_secs(),
            "worker started, waiting for jobs"
        );

        let mut shutdown = std::pin::pin!(shutdown);
        loop {
            let dequeued = tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("shutdown requested, worker stopping");
                    return;
                }
                result = self.queue.dequeue() => result,
            };

            let raw = match dequeued {
                Ok(raw) => raw,
                Err(QueueError::Closed) => {
                    info!("queue closed, worker stopping");
                    return;
                }
                Err(e) => {
                    error!(error = %e, retry_in = ?self.retry_delay, "dequeue failed");
                    tokio::select! {
                        biased;
                        () = &mut shutdown => {
                            info!("shutdown requested, worker stopping");
                            return;
                        }
                        () = tokio::time::sleep(self.retry_delay) => {}
                    }
                    continue;
                }
            };

            match self.process(&raw).await {
                Ok(_) => {}
                Err(e @ WorkerError::Malformed(_)) => warn!(error = %e, "skipping entry"),
                Err(e) => error!(error = %e, "job dropped"),
            }
        }
    }

    /// Process one raw queue entry
    ///
    /// Returns the published record, or `None` for entries that are not
    /// judge jobs.
    pub async fn process(&self, raw: &str) -> Result<Option<ResultRecord>, WorkerError> {
        let Some(job) = parse_job(raw).map_err(WorkerError::Malformed)? else {
            return Ok(None);
        };

        let verdict = self.judge_job(&job).await;
        let record = ResultRecord::new(job.id, verdict);

        self.store
            .publish(&record, self.result_ttl)
            .await
            .map_err(|source| WorkerError::Publish {
                job_id: record.job_id.clone(),
                source,
            })?;

        info!(job_id = %record.job_id, verdict = %record.verdict, "job complete");
        Ok(Some(record))
    }

    /// Judge in a separate task so a panic cannot take the loop down
    #[instrument(skip_all, fields(job_id = %job.id))]
    async fn judge_job(&self, job: &Job) -> Verdict {
        let judge = self.judge.clone();
        let submission = job.submission.clone();

        match tokio::spawn(async move { judge.judge(&submission).await }).await {
            Ok(verdict) => verdict,
            Err(e) if e.is_panic() => {
                error!("judging task panicked");
                Verdict::internal(INTERNAL_ERROR_MESSAGE)
            }
            Err(e) => {
                error!(error = %e, "judging task cancelled");
                Verdict::internal(INTERNAL_ERROR_MESSAGE)
            }
        }
    }
}
