//! Redis-backed queue and result store

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::{debug, instrument};

use crate::queue::{JobQueue, QueueError, ResultStore};
use crate::verdict::ResultRecord;

async fn connect(url: &str) -> Result<ConnectionManager, QueueError> {
    let client = redis::Client::open(url)?;
    Ok(ConnectionManager::new(client).await?)
}

/// Job queue on a Redis list
///
/// Intake pushes with `LPUSH`, so popping with `BRPOP` is FIFO. Each queue
/// holds its own connection because a blocking pop occupies it.
#[derive(Clone)]
pub struct RedisQueue {
    conn: ConnectionManager,
    key: String,
}

impl RedisQueue {
    pub async fn connect(url: &str, key: impl Into<String>) -> Result<Self, QueueError> {
        Ok(Self {
            conn: connect(url).await?,
            key: key.into(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for RedisQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisQueue").field("key", &self.key).finish()
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    #[instrument(skip(self), fields(key = %self.key))]
    async fn dequeue(&self) -> Result<String, QueueError> {
        let mut conn = self.conn.clone();
        loop {
            // Timeout 0 blocks until an entry exists
            let popped: Option<(String, String)> = redis::cmd("BRPOP")
                .arg(&self.key)
                .arg(0)
                .query_async(&mut conn)
                .await?;

            if let Some((_, raw)) = popped {
                debug!(len = raw.len(), "dequeued entry");
                return Ok(raw);
            }
        }
    }
}

/// Result store on Redis string keys with expiry
#[derive(Clone)]
pub struct RedisResultStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisResultStore {
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, QueueError> {
        Ok(Self {
            conn: connect(url).await?,
            prefix: prefix.into(),
        })
    }

    fn key(&self, job_id: &str) -> String {
        ResultRecord::key(&self.prefix, job_id)
    }
}

impl fmt::Debug for RedisResultStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisResultStore")
            .field("prefix", &self.prefix)
            .finish()
    }
}

#[async_trait]
impl ResultStore for RedisResultStore {
    #[instrument(skip(self, record), fields(job_id = %record.job_id))]
    async fn publish(&self, record: &ResultRecord, ttl: Duration) -> Result<(), QueueError> {
        let value = serde_json::to_string(record)?;
        let mut conn = self.conn.clone();

        let _: () = redis::cmd("SET")
            .arg(self.key(&record.job_id))
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;

        debug!(ttl_secs = ttl.as_secs(), "result published");
        Ok(())
    }

    async fn fetch(&self, job_id: &str) -> Result<Option<ResultRecord>, QueueError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(self.key(job_id))
            .query_async(&mut conn)
            .await?;

        match value {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}
