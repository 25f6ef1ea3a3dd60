//! In-process queue and result store

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::time::Instant;

use crate::queue::{JobQueue, QueueError, ResultStore};
use crate::verdict::ResultRecord;

/// Job queue on a Tokio channel
///
/// Dequeue fails with [`QueueError::Closed`] once every [`QueueSender`] is
/// dropped and the channel is drained.
#[derive(Debug)]
pub struct MemoryQueue {
    rx: AsyncMutex<mpsc::UnboundedReceiver<String>>,
}

/// Producer half of a [`MemoryQueue`]
#[derive(Debug, Clone)]
pub struct QueueSender {
    tx: mpsc::UnboundedSender<String>,
}

impl MemoryQueue {
    pub fn channel() -> (QueueSender, MemoryQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            QueueSender { tx },
            MemoryQueue {
                rx: AsyncMutex::new(rx),
            },
        )
    }
}

impl QueueSender {
    /// Append a raw envelope to the queue
    pub fn push(&self, raw: impl Into<String>) -> Result<(), QueueError> {
        self.tx.send(raw.into()).map_err(|_| QueueError::Closed)
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn dequeue(&self) -> Result<String, QueueError> {
        self.rx.lock().await.recv().await.ok_or(QueueError::Closed)
    }
}

/// Result store in a map, with per-entry expiry
///
/// Expired entries are dropped lazily on fetch and swept on every publish.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unexpired entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .map(|entries| entries.values().filter(|(_, exp)| *exp > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn publish(&self, record: &ResultRecord, ttl: Duration) -> Result<(), QueueError> {
        // Stored serialized, as a remote store would hold it
        let value = serde_json::to_string(record)?;
        let now = Instant::now();
        let mut entries = self.entries.lock().map_err(|_| QueueError::Poisoned)?;
        entries.retain(|_, (_, expires)| *expires > now);
        entries.insert(record.job_id.clone(), (value, now + ttl));
        Ok(())
    }

    async fn fetch(&self, job_id: &str) -> Result<Option<ResultRecord>, QueueError> {
        let raw = {
            let mut entries = self.entries.lock().map_err(|_| QueueError::Poisoned)?;
            let expired = matches!(
                entries.get(job_id),
                Some((_, expires)) if *expires <= Instant::now()
            );
            if expired {
                entries.remove(job_id);
                None
            } else {
                entries.get(job_id).map(|(value, _)| value.clone())
            }
        };

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}
