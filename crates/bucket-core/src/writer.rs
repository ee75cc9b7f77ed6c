//! Per-session persistence queue.
//!
//! Each chat gets one [`SessionWriter`]: a single in-order worker draining
//! durable writes for that session key. Two writes from the same session
//! can therefore never race each other — an older write cannot land after
//! a newer one.
//!
//! A job may carry an ack so the caller can await durability before
//! replying; without one the write is fire-and-forget and a failure is only
//! logged, since the user already got their reply.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use bucket_store::{Bucket, ConceptArchive, SessionCache, SessionRecord, StoreResult};

use crate::error::SessionError;

enum WriteJob {
    Bucket {
        id: String,
        bucket: Bucket,
        ack: Option<oneshot::Sender<StoreResult<()>>>,
    },
    Session {
        record: SessionRecord,
        ack: Option<oneshot::Sender<StoreResult<()>>>,
    },
    /// Barrier: resolves once every previously queued job has been applied.
    Flush { ack: oneshot::Sender<()> },
}

/// Handle to one chat's in-order persistence worker.
pub struct SessionWriter {
    chat_id: i64,
    tx: mpsc::UnboundedSender<WriteJob>,
}

impl SessionWriter {
    /// Spawn the worker task for `chat_id`.
    pub fn spawn(chat_id: i64, archive: ConceptArchive, cache: SessionCache) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(worker(chat_id, archive, cache, rx));
        Self { chat_id, tx }
    }

    /// Queue a bucket write and wait for it to become durable.
    pub async fn store_bucket(&self, id: &str, bucket: Bucket) -> Result<(), SessionError> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(WriteJob::Bucket {
                id: id.to_string(),
                bucket,
                ack: Some(ack),
            })
            .map_err(|_| SessionError::WriterClosed)?;
        done.await.map_err(|_| SessionError::WriterClosed)??;
        Ok(())
    }

    /// Queue a bucket write without waiting for durability.
    pub fn queue_bucket(&self, id: &str, bucket: Bucket) {
        let job = WriteJob::Bucket {
            id: id.to_string(),
            bucket,
            ack: None,
        };
        if self.tx.send(job).is_err() {
            error!(chat_id = self.chat_id, "bucket write dropped: worker gone");
        }
    }

    /// Queue a session write without waiting for durability.
    pub fn queue_session(&self, record: SessionRecord) {
        if self.tx.send(WriteJob::Session { record, ack: None }).is_err() {
            error!(chat_id = self.chat_id, "session write dropped: worker gone");
        }
    }

    /// Wait until every previously queued write has been applied.
    pub async fn flush(&self) -> Result<(), SessionError> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(WriteJob::Flush { ack })
            .map_err(|_| SessionError::WriterClosed)?;
        done.await.map_err(|_| SessionError::WriterClosed)
    }
}

async fn worker(
    chat_id: i64,
    archive: ConceptArchive,
    cache: SessionCache,
    mut rx: mpsc::UnboundedReceiver<WriteJob>,
) {
    debug!(chat_id, "session writer started");

    while let Some(job) = rx.recv().await {
        match job {
            WriteJob::Bucket { id, bucket, ack } => {
                let result = archive.put(&id, &bucket).await;
                settle(chat_id, "bucket", result, ack);
            }
            WriteJob::Session { record, ack } => {
                let result = cache.put(chat_id, &record).await;
                settle(chat_id, "session", result, ack);
            }
            WriteJob::Flush { ack } => {
                let _ = ack.send(());
            }
        }
    }

    debug!(chat_id, "session writer stopped");
}

fn settle(
    chat_id: i64,
    op: &'static str,
    result: StoreResult<()>,
    ack: Option<oneshot::Sender<StoreResult<()>>>,
) {
    match ack {
        Some(tx) => {
            // Caller is waiting; the error travels to them instead of the log.
            let _ = tx.send(result);
        }
        None => {
            if let Err(err) = result {
                error!(chat_id, op, error = %err, "background persist failed");
            }
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use bucket_store::Database;

    async fn setup() -> (ConceptArchive, SessionCache) {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        (ConceptArchive::new(db.clone()), SessionCache::new(db))
    }

    #[tokio::test]
    async fn store_bucket_waits_for_durability() {
        let (archive, cache) = setup().await;
        let writer = SessionWriter::spawn(1, archive.clone(), cache);

        writer
            .store_bucket("id1", Bucket::new("waited"))
            .await
            .unwrap();

        // No flush needed: the ack already proved the write landed.
        assert_eq!(archive.get("id1").await.unwrap().name, "waited");
    }

    #[tokio::test]
    async fn queued_writes_apply_in_order() {
        let (archive, cache) = setup().await;
        let writer = SessionWriter::spawn(1, archive.clone(), cache.clone());

        // An older write must never overwrite a newer one.
        for i in 0..50 {
            writer.queue_bucket("same", Bucket::new(format!("v{i}")));
            writer.queue_session(SessionRecord {
                bucket_ids: vec![format!("v{i}")],
                current_id: None,
            });
        }
        writer.flush().await.unwrap();

        assert_eq!(archive.get("same").await.unwrap().name, "v49");
        assert_eq!(
            cache.get(1).await.unwrap().unwrap().bucket_ids,
            vec!["v49".to_string()]
        );
    }

    #[tokio::test]
    async fn flush_is_a_barrier_for_prior_jobs() {
        let (archive, cache) = setup().await;
        let writer = SessionWriter::spawn(9, archive, cache.clone());

        writer.queue_session(SessionRecord {
            bucket_ids: vec!["a".into()],
            current_id: Some("a".into()),
        });
        writer.flush().await.unwrap();

        let record = cache.get(9).await.unwrap().unwrap();
        assert_eq!(record.current_id.as_deref(), Some("a"));
    }
}
