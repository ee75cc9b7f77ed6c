//! The Session Cache — per-chat session records keyed by chat id.
//!
//! The cache is the single source of truth for which bucket ids belong to
//! which chat and which one is currently selected. An absent record means
//! "empty session", never an error the conversation surfaces.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::Database;
use crate::error::StoreResult;
use crate::kv::Namespace;

/// Per-chat record of owned bucket ids and the currently selected one.
///
/// `bucket_ids` is a list of references, not ownership in the cascading
/// sense: an id the archive can no longer resolve simply stays here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default)]
    pub bucket_ids: Vec<String>,
    #[serde(default)]
    pub current_id: Option<String>,
}

impl SessionRecord {
    /// True if `id` is one of this session's owned bucket ids.
    ///
    /// Linear scan over the in-memory list — ownership is checked here, not
    /// against the archive. Existence and ownership are different questions.
    pub fn owns(&self, id: &str) -> bool {
        self.bucket_ids.iter().any(|owned| owned == id)
    }
}

/// Durable mapping from chat id to [`SessionRecord`].
#[derive(Clone)]
pub struct SessionCache {
    ns: Namespace,
}

impl SessionCache {
    /// Create a session cache backed by `db`.
    pub fn new(db: Database) -> Self {
        Self {
            ns: Namespace::new(db, "chat_sessions"),
        }
    }

    /// Store the session record for `chat_id`, overwriting any previous one.
    pub async fn put(&self, chat_id: i64, record: &SessionRecord) -> StoreResult<()> {
        self.ns.put(&chat_id.to_string(), record).await?;
        debug!(chat_id, "session stored");
        Ok(())
    }

    /// Load the session record for `chat_id`, `None` if the chat has never
    /// been seen. Callers treat `None` as an empty session.
    pub async fn get(&self, chat_id: i64) -> StoreResult<Option<SessionRecord>> {
        self.ns.get(&chat_id.to_string()).await
    }

    /// Every chat id with a stored session. Administrative use only; the
    /// conversation logic never calls this.
    pub async fn chat_ids(&self) -> StoreResult<Vec<i64>> {
        let keys = self.ns.keys().await?;
        Ok(keys.iter().filter_map(|k| k.parse().ok()).collect())
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_cache() -> SessionCache {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        SessionCache::new(db)
    }

    #[tokio::test]
    async fn absent_chat_returns_none() {
        let cache = setup_cache().await;
        assert!(cache.get(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn round_trip_field_for_field() {
        let cache = setup_cache().await;
        let record = SessionRecord {
            bucket_ids: vec!["a1".into(), "b2".into()],
            current_id: Some("b2".into()),
        };

        cache.put(42, &record).await.unwrap();
        let got = cache.get(42).await.unwrap().unwrap();
        assert_eq!(got, record);
    }

    #[tokio::test]
    async fn put_overwrites() {
        let cache = setup_cache().await;
        cache
            .put(7, &SessionRecord { bucket_ids: vec!["x".into()], current_id: None })
            .await
            .unwrap();
        cache
            .put(
                7,
                &SessionRecord {
                    bucket_ids: vec!["x".into(), "y".into()],
                    current_id: Some("y".into()),
                },
            )
            .await
            .unwrap();

        let got = cache.get(7).await.unwrap().unwrap();
        assert_eq!(got.bucket_ids, vec!["x", "y"]);
        assert_eq!(got.current_id.as_deref(), Some("y"));
    }

    #[tokio::test]
    async fn chat_ids_lists_stored_sessions() {
        let cache = setup_cache().await;
        cache.put(1, &SessionRecord::default()).await.unwrap();
        cache.put(-99, &SessionRecord::default()).await.unwrap();

        let mut ids = cache.chat_ids().await.unwrap();
        ids.sort_unstable();
        assert_eq!(ids, vec![-99, 1]);
    }

    #[test]
    fn owns_is_a_linear_match() {
        let record = SessionRecord {
            bucket_ids: vec!["a".into(), "b".into()],
            current_id: None,
        };
        assert!(record.owns("a"));
        assert!(record.owns("b"));
        assert!(!record.owns("c"));
        assert!(!record.owns(""));
    }
}
