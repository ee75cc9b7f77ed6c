//! Generic serialized key-value namespace.
//!
//! A [`Namespace`] is one table of the database: an independent logical key
//! space mapping text keys to opaque JSON records. Values are serialized
//! with `serde_json` on the way in and deserialized on the way out; the
//! namespace itself never inspects them.
//!
//! Each operation is a single self-contained engine interaction — there is
//! no cross-call transaction, and no long-lived statement handle escapes.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::StoreResult;

/// A single named key space backed by one table.
#[derive(Clone)]
pub struct Namespace {
    db: Database,
    table: &'static str,
}

impl Namespace {
    /// Bind a namespace to a table created by the migrations.
    pub fn new(db: Database, table: &'static str) -> Self {
        Self { db, table }
    }

    /// Insert or overwrite the record under `key`.
    #[instrument(skip(self, value), fields(table = self.table))]
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        let record = serde_json::to_string(value)?;
        let key = key.to_string();
        let sql = format!(
            "INSERT INTO {} (key, record, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET record = excluded.record, updated_at = excluded.updated_at",
            self.table
        );
        let table = self.table;

        self.db
            .execute(move |conn| {
                let now = chrono::Utc::now().timestamp();
                conn.execute(&sql, rusqlite::params![key, record, now])?;
                debug!(table, key = %key, "record stored");
                Ok(())
            })
            .await
    }

    /// Fetch and decode the record under `key`, `None` if absent.
    #[instrument(skip(self), fields(table = self.table))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        let key = key.to_string();
        let sql = format!("SELECT record FROM {} WHERE key = ?1", self.table);

        let record: Option<String> = self
            .db
            .execute(move |conn| {
                let result = conn.query_row(&sql, rusqlite::params![key], |row| row.get(0));
                match result {
                    Ok(record) => Ok(Some(record)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        match record {
            Some(record) => Ok(Some(serde_json::from_str(&record)?)),
            None => Ok(None),
        }
    }

    /// True if a record exists under `key`, without decoding it.
    #[instrument(skip(self), fields(table = self.table))]
    pub async fn contains(&self, key: &str) -> StoreResult<bool> {
        let key = key.to_string();
        let sql = format!("SELECT 1 FROM {} WHERE key = ?1", self.table);

        self.db
            .execute(move |conn| {
                let result = conn.query_row(&sql, rusqlite::params![key], |_| Ok(()));
                match result {
                    Ok(()) => Ok(true),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
                    Err(e) => Err(e.into()),
                }
            })
            .await
    }

    /// Every key in the namespace, as a snapshot.
    ///
    /// The snapshot is finite and taken at call time; it does not observe
    /// mutations made after it returns.
    #[instrument(skip(self), fields(table = self.table))]
    pub async fn keys(&self) -> StoreResult<Vec<String>> {
        let sql = format!("SELECT key FROM {} ORDER BY key", self.table);

        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let keys = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
    }
}

// ── tests ────────────────────────────────────────────────────────────
