//! The Concept Archive — durable buckets keyed by generated id.
//!
//! The archive is the single source of truth for bucket contents. It knows
//! nothing about ownership: which chat owns which bucket id lives in the
//! [`SessionCache`](crate::session::SessionCache), and a session holding an
//! id the archive cannot resolve is a tolerated state, not corruption.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::kv::Namespace;

// ═══════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════

/// A titled note with a text body, unique by title within its bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub title: String,
    pub body: String,
    /// Unix timestamp of the write that produced this revision.
    pub created_at: i64,
}

/// A named collection of concepts, addressed externally by a generated id.
///
/// The name is set once at creation and never checked for uniqueness — two
/// buckets may share a name; only the id is authoritative. A bucket with no
/// concepts is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    /// Concepts keyed by title.
    #[serde(default)]
    pub concepts: BTreeMap<String, Concept>,
}

impl Bucket {
    /// Create an empty bucket with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            concepts: BTreeMap::new(),
        }
    }

    /// Insert a concept, replacing any previous one with the same title.
    ///
    /// Last write wins; no history is kept.
    pub fn upsert_concept(&mut self, title: impl Into<String>, body: impl Into<String>, now: i64) {
        let title = title.into();
        self.concepts.insert(
            title.clone(),
            Concept {
                title,
                body: body.into(),
                created_at: now,
            },
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  ConceptArchive
// ═══════════════════════════════════════════════════════════════════════

/// Durable mapping from bucket id to [`Bucket`] record.
///
/// No delete and no listing by owner: deletion has no user path, and
/// ownership is the session cache's concern.
#[derive(Clone)]
pub struct ConceptArchive {
    ns: Namespace,
}

impl ConceptArchive {
    /// Create an archive backed by `db`.
    pub fn new(db: Database) -> Self {
        Self {
            ns: Namespace::new(db, "buckets"),
        }
    }

    /// Store `bucket` under `id`, overwriting any previous record.
    pub async fn put(&self, id: &str, bucket: &Bucket) -> StoreResult<()> {
        self.ns.put(id, bucket).await?;
        debug!(bucket_id = %id, "bucket stored");
        Ok(())
    }

    /// Load the bucket stored under `id`.
    ///
    /// An absent key is an error here: every bucket id presented by a user
    /// should resolve.
    pub async fn get(&self, id: &str) -> StoreResult<Bucket> {
        self.ns
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "bucket",
                key: id.to_string(),
            })
    }

    /// True if a bucket exists under `id`.
    pub async fn exists(&self, id: &str) -> StoreResult<bool> {
        self.ns.contains(id).await
    }

    /// Snapshot of every bucket id in the archive.
    pub async fn keys(&self) -> StoreResult<Vec<String>> {
        self.ns.keys().await
    }
}

// ── tests ────────────────────────────────────────────────────────────
