//! # bucket-store
//!
//! Durable storage for the Concept Bucket bot.
//!
//! Provides SQLite-backed persistence behind two logical namespaces: the
//! [`ConceptArchive`] (buckets keyed by generated id) and the
//! [`SessionCache`] (per-chat session records keyed by chat id). Both are
//! built on the generic [`Namespace`] key-value layer, which stores records
//! as opaque JSON values.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  ConceptArchive        SessionCache      │
//! ├──────────────────────────────────────────┤
//! │  Namespace (serde JSON key-value)        │
//! ├──────────────────────────────────────────┤
//! │  Database (rusqlite WAL, single writer)  │
//! │  Migrations (versioned, transactional)   │
//! └──────────────────────────────────────────┘
//! ```
//!
//! The two namespaces are independent: nothing links a session write to a
//! bucket write transactionally. A crash between the two leaves the system
//! partially updated but individually valid, which callers tolerate.
//!
//! ## Quick start
//!
//! ```ignore
//! use bucket_store::{ConceptArchive, Database, SessionCache};
//!
//! let db = Database::open_and_migrate("data/bucket.db").await?;
//! let archive = ConceptArchive::new(db.clone());
//! let sessions = SessionCache::new(db);
//! ```

pub mod archive;
pub mod db;
pub mod error;
pub mod kv;
pub mod migration;
pub mod session;

// ── re-exports ───────────────────────────────────────────────────────

pub use archive::{Bucket, Concept, ConceptArchive};
pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use kv::Namespace;
pub use session::{SessionCache, SessionRecord};
