//! Integration tests for the bucket-store crate.
//!
//! These tests exercise the full database lifecycle including migrations,
//! archive and session round-trips across process-style reopens, and the
//! blocking policy under concurrent writers, against a real SQLite database
//! on disk (via tempfile).

use bucket_store::{Bucket, ConceptArchive, Database, SessionCache, SessionRecord};

// ═══════════════════════════════════════════════════════════════════════
//  Database lifecycle
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn database_open_and_migrate_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("bucket.db");

    let db = Database::open_and_migrate(db_path.clone()).await.unwrap();

    let bucket_count: i64 = db
        .execute(|conn| {
            let c: i64 = conn.query_row("SELECT count(*) FROM buckets", [], |row| row.get(0))?;
            Ok(c)
        })
        .await
        .unwrap();
    assert_eq!(bucket_count, 0);

    let session_count: i64 = db
        .execute(|conn| {
            let c: i64 =
                conn.query_row("SELECT count(*) FROM chat_sessions", [], |row| row.get(0))?;
            Ok(c)
        })
        .await
        .unwrap();
    assert_eq!(session_count, 0);

    assert!(db_path.exists());
}

#[tokio::test]
async fn database_open_and_migrate_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("idempotent.db");

    let db1 = Database::open_and_migrate(db_path.clone()).await.unwrap();
    drop(db1);

    let db2 = Database::open_and_migrate(db_path).await.unwrap();
    let count: i64 = db2
        .execute(|conn| {
            let c: i64 = conn.query_row("SELECT count(*) FROM buckets", [], |row| row.get(0))?;
            Ok(c)
        })
        .await
        .unwrap();
    assert_eq!(count, 0);
}

// ═══════════════════════════════════════════════════════════════════════
//  Persistence across restarts
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn bucket_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("bucket.db");

    let mut bucket = Bucket::new("My Notes");
    bucket.upsert_concept("ownership", "one owner at a time", 1_700_000_000);

    {
        let db = Database::open_and_migrate(db_path.clone()).await.unwrap();
        let archive = ConceptArchive::new(db);
        archive.put("abc123def456", &bucket).await.unwrap();
    }

    let db = Database::open_and_migrate(db_path).await.unwrap();
    let archive = ConceptArchive::new(db);
    let got = archive.get("abc123def456").await.unwrap();
    assert_eq!(got, bucket);
}

#[tokio::test]
async fn session_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("bucket.db");

    let record = SessionRecord {
        bucket_ids: vec!["abc123def456".into()],
        current_id: Some("abc123def456".into()),
    };

    {
        let db = Database::open_and_migrate(db_path.clone()).await.unwrap();
        let cache = SessionCache::new(db);
        cache.put(123_456_789, &record).await.unwrap();
    }

    let db = Database::open_and_migrate(db_path).await.unwrap();
    let cache = SessionCache::new(db);
    let got = cache.get(123_456_789).await.unwrap().unwrap();
    assert_eq!(got, record);
}

#[tokio::test]
async fn archive_and_session_namespaces_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_and_migrate(dir.path().join("bucket.db"))
        .await
        .unwrap();

    let archive = ConceptArchive::new(db.clone());
    let cache = SessionCache::new(db);

    // A crash between the two writes leaves one namespace updated and the
    // other not; each remains individually valid. Simulate by writing only
    // the bucket.
    archive.put("orphan", &Bucket::new("unowned")).await.unwrap();

    assert!(cache.get(1).await.unwrap().is_none());
    assert!(archive.exists("orphan").await.unwrap());

    // The converse: a session referencing an id the archive never saw is a
    // readable record, not corruption.
    let dangling = SessionRecord {
        bucket_ids: vec!["never-written".into()],
        current_id: Some("never-written".into()),
    };
    cache.put(1, &dangling).await.unwrap();
    assert_eq!(cache.get(1).await.unwrap().unwrap(), dangling);
    assert!(archive.get("never-written").await.unwrap_err().is_not_found());
}

// ═══════════════════════════════════════════════════════════════════════
//  Concurrency policy
// ═══════════════════════════════════════════════════════════════════════

/// Two handles on the same file are two SQLite writers. The busy timeout
/// makes the second writer block and retry rather than fail, so every write
/// lands.
#[tokio::test]
async fn concurrent_writers_block_instead_of_failing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("bucket.db");

    let db_a = Database::open_and_migrate(db_path.clone()).await.unwrap();
    let db_b = Database::open(db_path).unwrap();

    let archive_a = ConceptArchive::new(db_a);
    let archive_b = ConceptArchive::new(db_b);

    let writes_a = tokio::spawn(async move {
        for i in 0..20 {
            archive_a
                .put(&format!("a{i}"), &Bucket::new(format!("from a {i}")))
                .await
                .unwrap();
        }
        archive_a
    });
    let writes_b = tokio::spawn(async move {
        for i in 0..20 {
            archive_b
                .put(&format!("b{i}"), &Bucket::new(format!("from b {i}")))
                .await
                .unwrap();
        }
        archive_b
    });

    let archive = writes_a.await.unwrap();
    writes_b.await.unwrap();

    assert_eq!(archive.keys().await.unwrap().len(), 40);
}

/// Sessions from different chats never clobber each other: the key space is
/// per chat id.
#[tokio::test]
async fn sessions_are_isolated_per_chat() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_and_migrate(dir.path().join("bucket.db"))
        .await
        .unwrap();
    let cache = SessionCache::new(db);

    let a = SessionRecord {
        bucket_ids: vec!["a".into()],
        current_id: Some("a".into()),
    };
    let b = SessionRecord {
        bucket_ids: vec!["b".into()],
        current_id: None,
    };

    cache.put(1, &a).await.unwrap();
    cache.put(2, &b).await.unwrap();

    assert_eq!(cache.get(1).await.unwrap().unwrap(), a);
    assert_eq!(cache.get(2).await.unwrap().unwrap(), b);
}
