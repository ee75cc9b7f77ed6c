//! The per-chat session state machine.
//!
//! One [`SessionMachine`] per active chat. It holds the live session record,
//! the working copy of the currently-selected bucket, and an explicit
//! [`ChatState`]. Inbound text events drive the transition table; outbound
//! [`Reply`] values come back, and durable writes go through the chat's
//! [`SessionWriter`].
//!
//! Cancellation takes precedence over every state: it is checked before any
//! state-specific branch and unconditionally resets to [`ChatState::Idle`],
//! discarding pending scratch data. No timeouts exist; a chat left mid-flow
//! stays there until the next matching or cancelling event.
//!
//! Every store or generator failure is caught here, per event: the user
//! gets one generic message, the log gets the operation and chat id, and
//! the machine lands back in `Idle` rather than stuck mid-flow.

use std::mem;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};

use bucket_store::{Bucket, ConceptArchive, SessionCache, SessionRecord};

use crate::command::Command;
use crate::ids::IdGenerator;
use crate::reply::{self, Reply};
use crate::writer::SessionWriter;

/// Conversation state of one chat.
///
/// `Idle` is both initial and terminal-per-turn; the only multi-step flow is
/// concept creation, which passes through `AwaitingConceptBody`. The pending
/// title is variant data, so cancelling cannot leak it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChatState {
    #[default]
    Idle,
    AwaitingBucketName,
    AwaitingAddBucketId,
    AwaitingSetBucketId,
    AwaitingConceptTitle,
    AwaitingConceptBody { title: String },
}

/// State machine instance for one chat.
pub struct SessionMachine {
    chat_id: i64,
    session: SessionRecord,
    /// Working copy of the selected bucket; the archive stays authoritative.
    bucket: Option<Bucket>,
    state: ChatState,
    archive: ConceptArchive,
    ids: Arc<IdGenerator>,
    writer: SessionWriter,
}

impl SessionMachine {
    /// Build the machine for `chat_id`, loading its session lazily.
    ///
    /// An absent session record means a first contact and becomes an empty
    /// session; a failed load is logged and also starts empty rather than
    /// refusing the chat. The selected bucket, if any, is loaded into the
    /// working copy the same way.
    pub async fn connect(
        chat_id: i64,
        archive: ConceptArchive,
        cache: SessionCache,
        ids: Arc<IdGenerator>,
    ) -> Self {
        let session = match cache.get(chat_id).await {
            Ok(record) => record.unwrap_or_default(),
            Err(err) => {
                error!(chat_id, error = %err, "session load failed, starting empty");
                SessionRecord::default()
            }
        };

        let bucket = match &session.current_id {
            Some(id) => match archive.get(id).await {
                Ok(bucket) => Some(bucket),
                Err(err) => {
                    // Dangling selection is tolerated; the user just has to
                    // select again.
                    error!(chat_id, bucket_id = %id, error = %err, "selected bucket load failed");
                    None
                }
            },
            None => None,
        };

        let writer = SessionWriter::spawn(chat_id, archive.clone(), cache);

        debug!(chat_id, owned = session.bucket_ids.len(), "session connected");

        Self {
            chat_id,
            session,
            bucket,
            state: ChatState::Idle,
            archive,
            ids,
            writer,
        }
    }

    /// Consume one inbound text event, producing zero or more replies.
    pub async fn handle(&mut self, text: &str) -> Vec<Reply> {
        // An update with no extractable text matches no case, in any state.
        if text.is_empty() {
            return Vec::new();
        }

        // Cancel outranks every state.
        if Command::parse(text) == Some(Command::Cancel) {
            self.state = ChatState::Idle;
            return vec![Reply::plain(reply::CANCELLED)];
        }

        let state = mem::take(&mut self.state);
        match state {
            ChatState::Idle => self.handle_idle(text).await,
            ChatState::AwaitingBucketName => self.create_bucket(text).await,
            ChatState::AwaitingAddBucketId => self.add_bucket(text).await,
            ChatState::AwaitingSetBucketId => self.set_bucket(text).await,
            ChatState::AwaitingConceptTitle => {
                self.state = ChatState::AwaitingConceptBody {
                    title: text.to_string(),
                };
                vec![Reply::plain(reply::ASK_CONCEPT_BODY)]
            }
            ChatState::AwaitingConceptBody { title } => self.add_concept(title, text),
        }
    }

    /// Current conversation state.
    pub fn state(&self) -> &ChatState {
        &self.state
    }

    /// Current in-memory session record.
    pub fn session(&self) -> &SessionRecord {
        &self.session
    }

    /// Block until every queued durable write for this chat has landed.
    pub async fn flush(&self) {
        if let Err(err) = self.writer.flush().await {
            error!(chat_id = self.chat_id, error = %err, "flush failed");
        }
    }

    // ── Idle dispatch ────────────────────────────────────────────────

    async fn handle_idle(&mut self, text: &str) -> Vec<Reply> {
        match Command::parse(text) {
            Some(Command::Start) => vec![Reply::with_keyboard(reply::WELCOME)],
            Some(Command::NewBucket) => {
                self.state = ChatState::AwaitingBucketName;
                vec![Reply::plain(reply::ASK_BUCKET_NAME)]
            }
            Some(Command::MyBuckets) => self.list_buckets().await,
            Some(Command::AddBucket) => {
                self.state = ChatState::AwaitingAddBucketId;
                vec![Reply::plain(reply::ASK_ADD_ID)]
            }
            Some(Command::SetBucket) => {
                self.state = ChatState::AwaitingSetBucketId;
                vec![Reply::plain(reply::ASK_SET_ID)]
            }
            Some(Command::NewConcept) => {
                if self.bucket.is_some() {
                    self.state = ChatState::AwaitingConceptTitle;
                    vec![Reply::plain(reply::ASK_CONCEPT_TITLE)]
                } else {
                    vec![Reply::plain(reply::NO_BUCKET_SELECTED)]
                }
            }
            Some(Command::MyConcepts) => self.list_concepts().await,
            Some(Command::WhichBucket) => self.which_bucket().await,
            // Cancel was intercepted above; unrecognized free text is a no-op.
            Some(Command::Cancel) | None => Vec::new(),
        }
    }

    // ── transitions out of Awaiting* states ──────────────────────────

    /// `AwaitingBucketName` → `Idle`: mint an id, persist, confirm.
    ///
    /// The bucket write is awaited and happens before the session is
    /// touched, so a crash can orphan a bucket but never leave a session
    /// pointing at a bucket that was never written. The session write then
    /// rides the queue without delaying the confirmation.
    async fn create_bucket(&mut self, name: &str) -> Vec<Reply> {
        let id = match self.ids.next() {
            Ok(id) => id,
            Err(err) => {
                // Abort with no partial bucket; not retried here.
                error!(chat_id = self.chat_id, error = %err, "bucket id generation failed");
                return vec![Reply::plain(reply::GENERIC_FAILURE)];
            }
        };

        let bucket = Bucket::new(name);
        if let Err(err) = self.writer.store_bucket(&id, bucket.clone()).await {
            error!(chat_id = self.chat_id, bucket_id = %id, error = %err, "bucket persist failed");
            return vec![Reply::plain(reply::GENERIC_FAILURE)];
        }

        self.session.bucket_ids.push(id.clone());
        self.session.current_id = Some(id.clone());
        self.bucket = Some(bucket);
        self.writer.queue_session(self.session.clone());

        debug!(chat_id = self.chat_id, bucket_id = %id, "bucket created");
        vec![reply::bucket_created(name, &id)]
    }

    /// `AwaitingAddBucketId` → `Idle`: adopt a bucket someone shared.
    ///
    /// Existence is checked against the archive — deliberately not the
    /// session: adopting an id that exists but is not yet owned is exactly
    /// this path's job.
    async fn add_bucket(&mut self, id: &str) -> Vec<Reply> {
        match self.archive.exists(id).await {
            Ok(true) => {
                self.session.bucket_ids.push(id.to_string());
                self.writer.queue_session(self.session.clone());
                vec![Reply::plain(reply::BUCKET_ADDED)]
            }
            Ok(false) => vec![Reply::plain(reply::INVALID_ID)],
            Err(err) => {
                error!(chat_id = self.chat_id, bucket_id = %id, error = %err, "existence check failed");
                vec![Reply::plain(reply::GENERIC_FAILURE)]
            }
        }
    }

    /// `AwaitingSetBucketId` → `Idle`: select one of the owned buckets.
    ///
    /// Ownership is checked against the in-memory session list only; the
    /// archive is read just to refresh the working copy.
    async fn set_bucket(&mut self, id: &str) -> Vec<Reply> {
        if !self.session.owns(id) {
            return vec![Reply::plain(reply::INVALID_ID)];
        }

        match self.archive.get(id).await {
            Ok(bucket) => {
                self.bucket = Some(bucket);
                self.session.current_id = Some(id.to_string());
                self.writer.queue_session(self.session.clone());
                vec![Reply::plain(reply::BUCKET_SET)]
            }
            Err(err) => {
                // Owned but unresolvable (dangling id): report, change nothing.
                error!(chat_id = self.chat_id, bucket_id = %id, error = %err, "bucket load failed");
                vec![Reply::plain(reply::GENERIC_FAILURE)]
            }
        }
    }

    /// `AwaitingConceptBody` → `Idle`: upsert the concept, reply at once.
    ///
    /// The bucket write rides the queue without being awaited — the reply
    /// does not wait for durability, and a crash in that window loses the
    /// concept. The queue still guarantees it cannot be overwritten by an
    /// older write.
    fn add_concept(&mut self, title: String, body: &str) -> Vec<Reply> {
        let (Some(bucket), Some(id)) = (self.bucket.as_mut(), self.session.current_id.clone())
        else {
            // Selection vanished mid-flow; treat like no selection at all.
            return vec![Reply::plain(reply::NO_BUCKET_SELECTED)];
        };

        bucket.upsert_concept(title, body, Utc::now().timestamp());
        self.writer.queue_bucket(&id, bucket.clone());

        vec![Reply::plain(reply::CONCEPT_ADDED)]
    }

    // ── Idle queries ─────────────────────────────────────────────────

    /// Overview of every owned bucket, one reply each.
    async fn list_buckets(&self) -> Vec<Reply> {
        if self.session.bucket_ids.is_empty() {
            return vec![Reply::plain(reply::NO_BUCKETS)];
        }

        let mut replies = Vec::with_capacity(self.session.bucket_ids.len());
        for id in &self.session.bucket_ids {
            match self.archive.get(id).await {
                Ok(bucket) => replies.push(reply::bucket_overview(&bucket.name, id)),
                Err(err) => {
                    // A dangling id degrades that one entry, not the listing.
                    error!(chat_id = self.chat_id, bucket_id = %id, error = %err, "bucket overview failed");
                    replies.push(Reply::plain(reply::GENERIC_FAILURE));
                }
            }
        }
        replies
    }

    /// All concepts of the selected bucket, reloaded from the archive so
    /// edits made from elsewhere show up.
    async fn list_concepts(&mut self) -> Vec<Reply> {
        let Some(id) = self.session.current_id.clone() else {
            return vec![Reply::plain(reply::NO_BUCKET_SELECTED)];
        };

        match self.archive.get(&id).await {
            Ok(bucket) => {
                let replies = if bucket.concepts.is_empty() {
                    vec![Reply::plain(reply::EMPTY_BUCKET)]
                } else {
                    bucket.concepts.values().map(reply::concept).collect()
                };
                self.bucket = Some(bucket);
                replies
            }
            Err(err) => {
                error!(chat_id = self.chat_id, bucket_id = %id, error = %err, "concept listing failed");
                vec![Reply::plain(reply::GENERIC_FAILURE)]
            }
        }
    }

    /// Overview of the selected bucket, if any.
    async fn which_bucket(&self) -> Vec<Reply> {
        let Some(id) = &self.session.current_id else {
            return vec![Reply::plain(reply::NO_BUCKET_SELECTED)];
        };

        match self.archive.get(id).await {
            Ok(bucket) => vec![reply::bucket_overview(&bucket.name, id)],
            Err(err) => {
                error!(chat_id = self.chat_id, bucket_id = %id, error = %err, "bucket overview failed");
                vec![Reply::plain(reply::GENERIC_FAILURE)]
            }
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────
