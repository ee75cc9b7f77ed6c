//! Inbound command vocabulary.
//!
//! Commands are the exact reply-keyboard labels the bot presents, plus
//! `/start`. The label constants live here so the transport renders its
//! keyboard from the same strings this parser matches — content is part of
//! the machine's contract, rendering is the transport's.

/// `/start` greeting.
pub const START: &str = "/start";
/// Begin the bucket-creation flow.
pub const NEW_BUCKET: &str = "🆕 New bucket";
/// List every owned bucket.
pub const MY_BUCKETS: &str = "🗑 My buckets";
/// Begin adding a shared bucket by id.
pub const ADD_BUCKET: &str = "➕ Add bucket";
/// Begin selecting an owned bucket by id.
pub const SET_BUCKET: &str = "☑️ Set bucket";
/// Begin the two-step concept-creation flow.
pub const NEW_CONCEPT: &str = "💡 New concept";
/// List the concepts of the selected bucket.
pub const MY_CONCEPTS: &str = "📝 My concepts";
/// Show the selected bucket's overview.
pub const WHICH_BUCKET: &str = "❓ Which bucket";
/// Abandon whatever flow is pending.
pub const CANCEL: &str = "❌ Cancel";

/// Keyboard layout, two labels per row, as the bot presents it.
pub const KEYBOARD_ROWS: [[&str; 2]; 4] = [
    [NEW_BUCKET, MY_BUCKETS],
    [ADD_BUCKET, SET_BUCKET],
    [NEW_CONCEPT, MY_CONCEPTS],
    [WHICH_BUCKET, CANCEL],
];

/// A recognized inbound command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    NewBucket,
    MyBuckets,
    AddBucket,
    SetBucket,
    NewConcept,
    MyConcepts,
    WhichBucket,
    Cancel,
}

impl Command {
    /// Parse an inbound text; `None` means free text.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            START => Some(Self::Start),
            NEW_BUCKET => Some(Self::NewBucket),
            MY_BUCKETS => Some(Self::MyBuckets),
            ADD_BUCKET => Some(Self::AddBucket),
            SET_BUCKET => Some(Self::SetBucket),
            NEW_CONCEPT => Some(Self::NewConcept),
            MY_CONCEPTS => Some(Self::MyConcepts),
            WHICH_BUCKET => Some(Self::WhichBucket),
            CANCEL => Some(Self::Cancel),
            _ => None,
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────
