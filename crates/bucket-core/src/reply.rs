//! Outbound reply values.
//!
//! The machine emits [`Reply`] values; the transport decides how to render
//! them. Markdown replies put names in bold and ids in a fixed-width style.

use bucket_store::Concept;

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Render with markup (bold names, fixed-width ids).
    pub markdown: bool,
    /// Ask the transport to attach its persistent keyboard.
    pub keyboard: bool,
}

impl Reply {
    /// A plain text reply.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markdown: false,
            keyboard: false,
        }
    }

    /// A reply rendered with markup.
    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markdown: true,
            keyboard: false,
        }
    }

    /// A plain reply that also carries the keyboard.
    pub fn with_keyboard(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markdown: false,
            keyboard: true,
        }
    }
}

// ── fixed texts ──────────────────────────────────────────────────────

pub const WELCOME: &str = "Welcome to Concept Bucket!";
pub const ASK_BUCKET_NAME: &str = "What's the name of the bucket?";
pub const ASK_ADD_ID: &str = "What's the ID of the bucket you want to add?";
pub const ASK_SET_ID: &str = "What's the ID of the bucket you want to use?";
pub const ASK_CONCEPT_TITLE: &str = "What's the title of the new concept?";
pub const ASK_CONCEPT_BODY: &str = "What's the new concept?";
pub const NO_BUCKETS: &str = "You have no bucket";
pub const NO_BUCKET_SELECTED: &str = "No bucket selected, please select or create one first";
pub const BUCKET_ADDED: &str = "Bucket added successfully";
pub const BUCKET_SET: &str = "Bucket set successfully";
pub const CONCEPT_ADDED: &str = "Concept added successfully";
pub const EMPTY_BUCKET: &str = "The bucket is empty";
pub const INVALID_ID: &str = "Invalid ID";
pub const CANCELLED: &str = "Action cancelled";
pub const GENERIC_FAILURE: &str = "Something went wrong...";

// ── formatted replies ────────────────────────────────────────────────

/// Confirmation for a newly created bucket.
pub fn bucket_created(name: &str, id: &str) -> Reply {
    Reply::markdown(format!("New bucket created!\n\nName: *{name}*\nID: `{id}`"))
}

/// Overview of one bucket.
pub fn bucket_overview(name: &str, id: &str) -> Reply {
    Reply::markdown(format!("Name: *{name}*\nID: `{id}`"))
}

/// One concept, title bold, body below.
pub fn concept(c: &Concept) -> Reply {
    Reply::markdown(format!("*{}*\n\n{}", c.title, c.body))
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_created_carries_name_and_id() {
        let reply = bucket_created("My Notes", "Aabc123xyz09");
        assert!(reply.markdown);
        assert!(reply.text.contains("*My Notes*"));
        assert!(reply.text.contains("`Aabc123xyz09`"));
    }

    #[test]
    fn concept_renders_title_and_body() {
        let c = Concept {
            title: "borrow checker".into(),
            body: "aliasing xor mutation".into(),
            created_at: 0,
        };
        let reply = concept(&c);
        assert_eq!(reply.text, "*borrow checker*\n\naliasing xor mutation");
    }
}
