//! # bucket-core
//!
//! Conversation core for the Concept Bucket bot.
//!
//! One [`SessionMachine`] per active chat consumes inbound text events and
//! produces outbound [`Reply`] values plus persistence side effects against
//! the stores in `bucket-store`. The machine is an explicit finite state
//! machine — state is data ([`ChatState`]), not stored callables — so it can
//! be driven and inspected in tests without any transport.
//!
//! Durable writes from one chat go through that chat's [`SessionWriter`], a
//! single in-order worker, so two writes from the same session can never
//! race each other.

pub mod command;
pub mod error;
pub mod ids;
pub mod machine;
pub mod reply;
pub mod writer;

// ── re-exports ───────────────────────────────────────────────────────

pub use command::Command;
pub use error::{GenerationError, SessionError};
pub use ids::IdGenerator;
pub use machine::{ChatState, SessionMachine};
pub use reply::Reply;
pub use writer::SessionWriter;
