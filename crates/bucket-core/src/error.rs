//! Error types for the conversation core.
//!
//! Every failure is caught at the session machine boundary per event; none
//! crosses it. The user sees one generic message, the log gets the detail.

use thiserror::Error;

use bucket_store::StoreError;

/// Errors the conversation layer can hit while handling one event.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A durable read or write failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Producing a fresh bucket id failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The per-session persistence worker is gone.
    #[error("persistence worker unavailable")]
    WriterClosed,
}

/// Id generation failed.
///
/// Never retried silently — retrying is the caller's decision.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The wall clock reads before the generator epoch.
    #[error("system clock reads before the id generator epoch")]
    ClockSkew,

    /// The generator's internal state is poisoned.
    #[error("id generator state poisoned")]
    Poisoned,
}
