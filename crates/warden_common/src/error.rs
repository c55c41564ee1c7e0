//! Error taxonomy for warden operations
//!
//! Policy violations are not errors (they are `Verdict`s handled in place by
//! the automod layer); this enum covers the failures that cross component
//! boundaries.

use thiserror::Error;

/// The primary error type for warden operations.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Requester already holds an open ticket; nothing was created.
    #[error("requester already has an open ticket")]
    TicketAlreadyOpen,

    /// Actor lacks the support role required for a privileged action.
    #[error("support role required")]
    NotAuthorized,

    /// Durable store could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Durable store content did not parse. Absent files are empty state,
    /// malformed ones are not repaired.
    #[error("corrupt store content: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// A call into the external chat platform failed.
    #[error(transparent)]
    Gateway(#[from] anyhow::Error),
}

/// Specialized Result for warden logic.
pub type Result<T> = std::result::Result<T, WardenError>;
