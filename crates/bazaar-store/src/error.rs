//! Error types for bazaar storage.

use bazaar_core::{ListingId, ValidationError};

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, TableError>;

/// Why a single operation inside a cancelled transaction failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationReason {
    /// This operation was fine; another one cancelled the transaction.
    None,
    /// The operation's condition did not hold.
    ConditionalCheckFailed,
    /// Any other store-reported reason code.
    Other(String),
}

impl CancellationReason {
    /// Whether the operation's condition expression failed.
    #[must_use]
    pub const fn is_condition_failure(&self) -> bool {
        matches!(self, Self::ConditionalCheckFailed)
    }
}

/// Errors raised by a table backend.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// Transport or service failure.
    #[error("database error: {0}")]
    Backend(String),

    /// Item encoding/decoding failed at the byte level.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored item does not have the shape its record kind requires.
    #[error("corrupt item {key}: {message}")]
    Decode {
        /// Key of the offending item.
        key: String,
        /// What was wrong with it.
        message: String,
    },

    /// A conditional single-item write was rejected.
    #[error("conditional check failed")]
    ConditionalCheckFailed,

    /// A multi-item transaction was cancelled; one reason per operation.
    #[error("transaction canceled: {reasons:?}")]
    TransactionCanceled {
        /// Per-operation reasons, in request order.
        reasons: Vec<CancellationReason>,
    },

    /// Invalid backend configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The reserved partition keys overlap.
    #[error("invalid key layout: {0}")]
    InvalidKeyLayout(String),
}

/// Errors surfaced by the repositories.
///
/// Expected outcomes such as "already exists" or "not found" are not errors;
/// they are reported through the operation's outcome type.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Input failed validation before any store call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Another create committed the same listing id first.
    #[error("listing id {listing_id} was claimed by a concurrent create")]
    IdCollision {
        /// The contested identifier.
        listing_id: ListingId,
    },

    /// The table failed.
    #[error(transparent)]
    Store(#[from] TableError),
}

impl RepositoryError {
    /// Whether repeating the operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::IdCollision { .. })
    }
}
