//! Error types for bazaar entities.

/// Result type for entity construction and parsing.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Malformed input detected before any store call.
///
/// These errors are never retried; they describe input the caller must fix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required string field was empty.
    #[error("{field} must not be empty")]
    EmptyField {
        /// The field name.
        field: &'static str,
    },

    /// The price is not a non-negative decimal number.
    #[error("invalid price: {0:?}")]
    InvalidPrice(String),

    /// The price has more than two decimal places.
    #[error("price has more than two decimal places: {0:?}")]
    TooManyDecimals(String),

    /// The listing identifier is not an integer.
    #[error("invalid listing id: {0:?}")]
    InvalidListingId(String),

    /// The listing identifier is below the first assignable id.
    #[error("listing id out of range: {0}")]
    ListingIdOutOfRange(i64),

    /// A category counter below zero.
    #[error("negative category count: {0}")]
    NegativeCount(i64),

    /// The sort key token is not recognised.
    #[error("invalid sort key: {0:?}")]
    InvalidSortKey(String),

    /// The sort order token is not recognised.
    #[error("invalid sort order: {0:?}")]
    InvalidSortOrder(String),
}

impl ValidationError {
    /// Whether this error concerns the price field.
    #[must_use]
    pub const fn is_price(&self) -> bool {
        matches!(self, Self::InvalidPrice(_) | Self::TooManyDecimals(_))
    }
}
