//! Identifier types for bazaar.
//!
//! Listing identifiers are plain integers so that they double as the table's
//! numeric partition key. Everything below [`FIRST_LISTING_ID`] is reserved
//! for sentinel partitions (users, category metrics, the id sequence).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// The first identifier handed out on an empty table.
pub const FIRST_LISTING_ID: i64 = 100_001;

/// A listing identifier.
///
/// Identifiers are assigned once, in commit order, and are never reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ListingId(i64);

impl ListingId {
    /// The identifier assigned to the first listing ever created.
    pub const FIRST: Self = Self(FIRST_LISTING_ID);

    /// Create a listing identifier, enforcing the lower bound.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ListingIdOutOfRange` below [`FIRST_LISTING_ID`].
    pub const fn new(value: i64) -> Result<Self, ValidationError> {
        if value < FIRST_LISTING_ID {
            return Err(ValidationError::ListingIdOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Return the raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// The identifier following this one, `None` at `i64::MAX`.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

impl FromStr for ListingId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .parse()
            .map_err(|_| ValidationError::InvalidListingId(s.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Debug for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListingId({})", self.0)
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for ListingId {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ListingId> for i64 {
    fn from(id: ListingId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_listing_id() {
        let id: ListingId = "100001".parse().unwrap();
        assert_eq!(id, ListingId::FIRST);
        assert_eq!(id.to_string(), "100001");
    }

    #[test]
    fn parse_rejects_non_numeric() {
        let err = "100xxx".parse::<ListingId>().unwrap_err();
        assert_eq!(err, ValidationError::InvalidListingId("100xxx".into()));
    }

    #[test]
    fn sentinel_range_is_rejected() {
        assert_eq!(
            ListingId::new(-1),
            Err(ValidationError::ListingIdOutOfRange(-1))
        );
        assert!(ListingId::new(100_000).is_err());
    }

    #[test]
    fn next_is_strictly_greater() {
        let id = ListingId::FIRST;
        assert!(id.next() > Some(id));
        assert_eq!(id.next().map(ListingId::get), Some(100_002));
    }

    #[test]
    fn next_stops_at_the_top_of_the_range() {
        let last: ListingId = "9223372036854775807".parse().unwrap();
        assert_eq!(last.next(), None);
    }

    #[test]
    fn listing_id_serde_json() {
        let id = ListingId::new(100_042).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "100042");
        assert!(serde_json::from_str::<ListingId>("12").is_err());
    }
}
