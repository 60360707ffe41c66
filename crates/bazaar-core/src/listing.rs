//! Listing types for bazaar.
//!
//! A [`ListingDraft`] is the validated user input for a new listing. The
//! storage layer turns a draft into a [`Listing`] once it has allocated an
//! identifier, so a draft never carries an id or a timestamp.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::{require_non_empty, ListingId, Price};

/// Format used when rendering `created_at`.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Validated input for a new listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingDraft {
    /// Owner of the listing.
    pub username: String,
    /// Listing title (non-empty).
    pub title: String,
    /// Free-form description, may be empty.
    pub description: String,
    /// Asking price.
    pub price: Price,
    /// Category the listing is filed under (non-empty).
    pub category: String,
}

impl ListingDraft {
    /// Validate the fields of a new listing.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyField` when the username, title or
    /// category is empty.
    pub fn new(
        username: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        price: Price,
        category: impl Into<String>,
    ) -> Result<Self> {
        let draft = Self {
            username: username.into(),
            title: title.into(),
            description: description.into(),
            price,
            category: category.into(),
        };
        require_non_empty("username", &draft.username)?;
        require_non_empty("title", &draft.title)?;
        require_non_empty("category", &draft.category)?;
        Ok(draft)
    }
}

/// A live listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Unique listing identifier (partition key).
    pub id: ListingId,
    /// Owner of the listing (sort key).
    pub username: String,
    /// Listing title.
    pub title: String,
    /// Listing description.
    pub description: String,
    /// Asking price in minor units.
    pub price: Price,
    /// Category name.
    pub category: String,
    /// Creation time, whole seconds.
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// Materialise a draft under an allocated identifier.
    ///
    /// `created_at` is truncated to whole seconds, the resolution the table
    /// stores it at.
    #[must_use]
    pub fn from_draft(id: ListingId, draft: ListingDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            username: draft.username,
            title: draft.title,
            description: draft.description,
            price: draft.price,
            category: draft.category,
            created_at: created_at.trunc_subsecs(0),
        }
    }

    /// Re-check field validity, e.g. after decoding a stored record.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyField` for an empty username, title or
    /// category.
    pub fn validate(&self) -> Result<()> {
        require_non_empty("username", &self.username)?;
        require_non_empty("title", &self.title)?;
        require_non_empty("category", &self.category)?;
        Ok(())
    }
}

/// Renders `title|description|price|created_at|category|username`, with the
/// price in whole major units.
impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}|{}",
            self.title,
            self.description,
            self.price.major_units(),
            self.created_at.format(CREATED_AT_FORMAT),
            self.category,
            self.username
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValidationError;
    use chrono::TimeZone;

    fn price(minor: i64) -> Price {
        Price::from_minor_units(minor).unwrap()
    }

    #[test]
    fn draft_requires_title_and_category() {
        assert_eq!(
            ListingDraft::new("alice", "", "desc", price(100), "Sports"),
            Err(ValidationError::EmptyField { field: "title" })
        );
        assert_eq!(
            ListingDraft::new("alice", "Shoes", "desc", price(100), ""),
            Err(ValidationError::EmptyField { field: "category" })
        );
    }

    #[test]
    fn draft_allows_empty_description() {
        let draft = ListingDraft::new("alice", "Shoes", "", price(100), "Sports").unwrap();
        assert!(draft.description.is_empty());
    }

    #[test]
    fn display_format() {
        let created_at = Utc.with_ymd_and_hms(2019, 2, 22, 12, 34, 56).unwrap();
        let draft = ListingDraft::new(
            "user1",
            "Phone model 8",
            "Black color, brand new",
            price(100_000),
            "Electronics",
        )
        .unwrap();
        let listing = Listing::from_draft(ListingId::FIRST, draft, created_at);

        assert_eq!(
            listing.to_string(),
            "Phone model 8|Black color, brand new|1000|2019-02-22 12:34:56|Electronics|user1"
        );
    }

    #[test]
    fn created_at_is_truncated_to_seconds() {
        let created_at = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 1)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(750))
            .unwrap();
        let draft = ListingDraft::new("bob", "Lamp", "", price(0), "Home").unwrap();
        let listing = Listing::from_draft(ListingId::FIRST, draft, created_at);
        assert_eq!(listing.created_at.timestamp_subsec_nanos(), 0);
        assert_eq!(listing.created_at.timestamp(), created_at.timestamp());
    }
}
