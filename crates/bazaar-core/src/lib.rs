//! Core types for the bazaar marketplace.
//!
//! This crate provides the entity model shared by the storage layer and the
//! command dispatcher:
//!
//! - **Identifiers**: `ListingId`
//! - **Money**: `Price` (integer minor units)
//! - **Entities**: `User`, `Listing`, `ListingDraft`, `CategoryMetric`
//! - **Browsing**: `SortBy`, `SortOrder`
//!
//! Every constructor validates its fields, so a value of one of these types is
//! always safe to write. Validation failures are reported as
//! [`ValidationError`] and never reach the store.
//!
//! # Price unit
//!
//! Prices are stored as `i64` minor units (cents): `"10.5"` parses to 1050.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod category;
pub mod error;
pub mod ids;
pub mod listing;
pub mod price;
pub mod user;

pub use category::{CategoryMetric, SortBy, SortOrder};
pub use error::{Result, ValidationError};
pub use ids::{ListingId, FIRST_LISTING_ID};
pub use listing::{Listing, ListingDraft};
pub use price::Price;
pub use user::User;

/// Reject empty required string fields.
pub(crate) fn require_non_empty(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}
