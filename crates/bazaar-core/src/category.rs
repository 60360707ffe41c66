//! Category metrics and browse ordering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ValidationError};

/// Derived per-category counter.
///
/// `count` equals the number of live listings filed under `category`. The
/// record is created by the first listing in a category and kept at zero
/// once the category empties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMetric {
    /// Category name.
    pub category: String,
    /// Number of live listings.
    pub count: i64,
}

impl CategoryMetric {
    /// Create a metric record.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyField` for an empty category name and
    /// `ValidationError::NegativeCount` for a count below zero.
    pub fn new(category: impl Into<String>, count: i64) -> Result<Self> {
        let category = category.into();
        crate::require_non_empty("category", &category)?;
        if count < 0 {
            return Err(ValidationError::NegativeCount(count));
        }
        Ok(Self { category, count })
    }
}

/// Dimension a category is browsed by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Creation time (`sort_time`).
    #[default]
    CreatedAt,
    /// Price (`sort_price`).
    Price,
}

impl SortBy {
    /// The command token for this dimension.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "sort_time",
            Self::Price => "sort_price",
        }
    }
}

impl FromStr for SortBy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sort_time" => Ok(Self::CreatedAt),
            "sort_price" => Ok(Self::Price),
            other => Err(ValidationError::InvalidSortKey(other.to_string())),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a category browse. Defaults to newest/highest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Descending (`dsc`).
    #[default]
    Descending,
    /// Ascending (`asc`).
    Ascending,
}

impl SortOrder {
    /// The command token for this order.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Descending => "dsc",
            Self::Ascending => "asc",
        }
    }

    /// Whether results run from lowest to highest.
    #[must_use]
    pub const fn is_ascending(self) -> bool {
        matches!(self, Self::Ascending)
    }
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dsc" => Ok(Self::Descending),
            "asc" => Ok(Self::Ascending),
            other => Err(ValidationError::InvalidSortOrder(other.to_string())),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_browse_is_newest_first() {
        assert_eq!(SortBy::default(), SortBy::CreatedAt);
        assert_eq!(SortOrder::default(), SortOrder::Descending);
    }

    #[test]
    fn sort_tokens() {
        assert_eq!("sort_price".parse::<SortBy>(), Ok(SortBy::Price));
        assert_eq!("sort_time".parse::<SortBy>(), Ok(SortBy::CreatedAt));
        assert_eq!("asc".parse::<SortOrder>(), Ok(SortOrder::Ascending));
        assert_eq!(SortOrder::Descending.to_string(), "dsc");
        assert_eq!(
            "zzzsort_price".parse::<SortBy>(),
            Err(ValidationError::InvalidSortKey("zzzsort_price".into()))
        );
        assert_eq!(
            "zzzdsc".parse::<SortOrder>(),
            Err(ValidationError::InvalidSortOrder("zzzdsc".into()))
        );
    }

    #[test]
    fn metric_never_negative() {
        assert_eq!(
            CategoryMetric::new("Sports", -3),
            Err(ValidationError::NegativeCount(-3))
        );
        assert_eq!(CategoryMetric::new("Sports", 0).unwrap().count, 0);
        assert!(CategoryMetric::new("", 1).is_err());
    }
}
