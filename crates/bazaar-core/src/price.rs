//! Listing prices.
//!
//! A price is held as a non-negative count of minor currency units (cents).
//! Price strings carry at most two decimal places and are parsed exactly,
//! without going through floating point, so `"12.13"` is always 1213.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Minor units per major unit.
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// A non-negative price in minor units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct Price(i64);

impl Price {
    /// Create a price from minor units.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPrice` for negative amounts.
    pub fn from_minor_units(minor_units: i64) -> Result<Self, ValidationError> {
        if minor_units < 0 {
            return Err(ValidationError::InvalidPrice(minor_units.to_string()));
        }
        Ok(Self(minor_units))
    }

    /// The price in minor units.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// The whole major units, truncating any fraction.
    #[must_use]
    pub const fn major_units(self) -> i64 {
        self.0 / MINOR_UNITS_PER_MAJOR
    }
}

impl FromStr for Price {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidPrice(s.to_string());

        let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        if fraction.len() > 2 {
            return Err(ValidationError::TooManyDecimals(s.to_string()));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        whole
            .checked_mul(MINOR_UNITS_PER_MAJOR)
            .and_then(|v| v.checked_add(cents))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.major_units(),
            self.0 % MINOR_UNITS_PER_MAJOR
        )
    }
}

impl TryFrom<i64> for Price {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_minor_units(value)
    }
}

impl From<Price> for i64 {
    fn from(price: Price) -> Self {
        price.0
    }
}
