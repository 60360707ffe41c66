//! Attribute-level item model shared by every backend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, TableError};
use crate::schema::attr;

/// A single attribute value. The table only uses numbers and strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AttrValue {
    /// Number.
    N(i64),
    /// String.
    S(String),
}

impl AttrValue {
    /// The numeric value, if this is a number.
    #[must_use]
    pub const fn as_n(&self) -> Option<i64> {
        match self {
            Self::N(n) => Some(*n),
            Self::S(_) => None,
        }
    }

    /// The string value, if this is a string.
    #[must_use]
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            Self::N(_) => None,
        }
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::N(value)
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::S(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::S(value.to_string())
    }
}

/// Primary key: `(ListingId, Username)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key {
    /// `ListingId` value.
    pub partition: i64,
    /// `Username` value.
    pub sort: String,
}

impl Key {
    /// Build a key.
    #[must_use]
    pub fn new(partition: i64, sort: impl Into<String>) -> Self {
        Self {
            partition,
            sort: sort.into(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.partition, self.sort)
    }
}

/// A stored item: attribute name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(BTreeMap<String, AttrValue>);

impl Item {
    /// An item holding only the key attributes.
    #[must_use]
    pub fn from_key(key: &Key) -> Self {
        Self::default()
            .with(attr::LISTING_ID, key.partition)
            .with(attr::USERNAME, key.sort.as_str())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set an attribute, replacing any previous value.
    pub fn insert(&mut self, name: &str, value: impl Into<AttrValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    /// Look up an attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.get(name)
    }

    /// Iterate attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.0.iter()
    }

    /// The primary key of this item.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Decode` if either key attribute is missing or
    /// has the wrong type.
    pub fn key(&self) -> Result<Key> {
        let partition = self
            .get(attr::LISTING_ID)
            .and_then(AttrValue::as_n)
            .ok_or_else(|| self.decode_error(format!("missing number {}", attr::LISTING_ID)))?;
        let sort = self
            .get(attr::USERNAME)
            .and_then(AttrValue::as_s)
            .ok_or_else(|| self.decode_error(format!("missing string {}", attr::USERNAME)))?;
        Ok(Key::new(partition, sort))
    }

    /// A required number attribute.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Decode` if it is missing or not a number.
    pub fn n(&self, name: &str) -> Result<i64> {
        self.get(name)
            .and_then(AttrValue::as_n)
            .ok_or_else(|| self.decode_error(format!("missing number {name}")))
    }

    /// A required string attribute.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Decode` if it is missing or not a string.
    pub fn s(&self, name: &str) -> Result<&str> {
        self.get(name)
            .and_then(AttrValue::as_s)
            .ok_or_else(|| self.decode_error(format!("missing string {name}")))
    }

    /// A decode error tagged with this item's key (as far as it is readable).
    #[must_use]
    pub fn decode_error(&self, message: impl Into<String>) -> TableError {
        let key = match (
            self.get(attr::LISTING_ID).and_then(AttrValue::as_n),
            self.get(attr::USERNAME).and_then(AttrValue::as_s),
        ) {
            (Some(p), Some(s)) => Key::new(p, s).to_string(),
            _ => serde_json::to_string(self).unwrap_or_else(|_| "<unreadable>".to_string()),
        };
        TableError::Decode {
            key,
            message: message.into(),
        }
    }
}

impl FromIterator<(String, AttrValue)> for Item {
    fn from_iter<I: IntoIterator<Item = (String, AttrValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
