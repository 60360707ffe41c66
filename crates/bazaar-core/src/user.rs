//! Marketplace users.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A registered user. Users are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    /// The unique username.
    pub username: String,
}

impl User {
    /// Create a user record.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyField` for an empty username.
    pub fn new(username: impl Into<String>) -> Result<Self> {
        let username = username.into();
        crate::require_non_empty("username", &username)?;
        Ok(Self { username })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValidationError;

    #[test]
    fn empty_username_rejected() {
        assert_eq!(
            User::new(""),
            Err(ValidationError::EmptyField { field: "username" })
        );
    }

    #[test]
    fn username_kept_verbatim() {
        assert_eq!(User::new("alice").unwrap().username, "alice");
    }
}
