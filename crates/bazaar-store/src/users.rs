//! User registration and lookup.

use std::sync::Arc;

use bazaar_core::User;

use crate::error::{RepositoryError, TableError};
use crate::expr::Condition;
use crate::keys;
use crate::record::Record;
use crate::schema::attr;
use crate::Table;

/// Result of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The user was created.
    Registered(User),
    /// The username is taken.
    AlreadyExists,
}

/// Users stored in the `-1` partition.
#[derive(Clone)]
pub struct UserRepository {
    table: Arc<dyn Table>,
}

impl UserRepository {
    /// Create a repository over a table.
    #[must_use]
    pub fn new(table: Arc<dyn Table>) -> Self {
        Self { table }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Validation` for an empty username, or a
    /// store error.
    pub async fn register(&self, username: &str) -> Result<RegisterOutcome, RepositoryError> {
        let user = User::new(username)?;
        let guard = Condition::not_exists(attr::LISTING_ID);

        match self.table.put_item(user.to_item(), Some(guard)).await {
            Ok(()) => {
                tracing::info!(username = %user.username, "User registered");
                Ok(RegisterOutcome::Registered(user))
            }
            Err(TableError::ConditionalCheckFailed) => {
                tracing::debug!(username = %user.username, "User already exists");
                Ok(RegisterOutcome::AlreadyExists)
            }
            Err(e) => {
                tracing::error!(username = %user.username, error = %e, "Failed to register user");
                Err(e.into())
            }
        }
    }

    /// Look up a user by name.
    ///
    /// # Errors
    ///
    /// Returns a store error, including `TableError::Decode` for a corrupt
    /// record.
    pub async fn get_user(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        if username.is_empty() {
            return Ok(None);
        }
        let item = self.table.get_item(&keys::user_key(username)).await?;
        Ok(item.as_ref().map(User::from_item).transpose()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTable;
    use bazaar_core::ValidationError;

    fn repo() -> UserRepository {
        UserRepository::new(Arc::new(MemoryTable::new()))
    }

    #[tokio::test]
    async fn register_then_duplicate() {
        let users = repo();
        assert_eq!(
            users.register("alice").await.unwrap(),
            RegisterOutcome::Registered(User::new("alice").unwrap())
        );
        assert_eq!(
            users.register("alice").await.unwrap(),
            RegisterOutcome::AlreadyExists
        );
    }

    #[tokio::test]
    async fn lookup() {
        let users = repo();
        users.register("alice").await.unwrap();
        assert!(users.get_user("alice").await.unwrap().is_some());
        assert!(users.get_user("bob").await.unwrap().is_none());
        assert!(users.get_user("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_username_is_invalid() {
        assert!(matches!(
            repo().register("").await,
            Err(RepositoryError::Validation(ValidationError::EmptyField { .. }))
        ));
    }
}
