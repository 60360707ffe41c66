//! Command-level errors and their replies.

use bazaar_core::ValidationError;
use bazaar_store::RepositoryError;

/// Why a command could not be carried out.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Wrong number of arguments for the command.
    #[error("invalid number of arguments")]
    InvalidArguments,

    /// The command name is not recognised.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The username is not registered.
    #[error("unknown user")]
    UnknownUser,

    /// An argument failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store failed.
    #[error("store failure: {0}")]
    Store(RepositoryError),
}

impl DispatchError {
    /// The line printed for this error.
    #[must_use]
    pub const fn reply(&self) -> &'static str {
        match self {
            Self::InvalidArguments => "Error - invalid number of arguments",
            Self::UnknownCommand(_) => "Unknown command",
            Self::UnknownUser => "Error - unknown user",
            Self::Validation(e) if e.is_price() => "Error - invalid price",
            Self::Validation(ValidationError::InvalidSortKey(_)) => "Error - invalid sort key",
            Self::Validation(ValidationError::InvalidSortOrder(_)) => "Error - invalid sort order",
            Self::Validation(_) => "Error - invalid input",
            Self::Store(_) => "Error - internal server error",
        }
    }
}

impl From<RepositoryError> for DispatchError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Validation(e) => Self::Validation(e),
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_store::TableError;

    #[test]
    fn replies() {
        assert_eq!(
            DispatchError::from(ValidationError::TooManyDecimals("1.234".into())).reply(),
            "Error - invalid price"
        );
        assert_eq!(
            DispatchError::from(ValidationError::InvalidPrice("-1".into())).reply(),
            "Error - invalid price"
        );
        assert_eq!(
            DispatchError::from(ValidationError::EmptyField { field: "title" }).reply(),
            "Error - invalid input"
        );
        assert_eq!(
            DispatchError::from(RepositoryError::Store(TableError::Backend("down".into())))
                .reply(),
            "Error - internal server error"
        );
    }

    #[test]
    fn repository_validation_stays_validation() {
        let err = DispatchError::from(RepositoryError::Validation(
            ValidationError::InvalidListingId("100xxx".into()),
        ));
        assert!(matches!(err, DispatchError::Validation(_)));
    }
}
