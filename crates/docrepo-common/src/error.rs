//! Error types for docrepo

use thiserror::Error;

/// Result type alias for docrepo operations
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Server error code for a unique index violation
#[cfg(feature = "mongodb-errors")]
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Unified error type for all repository operations
///
/// Errors raised by the MongoDB driver are carried unchanged in
/// [`RepositoryError::Driver`]; the remaining variants cover what the
/// repository layer itself can reject.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Error returned by the MongoDB driver, untouched
    #[cfg(feature = "mongodb-errors")]
    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation's cancellation token fired before the driver answered
    #[error("Operation cancelled")]
    Cancelled,
}

impl RepositoryError {
    /// Returns true if the operation was cancelled through its token
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RepositoryError::Cancelled)
    }

    /// Returns true if the driver rejected a write because of a unique index
    #[cfg(feature = "mongodb-errors")]
    pub fn is_duplicate_key(&self) -> bool {
        use mongodb::error::{ErrorKind, WriteFailure};

        let RepositoryError::Driver(err) = self else {
            return false;
        };

        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
                write_error.code == DUPLICATE_KEY_CODE
            }
            ErrorKind::InsertMany(insert_error) => insert_error
                .write_errors
                .as_ref()
                .is_some_and(|errors| errors.iter().any(|e| e.code == DUPLICATE_KEY_CODE)),
            ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
            _ => false,
        }
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::ser::Error> for RepositoryError {
    fn from(err: bson::ser::Error) -> Self {
        RepositoryError::Serialization(format!("BSON serialization error: {}", err))
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::de::Error> for RepositoryError {
    fn from(err: bson::de::Error) -> Self {
        RepositoryError::Deserialization(format!("BSON deserialization error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_serialization() {
        let err = RepositoryError::Serialization("invalid key".to_string());
        assert_eq!(err.to_string(), "Serialization error: invalid key");
    }

    #[test]
    fn test_error_display_deserialization() {
        let err = RepositoryError::Deserialization("missing field".to_string());
        assert_eq!(err.to_string(), "Deserialization error: missing field");
    }

    #[test]
    fn test_error_display_connection() {
        let err = RepositoryError::Connection("timeout".to_string());
        assert_eq!(err.to_string(), "Connection error: timeout");
    }

    #[test]
    fn test_error_display_validation() {
        let err = RepositoryError::Validation("bad collection".to_string());
        assert_eq!(err.to_string(), "Validation error: bad collection");
    }

    #[test]
    fn test_error_display_cancelled() {
        assert_eq!(RepositoryError::Cancelled.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(RepositoryError::Cancelled.is_cancelled());
        assert!(!RepositoryError::Validation("test".to_string()).is_cancelled());
    }

    #[test]
    fn test_result_type_err() {
        let result: Result<i32> = Err(RepositoryError::Cancelled);
        assert!(result.is_err());
    }

    #[cfg(feature = "mongodb-errors")]
    #[test]
    fn test_driver_error_passes_through() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let driver: mongodb::error::Error = io.into();
        let expected = driver.to_string();

        let err: RepositoryError = driver.into();
        assert_eq!(err.to_string(), expected);
        assert!(!err.is_duplicate_key());
    }

    #[cfg(feature = "mongodb-errors")]
    #[test]
    fn test_from_bson_de_error() {
        let de_err = bson::from_document::<i32>(bson::doc! { "a": 1 }).unwrap_err();
        let err: RepositoryError = de_err.into();
        assert!(matches!(err, RepositoryError::Deserialization(_)));
        assert!(!err.is_duplicate_key());
    }
}
