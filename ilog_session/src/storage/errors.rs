use thiserror::Error;

/// Failures raised by the data layer.
///
/// Everything sqlx can throw at us is normalized into [`StorageError::Database`]
/// so nothing above the unit-of-work boundary needs to know sqlx error types.
#[derive(Debug, Error, Clone)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Json conversion(Serde) error: {0}")]
    Serde(String),

    #[error("No unit of work is attached")]
    Detached,
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

/// Error channel of [`with_unit_of_work`](super::with_unit_of_work).
///
/// `Data` failures were rolled back by the wrapper. `Operation` carries the
/// wrapped operation's own error untouched.
#[derive(Debug, Error)]
pub enum UnitOfWorkError<E> {
    #[error(transparent)]
    Data(StorageError),

    #[error("{0}")]
    Operation(E),
}

impl<E> From<StorageError> for UnitOfWorkError<E> {
    fn from(err: StorageError) -> Self {
        Self::Data(err)
    }
}

impl<E> From<sqlx::Error> for UnitOfWorkError<E> {
    fn from(err: sqlx::Error) -> Self {
        Self::Data(err.into())
    }
}

impl<E> UnitOfWorkError<E>
where
    E: From<StorageError>,
{
    /// Collapse both channels into the caller's error type.
    pub fn flatten(self) -> E {
        match self {
            Self::Data(err) => E::from(err),
            Self::Operation(err) => err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum CallerError {
        Storage(String),
        Denied,
    }

    impl From<StorageError> for CallerError {
        fn from(err: StorageError) -> Self {
            CallerError::Storage(err.to_string())
        }
    }

    #[test]
    fn test_storage_error_display() {
        let error = StorageError::Database("Connection failed".to_string());
        assert_eq!(error.to_string(), "Database error: Connection failed");
    }

    #[test]
    fn test_from_sqlx_error() {
        // Given a sqlx error
        let sqlx_error = sqlx::Error::RowNotFound;

        // When converting to StorageError
        let storage_error = StorageError::from(sqlx_error);

        // Then it should be a Database variant
        assert!(matches!(storage_error, StorageError::Database(_)));
    }

    #[test]
    fn test_from_serde_error() {
        let serde_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        match StorageError::from(serde_error) {
            StorageError::Serde(msg) => assert!(msg.contains("expected value")),
            other => panic!("Expected Serde variant, got {other:?}"),
        }
    }

    #[test]
    fn test_flatten_data_error() {
        let error: UnitOfWorkError<CallerError> =
            UnitOfWorkError::Data(StorageError::Database("boom".to_string()));
        assert_eq!(
            error.flatten(),
            CallerError::Storage("Database error: boom".to_string())
        );
    }

    #[test]
    fn test_flatten_operation_error_is_unchanged() {
        let error: UnitOfWorkError<CallerError> = UnitOfWorkError::Operation(CallerError::Denied);
        assert_eq!(error.flatten(), CallerError::Denied);
    }

    #[test]
    fn test_error_is_sync_and_send() {
        fn assert_sync_send<T: Sync + Send>() {}
        assert_sync_send::<StorageError>();
    }
}
