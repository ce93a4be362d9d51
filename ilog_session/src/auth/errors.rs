use thiserror::Error;

use crate::session::SessionError;
use crate::storage::StorageError;
use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum AuthError {
    /// Unknown user, unconfirmed user or wrong password. Deliberately vague.
    #[error("Unauthorized login")]
    Unauthorized,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Cookie error: {0}")]
    Cookie(String),
}

impl From<UtilError> for AuthError {
    fn from(err: UtilError) -> Self {
        Self::Crypto(err.to_string())
    }
}
