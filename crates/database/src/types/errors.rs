//! Error types for the account store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account not found")]
    NotFound,

    #[error("message not found")]
    MessageNotFound,

    #[error("username already taken")]
    UsernameTaken,

    #[error("email already registered")]
    EmailTaken,

    #[error("stored message list is corrupt: {0}")]
    CorruptMessageList(String),

    #[error("database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for AccountError {
    fn from(error: sqlx::Error) -> Self {
        AccountError::DatabaseError(error.to_string())
    }
}
