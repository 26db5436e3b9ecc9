use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;
use whisperwall_auth::AuthError;
use whisperwall_database::AccountError;

/// Error envelope shared by every endpoint: `success` is always false.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            success: false,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        error!(error = ?error, "internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        let (status, message) = match &error {
            AuthError::UsernameTaken => (StatusCode::CONFLICT, "Username is already taken".into()),
            AuthError::EmailTaken => (StatusCode::CONFLICT, "Email is already registered".into()),
            AuthError::AccountNotFound => (StatusCode::NOT_FOUND, "User not found".into()),
            AuthError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".into())
            }
            AuthError::AccountNotVerified => (
                StatusCode::FORBIDDEN,
                "Please verify your account before signing in".into(),
            ),
            AuthError::CodeExpired => (
                StatusCode::BAD_REQUEST,
                "Verification code has expired, please sign up again to get a new code".into(),
            ),
            AuthError::InvalidCode => (StatusCode::BAD_REQUEST, "Incorrect verification code".into()),
            AuthError::SessionNotFound | AuthError::SessionExpired | AuthError::InvalidSession => {
                (StatusCode::UNAUTHORIZED, error.to_string())
            }
            AuthError::InvalidExpiry | AuthError::Database(_) | AuthError::PasswordHash(_) => {
                error!(error = ?error, "auth error");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
            }
        };
        Self::new(status, message)
    }
}

impl From<AccountError> for ApiError {
    fn from(error: AccountError) -> Self {
        let (status, message) = match &error {
            AccountError::NotFound => (StatusCode::NOT_FOUND, "User not found".into()),
            AccountError::MessageNotFound => (
                StatusCode::NOT_FOUND,
                "Message not found or already deleted".into(),
            ),
            AccountError::UsernameTaken => {
                (StatusCode::CONFLICT, "Username is already taken".into())
            }
            AccountError::EmailTaken => {
                (StatusCode::CONFLICT, "Email is already registered".into())
            }
            AccountError::CorruptMessageList(_) | AccountError::DatabaseError(_) => {
                error!(error = ?error, "store error");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
            }
        };
        Self::new(status, message)
    }
}
