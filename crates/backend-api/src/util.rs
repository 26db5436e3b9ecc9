use axum::http::{header::AUTHORIZATION, HeaderMap};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ApiError;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{3,30}$").expect("username regex"));

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));

pub fn require_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

    let mut parts = value.split_whitespace();
    let scheme = parts.next().unwrap_or("");
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(ApiError::unauthorized("invalid authorization scheme"));
    }

    let token = parts.next().unwrap_or("");
    if token.is_empty() {
        return Err(ApiError::unauthorized("missing bearer token"));
    }

    Ok(token.to_string())
}

pub fn validate_username(username: &str) -> Result<(), ApiError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(ApiError::bad_request(
            "Username must be 3-30 characters using letters, numbers, underscores or hyphens",
        ))
    }
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ApiError::bad_request("Invalid email address"))
    }
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() >= 8 {
        Ok(())
    } else {
        Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ))
    }
}

pub fn validate_message_content(content: &str) -> Result<(), ApiError> {
    let length = content.chars().count();
    if (6..=300).contains(&length) {
        Ok(())
    } else {
        Err(ApiError::bad_request(
            "Content must be between 6 and 300 characters",
        ))
    }
}

/// Message identifiers are short alphanumeric strings generated at insert
/// time; anything else is rejected before touching the store.
pub fn validate_message_id(id: &str) -> Result<(), ApiError> {
    if !id.is_empty() && id.len() <= 64 && id.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(ApiError::bad_request("Invalid message identifier"))
    }
}
