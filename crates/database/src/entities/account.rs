//! Account entity and creation request.

use serde::{Deserialize, Serialize};

use crate::entities::message::Message;
use crate::types::AccountError;

/// A registered account. Owns its embedded message list exclusively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub verify_code: String,
    pub verify_code_expiry: String,
    pub is_verified: bool,
    pub is_accepting_messages: bool,
    pub messages: Vec<Message>,
    pub created_at: String,
}

/// Fields required to create a new account row.
#[derive(Debug, Clone)]
pub struct CreateAccountRequest {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub verify_code: String,
    pub verify_code_expiry: String,
}

/// Parse the raw JSON column into a message list, dropping null placeholder
/// entries the store may have left behind.
pub(crate) fn parse_message_list(raw: &str) -> Result<Vec<Message>, AccountError> {
    let entries: Vec<Option<Message>> = serde_json::from_str(raw)
        .map_err(|e| AccountError::CorruptMessageList(e.to_string()))?;
    Ok(entries.into_iter().flatten().collect())
}
