//! Response types shared across routes.

use serde::Serialize;
use utoipa::ToSchema;
use whisperwall_database::Message;

/// Generic success envelope for operations with no payload beyond a note.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiStatusResponse {
    pub success: bool,
    pub message: String,
}

impl ApiStatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// A message as the dashboard sees it. Field names follow the stored
/// document shape so existing clients keep working.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl From<Message> for ApiMessage {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            content: message.content,
            created_at: message.created_at.to_rfc3339(),
        }
    }
}
