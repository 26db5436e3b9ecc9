//! Anonymous message embedded in an account's message list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single anonymous message. Lives only inside the owning account's
/// `messages` JSON array; the identifier is unique within that list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Construct a new message with a freshly generated identifier and the
    /// current timestamp.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: cuid2::create_id(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}
