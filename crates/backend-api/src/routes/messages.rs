//! Anonymous message ingestion, retrieval and deletion.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use whisperwall_database::Message;

use crate::extract::ApiJson;
use crate::routes::models::{ApiMessage, ApiStatusResponse};
use crate::util::{require_bearer, validate_message_content, validate_message_id};
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub username: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckAcceptingQuery {
    pub username: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AcceptingResponse {
    pub success: bool,
    #[serde(rename = "isAcceptingMessages")]
    pub is_accepting_messages: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessagesResponse {
    pub success: bool,
    pub messages: Vec<ApiMessage>,
}

#[utoipa::path(
    post,
    path = "/send-message",
    tag = "Messages",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Message appended", body = ApiStatusResponse),
        (status = 400, description = "Content out of bounds", body = crate::error::ErrorResponse),
        (status = 403, description = "Target is not accepting messages", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown username", body = crate::error::ErrorResponse)
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SendMessageRequest>,
) -> Result<Json<ApiStatusResponse>, ApiError> {
    validate_message_content(&payload.content)?;

    let account = state
        .accounts()
        .find_by_username(&payload.username)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !account.is_accepting_messages {
        return Err(ApiError::forbidden("User is not accepting messages"));
    }

    let message = Message::new(payload.content);
    state.messages().append(account.id, &message).await?;

    Ok(Json(ApiStatusResponse::ok("Message sent successfully")))
}

/// Public pre-flight used by the visitor form to grey out the submit button.
#[utoipa::path(
    get,
    path = "/send-message",
    tag = "Messages",
    params(
        ("username" = String, Query, description = "Target profile username")
    ),
    responses(
        (status = 200, description = "Current acceptance flag", body = AcceptingResponse),
        (status = 404, description = "Unknown username", body = crate::error::ErrorResponse)
    )
)]
pub async fn check_accepting(
    State(state): State<AppState>,
    Query(query): Query<CheckAcceptingQuery>,
) -> Result<Json<AcceptingResponse>, ApiError> {
    let account = state
        .accounts()
        .find_by_username(&query.username)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(AcceptingResponse {
        success: true,
        is_accepting_messages: account.is_accepting_messages,
    }))
}

#[utoipa::path(
    get,
    path = "/get-messages",
    tag = "Messages",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Messages newest first", body = MessagesResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessagesResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let messages = state.messages().list_newest_first(user.id).await?;

    Ok(Json(MessagesResponse {
        success: true,
        messages: messages.into_iter().map(ApiMessage::from).collect(),
    }))
}

#[utoipa::path(
    delete,
    path = "/delete-message/{message_id}",
    tag = "Messages",
    security(("bearerAuth" = [])),
    params(
        ("message_id" = String, Path, description = "Identifier of the message to delete")
    ),
    responses(
        (status = 200, description = "Message deleted", body = ApiStatusResponse),
        (status = 400, description = "Malformed identifier", body = crate::error::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 404, description = "Message not found or already deleted", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(message_id): Path<String>,
) -> Result<Json<ApiStatusResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;
    validate_message_id(&message_id)?;

    state.messages().remove(user.id, &message_id).await?;

    Ok(Json(ApiStatusResponse::ok("Message deleted")))
}
