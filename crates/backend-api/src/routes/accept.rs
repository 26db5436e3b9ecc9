//! The acceptance flag gating message ingestion.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::extract::ApiJson;
use crate::util::require_bearer;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct AcceptMessagesQuery {
    pub username: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAcceptanceRequest {
    #[serde(rename = "acceptMessages")]
    pub accept_messages: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AcceptanceResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(rename = "isAcceptingMessages")]
    pub is_accepting_messages: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AcceptanceUpdatedResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "isAcceptingMessages")]
    pub is_accepting_messages: bool,
}

/// Owner reads their own flag; with `?username=` any visitor may read the
/// flag of a named profile without a session.
#[utoipa::path(
    get,
    path = "/accept-messages",
    tag = "Acceptance",
    security(("bearerAuth" = [])),
    params(
        ("username" = Option<String>, Query, description = "Read another profile's flag without a session")
    ),
    responses(
        (status = 200, description = "Current acceptance flag", body = AcceptanceResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown username", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_accept_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AcceptMessagesQuery>,
) -> Result<Json<AcceptanceResponse>, ApiError> {
    if let Some(username) = query.username {
        let account = state
            .accounts()
            .find_by_username(&username)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        return Ok(Json(AcceptanceResponse {
            success: true,
            username: Some(account.username),
            is_accepting_messages: account.is_accepting_messages,
        }));
    }

    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let account = state
        .accounts()
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(AcceptanceResponse {
        success: true,
        username: None,
        is_accepting_messages: account.is_accepting_messages,
    }))
}

#[utoipa::path(
    post,
    path = "/accept-messages",
    tag = "Acceptance",
    security(("bearerAuth" = [])),
    request_body = UpdateAcceptanceRequest,
    responses(
        (status = 200, description = "Flag updated", body = AcceptanceUpdatedResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn set_accept_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<UpdateAcceptanceRequest>,
) -> Result<Json<AcceptanceUpdatedResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let value = state
        .accounts()
        .set_accepting(user.id, payload.accept_messages)
        .await?;

    Ok(Json(AcceptanceUpdatedResponse {
        success: true,
        message: "Message acceptance status updated successfully".to_string(),
        is_accepting_messages: value,
    }))
}
