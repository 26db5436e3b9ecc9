//! Sign-up, sign-in, verification and username availability.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::extract::ApiJson;
use crate::routes::models::ApiStatusResponse;
use crate::util::{validate_email, validate_password, validate_username};
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignInRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignInResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub username: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyCodeRequest {
    pub username: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckUsernameQuery {
    pub username: String,
}

#[utoipa::path(
    post,
    path = "/sign-up",
    tag = "Auth",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "Account registered, verification pending", body = ApiStatusResponse),
        (status = 400, description = "Invalid username, email or password", body = crate::error::ErrorResponse),
        (status = 409, description = "Username or email already taken", body = crate::error::ErrorResponse)
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignUpRequest>,
) -> Result<Json<ApiStatusResponse>, ApiError> {
    validate_username(&payload.username)?;
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;

    state
        .authenticator()
        .register(&payload.username, &payload.email, &payload.password)
        .await?;

    Ok(Json(ApiStatusResponse::ok(
        "User registered successfully. Please verify your account.",
    )))
}

#[utoipa::path(
    post,
    path = "/sign-in",
    tag = "Auth",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Session issued", body = SignInResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse),
        (status = 403, description = "Account not verified", body = crate::error::ErrorResponse)
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignInRequest>,
) -> Result<Json<SignInResponse>, ApiError> {
    let (user, session) = state
        .authenticator()
        .login(&payload.identifier, &payload.password)
        .await?;

    Ok(Json(SignInResponse {
        success: true,
        message: "Signed in successfully".to_string(),
        token: session.token,
        username: user.username,
    }))
}

#[utoipa::path(
    post,
    path = "/verify-code",
    tag = "Auth",
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Account verified", body = ApiStatusResponse),
        (status = 400, description = "Incorrect or expired code", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn verify_code(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<VerifyCodeRequest>,
) -> Result<Json<ApiStatusResponse>, ApiError> {
    state
        .authenticator()
        .verify_account(&payload.username, &payload.code)
        .await?;

    Ok(Json(ApiStatusResponse::ok("Account verified successfully")))
}

#[utoipa::path(
    get,
    path = "/check-username",
    tag = "Auth",
    params(
        ("username" = String, Query, description = "Username to check")
    ),
    responses(
        (status = 200, description = "Username is available", body = ApiStatusResponse),
        (status = 400, description = "Malformed username", body = crate::error::ErrorResponse),
        (status = 409, description = "Username is taken", body = crate::error::ErrorResponse)
    )
)]
pub async fn check_username(
    State(state): State<AppState>,
    Query(query): Query<CheckUsernameQuery>,
) -> Result<Json<ApiStatusResponse>, ApiError> {
    validate_username(&query.username)?;

    if state
        .accounts()
        .is_verified_username_taken(&query.username)
        .await?
    {
        return Err(ApiError::conflict("Username is already taken"));
    }

    Ok(Json(ApiStatusResponse::ok("Username is available")))
}
