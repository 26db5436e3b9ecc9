mod docs;
mod error;
mod extract;
mod state;
mod util;

pub mod routes;

pub use error::ApiError;
pub use state::AppState;

use axum::{
    http::header::{AUTHORIZATION, CONTENT_TYPE},
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/sign-up", post(routes::auth::sign_up))
        .route("/sign-in", post(routes::auth::sign_in))
        .route("/verify-code", post(routes::auth::verify_code))
        .route("/check-username", get(routes::auth::check_username))
        .route(
            "/send-message",
            post(routes::messages::send_message).get(routes::messages::check_accepting),
        )
        .route("/get-messages", get(routes::messages::get_messages))
        .route(
            "/delete-message/:message_id",
            delete(routes::messages::delete_message),
        )
        .route(
            "/accept-messages",
            get(routes::accept::get_accept_messages).post(routes::accept::set_accept_messages),
        )
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(state)
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
