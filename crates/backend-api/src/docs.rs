use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::auth::sign_up,
        crate::routes::auth::sign_in,
        crate::routes::auth::verify_code,
        crate::routes::auth::check_username,
        crate::routes::messages::send_message,
        crate::routes::messages::check_accepting,
        crate::routes::messages::get_messages,
        crate::routes::messages::delete_message,
        crate::routes::accept::get_accept_messages,
        crate::routes::accept::set_accept_messages
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::routes::health::HealthResponse,
            crate::routes::models::ApiStatusResponse,
            crate::routes::models::ApiMessage,
            crate::routes::auth::SignUpRequest,
            crate::routes::auth::SignInRequest,
            crate::routes::auth::SignInResponse,
            crate::routes::auth::VerifyCodeRequest,
            crate::routes::messages::SendMessageRequest,
            crate::routes::messages::AcceptingResponse,
            crate::routes::messages::MessagesResponse,
            crate::routes::accept::UpdateAcceptanceRequest,
            crate::routes::accept::AcceptanceResponse,
            crate::routes::accept::AcceptanceUpdatedResponse
        )
    ),
    tags(
        (name = "Health", description = "Service health endpoints"),
        (name = "Auth", description = "Registration, verification and sessions"),
        (name = "Messages", description = "Anonymous message ingestion and dashboard access"),
        (name = "Acceptance", description = "Per-profile message acceptance flag")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let schemes = &mut components.security_schemes;

        let mut scheme = SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer));
        if let SecurityScheme::Http(http) = &mut scheme {
            http.bearer_format = Some("Bearer".to_string());
        }

        schemes.insert("bearerAuth".to_string(), scheme);
    }
}
