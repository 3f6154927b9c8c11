//! OpenAPI document for the auth endpoints.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use super::{handlers, types};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "portero",
        description = "Admin authentication service",
    ),
    paths(
        handlers::health::health,
        handlers::login::login,
        handlers::session::verify_session,
        handlers::session::logout,
        handlers::provision::create_admin,
        handlers::two_factor::setup_two_factor,
        handlers::two_factor::verify_two_factor,
    ),
    components(schemas(
        types::LoginRequest,
        types::LoginResponse,
        types::UserSummary,
        types::TwoFactorPrompt,
        types::SessionResponse,
        types::CreateAdminRequest,
        types::AdminSummary,
        types::CreateAdminResponse,
        types::TwoFactorSetupResponse,
        types::TwoFactorVerifyRequest,
        types::OkResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Admin authentication API")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_all_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        for path in [
            "/health",
            "/login",
            "/verify-session",
            "/logout",
            "/create-admin",
            "/setup-2fa",
            "/verify-2fa",
        ] {
            assert!(paths.contains_key(path), "missing path: {path}");
        }
    }

    #[test]
    fn openapi_registers_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
