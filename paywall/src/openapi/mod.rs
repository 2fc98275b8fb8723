//! OpenAPI documentation for the HTTP API, rendered at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

/// Session cookie and bearer token schemes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session token issued at login, sent in the `Authorization` header:\n\n\
                            ```\nAuthorization: Bearer YOUR_SESSION_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
            components.security_schemes.insert(
                "CookieAuth".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "paywall_session",
                    "Session cookie set by `POST /authentication/login`",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Paywall API",
        description = "Strategy catalogue with subscription-gated detail views. \
            Curious plans may open a limited number of distinct strategies per UTC month; \
            Active, Quant and admin accounts are unmetered."
    ),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::strategies::list_strategies,
        api::handlers::strategies::get_strategy,
        api::handlers::strategies::create_strategy,
        api::handlers::strategies::update_strategy,
        api::handlers::strategies::delete_strategy,
        api::handlers::users::list_users,
        api::handlers::users::create_user,
        api::handlers::users::get_user,
        api::handlers::users::update_user,
        api::handlers::users::delete_user,
        api::handlers::usage::get_current_usage,
        api::handlers::saved_strategies::list_saved_strategies,
        api::handlers::saved_strategies::save_strategy,
        api::handlers::saved_strategies::remove_saved_strategy,
        api::handlers::payments::webhook_handler,
    ),
    components(
        schemas(
            api::models::auth::LoginRequest,
            api::models::auth::AuthResponse,
            api::models::auth::AuthSuccessResponse,
            api::models::strategies::StrategySummary,
            api::models::strategies::StrategyResponse,
            api::models::strategies::StrategyCreate,
            api::models::strategies::StrategyUpdate,
            api::models::users::AccountResponse,
            api::models::users::AccountCreate,
            api::models::users::AccountUpdate,
            api::models::usage::UsageResponse,
            crate::entitlements::Tier,
        )
    ),
    tags(
        (name = "authentication", description = "Session login and logout"),
        (name = "strategies", description = "Strategy catalogue. Listing is public; detail views are gated by plan."),
        (name = "users", description = "Accounts and the caller's monthly usage"),
        (name = "saved strategies", description = "Per-account bookmarks"),
        (name = "payments", description = "Subscription webhooks from the payment processor"),
    )
)]
pub struct ApiDoc;
