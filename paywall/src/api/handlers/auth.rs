use crate::api::models::auth::{AuthResponse, AuthSuccessResponse, LoginRequest, LoginResponse, LogoutResponse};
use crate::api::models::users::{AccountResponse, CurrentUser};
use crate::auth::{password, session};
use crate::config::Config;
use crate::db::handlers::Accounts;
use crate::errors::{Error, Result};
use crate::AppState;
use axum::{Json, extract::State};

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    }
}

fn session_cookie(token: &str, max_age_secs: u64, config: &Config) -> String {
    let session_config = &config.auth.native.session;
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        session_config.cookie_name, token, session_config.cookie_same_site, max_age_secs
    );
    if session_config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/authentication/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Native authentication is disabled"),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let account = Accounts::new(&mut conn)
        .get_by_email(request.email.trim())
        .await?
        .ok_or_else(invalid_credentials)?;

    let hash = account.password_hash.clone().ok_or_else(invalid_credentials)?;

    // Argon2 is CPU-bound
    let password = request.password;
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(invalid_credentials());
    }

    let current_user = CurrentUser::from(&account);
    let token = session::create_session_token(&current_user, &state.config)?;
    let cookie = session_cookie(&token, state.config.auth.security.jwt_expiry.as_secs(), &state.config);

    tracing::info!(account_id = %crate::types::abbrev_uuid(&account.id), "Login successful");

    Ok(LoginResponse {
        auth_response: AuthResponse {
            user: AccountResponse::from(account),
            message: "Login successful".to_string(),
        },
        cookie,
    })
}

/// Logout (clear session)
#[utoipa::path(
    post,
    path = "/authentication/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Result<LogoutResponse> {
    Ok(LogoutResponse {
        auth_response: AuthSuccessResponse {
            message: "Logout successful".to_string(),
        },
        cookie: session_cookie("", 0, &state.config),
    })
}
