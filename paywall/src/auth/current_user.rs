use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    config::Config,
    errors::{Error, Result},
};
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use tracing::{debug, instrument, trace};

/// Extract user from the JWT session cookie if present and valid
/// Returns:
/// - None: No session cookie present
/// - Some(Ok(user)): Valid JWT found and verified
/// - Some(Err(error)): Session cookie present but invalid or expired
#[instrument(skip(parts, config))]
fn try_jwt_session_auth(parts: &Parts, config: &Config) -> Option<Result<CurrentUser>> {
    let cookie_header = parts.headers.get(header::COOKIE)?;

    let cookie_str = match cookie_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid cookie header: {e}"),
            }));
        }
    };
    let cookie_name = &config.auth.native.session.cookie_name;

    let mut last_error = None;
    for cookie in cookie_str.split(';') {
        if let Some((name, value)) = cookie.trim().split_once('=')
            && name == cookie_name
        {
            match session::verify_session_token(value, config) {
                Ok(user) => return Some(Ok(user)),
                // A stale cookie may sit next to a fresh one
                Err(e) => last_error = Some(e),
            }
        }
    }
    last_error.map(Err)
}

/// Extract user from an `Authorization: Bearer <session token>` header
#[instrument(skip(parts, config))]
fn try_bearer_auth(parts: &Parts, config: &Config) -> Option<Result<CurrentUser>> {
    let auth_header = parts.headers.get(header::AUTHORIZATION)?;

    let value = match auth_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid authorization header: {e}"),
            }));
        }
    };
    let token = value.strip_prefix("Bearer ")?;

    Some(session::verify_session_token(token.trim(), config))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        if !state.config.auth.native.enabled {
            trace!("Native authentication disabled");
            return Err(Error::Unauthenticated { message: None });
        }

        let mut auth_errors = Vec::new();

        for (method, attempt) in [
            ("Bearer token", try_bearer_auth(parts, &state.config)),
            ("JWT session", try_jwt_session_auth(parts, &state.config)),
        ] {
            match attempt {
                Some(Ok(user)) => {
                    debug!("Found {} authenticated user: {}", method, user.id);
                    return Ok(user);
                }
                Some(Err(e)) => {
                    trace!("{} authentication failed: {:?}", method, e);
                    auth_errors.push((method, e));
                }
                None => trace!("No {} authentication attempted", method),
            }
        }

        if auth_errors.is_empty() {
            trace!("No authentication credentials found in request");
        } else {
            trace!("All authentication attempts failed ({}): {:?}", auth_errors.len(), auth_errors);
        }
        Err(Error::Unauthenticated { message: None })
    }
}

/// Anonymous callers become `None` rather than a rejection.
///
/// Invalid or expired credentials are also treated as anonymous, so gated endpoints can answer
/// with their own denial.
impl OptionalFromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Option<Self>> {
        match <CurrentUser as FromRequestParts<AppState>>::from_request_parts(parts, state).await {
            Ok(user) => Ok(Some(user)),
            Err(Error::Unauthenticated { .. }) | Err(Error::BadRequest { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
