//! Authentication API endpoints

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::AppState;
use crate::api::extractors::{AuthContext, ValidatedJson};
use crate::api::types::ApiError;
use crate::auth::{AuthError, Credentials, Resolved, SessionToken};
use crate::core::config::TrustMode;
use crate::core::constants::{LOGIN_MAX_LEN, SESSION_COOKIE_NAME};
use crate::data::UserRow;

/// `validator` length bounds are `u64`; same value as `LOGIN_MAX_LEN`.
const LOGIN_MAX_LEN_U64: u64 = LOGIN_MAX_LEN as u64;

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = LOGIN_MAX_LEN_U64, message = "Login must be 1-200 characters"))]
    pub login: String,
    #[validate(length(min = 1, max = 1024, message = "Password must be 1-1024 characters"))]
    pub password: String,
}

/// User info in auth responses
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: String,
    pub login: String,
    pub email: Option<String>,
    pub realname: Option<String>,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_project: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    pub trust_mode: TrustMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserDto>,
}

/// Create auth routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/status", get(auth_status))
        .route("/logout", post(logout))
}

/// Authenticate with login and password (directory and local trust modes)
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AuthContext(request): AuthContext,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<AuthStatusResponse>), ApiError> {
    let trust_mode = state.resolver.trust_mode();
    if !matches!(trust_mode, TrustMode::Directory | TrustMode::Local) {
        return Err(ApiError::bad_request(
            "LOGIN_NOT_SUPPORTED",
            format!("Password login is not available in {} trust mode", trust_mode),
        ));
    }

    let request = request.with_credentials(Credentials::new(body.login, body.password));
    let resolved = state.resolver.resolve(&request).await?;
    Ok(respond(&state, jar, resolved).await)
}

/// Current authentication state
///
/// In proxy mode this is where identity headers turn into a session.
pub async fn auth_status(
    State(state): State<AppState>,
    jar: CookieJar,
    AuthContext(request): AuthContext,
) -> Result<(CookieJar, Json<AuthStatusResponse>), ApiError> {
    match state.resolver.resolve(&request).await {
        Ok(resolved) => Ok(respond(&state, jar, resolved).await),
        Err(AuthError::Unauthenticated) => {
            // Drop a cookie that no longer maps to a session
            let jar = if request.session_token.is_some() {
                jar.remove(session_cookie(String::new(), time::Duration::ZERO))
            } else {
                jar
            };
            Ok((
                jar,
                Json(AuthStatusResponse {
                    authenticated: false,
                    trust_mode: state.resolver.trust_mode(),
                    expires_at: None,
                    user: None,
                }),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

/// Logout - end the session and clear the cookie
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    AuthContext(request): AuthContext,
) -> Result<(CookieJar, Json<serde_json::Value>), ApiError> {
    state.resolver.logout(&request).await?;

    Ok((
        jar.remove(session_cookie(String::new(), time::Duration::ZERO)),
        Json(serde_json::json!({
            "success": true,
            "message": "Logged out successfully"
        })),
    ))
}

async fn respond(
    state: &AppState,
    jar: CookieJar,
    resolved: Resolved,
) -> (CookieJar, Json<AuthStatusResponse>) {
    let Resolved { user, token } = resolved;

    let (jar, expires_at) = match token {
        Some(SessionToken { value, expires_at }) => {
            let max_age = time::Duration::seconds(state.resolver.sessions().ttl().num_seconds());
            (
                jar.add(session_cookie(value, max_age)),
                DateTime::from_timestamp(expires_at, 0),
            )
        }
        None => (jar, None),
    };

    let user = user_dto(state, user).await;
    (
        jar,
        Json(AuthStatusResponse {
            authenticated: true,
            trust_mode: state.resolver.trust_mode(),
            expires_at,
            user: Some(user),
        }),
    )
}

async fn user_dto(state: &AppState, user: UserRow) -> UserDto {
    let home_project = match state.users.find_home_project(&user.login).await {
        Ok(project) => project.map(|p| p.name),
        Err(e) => {
            tracing::warn!(login = %user.login, error = %e, "Failed to look up home project");
            None
        }
    };

    UserDto {
        id: user.id,
        login: user.login,
        email: user.email,
        realname: user.realname,
        is_admin: user.is_admin,
        home_project,
    }
}

fn session_cookie(value: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, value))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/api")
        .max_age(max_age)
        .build()
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
