//! Authentication request handlers.
//!
//! Token-minting endpoints return the pair in the body and also set the
//! `kanban_access` / `kanban_refresh` cookies.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum_extra::extract::CookieJar;
use kanban_core::auth::Unauthenticated;
use kanban_core::models::auth::TokenPair;
use tracing::{debug, info};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{Auth, access_token};
use crate::models::{
    LoginRequest, LogoutResponse, RefreshRequest, RegisterRequest, TokenResponse, UserResponse,
};
use crate::services::cookies::{
    REFRESH_COOKIE, access_cookie, clear_access_cookie, clear_refresh_cookie, refresh_cookie,
};

fn with_session_cookies(jar: CookieJar, state: &AppState, pair: &TokenPair) -> CookieJar {
    let secure = state.config.secure_cookies;
    jar.add(access_cookie(&pair.access_token, pair.expires_in, secure))
        .add(refresh_cookie(
            &pair.refresh_token,
            state.sessions.refresh_ttl_secs(),
            secure,
        ))
}

/// Optional JSON body; an empty body reads as the default.
fn optional_body(body: &Bytes) -> AppResult<RefreshRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RefreshRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))
}

/// Refresh token from the body, falling back to the `kanban_refresh` cookie.
fn refresh_token(body: RefreshRequest, jar: &CookieJar) -> Option<String> {
    body.refresh_token
        .filter(|t| !t.is_empty())
        .or_else(|| jar.get(REFRESH_COOKIE).map(|c| c.value().to_owned()))
        .filter(|t| !t.is_empty())
}

/// `POST /auth/register`: create a new user account.
pub async fn register_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, CookieJar, Json<TokenResponse>)> {
    let (user, pair) = state
        .sessions
        .register(
            &body.email,
            &body.password,
            body.display_name.as_deref().unwrap_or_default(),
        )
        .await?;
    info!(user_id = %user.id, role = %user.role, "user registered");
    let jar = with_session_cookies(jar, &state, &pair);
    Ok((
        StatusCode::CREATED,
        jar,
        Json(TokenResponse::new(pair, Some(user.into()))),
    ))
}

/// `POST /auth/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let (user, pair) = state.sessions.login(&body.email, &body.password).await?;
    let jar = with_session_cookies(jar, &state, &pair);
    Ok((jar, Json(TokenResponse::new(pair, Some(user.into())))))
}

/// `POST /auth/refresh`: exchange a refresh token for a new token pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let token = refresh_token(optional_body(&body)?, &jar);
    let pair = state.sessions.refresh(token.as_deref()).await?;
    let jar = with_session_cookies(jar, &state, &pair);
    Ok((jar, Json(TokenResponse::new(pair, None))))
}

/// `POST /auth/logout`: revoke the access token and retire the refresh
/// token, then clear both cookies.
///
/// A body that does not parse is treated as absent; the refresh token then
/// comes from the cookie, if any.
pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<(CookieJar, Json<LogoutResponse>)> {
    let access = access_token(&headers, &jar)
        .ok_or(AppError::Unauthorized(Unauthenticated::MissingToken))?;
    // An unreadable body must not block revoking the access token.
    let body = optional_body(&body).unwrap_or_else(|e| {
        debug!(error = %e, "ignoring unreadable logout body");
        RefreshRequest::default()
    });
    let refresh = refresh_token(body, &jar);
    state.sessions.logout(&access, refresh.as_deref()).await?;

    let secure = state.config.secure_cookies;
    let jar = jar
        .add(clear_access_cookie(secure))
        .add(clear_refresh_cookie(secure));
    Ok((
        jar,
        Json(LogoutResponse {
            success: true,
            sessions_revoked: None,
        }),
    ))
}

/// `POST /auth/logout-all`: retire every refresh token of the caller.
pub async fn logout_all_handler(
    State(state): State<AppState>,
    Auth(principal): Auth,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<LogoutResponse>)> {
    let removed = state.sessions.logout_all(&principal).await?;
    let jar = jar.add(clear_refresh_cookie(state.config.secure_cookies));
    Ok((
        jar,
        Json(LogoutResponse {
            success: true,
            sessions_revoked: Some(removed),
        }),
    ))
}

/// `GET /auth/me`: the current principal, with its stored role.
pub async fn me_handler(Auth(principal): Auth) -> Json<UserResponse> {
    Json(principal.into())
}

#[cfg(test)]
mod tests {
    use axum_extra::extract::cookie::Cookie;

    use super::*;

    #[test]
    fn empty_body_is_default() {
        let body = optional_body(&Bytes::from_static(b"  \n")).unwrap();
        assert!(body.refresh_token.is_none());
    }

    #[test]
    fn malformed_body_is_a_validation_error() {
        assert!(matches!(
            optional_body(&Bytes::from_static(b"{not json")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn body_refresh_token_wins_over_cookie() {
        let jar = CookieJar::new().add(Cookie::new(REFRESH_COOKIE, "cookie-token"));
        let from_body = RefreshRequest {
            refresh_token: Some("body-token".into()),
        };
        assert_eq!(refresh_token(from_body, &jar).as_deref(), Some("body-token"));
        assert_eq!(
            refresh_token(RefreshRequest::default(), &jar).as_deref(),
            Some("cookie-token")
        );
        assert_eq!(refresh_token(RefreshRequest::default(), &CookieJar::new()), None);
    }
}
