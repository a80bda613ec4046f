//! Authentication middleware: token extraction, principal loading and the
//! role gate.
//!
//! Handlers behind [`require_auth`] read the principal through the [`Auth`]
//! extractor:
//!
//! ```rust,ignore
//! async fn me(Auth(principal): Auth) -> Json<UserResponse> { .. }
//! ```

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use kanban_core::auth::Unauthenticated;
use kanban_core::auth::roles;
use kanban_core::models::auth::{Principal, Role};

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::ACCESS_COOKIE;

/// Key used to store the loaded `Principal` in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Principal);

/// Bearer token from the `Authorization` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Access token from the header, falling back to the `kanban_access` cookie.
pub fn access_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    bearer_token(headers).map(str::to_owned).or_else(|| {
        jar.get(ACCESS_COOKIE)
            .map(|c| c.value().to_owned())
            .filter(|t| !t.is_empty())
    })
}

/// Axum middleware: authenticates the access token and injects
/// `AuthenticatedUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = access_token(request.headers(), &jar);
    let principal = state.sessions.authenticate(token.as_deref()).await?;
    request.extensions_mut().insert(AuthenticatedUser(principal));
    Ok(next.run(request).await)
}

/// Axum middleware: rejects principals below `min_role`.
///
/// Must run inside [`require_auth`]; a missing principal reads as a missing
/// token.
pub async fn require_role(
    State(min_role): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|u| &u.0);
    roles::require(principal, min_role)?;
    Ok(next.run(request).await)
}

/// Extractor for the authenticated principal.
pub struct Auth(pub Principal);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(|u| Auth(u.0))
            .ok_or(AppError::Unauthorized(Unauthenticated::MissingToken))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use axum_extra::extract::cookie::Cookie;

    use super::*;

    fn headers(auth: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        h
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn header_wins_over_cookie() {
        let jar = CookieJar::new().add(Cookie::new(ACCESS_COOKIE, "from-cookie"));
        assert_eq!(
            access_token(&headers("Bearer from-header"), &jar).as_deref(),
            Some("from-header")
        );
        assert_eq!(
            access_token(&HeaderMap::new(), &jar).as_deref(),
            Some("from-cookie")
        );
        assert_eq!(access_token(&HeaderMap::new(), &CookieJar::new()), None);
    }
}
