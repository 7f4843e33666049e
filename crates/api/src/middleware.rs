use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use exportdesk_auth::{explain_access, resolve_session, AccessToken, Access, Role};

use crate::app::services::AppServices;
use crate::context::{SessionContext, ACCESS_TOKEN_COOKIE};

/// Resolve the caller's session and attach it to the request.
///
/// Never rejects: a missing or bad token yields an anonymous session and the
/// route guards decide what that means.
pub async fn session_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = extract_token(req.headers());
    let session = resolve_session(&*services.auth, &*services.profiles, token.as_ref()).await;

    req.extensions_mut().insert(SessionContext::new(session, token));
    next.run(req).await
}

/// Role a route group requires (`None` = any signed-in caller).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredRole(pub Option<Role>);

impl RequiredRole {
    pub fn signed_in() -> Self {
        Self(None)
    }

    pub fn admin() -> Self {
        Self(Some(Role::Admin))
    }
}

/// Run the access guard before any handler of the group.
pub async fn guard_middleware(
    State(RequiredRole(required)): State<RequiredRole>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let context = req
        .extensions()
        .get::<SessionContext>()
        .cloned()
        .unwrap_or_else(SessionContext::anonymous);

    let explanation = explain_access(context.session(), required);
    match explanation.access {
        Access::Allow => next.run(req).await,
        Access::RedirectTo(destination) => {
            tracing::debug!(
                path = %req.uri().path(),
                destination = destination.path(),
                reason = explanation.reason,
                "access denied"
            );
            redirect(destination.path())
        }
    }
}

fn redirect(location: &'static str) -> Response {
    (
        StatusCode::SEE_OTHER,
        [(header::LOCATION, HeaderValue::from_static(location))],
    )
        .into_response()
}

/// Fixed security headers on every response.
pub async fn security_headers(req: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let mut res = next.run(req).await;
    let headers = res.headers_mut();
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("origin-when-cross-origin"),
    );
    res
}

/// Access token from `Authorization: Bearer`, else from the session cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<AccessToken> {
    extract_bearer(headers)
        .or_else(|| extract_cookie(headers, ACCESS_TOKEN_COOKIE))
        .map(AccessToken::new)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

fn extract_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let map = headers(&[
            (header::AUTHORIZATION, "Bearer from-header"),
            (header::COOKIE, "exportdesk-access-token=from-cookie"),
        ]);
        assert_eq!(extract_token(&map), Some(AccessToken::new("from-header")));
    }

    #[test]
    fn cookie_is_found_among_others() {
        let map = headers(&[(header::COOKIE, "theme=dark; exportdesk-access-token=abc.def; lang=en")]);
        assert_eq!(extract_token(&map), Some(AccessToken::new("abc.def")));
    }

    #[test]
    fn empty_or_foreign_credentials_are_ignored() {
        assert_eq!(extract_token(&headers(&[(header::AUTHORIZATION, "Bearer   ")])), None);
        assert_eq!(extract_token(&headers(&[(header::AUTHORIZATION, "Basic dXNlcg==")])), None);
        assert_eq!(extract_token(&headers(&[(header::COOKIE, "exportdesk-access-token=")])), None);
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }
}
