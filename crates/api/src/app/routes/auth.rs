//! Sign-in, sign-out, refresh and session inspection.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, HeaderValue, StatusCode},
    response::{sse::Event as SseEvent, IntoResponse, Sse},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use exportdesk_auth::{session_for_identity, AuthProvider, AuthSession, RefreshToken, SessionResolver};

use crate::app::dto::{LoginRequest, RefreshRequest, SignedInResponse};
use crate::app::errors;
use crate::app::services::{self, AppServices};
use crate::context::{SessionContext, ACCESS_TOKEN_COOKIE};

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
        .route("/session", get(current_session))
        .route("/session/stream", get(session_stream))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> axum::response::Response {
    if let Err(e) = body.validate() {
        return errors::domain_error_to_response(e);
    }
    match services.auth.sign_in(body.email.trim(), &body.password).await {
        Ok(auth) => signed_in(&services, auth).await,
        Err(e) => errors::provider_error_to_response(e),
    }
}

pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<RefreshRequest>,
) -> axum::response::Response {
    let token = RefreshToken::new(body.refresh_token);
    match services.auth.refresh_session(&token).await {
        Ok(auth) => signed_in(&services, auth).await,
        Err(e) => errors::provider_error_to_response(e),
    }
}

async fn signed_in(services: &AppServices, auth: AuthSession) -> axum::response::Response {
    let session = session_for_identity(&*services.profiles, Some(auth.identity.clone())).await;
    let max_age = (auth.expires_at - Utc::now()).num_seconds().max(0);
    let cookie = session_cookie(auth.access_token.as_str(), max_age);
    let body = SignedInResponse::new(&auth, session);

    match cookie {
        Some(cookie) => (StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(body)).into_response(),
        None => (StatusCode::OK, Json(body)).into_response(),
    }
}

/// Ends the session at the provider and always clears the cookie, even when
/// the provider call fails.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<SessionContext>,
) -> axum::response::Response {
    let resolver = SessionResolver::new(
        services.auth.clone(),
        services.profiles.clone(),
        context.token().cloned(),
    );
    resolver.sign_out().await;

    let body = Json(json!({ "signed_out": true, "session": resolver.current() }));
    match session_cookie("", 0) {
        Some(cookie) => (StatusCode::OK, [(header::SET_COOKIE, cookie)], body).into_response(),
        None => (StatusCode::OK, body).into_response(),
    }
}

pub async fn current_session(Extension(context): Extension<SessionContext>) -> impl IntoResponse {
    Json(context.session().clone())
}

pub async fn session_stream(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(context): Extension<SessionContext>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    services::session_sse_stream(services, context.token().cloned()).await
}

fn session_cookie(value: &str, max_age: i64) -> Option<HeaderValue> {
    let cookie = format!(
        "{ACCESS_TOKEN_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"
    );
    match HeaderValue::from_str(&cookie) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(error = %e, "access token not usable as a cookie value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clearing_cookie_expires_immediately() {
        let cookie = session_cookie("", 0).unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "exportdesk-access-token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
        );
    }
}
