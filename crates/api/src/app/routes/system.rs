use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::app::errors;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Where the guard sends callers without a session.
pub async fn login_page() -> impl IntoResponse {
    Json(json!({
        "page": "login",
        "message": "Sign in with your email and password",
        "action": "/auth/login",
    }))
}

/// Where the guard sends signed-in callers lacking the required role.
pub async fn unauthorized_page() -> axum::response::Response {
    errors::json_error(
        StatusCode::FORBIDDEN,
        "unauthorized",
        "You do not have permission to access this page.",
    )
}
