use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use exportdesk_auth::ProviderError;
use exportdesk_core::DomainError;
use exportdesk_infra::StoreError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::InvalidForm(fields) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(json!({
                "error": "validation_error",
                "message": fields.to_string(),
                "fields": fields,
            })),
        )
            .into_response(),
        DomainError::Validation(msg) => json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Unauthorized => json_error(StatusCode::FORBIDDEN, "unauthorized", "unauthorized"),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::UnknownColumn { .. } => {
            json_error(StatusCode::BAD_REQUEST, "invalid_query", err.to_string())
        }
        StoreError::Database(_) | StoreError::Decode(_) => {
            tracing::error!(error = %err, "record store failure");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_error", err.to_string())
        }
    }
}

pub fn provider_error_to_response(err: ProviderError) -> axum::response::Response {
    match err {
        ProviderError::InvalidCredentials => json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "Invalid login credentials",
        ),
        ProviderError::InvalidToken(msg) => json_error(StatusCode::UNAUTHORIZED, "invalid_token", msg),
        ProviderError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        ProviderError::Rejected(msg) => json_error(StatusCode::UNPROCESSABLE_ENTITY, "rejected", msg),
        ProviderError::Unreachable(msg) => {
            tracing::warn!(error = %msg, "auth provider unreachable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "auth_unavailable", msg)
        }
    }
}
