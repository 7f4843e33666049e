//! User management (admins only; the guard runs before these handlers).

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use exportdesk_auth::{AuthProvider, SignUp, UserForm, UserProfile, UserUpdateForm};
use exportdesk_core::{DomainError, UserId};
use exportdesk_infra::{Query, RecordStore};

use crate::app::dto::ListResponse;
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let items = match services.users.select(&Query::newest_first()).await {
        Ok(items) => items,
        Err(e) => {
            tracing::error!(error = %e, "error fetching users");
            Vec::new()
        }
    };
    (StatusCode::OK, Json(ListResponse { items })).into_response()
}

/// Register the account with the auth provider, then store its profile row.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Json(form): Json<UserForm>,
) -> axum::response::Response {
    let new_user = match form.validate() {
        Ok(u) => u,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let identity = match services
        .auth
        .sign_up(SignUp {
            email: new_user.email.clone(),
            password: new_user.password.clone(),
            full_name: Some(new_user.full_name.clone()),
        })
        .await
    {
        Ok(identity) => identity,
        Err(e) => return errors::provider_error_to_response(e),
    };

    let profile = UserProfile::for_identity(&identity, Some(new_user.full_name), new_user.role, Utc::now());
    match services.users.insert(profile).await {
        Ok(saved) => {
            tracing::info!(user_id = %saved.id, role = %saved.role, "user created");
            (StatusCode::CREATED, Json(saved)).into_response()
        }
        Err(e) => {
            tracing::error!(user_id = %identity.id, error = %e, "account registered but profile row not stored");
            errors::store_error_to_response(e)
        }
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.users.get(id).await {
        Ok(Some(profile)) => (StatusCode::OK, Json(profile)).into_response(),
        Ok(None) => errors::domain_error_to_response(DomainError::NotFound),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Edit full name and role. Email and password stay with the auth provider.
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(form): Json<UserUpdateForm>,
) -> axum::response::Response {
    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let update = match form.validate() {
        Ok(u) => u,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let mut profile = match services.users.get(id).await {
        Ok(Some(p)) => p,
        Ok(None) => return errors::domain_error_to_response(DomainError::NotFound),
        Err(e) => return errors::store_error_to_response(e),
    };
    profile.apply(update, Utc::now());
    match services.users.update(profile).await {
        Ok(saved) => (StatusCode::OK, Json(saved)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.users.delete(id).await {
        Ok(true) => {
            tracing::info!(user_id = %id, "user profile deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => errors::domain_error_to_response(DomainError::NotFound),
        Err(e) => errors::store_error_to_response(e),
    }
}
