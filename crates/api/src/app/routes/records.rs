//! CRUD handlers shared by the master-data collections.

use core::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use exportdesk_core::{DomainError, Entity};
use exportdesk_infra::{Query, Record, RecordStore};

use crate::app::dto::ListResponse;
use crate::app::errors;
use crate::app::services::AppServices;

/// A record type editable through the dashboard forms.
pub trait Resource: Record + Entity<Id: FromStr<Err = DomainError>> + Serialize {
    type Form: DeserializeOwned + Send + 'static;

    /// Singular name used in logs.
    const NAME: &'static str;

    fn store(services: &AppServices) -> &Arc<dyn RecordStore<Self>>;

    fn create(form: Self::Form, now: DateTime<Utc>) -> Result<Self, DomainError>;

    fn edit(&mut self, form: Self::Form, now: DateTime<Utc>) -> Result<(), DomainError>;
}

pub fn router<R>() -> Router
where
    R: Resource,
{
    Router::new()
        .route("/", get(list::<R>).post(create::<R>))
        .route("/:id", get(fetch::<R>).put(update::<R>).delete(remove::<R>))
}

/// Newest first. A failing store is logged and shows as an empty list.
pub async fn list<R>(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response
where
    R: Resource,
{
    let items = match R::store(&services).select(&Query::newest_first()).await {
        Ok(items) => items,
        Err(e) => {
            tracing::error!(collection = %R::COLLECTION, error = %e, "error fetching records");
            Vec::new()
        }
    };
    (StatusCode::OK, Json(ListResponse { items })).into_response()
}

pub async fn create<R>(
    Extension(services): Extension<Arc<AppServices>>,
    Json(form): Json<R::Form>,
) -> axum::response::Response
where
    R: Resource,
{
    let record = match R::create(form, Utc::now()) {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match R::store(&services).insert(record).await {
        Ok(saved) => {
            tracing::info!(kind = R::NAME, id = %saved.id(), "record created");
            (StatusCode::CREATED, Json(saved)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn fetch<R>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response
where
    R: Resource,
{
    let id: R::Id = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match R::store(&services).get(id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => errors::domain_error_to_response(DomainError::NotFound),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update<R>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(form): Json<R::Form>,
) -> axum::response::Response
where
    R: Resource,
{
    let id: R::Id = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let store = R::store(&services);
    let mut record = match store.get(id).await {
        Ok(Some(r)) => r,
        Ok(None) => return errors::domain_error_to_response(DomainError::NotFound),
        Err(e) => return errors::store_error_to_response(e),
    };
    if let Err(e) = record.edit(form, Utc::now()) {
        return errors::domain_error_to_response(e);
    }
    match store.update(record).await {
        Ok(saved) => (StatusCode::OK, Json(saved)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn remove<R>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response
where
    R: Resource,
{
    let id: R::Id = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match R::store(&services).delete(id).await {
        Ok(true) => {
            tracing::info!(kind = R::NAME, %id, "record deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => errors::domain_error_to_response(DomainError::NotFound),
        Err(e) => errors::store_error_to_response(e),
    }
}
