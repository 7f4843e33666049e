use std::sync::Arc;

use axum::{routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde_json::json;

use exportdesk_containers::{
    Container, ContainerForm, ContainerStatus, CONTAINER_SIZES, CONTAINER_TYPES,
};
use exportdesk_core::DomainError;
use exportdesk_infra::RecordStore;

use super::records::{self, Resource};
use crate::app::services::AppServices;

impl Resource for Container {
    type Form = ContainerForm;
    const NAME: &'static str = "container";

    fn store(services: &AppServices) -> &Arc<dyn RecordStore<Self>> {
        &services.containers
    }

    fn create(form: ContainerForm, now: DateTime<Utc>) -> Result<Self, DomainError> {
        Ok(Container::new(form.validate()?, now))
    }

    fn edit(&mut self, form: ContainerForm, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.apply(form.validate()?, now);
        Ok(())
    }
}

pub fn router() -> Router {
    records::router::<Container>().route("/options", get(options))
}

/// Choices offered by the container form.
pub async fn options() -> Json<serde_json::Value> {
    let statuses: Vec<_> = ContainerStatus::ALL
        .iter()
        .map(|s| json!({ "value": s.as_str(), "label": s.label() }))
        .collect();
    Json(json!({
        "types": CONTAINER_TYPES,
        "sizes": CONTAINER_SIZES,
        "statuses": statuses,
    }))
}
