use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};

use exportdesk_core::DomainError;
use exportdesk_infra::RecordStore;
use exportdesk_parties::{Shipper, ShipperForm};

use super::records::{self, Resource};
use crate::app::services::AppServices;

impl Resource for Shipper {
    type Form = ShipperForm;
    const NAME: &'static str = "shipper";

    fn store(services: &AppServices) -> &Arc<dyn RecordStore<Self>> {
        &services.shippers
    }

    fn create(form: ShipperForm, now: DateTime<Utc>) -> Result<Self, DomainError> {
        Ok(Shipper::new(form.validate()?, now))
    }

    fn edit(&mut self, form: ShipperForm, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.apply(form.validate()?, now);
        Ok(())
    }
}

pub fn router() -> Router {
    records::router::<Shipper>()
}
