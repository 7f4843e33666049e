use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};

use exportdesk_core::DomainError;
use exportdesk_infra::RecordStore;
use exportdesk_parties::{NotifyParty, PartyForm};

use super::records::{self, Resource};
use crate::app::services::AppServices;

impl Resource for NotifyParty {
    type Form = PartyForm;
    const NAME: &'static str = "notify_party";

    fn store(services: &AppServices) -> &Arc<dyn RecordStore<Self>> {
        &services.notify_parties
    }

    fn create(form: PartyForm, now: DateTime<Utc>) -> Result<Self, DomainError> {
        Ok(NotifyParty::new(form.validate()?, now))
    }

    fn edit(&mut self, form: PartyForm, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.apply(form.validate()?, now);
        Ok(())
    }
}

pub fn router() -> Router {
    records::router::<NotifyParty>()
}
