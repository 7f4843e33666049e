use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use exportdesk_core::{ConsigneeId, DomainError, Entity, NotifyPartyId, Validator, normalize_optional};

/// Contact block shared by consignees and notify parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyDetails {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
    /// Unified Social Credit Identifier (Chinese business registration number).
    pub usci: Option<String>,
    pub contact_person: Option<String>,
}

macro_rules! party_record {
    ($t:ident, $id:ty, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $t {
            pub id: $id,
            #[serde(flatten)]
            pub details: PartyDetails,
            pub created_at: DateTime<Utc>,
            pub updated_at: DateTime<Utc>,
        }

        impl $t {
            pub fn new(details: PartyDetails, now: DateTime<Utc>) -> Self {
                Self {
                    id: <$id>::new(),
                    details,
                    created_at: now,
                    updated_at: now,
                }
            }

            /// Replace the editable fields; id and creation time stay.
            pub fn apply(&mut self, details: PartyDetails, now: DateTime<Utc>) {
                self.details = details;
                self.updated_at = now;
            }
        }

        impl Entity for $t {
            type Id = $id;

            fn id(&self) -> &Self::Id {
                &self.id
            }
        }
    };
}

party_record!(Consignee, ConsigneeId, "Consignee (receiving company).");
party_record!(NotifyParty, NotifyPartyId, "Party notified on arrival of the goods.");

/// Submitted consignee / notify party form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartyForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
    pub usci: Option<String>,
    pub contact_person: Option<String>,
}

impl PartyForm {
    pub fn validate(self) -> Result<PartyDetails, DomainError> {
        Validator::new()
            .required("name", &self.name, "Company name is required")
            .required("address", &self.address, "Address is required")
            .optional_email("email", self.email.as_deref(), "Invalid email format")
            .finish()?;

        Ok(PartyDetails {
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            phone: normalize_optional(self.phone),
            fax: normalize_optional(self.fax),
            email: normalize_optional(self.email),
            usci: normalize_optional(self.usci),
            contact_person: normalize_optional(self.contact_person),
        })
    }
}
