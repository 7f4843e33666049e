use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use exportdesk_core::{DomainError, Entity, ShipperId, Validator, normalize_optional};

/// Editable fields of a shipper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipperDetails {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub fax: Option<String>,
}

/// Shipper (exporting company).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipper {
    pub id: ShipperId,
    #[serde(flatten)]
    pub details: ShipperDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipper {
    pub fn new(details: ShipperDetails, now: DateTime<Utc>) -> Self {
        Self {
            id: ShipperId::new(),
            details,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the editable fields; id and creation time stay.
    pub fn apply(&mut self, details: ShipperDetails, now: DateTime<Utc>) {
        self.details = details;
        self.updated_at = now;
    }
}

impl Entity for Shipper {
    type Id = ShipperId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Submitted shipper form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShipperForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub phone: Option<String>,
    pub fax: Option<String>,
}

impl ShipperForm {
    pub fn validate(self) -> Result<ShipperDetails, DomainError> {
        Validator::new()
            .required("name", &self.name, "Company name is required")
            .required("address", &self.address, "Address is required")
            .finish()?;

        Ok(ShipperDetails {
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            phone: normalize_optional(self.phone),
            fax: normalize_optional(self.fax),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_optional_fields_become_none() {
        let details = ShipperForm {
            name: " PT Buah Segar ".into(),
            address: "Jl. Pelabuhan 1, Surabaya".into(),
            phone: Some("".into()),
            fax: Some("  ".into()),
        }
        .validate()
        .unwrap();

        assert_eq!(details.name, "PT Buah Segar");
        assert_eq!(details.phone, None);
        assert_eq!(details.fax, None);
    }

    #[test]
    fn name_and_address_are_required() {
        let err = ShipperForm::default().validate().unwrap_err();
        let fields = err.field_errors().unwrap();
        assert_eq!(fields.get("name"), Some("Company name is required"));
        assert_eq!(fields.get("address"), Some("Address is required"));
    }

    #[test]
    fn serializes_as_flat_row() {
        let shipper = Shipper::new(
            ShipperDetails {
                name: "Acme".into(),
                address: "Dock 4".into(),
                phone: None,
                fax: None,
            },
            Utc::now(),
        );
        let json = serde_json::to_value(&shipper).unwrap();
        assert_eq!(json["name"], "Acme");
        assert!(json["fax"].is_null());
    }
}
