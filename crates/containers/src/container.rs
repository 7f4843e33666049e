use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use exportdesk_core::{ContainerId, DomainError, Entity, Validator};

/// Container types offered by the form.
pub const CONTAINER_TYPES: [&str; 13] = [
    "20ft Standard",
    "40ft Standard",
    "20ft High Cube",
    "40ft High Cube",
    "45ft High Cube",
    "20ft Refrigerated",
    "40ft Refrigerated",
    "20ft Open Top",
    "40ft Open Top",
    "20ft Flat Rack",
    "40ft Flat Rack",
    "20ft Tank",
    "40ft Tank",
];

/// Container sizes offered by the form.
pub const CONTAINER_SIZES: [&str; 3] = ["20ft", "40ft", "45ft"];

/// Container status lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    #[default]
    Available,
    InUse,
    Maintenance,
}

impl ContainerStatus {
    pub const ALL: [ContainerStatus; 3] = [
        ContainerStatus::Available,
        ContainerStatus::InUse,
        ContainerStatus::Maintenance,
    ];

    /// Stored value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerStatus::Available => "available",
            ContainerStatus::InUse => "in_use",
            ContainerStatus::Maintenance => "maintenance",
        }
    }

    /// Human-readable form ("in use").
    pub fn label(&self) -> &'static str {
        match self {
            ContainerStatus::Available => "available",
            ContainerStatus::InUse => "in use",
            ContainerStatus::Maintenance => "maintenance",
        }
    }
}

impl core::fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown container status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ContainerStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContainerStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Editable fields of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDetails {
    pub container_number: String,
    pub container_type: String,
    pub size: String,
    pub status: ContainerStatus,
}

/// Shipping container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    #[serde(flatten)]
    pub details: ContainerDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Container {
    pub fn new(details: ContainerDetails, now: DateTime<Utc>) -> Self {
        Self {
            id: ContainerId::new(),
            details,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the editable fields; id and creation time stay.
    pub fn apply(&mut self, details: ContainerDetails, now: DateTime<Utc>) {
        self.details = details;
        self.updated_at = now;
    }

    pub fn is_available(&self) -> bool {
        self.details.status == ContainerStatus::Available
    }
}

impl Entity for Container {
    type Id = ContainerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Submitted container form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerForm {
    #[serde(default)]
    pub container_number: String,
    #[serde(default)]
    pub container_type: String,
    #[serde(default)]
    pub size: String,
    pub status: Option<String>,
}

impl ContainerForm {
    pub fn validate(self) -> Result<ContainerDetails, DomainError> {
        let statuses: Vec<&str> = ContainerStatus::ALL.iter().map(|s| s.as_str()).collect();
        Validator::new()
            .required("container_number", &self.container_number, "Container number is required")
            .required("container_type", &self.container_type, "Container type is required")
            .required("size", &self.size, "Size is required")
            .one_of("status", self.status.as_deref(), &statuses, "Please select a status")
            .finish()?;

        let status = self
            .status
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(|e: UnknownStatus| DomainError::validation(e.to_string()))?;

        Ok(ContainerDetails {
            container_number: self.container_number.trim().to_string(),
            container_type: self.container_type.trim().to_string(),
            size: self.size.trim().to_string(),
            status,
        })
    }
}
