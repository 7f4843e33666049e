//! Column mappings for every stored record type.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use exportdesk_auth::{Role, UserProfile};
use exportdesk_containers::{Container, ContainerDetails, ContainerStatus};
use exportdesk_parties::{Consignee, NotifyParty, PartyDetails, Shipper, ShipperDetails};

use super::{Collection, Record, Value};

fn decode_err<E>(column: &str, err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(err),
    }
}

fn timestamps(row: &PgRow) -> Result<(DateTime<Utc>, DateTime<Utc>), sqlx::Error> {
    Ok((row.try_get("created_at")?, row.try_get("updated_at")?))
}

impl Record for UserProfile {
    const COLLECTION: Collection = Collection::Users;
    const COLUMNS: &'static [&'static str] =
        &["id", "email", "full_name", "role", "created_at", "updated_at"];

    fn value(&self, column: &str) -> Option<Value> {
        Some(match column {
            "id" => Value::Uuid(self.id.into()),
            "email" => self.email.clone().into(),
            "full_name" => self.full_name.clone().into(),
            "role" => self.role.as_str().into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        })
    }

    fn from_pg_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        let role: Role = role.parse().map_err(|e| decode_err("role", e))?;
        let (created_at, updated_at) = timestamps(row)?;
        Ok(UserProfile {
            id: row.try_get::<Uuid, _>("id")?.into(),
            email: row.try_get("email")?,
            full_name: row.try_get("full_name")?,
            role,
            created_at,
            updated_at,
        })
    }

    fn keep_immutable(&mut self, stored: &Self) {
        self.created_at = stored.created_at;
    }
}

impl Record for Shipper {
    const COLLECTION: Collection = Collection::Shippers;
    const COLUMNS: &'static [&'static str] =
        &["id", "name", "address", "phone", "fax", "created_at", "updated_at"];

    fn value(&self, column: &str) -> Option<Value> {
        let d = &self.details;
        Some(match column {
            "id" => Value::Uuid(self.id.into()),
            "name" => d.name.clone().into(),
            "address" => d.address.clone().into(),
            "phone" => d.phone.clone().into(),
            "fax" => d.fax.clone().into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        })
    }

    fn from_pg_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let (created_at, updated_at) = timestamps(row)?;
        Ok(Shipper {
            id: row.try_get::<Uuid, _>("id")?.into(),
            details: ShipperDetails {
                name: row.try_get("name")?,
                address: row.try_get("address")?,
                phone: row.try_get("phone")?,
                fax: row.try_get("fax")?,
            },
            created_at,
            updated_at,
        })
    }

    fn keep_immutable(&mut self, stored: &Self) {
        self.created_at = stored.created_at;
    }
}

const PARTY_COLUMNS: &[&str] = &[
    "id",
    "name",
    "address",
    "phone",
    "fax",
    "email",
    "usci",
    "contact_person",
    "created_at",
    "updated_at",
];

fn party_value(d: &PartyDetails, column: &str) -> Option<Value> {
    Some(match column {
        "name" => d.name.clone().into(),
        "address" => d.address.clone().into(),
        "phone" => d.phone.clone().into(),
        "fax" => d.fax.clone().into(),
        "email" => d.email.clone().into(),
        "usci" => d.usci.clone().into(),
        "contact_person" => d.contact_person.clone().into(),
        _ => return None,
    })
}

fn party_details(row: &PgRow) -> Result<PartyDetails, sqlx::Error> {
    Ok(PartyDetails {
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        phone: row.try_get("phone")?,
        fax: row.try_get("fax")?,
        email: row.try_get("email")?,
        usci: row.try_get("usci")?,
        contact_person: row.try_get("contact_person")?,
    })
}

macro_rules! party_record_columns {
    ($t:ty, $collection:expr) => {
        impl Record for $t {
            const COLLECTION: Collection = $collection;
            const COLUMNS: &'static [&'static str] = PARTY_COLUMNS;

            fn value(&self, column: &str) -> Option<Value> {
                match column {
                    "id" => Some(Value::Uuid(self.id.into())),
                    "created_at" => Some(self.created_at.into()),
                    "updated_at" => Some(self.updated_at.into()),
                    other => party_value(&self.details, other),
                }
            }

            fn from_pg_row(row: &PgRow) -> Result<Self, sqlx::Error> {
                let (created_at, updated_at) = timestamps(row)?;
                Ok(Self {
                    id: row.try_get::<Uuid, _>("id")?.into(),
                    details: party_details(row)?,
                    created_at,
                    updated_at,
                })
            }

            fn keep_immutable(&mut self, stored: &Self) {
                self.created_at = stored.created_at;
            }
        }
    };
}

party_record_columns!(Consignee, Collection::Consignees);
party_record_columns!(NotifyParty, Collection::NotifyParties);

impl Record for Container {
    const COLLECTION: Collection = Collection::Containers;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "container_number",
        "container_type",
        "size",
        "status",
        "created_at",
        "updated_at",
    ];

    fn value(&self, column: &str) -> Option<Value> {
        let d = &self.details;
        Some(match column {
            "id" => Value::Uuid(self.id.into()),
            "container_number" => d.container_number.clone().into(),
            "container_type" => d.container_type.clone().into(),
            "size" => d.size.clone().into(),
            "status" => d.status.as_str().into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        })
    }

    fn from_pg_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status: ContainerStatus = status.parse().map_err(|e| decode_err("status", e))?;
        let (created_at, updated_at) = timestamps(row)?;
        Ok(Container {
            id: row.try_get::<Uuid, _>("id")?.into(),
            details: ContainerDetails {
                container_number: row.try_get("container_number")?,
                container_type: row.try_get("container_type")?,
                size: row.try_get("size")?,
                status,
            },
            created_at,
            updated_at,
        })
    }

    fn keep_immutable(&mut self, stored: &Self) {
        self.created_at = stored.created_at;
    }
}
