//! `exportdesk-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers, the domain error model and the form validation rules used
//! by every record type.

pub mod entity;
pub mod error;
pub mod id;
pub mod validation;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ConsigneeId, ContainerId, NotifyPartyId, ShipperId, UserId};
pub use validation::{normalize_optional, FieldErrors, Validator};
