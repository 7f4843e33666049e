//! Parties domain module (shippers, consignees and notify parties).
//!
//! This crate contains the record shapes and form rules for the parties named
//! on export paperwork, implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod party;
pub mod shipper;

pub use party::{Consignee, NotifyParty, PartyDetails, PartyForm};
pub use shipper::{Shipper, ShipperDetails, ShipperForm};
