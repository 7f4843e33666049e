//! Containers domain module.
//!
//! This crate contains the shipping container record, its status lifecycle
//! and the catalogues offered by the container form, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod container;

pub use container::{
    Container, ContainerDetails, ContainerForm, ContainerStatus, UnknownStatus, CONTAINER_SIZES,
    CONTAINER_TYPES,
};
