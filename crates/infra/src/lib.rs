//! Infrastructure layer: record store, profile lookups, auth providers.

pub mod auth;
pub mod profiles;
pub mod store;

pub use auth::{HostedAuthProvider, InMemoryAuthProvider};
pub use profiles::ProfileDirectory;
pub use store::{
    Collection, InMemoryRecordStore, Order, PostgresRecordStore, Query, Record, RecordStore,
    StoreError, Value,
};
