//! Record store: the remote tables behind the dashboard.
//!
//! Every record type maps to one [`Collection`]. Reads and writes go through
//! [`RecordStore`]; filters and ordering only ever name columns from the
//! record's whitelist, so no caller-provided text reaches SQL as an identifier.

pub mod in_memory;
pub mod postgres;
mod records;

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use thiserror::Error;
use uuid::Uuid;

use exportdesk_core::Entity;

pub use in_memory::InMemoryRecordStore;
pub use postgres::PostgresRecordStore;

/// Remote tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Shippers,
    Consignees,
    NotifyParties,
    Containers,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Users,
        Collection::Shippers,
        Collection::Consignees,
        Collection::NotifyParties,
        Collection::Containers,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Shippers => "shippers",
            Collection::Consignees => "consignees",
            Collection::NotifyParties => "notify_parties",
            Collection::Containers => "containers",
        }
    }
}

impl core::fmt::Display for Collection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.table())
    }
}

/// Column value as seen by filters and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Ordering used by the in-memory store. Nulls sort last, like Postgres `ASC`.
    pub(crate) fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Uuid(a), Value::Uuid(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            // Columns hold one kind of value; mixed kinds only meet in bad filters.
            _ => Ordering::Equal,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        v.map_or(Value::Null, Value::Text)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

/// A row type stored in one collection.
pub trait Record: Entity<Id: Into<Uuid> + Send + Sync> + Clone + Send + Sync + 'static {
    const COLLECTION: Collection;

    /// Column whitelist; `id` first.
    const COLUMNS: &'static [&'static str];

    /// Current value of `column`, `None` when the column is not in the whitelist.
    fn value(&self, column: &str) -> Option<Value>;

    fn from_pg_row(row: &PgRow) -> Result<Self, sqlx::Error>;

    /// Copy the columns an update never writes (`created_at`) from `stored`.
    fn keep_immutable(&mut self, stored: &Self);

    /// Columns written by an update.
    fn mutable_columns() -> impl Iterator<Item = &'static str> {
        Self::COLUMNS
            .iter()
            .copied()
            .filter(|c| *c != "id" && *c != "created_at")
    }

    fn has_column(column: &str) -> bool {
        Self::COLUMNS.contains(&column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn sql(&self) -> &'static str {
        match self {
            Order::Asc => " ASC",
            Order::Desc => " DESC",
        }
    }
}

/// Equality filters, optional ordering and limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    filters: Vec<(String, Value)>,
    order: Option<(String, Order)>,
    limit: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row, most recently created first.
    pub fn newest_first() -> Self {
        Self::new().order_by("created_at", Order::Desc)
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order = Some((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn filters(&self) -> &[(String, Value)] {
        &self.filters
    }

    pub fn ordering(&self) -> Option<(&str, Order)> {
        self.order.as_ref().map(|(c, o)| (c.as_str(), *o))
    }

    pub fn max_rows(&self) -> Option<u32> {
        self.limit
    }

    /// Reject columns `R` does not have.
    pub fn check<R: Record>(&self) -> Result<(), StoreError> {
        let named = self
            .filters
            .iter()
            .map(|(c, _)| c.as_str())
            .chain(self.order.as_ref().map(|(c, _)| c.as_str()));
        for column in named {
            if !R::has_column(column) {
                return Err(StoreError::UnknownColumn {
                    collection: R::COLLECTION,
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown column '{column}' in {collection}")]
    UnknownColumn { collection: Collection, column: String },

    #[error("record not found in {0}")]
    NotFound(Collection),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("failed to decode row: {0}")]
    Decode(String),
}

/// Async access to one collection.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<R>, StoreError>;

    async fn get(&self, id: R::Id) -> Result<Option<R>, StoreError>;

    /// Fails with `Conflict` when the id is already taken.
    async fn insert(&self, record: R) -> Result<R, StoreError>;

    /// Overwrites the mutable columns of an existing row; `NotFound` otherwise.
    async fn update(&self, record: R) -> Result<R, StoreError>;

    /// `Ok(false)` when nothing was deleted.
    async fn delete(&self, id: R::Id) -> Result<bool, StoreError>;

    async fn count(&self, query: &Query) -> Result<u64, StoreError>;
}

#[async_trait]
impl<R, S> RecordStore<R> for Arc<S>
where
    R: Record,
    S: RecordStore<R> + ?Sized,
{
    async fn select(&self, query: &Query) -> Result<Vec<R>, StoreError> {
        (**self).select(query).await
    }

    async fn get(&self, id: R::Id) -> Result<Option<R>, StoreError> {
        (**self).get(id).await
    }

    async fn insert(&self, record: R) -> Result<R, StoreError> {
        (**self).insert(record).await
    }

    async fn update(&self, record: R) -> Result<R, StoreError> {
        (**self).update(record).await
    }

    async fn delete(&self, id: R::Id) -> Result<bool, StoreError> {
        (**self).delete(id).await
    }

    async fn count(&self, query: &Query) -> Result<u64, StoreError> {
        (**self).count(query).await
    }
}
