//! Postgres-backed record store.
//!
//! One table per [`Collection`]; column names come from [`Record::COLUMNS`]
//! and every value is bound as a parameter.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (check constraint violation) | `23514` | `Conflict` |
//! | Database (other) | Any other | `Database` |
//! | PoolClosed / Io / other | N/A | `Database` |

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::debug;
use uuid::Uuid;

use super::{Query, Record, RecordStore, StoreError, Value};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

/// Create the dashboard tables if they do not exist yet.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("migrate", e))?;
    Ok(())
}

/// Postgres record store for one record type. Cloning shares the pool.
pub struct PostgresRecordStore<R> {
    pool: PgPool,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for PostgresRecordStore<R> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> PostgresRecordStore<R> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _record: PhantomData,
        }
    }

    fn select_sql(query: &Query, projection: &str) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {projection} FROM {}",
            R::COLLECTION.table()
        ));
        for (i, (column, value)) in query.filters().iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            qb.push(column);
            if *value == Value::Null {
                qb.push(" IS NULL");
            } else {
                qb.push(" = ");
                push_value(&mut qb, value.clone());
            }
        }
        qb
    }

    /// `UPDATE` of the mutable columns, returning the stored row.
    fn update_sql(record: &R) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", R::COLLECTION.table()));
        for (i, column) in R::mutable_columns().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(column).push(" = ");
            push_value(&mut qb, column_value(record, column));
        }
        qb.push(" WHERE id = ");
        push_value(&mut qb, column_value(record, "id"));
        qb.push(" RETURNING ").push(R::COLUMNS.join(", "));
        qb
    }
}

fn push_value(qb: &mut QueryBuilder<'static, Postgres>, value: Value) {
    match value {
        Value::Null => {
            qb.push("NULL");
        }
        Value::Text(v) => {
            qb.push_bind(v);
        }
        Value::Uuid(v) => {
            qb.push_bind(v);
        }
        Value::Timestamp(v) => {
            qb.push_bind(v);
        }
    }
}

fn column_value<R: Record>(record: &R, column: &str) -> Value {
    record.value(column).unwrap_or(Value::Null)
}

fn decode<R: Record>(rows: Vec<sqlx::postgres::PgRow>) -> Result<Vec<R>, StoreError> {
    rows.iter()
        .map(|row| R::from_pg_row(row).map_err(|e| StoreError::Decode(e.to_string())))
        .collect()
}

#[async_trait]
impl<R: Record> RecordStore<R> for PostgresRecordStore<R> {
    async fn select(&self, query: &Query) -> Result<Vec<R>, StoreError> {
        query.check::<R>()?;
        let mut qb = Self::select_sql(query, &R::COLUMNS.join(", "));
        if let Some((column, order)) = query.ordering() {
            qb.push(" ORDER BY ").push(column).push(order.sql());
        }
        if let Some(limit) = query.max_rows() {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }

        debug!(table = R::COLLECTION.table(), "select");
        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("select", e))?;
        decode(rows)
    }

    async fn get(&self, id: R::Id) -> Result<Option<R>, StoreError> {
        let uuid: Uuid = id.into();
        let rows = self.select(&Query::new().eq("id", uuid).limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, record: R) -> Result<R, StoreError> {
        let mut qb: QueryBuilder<'static, Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            R::COLLECTION.table(),
            R::COLUMNS.join(", ")
        ));
        for (i, column) in R::COLUMNS.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_value(&mut qb, column_value(&record, column));
        }
        qb.push(")");

        qb.build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert", e))?;
        Ok(record)
    }

    async fn update(&self, record: R) -> Result<R, StoreError> {
        let row = Self::update_sql(&record)
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update", e))?
            .ok_or(StoreError::NotFound(R::COLLECTION))?;
        R::from_pg_row(&row).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn delete(&self, id: R::Id) -> Result<bool, StoreError> {
        let uuid: Uuid = id.into();
        let sql = format!("DELETE FROM {} WHERE id = $1", R::COLLECTION.table());
        let result = sqlx::query(&sql)
            .bind(uuid)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, query: &Query) -> Result<u64, StoreError> {
        query.check::<R>()?;
        let mut qb = Self::select_sql(query, "COUNT(*)");
        let row = qb
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count", e))?;
        let count: i64 = row
            .try_get(0)
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(count.max(0) as u64)
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23514") => StoreError::Conflict(msg),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Decode(format!("{} in {}", err, operation))
        }
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}
