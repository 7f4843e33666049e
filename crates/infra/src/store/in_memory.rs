use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use super::{Query, Record, RecordStore, StoreError, Value};

/// In-memory record store for tests/dev.
#[derive(Debug)]
pub struct InMemoryRecordStore<R: Record> {
    inner: RwLock<HashMap<R::Id, R>>,
}

impl<R: Record> InMemoryRecordStore<R> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    fn poisoned() -> StoreError {
        StoreError::Database(format!("{} store lock poisoned", R::COLLECTION))
    }

    fn matching(&self, query: &Query) -> Result<Vec<R>, StoreError> {
        query.check::<R>()?;
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        let mut rows: Vec<R> = map
            .values()
            .filter(|r| {
                query
                    .filters()
                    .iter()
                    .all(|(column, expected)| r.value(column).as_ref() == Some(expected))
            })
            .cloned()
            .collect();
        drop(map);

        // Stable base order: ids are time-ordered.
        rows.sort_by_key(|r| Into::<Uuid>::into(*r.id()));
        if let Some((column, order)) = query.ordering() {
            rows.sort_by(|a, b| {
                let (a, b) = (
                    a.value(column).unwrap_or(Value::Null),
                    b.value(column).unwrap_or(Value::Null),
                );
                match order {
                    super::Order::Asc => a.sort_cmp(&b),
                    super::Order::Desc => b.sort_cmp(&a),
                }
            });
        }
        if let Some(limit) = query.max_rows() {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }
}

impl<R: Record> Default for InMemoryRecordStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for InMemoryRecordStore<R> {
    async fn select(&self, query: &Query) -> Result<Vec<R>, StoreError> {
        self.matching(query)
    }

    async fn get(&self, id: R::Id) -> Result<Option<R>, StoreError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn insert(&self, record: R) -> Result<R, StoreError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        let id = *record.id();
        if map.contains_key(&id) {
            return Err(StoreError::Conflict(format!(
                "{} already holds id {id}",
                R::COLLECTION
            )));
        }
        map.insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, mut record: R) -> Result<R, StoreError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        match map.get_mut(record.id()) {
            Some(slot) => {
                record.keep_immutable(slot);
                *slot = record.clone();
                Ok(record)
            }
            None => Err(StoreError::NotFound(R::COLLECTION)),
        }
    }

    async fn delete(&self, id: R::Id) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        Ok(map.remove(&id).is_some())
    }

    async fn count(&self, query: &Query) -> Result<u64, StoreError> {
        Ok(self.matching(query)?.len() as u64)
    }
}
