use async_trait::async_trait;

use exportdesk_auth::{ProfileStore, ProviderError, UserProfile};
use exportdesk_core::UserId;

use crate::store::{RecordStore, StoreError};

/// Profile lookups served from the `users` collection.
#[derive(Debug, Clone)]
pub struct ProfileDirectory<S> {
    store: S,
}

impl<S> ProfileDirectory<S>
where
    S: RecordStore<UserProfile>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S> ProfileStore for ProfileDirectory<S>
where
    S: RecordStore<UserProfile>,
{
    async fn fetch_profile(&self, id: UserId) -> Result<Option<UserProfile>, ProviderError> {
        self.store.get(id).await.map_err(|e| match e {
            StoreError::Database(msg) => ProviderError::Unreachable(msg),
            other => ProviderError::Rejected(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::{InMemoryRecordStore, Query};
    use chrono::Utc;
    use exportdesk_auth::{CallerIdentity, Role};

    struct Down;

    #[async_trait]
    impl RecordStore<UserProfile> for Down {
        async fn select(&self, _: &Query) -> Result<Vec<UserProfile>, StoreError> {
            Err(StoreError::Database("connection refused".into()))
        }
        async fn get(&self, _: UserId) -> Result<Option<UserProfile>, StoreError> {
            Err(StoreError::Database("connection refused".into()))
        }
        async fn insert(&self, r: UserProfile) -> Result<UserProfile, StoreError> {
            Ok(r)
        }
        async fn update(&self, r: UserProfile) -> Result<UserProfile, StoreError> {
            Ok(r)
        }
        async fn delete(&self, _: UserId) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn count(&self, _: &Query) -> Result<u64, StoreError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn fetches_present_and_absent_rows() {
        let store = Arc::new(InMemoryRecordStore::<UserProfile>::new());
        let identity = CallerIdentity::new(UserId::new(), "admin@example.com");
        let profile = UserProfile::for_identity(&identity, Some("Ops".into()), Role::Admin, Utc::now());
        store.insert(profile.clone()).await.unwrap();

        let directory = ProfileDirectory::new(store);
        assert_eq!(directory.fetch_profile(identity.id).await, Ok(Some(profile)));
        assert_eq!(directory.fetch_profile(UserId::new()).await, Ok(None));
    }

    #[tokio::test]
    async fn database_failures_are_reported_as_unreachable() {
        let directory = ProfileDirectory::new(Down);
        let err = directory.fetch_profile(UserId::new()).await.unwrap_err();
        assert!(err.is_unreachable());
    }
}
