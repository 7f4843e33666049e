//! Service wiring: auth provider, profile lookups and the record stores.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

use exportdesk_auth::{
    AccessToken, AuthProvider, ProfileStore, ProviderError, Role, SessionResolver, SignUp,
    UserProfile,
};
use exportdesk_containers::Container;
use exportdesk_infra::store::postgres::migrate;
use exportdesk_infra::{
    HostedAuthProvider, InMemoryAuthProvider, InMemoryRecordStore, PostgresRecordStore,
    ProfileDirectory, RecordStore, StoreError,
};
use exportdesk_parties::{Consignee, NotifyParty, Shipper};

use crate::config::{AppConfig, AuthBackend, SeedAdmin};

pub struct AppServices {
    pub auth: Arc<dyn AuthProvider>,
    pub profiles: Arc<dyn ProfileStore>,
    pub users: Arc<dyn RecordStore<UserProfile>>,
    pub shippers: Arc<dyn RecordStore<Shipper>>,
    pub consignees: Arc<dyn RecordStore<Consignee>>,
    pub notify_parties: Arc<dyn RecordStore<NotifyParty>>,
    pub containers: Arc<dyn RecordStore<Container>>,
}

impl AppServices {
    /// Everything in process memory.
    pub fn in_memory(auth: Arc<dyn AuthProvider>) -> Self {
        let users: Arc<dyn RecordStore<UserProfile>> = Arc::new(InMemoryRecordStore::new());
        Self {
            auth,
            profiles: Arc::new(ProfileDirectory::new(users.clone())),
            users,
            shippers: Arc::new(InMemoryRecordStore::new()),
            consignees: Arc::new(InMemoryRecordStore::new()),
            notify_parties: Arc::new(InMemoryRecordStore::new()),
            containers: Arc::new(InMemoryRecordStore::new()),
        }
    }

    /// Records in Postgres.
    pub fn postgres(pool: sqlx::PgPool, auth: Arc<dyn AuthProvider>) -> Self {
        let users: Arc<dyn RecordStore<UserProfile>> = Arc::new(PostgresRecordStore::new(pool.clone()));
        Self {
            auth,
            profiles: Arc::new(ProfileDirectory::new(users.clone())),
            users,
            shippers: Arc::new(PostgresRecordStore::new(pool.clone())),
            consignees: Arc::new(PostgresRecordStore::new(pool.clone())),
            notify_parties: Arc::new(PostgresRecordStore::new(pool.clone())),
            containers: Arc::new(PostgresRecordStore::new(pool)),
        }
    }

    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let auth: Arc<dyn AuthProvider> = match &config.auth {
            AuthBackend::Hosted { url, anon_key } => {
                tracing::info!(%url, "using hosted auth service");
                Arc::new(HostedAuthProvider::new(url.clone(), anon_key.clone()))
            }
            AuthBackend::InMemory => Arc::new(InMemoryAuthProvider::new(
                config.token_secret.as_bytes(),
                config.token_ttl,
            )),
        };

        let services = match &config.database_url {
            Some(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("failed to connect to DATABASE_URL")?;
                migrate(&pool).await.context("failed to create tables")?;
                Self::postgres(pool, auth)
            }
            None => Self::in_memory(auth),
        };

        if let Some(seed) = &config.seed_admin {
            services.seed_admin(seed).await?;
        }
        Ok(services)
    }

    /// Create the first admin account (skipped when the email is taken).
    pub async fn seed_admin(&self, seed: &SeedAdmin) -> anyhow::Result<()> {
        let request = SignUp {
            email: seed.email.clone(),
            password: seed.password.clone(),
            full_name: Some("Administrator".to_string()),
        };
        let identity = match self.auth.sign_up(request).await {
            Ok(identity) => identity,
            Err(ProviderError::Conflict(_)) => {
                tracing::info!(email = %seed.email, "seed admin already registered");
                return Ok(());
            }
            Err(e) => return Err(e).context("failed to register seed admin"),
        };

        let profile = UserProfile::for_identity(
            &identity,
            Some("Administrator".to_string()),
            Role::Admin,
            Utc::now(),
        );
        match self.users.insert(profile).await {
            Ok(_) | Err(StoreError::Conflict(_)) => {}
            Err(e) => return Err(e).context("failed to store seed admin profile"),
        }
        tracing::info!(user_id = %identity.id, "seed admin created");
        Ok(())
    }
}

/// Stream the caller's session, re-sent whenever the provider reports a change for it.
///
/// The stream owns its resolver; the listener stops when the client goes away.
pub async fn session_sse_stream(
    services: Arc<AppServices>,
    token: Option<AccessToken>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let resolver = Arc::new(SessionResolver::new(
        services.auth.clone(),
        services.profiles.clone(),
        token,
    ));
    let rx = resolver.subscribe();
    let listener = resolver.spawn_listener(services.auth.subscribe());
    resolver.resolve_initial_session().await;

    let stream = WatchStream::new(rx).map(move |session| {
        let _listener = &listener;
        let data = serde_json::to_string(&session).unwrap_or_else(|_| "{}".to_string());
        Ok(SseEvent::default().event("session").data(data))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
