//! Session resolution: "who is calling, and what is their profile?"
//!
//! Two entry points share the same logic:
//! - [`resolve_session`] resolves once for a server-rendered request.
//! - [`SessionResolver`] owns a long-lived context (SSE stream, CLI, tests):
//!   it is the single writer of a `watch` channel and keeps the session
//!   current as auth state changes arrive.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::{
    AccessToken, AuthProvider, AuthStateChange, CallerIdentity, ProfileState, ProfileStore,
    ProviderError, Session,
};

/// Resolve the session for a single request.
///
/// - No token, or a token the provider does not recognise → anonymous.
/// - Provider unreachable → anonymous (logged, never fatal).
/// - Otherwise the profile row is looked up; see [`session_for_identity`].
pub async fn resolve_session(
    provider: &dyn AuthProvider,
    profiles: &dyn ProfileStore,
    token: Option<&AccessToken>,
) -> Session {
    let Some(token) = token else {
        return Session::anonymous();
    };

    let identity = match provider.get_user(token).await {
        Ok(Some(identity)) => identity,
        Ok(None) => return Session::anonymous(),
        Err(ProviderError::InvalidToken(reason)) => {
            tracing::debug!(%reason, "rejected access token");
            return Session::anonymous();
        }
        Err(e) => {
            tracing::warn!(error = %e, "auth provider lookup failed; treating caller as signed out");
            return Session::anonymous();
        }
    };

    session_for_identity(profiles, Some(identity)).await
}

/// Compose the session for an already-known identity.
///
/// A missing row and a failed lookup are kept apart (`Missing` vs
/// `Unavailable`); neither grants a role.
pub async fn session_for_identity(
    profiles: &dyn ProfileStore,
    identity: Option<CallerIdentity>,
) -> Session {
    let Some(identity) = identity else {
        return Session::anonymous();
    };

    let profile = match profiles.fetch_profile(identity.id).await {
        Ok(Some(profile)) => ProfileState::Present(profile),
        Ok(None) => {
            tracing::warn!(user_id = %identity.id, "signed-in user has no profile row");
            ProfileState::Missing
        }
        Err(e) => {
            tracing::error!(user_id = %identity.id, error = %e, "failed to fetch user profile");
            ProfileState::Unavailable(e.to_string())
        }
    };

    Session::authenticated(identity, profile)
}

#[derive(Debug, Default)]
struct ContextState {
    token: Option<AccessToken>,
    /// Bumped by every operation that will write the session; only the most
    /// recent operation may publish.
    generation: u64,
}

/// Single writer of one caller context's session.
pub struct SessionResolver {
    provider: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    state: Mutex<ContextState>,
    tx: watch::Sender<Session>,
}

impl SessionResolver {
    /// New context, starting in the loading state.
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
        token: Option<AccessToken>,
    ) -> Self {
        let (tx, _rx) = watch::channel(Session::loading());
        Self {
            provider,
            profiles,
            state: Mutex::new(ContextState {
                token,
                generation: 0,
            }),
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn token(&self) -> Option<AccessToken> {
        self.lock().token.clone()
    }

    /// Resolve from whatever token the context currently holds.
    ///
    /// If a newer operation started meanwhile, its result wins and the
    /// current value is returned instead.
    pub async fn resolve_initial_session(&self) -> Session {
        let (ticket, token) = {
            let mut state = self.lock();
            state.generation += 1;
            (state.generation, state.token.clone())
        };

        let session = resolve_session(&*self.provider, &*self.profiles, token.as_ref()).await;
        self.publish(ticket, session)
    }

    /// Recompute the session from an auth state change.
    ///
    /// Delivering the same change twice yields the same session.
    pub async fn on_auth_state_changed(&self, change: AuthStateChange) -> Session {
        let ticket = {
            let mut state = self.lock();
            state.token = change.session.as_ref().map(|s| s.access_token.clone());
            state.generation += 1;
            state.generation
        };

        tracing::debug!(event = ?change.event, "auth state changed");
        let session = session_for_identity(&*self.profiles, change.identity().cloned()).await;
        self.publish(ticket, session)
    }

    /// Sign in through the provider and adopt the resulting session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        let auth = self.provider.sign_in(email, password).await?;
        Ok(self.on_auth_state_changed(AuthStateChange::signed_in(auth)).await)
    }

    /// Ask the provider to end the session, then clear it locally no matter
    /// what the provider answered.
    pub async fn sign_out(&self) {
        let (ticket, token) = {
            let mut state = self.lock();
            state.generation += 1;
            (state.generation, state.token.take())
        };

        if let Some(token) = token {
            if let Err(e) = self.provider.sign_out(&token).await {
                tracing::warn!(error = %e, "provider sign-out failed; clearing local session anyway");
            }
        }

        self.publish(ticket, Session::anonymous());
    }

    /// Apply provider notifications to this context until every subscriber is
    /// gone, the channel closes, or the returned handle is dropped.
    ///
    /// Subscribe before spawning: a context without subscribers stops at once.
    pub fn spawn_listener(
        self: &Arc<Self>,
        mut events: broadcast::Receiver<AuthStateChange>,
    ) -> ListenerHandle {
        let resolver = Arc::clone(self);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = resolver.tx.closed() => {
                        tracing::debug!("session context has no subscribers; stopping listener");
                        break;
                    }
                    received = events.recv() => match received {
                        Ok(change) => {
                            if resolver.is_relevant(&change) {
                                resolver.on_auth_state_changed(change).await;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "auth change channel lagged; re-resolving session");
                            resolver.resolve_initial_session().await;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });

        ListenerHandle { task: Some(task) }
    }

    fn is_relevant(&self, change: &AuthStateChange) -> bool {
        match &self.lock().token {
            Some(token) => change.concerns(token),
            None => false,
        }
    }

    fn publish(&self, ticket: u64, session: Session) -> Session {
        let state = self.lock();
        if state.generation == ticket {
            self.tx.send_replace(session.clone());
            session
        } else {
            tracing::debug!(ticket, latest = state.generation, "dropping superseded session resolution");
            self.tx.borrow().clone()
        }
    }

    fn lock(&self) -> MutexGuard<'_, ContextState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Running listener task; dropping it cancels the task.
#[derive(Debug)]
pub struct ListenerHandle {
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Wait for the listener to stop on its own.
    pub async fn wait(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
