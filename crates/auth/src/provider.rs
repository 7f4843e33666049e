//! Ports to the external authentication provider and profile store.
//!
//! Both are remote services from the application's point of view. Adapters
//! live in `exportdesk-infra`.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

use exportdesk_core::UserId;

use crate::{AccessToken, AuthSession, CallerIdentity, RefreshToken, UserProfile};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Transport failure or the service answered with a server error.
    #[error("provider unreachable: {0}")]
    Unreachable(String),

    #[error("invalid login credentials")]
    InvalidCredentials,

    /// Token is malformed, expired or revoked.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// e.g. signing up an email that is already registered.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The provider refused the request for any other reason.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl ProviderError {
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

/// Credentials for a new account.
#[derive(Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

impl core::fmt::Debug for SignUp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SignUp")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .finish_non_exhaustive()
    }
}

/// Kind of authentication state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Notification delivered on the provider's auth-change channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStateChange {
    pub event: AuthEvent,
    /// Session after the change (`None` after sign-out).
    pub session: Option<AuthSession>,
    /// Token the change supersedes (sign-out, refresh).
    pub previous_token: Option<AccessToken>,
}

impl AuthStateChange {
    pub fn signed_in(session: AuthSession) -> Self {
        Self {
            event: AuthEvent::SignedIn,
            session: Some(session),
            previous_token: None,
        }
    }

    pub fn signed_out(token: AccessToken) -> Self {
        Self {
            event: AuthEvent::SignedOut,
            session: None,
            previous_token: Some(token),
        }
    }

    pub fn token_refreshed(previous: AccessToken, session: AuthSession) -> Self {
        Self {
            event: AuthEvent::TokenRefreshed,
            session: Some(session),
            previous_token: Some(previous),
        }
    }

    /// Identity carried by the change, if the caller is still signed in.
    pub fn identity(&self) -> Option<&CallerIdentity> {
        self.session.as_ref().map(|s| &s.identity)
    }

    /// Whether this change is about the session holding `token`.
    pub fn concerns(&self, token: &AccessToken) -> bool {
        self.previous_token.as_ref() == Some(token)
            || self.session.as_ref().map(|s| &s.access_token) == Some(token)
    }
}

/// External authentication service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Who holds `token`? `Ok(None)` when the token is not (or no longer) valid.
    async fn get_user(&self, token: &AccessToken) -> Result<Option<CallerIdentity>, ProviderError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ProviderError>;

    async fn sign_up(&self, request: SignUp) -> Result<CallerIdentity, ProviderError>;

    async fn sign_out(&self, token: &AccessToken) -> Result<(), ProviderError>;

    async fn refresh_session(&self, refresh_token: &RefreshToken) -> Result<AuthSession, ProviderError>;

    /// Register an observer for auth state changes.
    ///
    /// Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange>;
}

/// Remote store holding user profile rows.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` means the store answered and holds no row for `id`.
    async fn fetch_profile(&self, id: UserId) -> Result<Option<UserProfile>, ProviderError>;
}
