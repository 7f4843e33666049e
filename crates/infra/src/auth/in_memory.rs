//! Self-contained authentication provider.
//!
//! Accounts live in memory with argon2 password hashes. Access tokens are
//! HS256 JWTs carrying [`TokenClaims`]; each sign-in opens a session id that
//! sign-out revokes. Refresh tokens are single use.

use std::collections::HashMap;
use std::sync::RwLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use exportdesk_auth::{
    validate_claims, AccessToken, AuthProvider, AuthSession, AuthStateChange, CallerIdentity,
    ProviderError, RefreshToken, SignUp, TokenClaims,
};
use exportdesk_core::UserId;

use super::EVENT_CAPACITY;

const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    identity: CallerIdentity,
    password_hash: String,
}

struct RefreshGrant {
    user_id: UserId,
    session_id: Uuid,
    access_token: AccessToken,
}

#[derive(Default)]
struct Accounts {
    by_email: HashMap<String, Account>,
    /// Latest access-token expiry per open session.
    sessions: HashMap<Uuid, DateTime<Utc>>,
    /// Signed-out sessions, kept until their last token expires.
    revoked: HashMap<Uuid, DateTime<Utc>>,
    refresh: HashMap<RefreshToken, RefreshGrant>,
}

impl Accounts {
    fn by_id(&self, id: UserId) -> Option<&Account> {
        self.by_email.values().find(|a| a.identity.id == id)
    }

    /// Expired tokens fail validation anyway; forget their sessions.
    fn prune(&mut self, now: DateTime<Utc>) {
        self.sessions.retain(|_, expires_at| *expires_at > now);
        self.revoked.retain(|_, expires_at| *expires_at > now);
    }
}

pub struct InMemoryAuthProvider {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    accounts: RwLock<Accounts>,
    events: broadcast::Sender<AuthStateChange>,
}

impl core::fmt::Debug for InMemoryAuthProvider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryAuthProvider")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

fn poisoned() -> ProviderError {
    ProviderError::unreachable("account table lock poisoned")
}

impl InMemoryAuthProvider {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
            accounts: RwLock::new(Accounts::default()),
            events,
        }
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time window is checked by `validate_claims`.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation
    }

    /// Signature check only; the time window is checked separately.
    fn decode(&self, token: &AccessToken) -> Result<TokenClaims, ProviderError> {
        jsonwebtoken::decode::<TokenClaims>(token.as_str(), &self.decoding, &Self::validation())
            .map(|data| data.claims)
            .map_err(|e| ProviderError::InvalidToken(e.to_string()))
    }

    fn issue(
        &self,
        identity: &CallerIdentity,
        session_id: Uuid,
    ) -> Result<(AccessToken, chrono::DateTime<Utc>), ProviderError> {
        let issued_at = Utc::now();
        let claims = TokenClaims {
            sub: identity.id,
            email: identity.email.clone(),
            session_id,
            issued_at,
            expires_at: issued_at + self.ttl,
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ProviderError::Rejected(format!("failed to sign token: {e}")))?;
        Ok((AccessToken::new(token), claims.expires_at))
    }

    /// Mint a session and remember its refresh grant.
    fn open_session(
        &self,
        accounts: &mut Accounts,
        identity: CallerIdentity,
        session_id: Uuid,
    ) -> Result<AuthSession, ProviderError> {
        let (access_token, expires_at) = self.issue(&identity, session_id)?;
        accounts.prune(Utc::now());
        accounts.sessions.insert(session_id, expires_at);
        let refresh_token = RefreshToken::new(Uuid::new_v4().simple().to_string());
        accounts.refresh.insert(
            refresh_token.clone(),
            RefreshGrant {
                user_id: identity.id,
                session_id,
                access_token: access_token.clone(),
            },
        );
        Ok(AuthSession {
            access_token,
            refresh_token,
            expires_at,
            identity,
        })
    }

    fn notify(&self, change: AuthStateChange) {
        // No subscribers is fine.
        let _ = self.events.send(change);
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn get_user(&self, token: &AccessToken) -> Result<Option<CallerIdentity>, ProviderError> {
        let claims = self.decode(token)?;
        validate_claims(&claims, Utc::now()).map_err(|e| ProviderError::InvalidToken(e.to_string()))?;

        let accounts = self.accounts.read().map_err(|_| poisoned())?;
        if accounts.revoked.contains_key(&claims.session_id) {
            return Ok(None);
        }
        Ok(accounts.by_id(claims.sub).map(|a| a.identity.clone()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ProviderError> {
        let (identity, password_hash) = {
            let accounts = self.accounts.read().map_err(|_| poisoned())?;
            let account = accounts
                .by_email
                .get(&email_key(email))
                .ok_or(ProviderError::InvalidCredentials)?;
            (account.identity.clone(), account.password_hash.clone())
        };

        // Verified without holding the table lock.
        let parsed = PasswordHash::new(&password_hash)
            .map_err(|e| ProviderError::Rejected(format!("stored hash unreadable: {e}")))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| ProviderError::InvalidCredentials)?;

        let mut accounts = self.accounts.write().map_err(|_| poisoned())?;
        let session = self.open_session(&mut accounts, identity, Uuid::new_v4())?;
        drop(accounts);

        info!(user_id = %session.identity.id, "signed in");
        self.notify(AuthStateChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, request: SignUp) -> Result<CallerIdentity, ProviderError> {
        if request.password.len() < MIN_PASSWORD_LEN {
            return Err(ProviderError::Rejected(format!(
                "Password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let key = email_key(&request.email);
        if key.is_empty() {
            return Err(ProviderError::Rejected("email is required".into()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(request.password.as_bytes(), &salt)
            .map_err(|e| ProviderError::Rejected(format!("failed to hash password: {e}")))?
            .to_string();

        let mut accounts = self.accounts.write().map_err(|_| poisoned())?;
        if accounts.by_email.contains_key(&key) {
            return Err(ProviderError::Conflict("User already registered".into()));
        }
        let identity = CallerIdentity::new(UserId::new(), request.email.trim());
        accounts.by_email.insert(
            key,
            Account {
                identity: identity.clone(),
                password_hash,
            },
        );
        debug!(user_id = %identity.id, "account created");
        Ok(identity)
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), ProviderError> {
        // Expired tokens may still sign out.
        let claims = self.decode(token)?;
        {
            let mut accounts = self.accounts.write().map_err(|_| poisoned())?;
            let last_expiry = accounts
                .sessions
                .remove(&claims.session_id)
                .map_or(claims.expires_at, |expires_at| expires_at.max(claims.expires_at));
            accounts.revoked.insert(claims.session_id, last_expiry);
            accounts.prune(Utc::now());
            accounts.refresh.retain(|_, grant| grant.session_id != claims.session_id);
        }
        info!(user_id = %claims.sub, "signed out");
        self.notify(AuthStateChange::signed_out(token.clone()));
        Ok(())
    }

    async fn refresh_session(&self, refresh_token: &RefreshToken) -> Result<AuthSession, ProviderError> {
        let mut accounts = self.accounts.write().map_err(|_| poisoned())?;
        let grant = accounts
            .refresh
            .remove(refresh_token)
            .ok_or_else(|| ProviderError::InvalidToken("unknown refresh token".into()))?;
        if accounts.revoked.contains_key(&grant.session_id) {
            return Err(ProviderError::InvalidToken("session revoked".into()));
        }
        let identity = accounts
            .by_id(grant.user_id)
            .map(|a| a.identity.clone())
            .ok_or_else(|| ProviderError::InvalidToken("account no longer exists".into()))?;

        let session = self.open_session(&mut accounts, identity, grant.session_id)?;
        drop(accounts);

        self.notify(AuthStateChange::token_refreshed(grant.access_token, session.clone()));
        Ok(session)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }
}
