//! `exportdesk-auth`: authentication/authorization session model.
//!
//! No HTTP or storage code here: the provider
//! and the profile store are ports, adapters live in `exportdesk-infra`.

pub mod authorize;
pub mod claims;
pub mod identity;
pub mod provider;
pub mod resolver;
pub mod roles;
pub mod session;
pub mod user;

pub use authorize::{authorize, explain_access, Access, AccessExplanation, Destination};
pub use claims::{validate_claims, TokenClaims, TokenValidationError};
pub use identity::{AccessToken, AuthSession, CallerIdentity, RefreshToken};
pub use provider::{AuthEvent, AuthProvider, AuthStateChange, ProfileStore, ProviderError, SignUp};
pub use resolver::{resolve_session, session_for_identity, ListenerHandle, SessionResolver};
pub use roles::Role;
pub use session::{ProfileState, Session};
pub use user::{NewUser, ProfileUpdate, UserForm, UserProfile, UserUpdateForm};
