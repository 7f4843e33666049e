//! Caller identity as issued by the authentication provider.
//!
//! The application never mints or edits identities; it only reads them back
//! from the provider and uses the identifier to look up the matching profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use exportdesk_core::UserId;

/// Authenticated caller (opaque id + email).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub id: UserId,
    pub email: String,
}

impl CallerIdentity {
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

macro_rules! secret_string {
    ($t:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(String);

        impl $t {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Debug for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, concat!(stringify!($t), "(***)"))
            }
        }
    };
}

secret_string!(AccessToken, "Bearer token presented by a caller.");
secret_string!(RefreshToken, "Long-lived token exchanged for a fresh access token.");

/// A signed-in session as handed out by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub expires_at: DateTime<Utc>,
    pub identity: CallerIdentity,
}
