//! Request/response DTOs that are not plain domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use exportdesk_auth::{AuthSession, Session};
use exportdesk_core::{DomainError, Validator};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        Validator::new()
            .email("email", &self.email, "Invalid email address")
            .required("password", &self.password, "Password is required")
            .finish()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Answer to a successful sign-in or refresh.
#[derive(Debug, Serialize)]
pub struct SignedInResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub session: Session,
}

impl SignedInResponse {
    pub fn new(auth: &AuthSession, session: Session) -> Self {
        Self {
            access_token: auth.access_token.as_str().to_string(),
            refresh_token: auth.refresh_token.as_str().to_string(),
            expires_at: auth.expires_at,
            session,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
}

/// Sidebar entry; groups carry children instead of a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavItem>,
}
