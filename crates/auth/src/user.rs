//! User profiles and the forms that create/edit them.
//!
//! A profile is the application-owned half of a user: one row per caller
//! identity, keyed by the same identifier. The provider owns the identity and
//! the credentials; the application owns the display name and the role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use exportdesk_core::{DomainError, Entity, UserId, Validator, normalize_optional};

use crate::{CallerIdentity, Role};

// ─────────────────────────────────────────────────────────────────────────────
// Profile
// ─────────────────────────────────────────────────────────────────────────────

/// Stored user profile.
///
/// # Invariants
/// - `id` equals the provider identity id and never changes.
/// - `created_at` never changes after the row exists.
/// - Only `full_name` and `role` are editable by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Profile row for a freshly signed-up identity.
    pub fn for_identity(
        identity: &CallerIdentity,
        full_name: Option<String>,
        role: Role,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            full_name: normalize_optional(full_name),
            role,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Name to show for this user ("No Name" when unset).
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or("No Name")
    }

    /// Apply an edit. Identifier, email and creation timestamp are untouched.
    pub fn apply(&mut self, update: ProfileUpdate, now: DateTime<Utc>) {
        self.full_name = update.full_name;
        self.role = update.role;
        self.updated_at = now;
    }
}

impl Entity for UserProfile {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Validated edit of a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub role: Role,
}

// ─────────────────────────────────────────────────────────────────────────────
// Forms
// ─────────────────────────────────────────────────────────────────────────────

const ROLE_NAMES: [&str; 2] = ["admin", "user"];

/// Submitted "Add New User" form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<String>,
}

/// A user creation request that passed validation.
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub role: Role,
}

impl core::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl UserForm {
    pub fn validate(self) -> Result<NewUser, DomainError> {
        Validator::new()
            .email("email", &self.email, "Invalid email address")
            .required("full_name", &self.full_name, "Full name is required")
            .min_len("password", &self.password, 6, "Password must be at least 6 characters")
            .one_of("role", self.role.as_deref(), &ROLE_NAMES, "Please select a role")
            .finish()?;

        let role = parse_role(self.role.as_deref())?;
        Ok(NewUser {
            email: self.email.trim().to_string(),
            full_name: self.full_name.trim().to_string(),
            password: self.password,
            role,
        })
    }
}

/// Submitted "Edit User" form (email and password are not editable here).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdateForm {
    #[serde(default)]
    pub full_name: String,
    pub role: Option<String>,
}

impl UserUpdateForm {
    pub fn validate(self) -> Result<ProfileUpdate, DomainError> {
        Validator::new()
            .required("full_name", &self.full_name, "Full name is required")
            .one_of("role", self.role.as_deref(), &ROLE_NAMES, "Please select a role")
            .finish()?;

        Ok(ProfileUpdate {
            full_name: normalize_optional(Some(self.full_name)),
            role: parse_role(self.role.as_deref())?,
        })
    }
}

fn parse_role(value: Option<&str>) -> Result<Role, DomainError> {
    value
        .unwrap_or_default()
        .parse()
        .map_err(|e: crate::roles::UnknownRole| DomainError::validation(e.to_string()))
}
