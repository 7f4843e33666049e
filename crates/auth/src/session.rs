//! Resolved session for one caller context.
//!
//! A `Session` is an owned value: request handlers receive it through request
//! extensions, long-lived contexts read it from a `watch` channel with a single
//! writer. It is replaced wholesale on every change, never patched in place.

use serde::Serialize;

use crate::{CallerIdentity, Role, UserProfile};

/// Outcome of the profile lookup for a resolved identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ProfileState {
    /// No identity yet, or resolution still pending.
    Unresolved,
    /// The profile row was found.
    Present(UserProfile),
    /// The store answered, but holds no row for this identity.
    Missing,
    /// The lookup itself failed (store unreachable, decode error, ...).
    Unavailable(String),
}

impl ProfileState {
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            ProfileState::Present(p) => Some(p),
            _ => None,
        }
    }
}

/// `{identity, profile, loading}` for the current caller.
///
/// # Invariants
/// - Without an identity the profile is always `Unresolved`.
/// - A failed profile lookup is kept as `Unavailable`; it never turns into a
///   profile with a default role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    identity: Option<CallerIdentity>,
    profile: ProfileState,
    loading: bool,
}

impl Session {
    /// Initial value of a context whose first resolution has not finished.
    pub fn loading() -> Self {
        Self {
            identity: None,
            profile: ProfileState::Unresolved,
            loading: true,
        }
    }

    /// Resolved: nobody is signed in.
    pub fn anonymous() -> Self {
        Self {
            identity: None,
            profile: ProfileState::Unresolved,
            loading: false,
        }
    }

    /// Resolved: `identity` is signed in and its profile lookup ended in `profile`.
    pub fn authenticated(identity: CallerIdentity, profile: ProfileState) -> Self {
        let profile = match profile {
            ProfileState::Unresolved => ProfileState::Missing,
            other => other,
        };
        Self {
            identity: Some(identity),
            profile,
            loading: false,
        }
    }

    pub fn identity(&self) -> Option<&CallerIdentity> {
        self.identity.as_ref()
    }

    pub fn profile_state(&self) -> &ProfileState {
        &self.profile
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.profile()
    }

    /// Role from the resolved profile, if any.
    pub fn role(&self) -> Option<Role> {
        self.profile().map(|p| p.role)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::loading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use exportdesk_core::UserId;

    #[test]
    fn anonymous_and_loading_have_no_identity() {
        assert!(!Session::anonymous().is_authenticated());
        assert!(!Session::anonymous().is_loading());
        assert!(Session::loading().is_loading());
        assert_eq!(Session::loading().profile_state(), &ProfileState::Unresolved);
    }

    #[test]
    fn authenticated_never_keeps_unresolved_profile() {
        let identity = CallerIdentity::new(UserId::new(), "a@example.com");
        let session = Session::authenticated(identity, ProfileState::Unresolved);
        assert_eq!(session.profile_state(), &ProfileState::Missing);
        assert_eq!(session.role(), None);
    }

    #[test]
    fn failed_lookup_has_no_role() {
        let identity = CallerIdentity::new(UserId::new(), "a@example.com");
        let session = Session::authenticated(identity, ProfileState::Unavailable("timeout".into()));
        assert!(session.is_authenticated());
        assert_eq!(session.role(), None);
    }

    #[test]
    fn role_comes_from_profile() {
        let identity = CallerIdentity::new(UserId::new(), "a@example.com");
        let profile = UserProfile::for_identity(&identity, None, Role::Admin, Utc::now());
        let session = Session::authenticated(identity, ProfileState::Present(profile));
        assert_eq!(session.role(), Some(Role::Admin));
    }
}
