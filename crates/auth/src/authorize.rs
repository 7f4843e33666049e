//! Access guard for role-restricted pages.
//!
//! This is the only place that compares roles. Pages state what they need
//! (`None` = any signed-in caller, `Some(Role::Admin)` = admins only) and act
//! on the returned [`Access`].
//!
//! - No IO
//! - No panics
//! - Evaluated on every navigation; nothing is cached across sessions.

use serde::Serialize;

use crate::{ProfileState, Role, Session};

/// Where a denied caller is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Login,
    Unauthorized,
}

impl Destination {
    pub fn path(&self) -> &'static str {
        match self {
            Destination::Login => "/login",
            Destination::Unauthorized => "/unauthorized",
        }
    }
}

/// Guard decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "destination", rename_all = "snake_case")]
pub enum Access {
    Allow,
    RedirectTo(Destination),
}

impl Access {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Access::Allow)
    }
}

/// Decide whether `session` may view a page requiring `required`.
///
/// A session without identity (anonymous, or still loading) goes to login.
/// An identity whose profile is missing or could not be fetched counts as
/// non-admin: it is sent to `/unauthorized`, never back to login.
pub fn authorize(session: &Session, required: Option<Role>) -> Access {
    if !session.is_authenticated() {
        return Access::RedirectTo(Destination::Login);
    }

    match required {
        Some(Role::Admin) if session.role() != Some(Role::Admin) => {
            Access::RedirectTo(Destination::Unauthorized)
        }
        _ => Access::Allow,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision explanation (audit trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Loggable account of an access decision.
#[derive(Debug, Clone, Serialize)]
pub struct AccessExplanation {
    pub access: Access,
    pub required_role: Option<Role>,
    pub reason: &'static str,
}

/// Same decision as [`authorize`], plus why.
pub fn explain_access(session: &Session, required: Option<Role>) -> AccessExplanation {
    let access = authorize(session, required);
    let reason = match (access, session.profile_state()) {
        (Access::Allow, _) if required.is_none() => "signed in; no role required",
        (Access::Allow, _) => "profile role satisfies requirement",
        (Access::RedirectTo(Destination::Login), _) if session.is_loading() => {
            "session still resolving"
        }
        (Access::RedirectTo(Destination::Login), _) => "no signed-in identity",
        (Access::RedirectTo(Destination::Unauthorized), ProfileState::Missing) => {
            "no profile row for identity"
        }
        (Access::RedirectTo(Destination::Unauthorized), ProfileState::Unavailable(_)) => {
            "profile lookup failed"
        }
        (Access::RedirectTo(Destination::Unauthorized), _) => "profile role lacks requirement",
    };

    AccessExplanation {
        access,
        required_role: required,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use exportdesk_core::UserId;

    use crate::{CallerIdentity, UserProfile};

    fn session_with(role: Option<Role>) -> Session {
        let identity = CallerIdentity::new(UserId::new(), "someone@example.com");
        let profile = match role {
            Some(role) => {
                ProfileState::Present(UserProfile::for_identity(&identity, None, role, Utc::now()))
            }
            None => ProfileState::Missing,
        };
        Session::authenticated(identity, profile)
    }

    #[test]
    fn user_visiting_user_management_is_sent_to_unauthorized() {
        let access = authorize(&session_with(Some(Role::User)), Some(Role::Admin));
        assert_eq!(access, Access::RedirectTo(Destination::Unauthorized));
        assert_eq!(Destination::Unauthorized.path(), "/unauthorized");
    }

    #[test]
    fn anonymous_visiting_dashboard_is_sent_to_login() {
        let access = authorize(&Session::anonymous(), None);
        assert_eq!(access, Access::RedirectTo(Destination::Login));
        assert_eq!(Destination::Login.path(), "/login");
    }

    #[test]
    fn admin_with_profile_is_allowed_into_user_management() {
        assert_eq!(authorize(&session_with(Some(Role::Admin)), Some(Role::Admin)), Access::Allow);
    }

    #[test]
    fn failed_profile_lookup_is_unauthorized_not_login() {
        let identity = CallerIdentity::new(UserId::new(), "x@example.com");
        let session = Session::authenticated(identity, ProfileState::Unavailable("boom".into()));
        assert_eq!(
            authorize(&session, Some(Role::Admin)),
            Access::RedirectTo(Destination::Unauthorized)
        );
        assert_eq!(authorize(&session, None), Access::Allow);
        assert_eq!(explain_access(&session, Some(Role::Admin)).reason, "profile lookup failed");
    }

    #[test]
    fn loading_session_is_not_let_through() {
        let explanation = explain_access(&Session::loading(), None);
        assert_eq!(explanation.access, Access::RedirectTo(Destination::Login));
        assert_eq!(explanation.reason, "session still resolving");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_required() -> impl Strategy<Value = Option<Role>> {
            prop_oneof![Just(None), Just(Some(Role::Admin)), Just(Some(Role::User))]
        }

        fn any_profile_role() -> impl Strategy<Value = Option<Role>> {
            prop_oneof![Just(None), Just(Some(Role::Admin)), Just(Some(Role::User))]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: no identity → login, whatever is required.
            #[test]
            fn absent_identity_always_redirects_to_login(required in any_required(), loading in any::<bool>()) {
                let session = if loading { Session::loading() } else { Session::anonymous() };
                prop_assert_eq!(authorize(&session, required), Access::RedirectTo(Destination::Login));
            }

            /// Property: with an identity, `None` requirement always allows.
            #[test]
            fn no_requirement_allows_any_identity(role in any_profile_role()) {
                prop_assert_eq!(authorize(&session_with(role), None), Access::Allow);
            }

            /// Property: admin gate allows exactly the admin profiles.
            #[test]
            fn admin_gate_matches_profile_role(role in any_profile_role()) {
                let access = authorize(&session_with(role), Some(Role::Admin));
                if role == Some(Role::Admin) {
                    prop_assert_eq!(access, Access::Allow);
                } else {
                    prop_assert_eq!(access, Access::RedirectTo(Destination::Unauthorized));
                }
            }

            /// Property: the decision is a pure function of its inputs.
            #[test]
            fn decision_is_deterministic(role in any_profile_role(), required in any_required()) {
                let session = session_with(role);
                prop_assert_eq!(authorize(&session, required), authorize(&session.clone(), required));
            }
        }
    }
}
