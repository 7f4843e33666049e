use exportdesk_auth::{AccessToken, Session};

/// Name of the cookie carrying the access token for browser callers.
pub const ACCESS_TOKEN_COOKIE: &str = "exportdesk-access-token";

/// Caller context for a request: the resolved session and the token it came from.
///
/// Inserted by the session middleware on every request; handlers never
/// resolve sessions themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    session: Session,
    token: Option<AccessToken>,
}

impl SessionContext {
    pub fn new(session: Session, token: Option<AccessToken>) -> Self {
        Self { session, token }
    }

    pub fn anonymous() -> Self {
        Self::new(Session::anonymous(), None)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }
}
