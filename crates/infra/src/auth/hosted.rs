//! Client for a hosted GoTrue-compatible auth REST API.
//!
//! Every request carries the project's anon key in the `apikey` header.
//! Transport failures and 5xx answers map to [`ProviderError::Unreachable`].

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use exportdesk_auth::{
    AccessToken, AuthProvider, AuthSession, AuthStateChange, CallerIdentity, ProviderError,
    RefreshToken, SignUp,
};

use super::EVENT_CAPACITY;

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl From<RemoteUser> for CallerIdentity {
    fn from(user: RemoteUser) -> Self {
        CallerIdentity::new(user.id.into(), user.email.unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: RemoteUser,
}

impl From<TokenResponse> for AuthSession {
    fn from(r: TokenResponse) -> Self {
        AuthSession {
            access_token: AccessToken::new(r.access_token),
            refresh_token: RefreshToken::new(r.refresh_token),
            expires_at: Utc::now() + Duration::seconds(r.expires_in),
            identity: r.user.into(),
        }
    }
}

/// Sign-up answers with a session when autoconfirm is on, a bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    WithSession { user: RemoteUser },
    User(RemoteUser),
}

#[derive(Debug, Clone)]
pub struct HostedAuthProvider {
    client: Client,
    base_url: String,
    anon_key: String,
    events: broadcast::Sender<AuthStateChange>,
}

impl HostedAuthProvider {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, anon_key)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            events,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("apikey", &self.anon_key)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ProviderError> {
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::unreachable(e.to_string()))?;
        if response.status().is_server_error() {
            let status = response.status();
            warn!(%status, "auth service answered with a server error");
            return Err(ProviderError::unreachable(format!("auth service returned {status}")));
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ProviderError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Rejected(format!("unexpected auth response: {e}")))
    }

    fn notify(&self, change: AuthStateChange) {
        let _ = self.events.send(change);
    }
}

/// Best-effort message from a GoTrue error body.
async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body: serde_json::Value = response.json().await.unwrap_or_default();
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}

#[async_trait]
impl AuthProvider for HostedAuthProvider {
    async fn get_user(&self, token: &AccessToken) -> Result<Option<CallerIdentity>, ProviderError> {
        let response = self
            .send(self.request(reqwest::Method::GET, "/user").bearer_auth(token.as_str()))
            .await?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                debug!(status = %response.status(), "token not accepted");
                Ok(None)
            }
            status if status.is_success() => Ok(Some(Self::json::<RemoteUser>(response).await?.into())),
            _ => Err(ProviderError::InvalidToken(error_message(response).await)),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ProviderError> {
        let response = self
            .send(
                self.request(reqwest::Method::POST, "/token?grant_type=password")
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;
        if response.status() == StatusCode::BAD_REQUEST {
            return Err(ProviderError::InvalidCredentials);
        }
        if !response.status().is_success() {
            return Err(ProviderError::Rejected(error_message(response).await));
        }
        let session: AuthSession = Self::json::<TokenResponse>(response).await?.into();
        self.notify(AuthStateChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, request: SignUp) -> Result<CallerIdentity, ProviderError> {
        let response = self
            .send(self.request(reqwest::Method::POST, "/signup").json(&json!({
                "email": request.email,
                "password": request.password,
                "data": { "full_name": request.full_name },
            })))
            .await?;
        if !response.status().is_success() {
            let message = error_message(response).await;
            return Err(if message.contains("already registered") {
                ProviderError::Conflict(message)
            } else {
                ProviderError::Rejected(message)
            });
        }
        Ok(match Self::json::<SignUpResponse>(response).await? {
            SignUpResponse::WithSession { user } | SignUpResponse::User(user) => user.into(),
        })
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), ProviderError> {
        let response = self
            .send(self.request(reqwest::Method::POST, "/logout").bearer_auth(token.as_str()))
            .await?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ProviderError::InvalidToken(error_message(response).await))
            }
            status if status.is_success() => {
                self.notify(AuthStateChange::signed_out(token.clone()));
                Ok(())
            }
            _ => Err(ProviderError::Rejected(error_message(response).await)),
        }
    }

    async fn refresh_session(&self, refresh_token: &RefreshToken) -> Result<AuthSession, ProviderError> {
        let response = self
            .send(
                self.request(reqwest::Method::POST, "/token?grant_type=refresh_token")
                    .json(&json!({ "refresh_token": refresh_token.as_str() })),
            )
            .await?;
        if !response.status().is_success() {
            return Err(ProviderError::InvalidToken(error_message(response).await));
        }
        let session: AuthSession = Self::json::<TokenResponse>(response).await?.into();
        // The access token being replaced is not known to this client.
        self.notify(AuthStateChange {
            event: exportdesk_auth::AuthEvent::TokenRefreshed,
            session: Some(session.clone()),
            previous_token: None,
        });
        Ok(session)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::collections::HashMap;

    const USER_ID: &str = "0190a3a4-5b6c-7d8e-9f00-112233445566";

    async fn token(Query(q): Query<HashMap<String, String>>, Json(body): Json<serde_json::Value>) -> axum::response::Response {
        use axum::response::IntoResponse;
        if q.get("grant_type").map(String::as_str) == Some("password") && body["password"] != "hunter22" {
            return (StatusCode::BAD_REQUEST, Json(json!({"error_description": "Invalid login credentials"})))
                .into_response();
        }
        Json(json!({
            "access_token": "remote-access",
            "refresh_token": "remote-refresh",
            "expires_in": 3600,
            "user": { "id": USER_ID, "email": "ops@example.com" },
        }))
        .into_response()
    }

    async fn user(headers: HeaderMap) -> axum::response::Response {
        use axum::response::IntoResponse;
        let ok = headers.get("apikey").is_some()
            && headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer remote-access");
        if ok {
            Json(json!({ "id": USER_ID, "email": "ops@example.com" })).into_response()
        } else {
            (StatusCode::UNAUTHORIZED, Json(json!({"msg": "invalid JWT"}))).into_response()
        }
    }

    async fn signup(Json(body): Json<serde_json::Value>) -> axum::response::Response {
        use axum::response::IntoResponse;
        if body["email"] == "taken@example.com" {
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"msg": "User already registered"})))
                .into_response();
        }
        Json(json!({ "id": USER_ID, "email": body["email"] })).into_response()
    }

    async fn spawn_fake() -> String {
        let app = Router::new()
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/user", get(user))
            .route("/auth/v1/signup", post(signup))
            .route("/auth/v1/logout", post(|| async { StatusCode::NO_CONTENT }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn password_grant_and_user_lookup() {
        let provider = HostedAuthProvider::new(spawn_fake().await, "anon");
        let session = provider.sign_in("ops@example.com", "hunter22").await.unwrap();
        assert_eq!(session.access_token.as_str(), "remote-access");
        assert_eq!(session.identity.id.to_string(), USER_ID);

        let identity = provider.get_user(&session.access_token).await.unwrap();
        assert_eq!(identity.map(|i| i.email), Some("ops@example.com".to_string()));
        assert_eq!(provider.get_user(&AccessToken::new("stale")).await, Ok(None));
    }

    #[tokio::test]
    async fn bad_password_is_invalid_credentials() {
        let provider = HostedAuthProvider::new(spawn_fake().await, "anon");
        assert_eq!(
            provider.sign_in("ops@example.com", "nope").await,
            Err(ProviderError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn sign_up_maps_duplicate_email_to_conflict() {
        let provider = HostedAuthProvider::new(spawn_fake().await, "anon");
        let request = |email: &str| SignUp {
            email: email.into(),
            password: "hunter22".into(),
            full_name: None,
        };
        assert!(provider.sign_up(request("new@example.com")).await.is_ok());
        assert!(matches!(
            provider.sign_up(request("taken@example.com")).await,
            Err(ProviderError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn sign_out_broadcasts() {
        let provider = HostedAuthProvider::new(spawn_fake().await, "anon");
        let mut events = provider.subscribe();
        let token = AccessToken::new("remote-access");
        provider.sign_out(&token).await.unwrap();
        assert!(events.recv().await.unwrap().concerns(&token));
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider = HostedAuthProvider::new(format!("http://{addr}"), "anon");
        let err = provider.get_user(&AccessToken::new("x")).await.unwrap_err();
        assert!(err.is_unreachable());
    }
}
