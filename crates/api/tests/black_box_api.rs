use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::{header, redirect, StatusCode};
use serde_json::json;

use exportdesk_api::app::{build_app, AppServices};
use exportdesk_api::config::SeedAdmin;
use exportdesk_auth::{AuthProvider, Role, SignUp, UserProfile};
use exportdesk_infra::{InMemoryAuthProvider, Query, RecordStore};

const ADMIN_EMAIL: &str = "admin@fresh-export.example";
const ADMIN_PASSWORD: &str = "admin-pass";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod with in-memory backends, bound to an ephemeral port.
        let auth = Arc::new(InMemoryAuthProvider::new(b"test-secret", Duration::hours(1)));
        let services = Arc::new(AppServices::in_memory(auth));
        services
            .seed_admin(&SeedAdmin {
                email: ADMIN_EMAIL.into(),
                password: ADMIN_PASSWORD.into(),
            })
            .await
            .expect("failed to seed admin");

        let app = build_app(services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            base_url,
            services,
            client,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register an account; `role: None` leaves it without a profile row.
    async fn add_account(&self, email: &str, password: &str, role: Option<Role>) {
        let identity = self
            .services
            .auth
            .sign_up(SignUp {
                email: email.into(),
                password: password.into(),
                full_name: None,
            })
            .await
            .unwrap();
        if let Some(role) = role {
            let profile = UserProfile::for_identity(&identity, Some("Clerk".into()), role, Utc::now());
            self.services.users.insert(profile).await.unwrap();
        }
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = res.json().await.unwrap();
        body["access_token"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn location(res: &reqwest::Response) -> &str {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn health_carries_security_headers() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-frame-options"], "DENY");
    assert_eq!(res.headers()["x-content-type-options"], "nosniff");
    assert_eq!(res.headers()["referrer-policy"], "origin-when-cross-origin");
}

#[tokio::test]
async fn anonymous_dashboard_visit_redirects_to_login() {
    let srv = TestServer::spawn().await;
    for path in ["/dashboard", "/dashboard/shippers", "/dashboard/users"] {
        let res = srv.client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&res), "/login", "{path}");
    }
}

#[tokio::test]
async fn regular_user_is_sent_to_unauthorized_for_user_management() {
    let srv = TestServer::spawn().await;
    srv.add_account("clerk@fresh-export.example", "clerk-pass", Some(Role::User)).await;
    let token = srv.login("clerk@fresh-export.example", "clerk-pass").await;

    let res = srv.client.get(srv.url("/dashboard/users")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/unauthorized");

    let res = srv.client.get(srv.url("/dashboard")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.get(srv.url("/unauthorized")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn demoted_admin_loses_user_management_on_next_visit() {
    let srv = TestServer::spawn().await;
    srv.add_account("lead@fresh-export.example", "lead-pass", Some(Role::Admin)).await;
    let token = srv.login("lead@fresh-export.example", "lead-pass").await;

    let res = srv.client.get(srv.url("/dashboard/users")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let mut profile = srv
        .services
        .users
        .select(&Query::new().eq("email", "lead@fresh-export.example"))
        .await
        .unwrap()
        .pop()
        .unwrap();
    profile.role = Role::User;
    srv.services.users.update(profile).await.unwrap();

    // Same token; the role is read again on every request.
    let res = srv.client.get(srv.url("/dashboard/users")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/unauthorized");

    let res = srv.client.get(srv.url("/dashboard")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn signed_in_caller_without_profile_row_is_not_an_admin() {
    let srv = TestServer::spawn().await;
    srv.add_account("orphan@fresh-export.example", "orphan-pass", None).await;
    let token = srv.login("orphan@fresh-export.example", "orphan-pass").await;

    let res = srv.client.get(srv.url("/auth/session")).bearer_auth(&token).send().await.unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["profile"]["state"], "missing");

    let res = srv.client.get(srv.url("/dashboard/users")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(location(&res), "/unauthorized");
}

#[tokio::test]
async fn admin_creates_user_who_can_then_sign_in() {
    let srv = TestServer::spawn().await;
    let admin = srv.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let res = srv
        .client
        .post(srv.url("/dashboard/users"))
        .bearer_auth(&admin)
        .json(&json!({ "email": "siti@fresh-export.example", "full_name": "Siti Rahma", "password": "hunter22", "role": "user" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    assert_eq!(created["role"], "user");

    let token = srv.login("siti@fresh-export.example", "hunter22").await;
    let res = srv.client.get(srv.url("/auth/session")).bearer_auth(&token).send().await.unwrap();
    let session: serde_json::Value = res.json().await.unwrap();
    assert_eq!(session["profile"]["detail"]["full_name"], "Siti Rahma");

    let res = srv
        .client
        .get(srv.url("/dashboard/users"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let list: serde_json::Value = res.json().await.unwrap();
    assert_eq!(list["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_user_form_reports_each_field() {
    let srv = TestServer::spawn().await;
    let admin = srv.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let res = srv
        .client
        .post(srv.url("/dashboard/users"))
        .bearer_auth(&admin)
        .json(&json!({ "email": "nope", "full_name": "", "password": "123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["fields"]["password"], "Password must be at least 6 characters");
    assert_eq!(body["fields"]["role"], "Please select a role");
}

#[tokio::test]
async fn shipper_lifecycle() {
    let srv = TestServer::spawn().await;
    let token = srv.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let shippers = srv.url("/dashboard/shippers");

    let res = srv.client.post(&shippers).bearer_auth(&token).json(&json!({ "name": "" })).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["fields"]["name"], "Company name is required");

    let mut ids = Vec::new();
    for name in ["PT Buah Segar", "Golden Mango Exports"] {
        let res = srv
            .client
            .post(&shippers)
            .bearer_auth(&token)
            .json(&json!({ "name": name, "address": "Jl. Pelabuhan 1, Surabaya", "phone": "" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: serde_json::Value = res.json().await.unwrap();
        assert!(body["phone"].is_null());
        ids.push(body["id"].as_str().unwrap().to_string());
    }

    let list: serde_json::Value = srv.client.get(&shippers).bearer_auth(&token).send().await.unwrap().json().await.unwrap();
    assert_eq!(list["items"][0]["name"], "Golden Mango Exports");

    let res = srv
        .client
        .put(format!("{shippers}/{}", ids[0]))
        .bearer_auth(&token)
        .json(&json!({ "name": "PT Buah Segar Tbk", "address": "Jl. Pelabuhan 2, Surabaya" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["name"], "PT Buah Segar Tbk");

    let res = srv.client.delete(format!("{shippers}/{}", ids[0])).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = srv.client.get(format!("{shippers}/{}", ids[0])).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv.client.get(format!("{shippers}/not-a-uuid")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn containers_feed_the_dashboard_overview() {
    let srv = TestServer::spawn().await;
    let token = srv.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let options: serde_json::Value = srv
        .client
        .get(srv.url("/dashboard/containers/options"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(options["sizes"], json!(["20ft", "40ft", "45ft"]));
    assert_eq!(options["types"].as_array().unwrap().len(), 13);

    for n in 0..6 {
        let res = srv
            .client
            .post(srv.url("/dashboard/containers"))
            .bearer_auth(&token)
            .json(&json!({
                "container_number": format!("MSKU000000{n}"),
                "container_type": "40ft Refrigerated",
                "size": "40ft",
                "status": "in_use",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let overview: serde_json::Value = srv
        .client
        .get(srv.url("/dashboard"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(overview["counts"]["containers"], 6);
    assert_eq!(overview["counts"]["users"], 1);
    let recent = overview["recent_containers"].as_array().unwrap();
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0]["container_number"], "MSKU0000005");
}

#[tokio::test]
async fn wrong_password_is_rejected_with_json_error() {
    let srv = TestServer::spawn().await;
    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "guess" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn cookie_session_works_until_logout() {
    let srv = TestServer::spawn().await;
    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    let cookie = set_cookie.split(';').next().unwrap().to_string();
    assert!(cookie.starts_with("exportdesk-access-token="));

    let res = srv.client.get(srv.url("/dashboard")).header(header::COOKIE, &cookie).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.post(srv.url("/auth/logout")).header(header::COOKIE, &cookie).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()[header::SET_COOKIE].to_str().unwrap().contains("Max-Age=0"));

    let res = srv.client.get(srv.url("/dashboard")).header(header::COOKIE, &cookie).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login");
}

#[tokio::test]
async fn logout_without_session_still_succeeds() {
    let srv = TestServer::spawn().await;
    let res = srv
        .client
        .post(srv.url("/auth/logout"))
        .bearer_auth("garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["signed_out"], true);
}

#[tokio::test]
async fn refresh_issues_a_working_token() {
    let srv = TestServer::spawn().await;
    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();

    let res = srv
        .client
        .post(srv.url("/auth/refresh"))
        .json(&json!({ "refresh_token": body["refresh_token"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let refreshed: serde_json::Value = res.json().await.unwrap();
    let token = refreshed["access_token"].as_str().unwrap();

    let res = srv.client.get(srv.url("/dashboard/users")).bearer_auth(token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn navigation_hides_user_management_from_regular_users() {
    let srv = TestServer::spawn().await;
    srv.add_account("clerk@fresh-export.example", "clerk-pass", Some(Role::User)).await;
    let token = srv.login("clerk@fresh-export.example", "clerk-pass").await;

    let nav: serde_json::Value = srv
        .client
        .get(srv.url("/dashboard/navigation"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = nav["items"].as_array().unwrap().iter().map(|i| i["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Dashboard", "Manage Data"]);
    assert_eq!(nav["user"]["role"], "user");
}

#[tokio::test]
async fn session_stream_sends_the_resolved_session_first() {
    let srv = TestServer::spawn().await;
    let token = srv.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let mut res = srv
        .client
        .get(srv.url("/auth/session/stream"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let chunk = tokio::time::timeout(std::time::Duration::from_secs(5), res.chunk())
        .await
        .expect("no event within timeout")
        .unwrap()
        .unwrap();
    let text = String::from_utf8_lossy(&chunk);
    assert!(text.contains("event: session"), "{text}");
    assert!(text.contains(ADMIN_EMAIL), "{text}");
}
