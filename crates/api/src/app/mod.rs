//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: auth provider, profile lookups, record stores
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::middleware::{self, RequiredRole};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
///
/// Every request gets a resolved session; route groups then apply the access
/// guard for their required role before any handler runs.
pub fn build_app(services: Arc<AppServices>) -> Router {
    let signed_in = routes::dashboard_router().layer(axum::middleware::from_fn_with_state(
        RequiredRole::signed_in(),
        middleware::guard_middleware,
    ));
    let admin_only = routes::admin_router().layer(axum::middleware::from_fn_with_state(
        RequiredRole::admin(),
        middleware::guard_middleware,
    ));

    routes::public_router()
        .merge(signed_in)
        .merge(admin_only)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::security_headers))
                .layer(Extension(services.clone()))
                .layer(axum::middleware::from_fn_with_state(
                    services,
                    middleware::session_middleware,
                )),
        )
}
