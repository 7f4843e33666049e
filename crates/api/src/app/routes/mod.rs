use axum::{routing::get, Router};

pub mod auth;
pub mod consignees;
pub mod containers;
pub mod dashboard;
pub mod navigation;
pub mod notify_parties;
pub mod records;
pub mod shippers;
pub mod system;
pub mod users;

/// Routes open to everyone (the session middleware still runs).
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/login", get(system::login_page))
        .route("/unauthorized", get(system::unauthorized_page))
        .nest("/auth", auth::router())
}

/// Routes for any signed-in caller.
pub fn dashboard_router() -> Router {
    Router::new()
        .route("/dashboard", get(dashboard::overview))
        .route("/dashboard/navigation", get(navigation::entries))
        .nest("/dashboard/shippers", shippers::router())
        .nest("/dashboard/consignees", consignees::router())
        .nest("/dashboard/notify-parties", notify_parties::router())
        .nest("/dashboard/containers", containers::router())
}

/// Routes for admins only.
pub fn admin_router() -> Router {
    Router::new().nest("/dashboard/users", users::router())
}
