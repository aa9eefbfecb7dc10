//! HTTP routes, one module per resource.

mod auth;
mod cart;
mod categories;
mod coupons;
mod notifications;
mod orders;
mod products;
mod reviews;
mod sellers;
mod users;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::config::Config;
use crate::state::AppState;

/// Every API route.
pub fn router(config: &Config) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth::router())
        .nest("/api/users", users::router(config))
        .nest("/e_commerce", products::router())
        .nest("/api/categories", categories::router())
        .nest("/api/sellers", sellers::router())
        .nest("/api/reviews", reviews::router())
        .nest("/api/cart", cart::router())
        .nest("/api/coupons", coupons::router())
        .nest("/api/orders", orders::router())
        .nest("/api/notifications", notifications::router())
}

async fn health() -> Json<Value> {
    Json(json!({ "success": true, "status": "ok" }))
}
