//! Checkout and order lifecycle.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use bazaar_commerce::order::{PlaceOrder, StatusUpdate};
use bazaar_commerce::{CommerceError, Money};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::extract::{AdminUser, CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(place_order).get(list_orders))
        .route("/myorders", get(my_orders))
        .route("/:id", get(get_order))
        .route("/:id/status", put(update_status))
        .route("/:id/cancel", put(cancel_order))
}

/// Without `items`, the order is built from the user's cart.
async fn place_order(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(input): ApiJson<PlaceOrder>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let order = state.orders.place(current.user.id.clone(), input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "order": order }))))
}

async fn my_orders(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Json<Value>> {
    let orders = state.orders.my_orders(&current.user.id).await?;
    Ok(Json(json!({ "success": true, "count": orders.len(), "orders": orders })))
}

async fn list_orders(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Value>> {
    let orders = state.orders.list_all().await?;
    let total_amount = Money::checked_sum(orders.iter().map(|order| order.total_amount))
        .ok_or(CommerceError::Overflow)?;
    Ok(Json(json!({
        "success": true,
        "count": orders.len(),
        "totalAmount": total_amount,
        "orders": orders,
    })))
}

async fn get_order(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let order = state.orders.get(&id).await?;
    if !current.is_admin() && !order.is_owned_by(current.user.id.as_str()) {
        return Err(ApiError::forbidden("Not authorized to view this order"));
    }
    Ok(Json(json!({ "success": true, "order": order })))
}

async fn update_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> ApiResult<Json<Value>> {
    let order = state.orders.update_status(&id, update).await?;
    Ok(Json(json!({ "success": true, "order": order })))
}

async fn cancel_order(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let order = state.orders.cancel(&current.user.id, &id).await?;
    Ok(Json(json!({ "success": true, "order": order })))
}
