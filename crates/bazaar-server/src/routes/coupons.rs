use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post, put};
use axum::{Json, Router};
use bazaar_commerce::cart::NewCoupon;
use bazaar_commerce::Money;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiJson, ApiResult};
use crate::extract::{AdminUser, CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_coupon).get(list_coupons))
        .route("/validate", post(validate_coupon))
        .route("/:id/deactivate", put(deactivate_coupon))
        .route("/:id", delete(delete_coupon))
}

async fn create_coupon(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(input): ApiJson<NewCoupon>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let coupon = state.coupons.create(admin.id, input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": coupon }))))
}

async fn list_coupons(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Value>> {
    let coupons = state.coupons.list().await?;
    Ok(Json(json!({ "success": true, "count": coupons.len(), "data": coupons })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CouponCheck {
    code: String,
    order_value: Money,
}

/// Price an order with a coupon for the signed-in user. Nothing is redeemed.
async fn validate_coupon(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(input): ApiJson<CouponCheck>,
) -> ApiResult<Json<Value>> {
    let quote = state
        .coupons
        .quote(&input.code, &current.user.id, input.order_value)
        .await?;
    Ok(Json(json!({ "success": true, "data": quote })))
}

async fn deactivate_coupon(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let coupon = state.coupons.deactivate(&id).await?;
    Ok(Json(json!({ "success": true, "data": coupon })))
}

async fn delete_coupon(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.coupons.delete(&id).await?;
    Ok(Json(json!({ "success": true, "data": {} })))
}
