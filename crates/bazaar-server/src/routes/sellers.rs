//! Seller onboarding, approval and dashboards.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use bazaar_auth::User;
use bazaar_commerce::notification::{Notification, NotificationKind};
use bazaar_commerce::seller::{NewSeller, Seller, SellerUpdate};
use bazaar_commerce::ApiFeatures;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::extract::{AdminUser, CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/get", get(list_sellers))
        .route("/get/:id", get(get_seller))
        .route("/create", post(create_seller))
        .route("/update/:id", put(update_seller))
        .route("/approve/:id", put(approve_seller))
        .route("/get/products/:id", get(seller_products))
        .route("/get/stats/:id", get(seller_stats))
}

/// A seller document with its owner's public details under `user`.
async fn with_owner(state: &AppState, seller: &Seller) -> ApiResult<Value> {
    let mut value = serde_json::to_value(seller)
        .map_err(|e| ApiError::Internal(format!("Failed to encode seller: {}", e)))?;
    if let Ok(owner) = state.users.get(seller.user_id.as_str()).await {
        value["user"] = json!({
            "_id": owner.id,
            "name": owner.name,
            "email": owner.email,
            "avatar": owner.avatar,
        });
    }
    Ok(value)
}

fn ensure_owner_or_admin(user: &User, seller: &Seller) -> ApiResult<()> {
    if user.is_admin() || seller.is_owned_by(user.id.as_str()) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "User {} is not authorized to access this seller",
            user.id
        )))
    }
}

async fn list_sellers(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Value>> {
    let sellers = state.sellers.list().await?;
    let mut data = Vec::with_capacity(sellers.len());
    for seller in &sellers {
        data.push(with_owner(&state, seller).await?);
    }
    Ok(Json(json!({ "success": true, "count": data.len(), "data": data })))
}

async fn get_seller(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let seller = state.sellers.get(&id).await?;
    Ok(Json(json!({ "success": true, "data": with_owner(&state, &seller).await? })))
}

async fn create_seller(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(input): ApiJson<NewSeller>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let seller = state.sellers.create(current.user.id.clone(), input).await?;
    state
        .users
        .attach_seller(current.user.id.as_str(), seller.id.clone())
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": seller }))))
}

async fn update_seller(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<SellerUpdate>,
) -> ApiResult<Json<Value>> {
    let seller = state.sellers.get(&id).await?;
    ensure_owner_or_admin(&current.user, &seller)?;

    let seller = state.sellers.update(&id, update).await?;
    Ok(Json(json!({ "success": true, "data": seller })))
}

async fn approve_seller(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let seller = state.sellers.approve(&id).await?;

    let notice = Notification::new(
        seller.user_id.clone(),
        NotificationKind::Account,
        "Seller account approved",
        format!("{} can now list products", seller.business_name),
    );
    if let Err(e) = state.notifications.create(notice).await {
        warn!(seller = %seller.id, error = %e, "Failed to send approval notification");
    }

    Ok(Json(json!({ "success": true, "data": seller })))
}

/// A seller's storefront. Takes the same `keyword`, field filters and
/// `sort` as the catalogue, without paging.
async fn seller_products(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Json<Value>> {
    let seller = state.sellers.get(&id).await?;
    let features = ApiFeatures::new(params)
        .search()
        .filter()
        .sort()
        .default_sort("-createdAt,-_id");
    let (products, total) = state
        .products
        .list_for_seller(seller.id.as_str(), features)
        .await?;
    Ok(Json(json!({
        "success": true,
        "count": products.len(),
        "total": total,
        "data": products,
    })))
}

async fn seller_stats(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let seller = state.sellers.get(&id).await?;
    ensure_owner_or_admin(&current.user, &seller)?;

    let stats = state.sellers.stats(&seller).await?;
    Ok(Json(json!({ "success": true, "data": stats })))
}
