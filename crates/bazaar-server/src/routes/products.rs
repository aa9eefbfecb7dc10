//! Product catalogue under the storefront's `/e_commerce` prefix.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use bazaar_auth::User;
use bazaar_commerce::catalog::{NewProduct, Product, ProductUpdate};
use bazaar_commerce::{ApiFeatures, SellerId};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::extract::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add/product", post(create_product))
        .route("/get/products", get(list_products))
        .route(
            "/product/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// The seller a product write is made for. Admins may name any seller and
/// fall back to their own profile; everyone else must be an approved seller.
async fn acting_seller(state: &AppState, user: &User, requested: Option<SellerId>) -> ApiResult<SellerId> {
    if user.is_admin() {
        let seller = requested
            .or_else(|| user.seller_profile.clone())
            .ok_or_else(|| ApiError::bad_request("Please provide the seller for this product"))?;
        state.sellers.get(seller.as_str()).await?;
        return Ok(seller);
    }

    match state.sellers.find_by_user(user.id.as_str()).await? {
        Some(seller) if seller.is_approved => Ok(seller.id),
        Some(_) => Err(ApiError::forbidden("Your seller account is awaiting approval")),
        None => Err(ApiError::forbidden("Only approved sellers can manage products")),
    }
}

/// Admins manage every product; sellers only their own.
async fn ensure_can_manage(state: &AppState, user: &User, product: &Product) -> ApiResult<()> {
    if user.is_admin() {
        return Ok(());
    }
    let owns = state
        .sellers
        .find_by_user(user.id.as_str())
        .await?
        .is_some_and(|seller| seller.is_approved && seller.id == product.seller);
    if owns {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "User {} is not authorized to modify this product",
            user.id
        )))
    }
}

async fn create_product(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(mut input): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let seller = acting_seller(&state, &current.user, input.seller.take()).await?;
    let product = state.products.create(seller, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Product created successfully",
            "product": product,
        })),
    ))
}

async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Json<Value>> {
    let features = ApiFeatures::new(params)
        .search()
        .filter()
        .sort()
        .default_sort("-createdAt,-_id")
        .paginate(state.config.catalog.products_per_page);
    let (products, total) = state.products.list(&features).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Product fetched successfully!",
        "count": products.len(),
        "total": total,
        "pagination": features.pagination(total),
        "product": products,
    })))
}

async fn get_product(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let product = state.products.get(&id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Product fetched successfully!",
        "product": product,
    })))
}

async fn update_product(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<ProductUpdate>,
) -> ApiResult<Json<Value>> {
    let product = state.products.get(&id).await?;
    ensure_can_manage(&state, &current.user, &product).await?;

    let product = state.products.update(&id, update).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Product Updated successfully!",
        "product": product,
    })))
}

async fn delete_product(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let product = state.products.get(&id).await?;
    ensure_can_manage(&state, &current.user, &product).await?;

    state.products.delete(&id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Product deleted successfully!",
    })))
}
