use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use bazaar_commerce::catalog::{CategoryUpdate, NewCategory};
use serde_json::{json, Value};

use crate::error::{ApiJson, ApiResult};
use crate::extract::AdminUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/hierarchy", get(hierarchy))
        .route("/featured", get(featured))
        .route("/create", post(create_category))
        .route("/add", post(add_category))
        .route(
            "/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}

async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let categories = state.categories.list().await?;
    Ok(Json(json!({ "success": true, "count": categories.len(), "data": categories })))
}

async fn hierarchy(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let tree = state.categories.hierarchy().await?;
    Ok(Json(json!({ "success": true, "data": tree })))
}

async fn featured(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let categories = state.categories.featured().await?;
    Ok(Json(json!({ "success": true, "count": categories.len(), "data": categories })))
}

async fn get_category(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let category = state.categories.get(&id).await?;
    Ok(Json(json!({ "success": true, "data": category })))
}

async fn create_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(input): ApiJson<NewCategory>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let category = state.categories.create(input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": category }))))
}

/// Bulk-import variant: the parent link is stored as given.
async fn add_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(input): ApiJson<NewCategory>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let category = state.categories.add(input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": category }))))
}

async fn update_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<CategoryUpdate>,
) -> ApiResult<Json<Value>> {
    let category = state.categories.update(&id, update).await?;
    Ok(Json(json!({ "success": true, "data": category })))
}

async fn delete_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.categories.delete(&id).await?;
    Ok(Json(json!({ "success": true, "data": {} })))
}
