use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use bazaar_auth::User;
use bazaar_commerce::catalog::{NewReview, Review, ReviewUpdate};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::extract::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_review))
        .route("/product/:id", get(product_reviews))
        .route("/:id", put(update_review).delete(delete_review))
}

fn ensure_author_or_admin(user: &User, review: &Review) -> ApiResult<()> {
    if user.is_admin() || review.user == user.id {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not authorized to modify this review"))
    }
}

async fn create_review(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(input): ApiJson<NewReview>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let review = state.reviews.create(current.user.id.clone(), input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": review }))))
}

async fn product_reviews(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    state.products.get(&id).await?;
    let reviews = state.reviews.for_product(&id).await?;
    Ok(Json(json!({ "success": true, "count": reviews.len(), "data": reviews })))
}

async fn update_review(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<ReviewUpdate>,
) -> ApiResult<Json<Value>> {
    let review = state.reviews.get(&id).await?;
    ensure_author_or_admin(&current.user, &review)?;

    let review = state.reviews.update(&id, update).await?;
    Ok(Json(json!({ "success": true, "data": review })))
}

async fn delete_review(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let review = state.reviews.get(&id).await?;
    ensure_author_or_admin(&current.user, &review)?;

    state.reviews.delete(&id).await?;
    Ok(Json(json!({ "success": true, "data": {} })))
}
