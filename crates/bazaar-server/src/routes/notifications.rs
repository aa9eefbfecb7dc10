use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::extract::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/read-all", put(mark_all_read))
        .route("/:id/read", put(mark_read))
        .route("/:id", delete(delete_notification))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListQuery {
    unread: bool,
}

async fn list_notifications(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let notifications = state
        .notifications
        .list_for(&current.user.id, query.unread)
        .await?;
    Ok(Json(json!({
        "success": true,
        "count": notifications.len(),
        "data": notifications,
    })))
}

async fn mark_all_read(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Json<Value>> {
    let updated = state.notifications.mark_all_read(&current.user.id).await?;
    Ok(Json(json!({ "success": true, "updated": updated })))
}

async fn mark_read(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let notification = state.notifications.mark_read(&current.user.id, &id).await?;
    Ok(Json(json!({ "success": true, "data": notification })))
}

async fn delete_notification(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.notifications.delete(&current.user.id, &id).await?;
    Ok(Json(json!({ "success": true, "data": {} })))
}
