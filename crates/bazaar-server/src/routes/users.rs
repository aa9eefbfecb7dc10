//! Profile self-service and admin user management.

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use bazaar_auth::{ProfileUpdate, Role};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::config::Config;
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::extract::{AdminUser, CurrentUser};
use crate::state::AppState;
use crate::upload::{self, AvatarFile};

/// Multipart framing allowance on top of the avatar itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(config: &Config) -> Router<AppState> {
    let avatar_limit = config.uploads.max_avatar_bytes + MULTIPART_OVERHEAD;
    Router::new()
        .route("/", get(list_users))
        .route("/profile", put(update_profile))
        .route(
            "/avatar",
            put(upload_avatar)
                .delete(remove_avatar)
                .layer(DefaultBodyLimit::max(avatar_limit)),
        )
        .route("/:id", get(get_user).delete(delete_user))
        .route("/:id/role", put(set_role))
}

async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<Value>> {
    let user = state
        .users
        .update_profile(current.user.id.as_str(), update)
        .await?;
    Ok(Json(json!({ "success": true, "user": user.profile() })))
}

async fn upload_avatar(
    State(state): State<AppState>,
    current: CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let max_bytes = state.config.uploads.max_avatar_bytes;
    let multipart_error = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            upload::too_large(max_bytes)
        } else {
            ApiError::bad_request(e.body_text())
        }
    };

    let mut saved = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("avatar") {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        let file = AvatarFile {
            content_type: content_type.as_deref(),
            file_name: file_name.as_deref(),
            bytes: &bytes,
        };
        saved = Some(upload::save_avatar(&state.config.uploads.dir, file, max_bytes).await?);
        break;
    }
    let saved = saved.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    let (user, previous) = match state
        .users
        .set_avatar(current.user.id.as_str(), saved.url.clone())
        .await
    {
        Ok(result) => result,
        Err(e) => {
            upload::remove_local(&state.config.uploads.dir, &saved.url).await;
            return Err(e.into());
        }
    };
    upload::remove_local(&state.config.uploads.dir, &previous).await;

    info!(user = %user.id, avatar = %saved.url, "Avatar updated");
    Ok(Json(json!({
        "success": true,
        "avatarUrl": saved.url,
        "user": user.profile(),
    })))
}

async fn remove_avatar(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Json<Value>> {
    let (user, previous) = state.users.reset_avatar(current.user.id.as_str()).await?;
    upload::remove_local(&state.config.uploads.dir, &previous).await;
    Ok(Json(json!({
        "success": true,
        "message": "Avatar removed successfully",
        "user": user.profile(),
    })))
}

async fn list_users(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Value>> {
    let users: Vec<_> = state.users.list().await?.iter().map(|u| u.profile()).collect();
    Ok(Json(json!({ "success": true, "count": users.len(), "users": users })))
}

async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let user = state.users.get(&id).await?;
    Ok(Json(json!({ "success": true, "user": user.profile() })))
}

#[derive(Debug, Deserialize)]
struct RoleChange {
    role: String,
}

async fn set_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<RoleChange>,
) -> ApiResult<Json<Value>> {
    let role: Role = input.role.parse()?;
    let user = state.users.set_role(&id, role).await?;
    info!(admin = %admin.id, user = %user.id, role = %role, "Role changed");
    Ok(Json(json!({ "success": true, "user": user.profile() })))
}

async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    if admin.id.as_str() == id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }
    let user = state.users.delete(&id).await?;
    let sessions = state.sessions.revoke_user(&user.id)?;
    upload::remove_local(&state.config.uploads.dir, &user.avatar).await;

    info!(admin = %admin.id, user = %user.id, sessions, "User deleted");
    Ok(Json(json!({ "success": true, "message": "User deleted successfully" })))
}
