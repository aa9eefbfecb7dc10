//! Sign-up, sign-in and password management.

use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use bazaar_auth::{AuthError, Registration, Session, TokenType, User};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::extract::{session_token, CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/password/forgot", post(forgot_password))
        .route("/password/reset/:token", put(reset_password))
        .route("/password/update", put(update_password))
}

fn session_cookie(state: &AppState, value: &str, max_age: u64) -> ApiResult<HeaderValue> {
    let cookie = format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        state.config.auth.cookie_name, value, max_age
    );
    HeaderValue::from_str(&cookie).map_err(|e| ApiError::Internal(format!("Bad cookie: {}", e)))
}

/// Start a session for `user` and answer with its token, both in the body
/// and as a cookie.
fn send_token(state: &AppState, user: &User, status: StatusCode) -> ApiResult<Response> {
    let session: Session = state.sessions.create(user)?;
    let cookie = session_cookie(state, &session.token, state.sessions.ttl().as_secs())?;
    let body = json!({
        "success": true,
        "token": session.token,
        "user": user.profile(),
    });
    Ok((status, [(SET_COOKIE, cookie)], Json(body)).into_response())
}

async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<Registration>,
) -> ApiResult<Response> {
    let user = state.users.register(input).await?;
    send_token(&state, &user, StatusCode::CREATED)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Login {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<Login>,
) -> ApiResult<Response> {
    let user = state.users.authenticate(&input.email, &input.password).await?;
    info!(user = %user.id, "User logged in");
    send_token(&state, &user, StatusCode::OK)
}

async fn logout(State(state): State<AppState>, headers: axum::http::HeaderMap) -> ApiResult<Response> {
    if let Some(token) = session_token(&headers, &state.config.auth.cookie_name) {
        state.sessions.revoke(&token)?;
    }
    let cookie = session_cookie(&state, "", 0)?;
    let body = json!({ "success": true, "message": "Logged Out" });
    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

async fn me(current: CurrentUser) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "user": current.user.profile() }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ForgotPassword {
    email: String,
}

async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ForgotPassword>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut body = json!({
        "success": true,
        "message": "If the account exists, a password reset token has been issued",
    });

    // Unknown emails get the same answer so accounts cannot be probed.
    if let Some(user) = state.users.find_by_email(&input.email.trim().to_lowercase()).await? {
        let token = state.tokens.issue(TokenType::PasswordReset, &user.id)?;
        info!(user = %user.id, "Password reset token issued");
        if state.config.auth.expose_reset_token {
            body["resetToken"] = json!(token);
        }
    }
    Ok(Json(body))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ResetPassword {
    password: String,
    confirm_password: String,
}

async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ApiJson(input): ApiJson<ResetPassword>,
) -> ApiResult<Response> {
    if input.password != input.confirm_password {
        return Err(AuthError::Validation("Password does not match".into()).into());
    }
    let user_id = state.tokens.consume(TokenType::PasswordReset, &token)?;
    let user = state.users.set_password(user_id.as_str(), &input.password).await?;
    let revoked = state.sessions.revoke_user(&user.id)?;
    info!(user = %user.id, revoked, "Password reset");
    send_token(&state, &user, StatusCode::OK)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct UpdatePassword {
    old_password: String,
    new_password: String,
}

async fn update_password(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(input): ApiJson<UpdatePassword>,
) -> ApiResult<Response> {
    let user = state
        .users
        .change_password(current.user.id.as_str(), &input.old_password, &input.new_password)
        .await?;
    state.sessions.revoke_user(&user.id)?;
    send_token(&state, &user, StatusCode::OK)
}
