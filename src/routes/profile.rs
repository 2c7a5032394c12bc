// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes: current user, nickname and sign-out.

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, SESSION_COOKIE};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Profile routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/me/nickname", put(set_nickname))
        .route("/api/logout", post(logout))
}

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub uid: String,
    pub nickname: Option<String>,
    /// True until a nickname has been saved; the frontend prompts for one.
    pub needs_nickname: bool,
    pub groups: Vec<String>,
    pub created_at: Option<String>,
}

/// Get current user profile, creating it on first sign-in.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    state.sessions.open(&state.db, &user.uid).await?;

    let profile = state
        .db
        .get_user(&user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.uid)))?;

    let needs_nickname = profile
        .nickname
        .as_deref()
        .map_or(true, |n| n.trim().is_empty());

    Ok(Json(MeResponse {
        uid: user.uid,
        nickname: profile.nickname,
        needs_nickname,
        groups: profile.groups,
        created_at: profile.created_at,
    }))
}

#[derive(Deserialize, Validate)]
struct NicknameRequest {
    #[validate(length(max = 50))]
    nickname: String,
}

/// Save the caller's nickname (trimmed, must not be empty).
async fn set_nickname(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<NicknameRequest>,
) -> Result<Json<MeResponse>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let nickname = req.nickname.trim();
    if nickname.is_empty() {
        return Err(AppError::Validation("Please enter a nickname".to_string()));
    }

    let handle = state.sessions.open(&state.db, &user.uid).await?;
    state.db.save_nickname(&user.uid, nickname).await?;
    tracing::info!(uid = %user.uid, "Nickname updated");

    // The calendar header caches the viewed nickname.
    if let Err(e) = handle.reload_calendar(&state.db).await {
        tracing::warn!(uid = %user.uid, error = %e, "Calendar reload after nickname change failed");
    }

    get_me(State(state), Extension(user)).await
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// End the viewer session and clear the session cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    let closed = state.sessions.close(&user.uid);
    tracing::info!(uid = %user.uid, closed, "User signed out");

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(LogoutResponse { success: true }))
}
