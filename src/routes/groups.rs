// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Group membership routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::services::{CalendarSnapshot, GroupPanelSnapshot};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Group routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/groups", get(list_groups).post(create_group))
        .route("/api/groups/join", post(join_group))
        .route("/api/groups/expand", post(expand_group))
        .route("/api/groups/select", post(select_member))
}

fn validate<T: Validate>(req: &T) -> Result<()> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))
}

/// List the caller's groups with member nicknames.
async fn list_groups(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<GroupPanelSnapshot>> {
    let handle = state.sessions.open(&state.db, &user.uid).await?;
    let mut viewer = handle.lock().await;
    viewer.groups.load_user_groups(&state.db).await?;
    Ok(Json(viewer.groups.snapshot()))
}

#[derive(Deserialize, Validate)]
struct CreateGroupRequest {
    #[validate(length(max = 100))]
    name: String,
}

async fn create_group(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<Json<GroupPanelSnapshot>> {
    validate(&req)?;

    let handle = state.sessions.open(&state.db, &user.uid).await?;
    let mut viewer = handle.lock().await;
    viewer.groups.create_group(&state.db, &req.name).await?;
    Ok(Json(viewer.groups.snapshot()))
}

#[derive(Deserialize, Validate)]
struct JoinGroupRequest {
    #[validate(length(max = 100))]
    code: String,
}

async fn join_group(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<JoinGroupRequest>,
) -> Result<Json<GroupPanelSnapshot>> {
    validate(&req)?;

    let handle = state.sessions.open(&state.db, &user.uid).await?;
    let mut viewer = handle.lock().await;
    viewer.groups.join_group(&state.db, &req.code).await?;
    Ok(Json(viewer.groups.snapshot()))
}

#[derive(Deserialize)]
struct ExpandGroupRequest {
    name: String,
}

/// Expand a group's member list, or collapse it if already expanded.
async fn expand_group(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ExpandGroupRequest>,
) -> Result<Json<GroupPanelSnapshot>> {
    let handle = state.sessions.open(&state.db, &user.uid).await?;
    let mut viewer = handle.lock().await;
    viewer.groups.toggle_group_expand(&req.name);
    Ok(Json(viewer.groups.snapshot()))
}

#[derive(Deserialize)]
struct SelectMemberRequest {
    uid: String,
}

/// Pick a member; the calendar switches to their marked dates.
async fn select_member(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SelectMemberRequest>,
) -> Result<Json<CalendarSnapshot>> {
    if req.uid.trim().is_empty() {
        return Err(AppError::Validation("Member id is required".to_string()));
    }

    let handle = state.sessions.open(&state.db, &user.uid).await?;
    Ok(Json(handle.select_member(&state.db, &req.uid).await?))
}
