// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar view routes.
//!
//! Every handler works on the caller's viewer session and answers with the
//! resulting calendar snapshot.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::services::{CalendarSnapshot, DayActivation, RangeSelection};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Calendar routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/calendar", get(get_calendar))
        .route("/api/calendar/activate", post(activate_day))
        .route(
            "/api/calendar/range-mode",
            post(toggle_range_mode).delete(exit_range_mode),
        )
        .route("/api/calendar/range", put(change_range))
        .route("/api/calendar/reload", post(reload_calendar))
        .route("/api/calendar/own", post(return_to_own))
}

async fn get_calendar(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CalendarSnapshot>> {
    let handle = state.sessions.open(&state.db, &user.uid).await?;
    let viewer = handle.lock().await;
    Ok(Json(viewer.calendar.snapshot()))
}

// ─── Marking ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct ActivateRequest {
    /// Day cell that was clicked (YYYY-MM-DD)
    date: NaiveDate,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivateResponse {
    pub activation: String,
    pub calendar: CalendarSnapshot,
}

/// Record a click on a day cell. The second click of a double-click
/// toggles that day.
async fn activate_day(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ActivateRequest>,
) -> Result<Json<ActivateResponse>> {
    let handle = state.sessions.open(&state.db, &user.uid).await?;
    let mut viewer = handle.lock().await;

    let activation = viewer
        .calendar
        .handle_day_activate(&state.db, req.date, chrono::Utc::now())
        .await?;

    tracing::debug!(uid = %user.uid, date = %req.date, ?activation, "Day activated");

    let activation = match activation {
        DayActivation::Ignored => "ignored",
        DayActivation::Pending => "pending",
        DayActivation::Toggled { .. } => "toggled",
    };
    Ok(Json(ActivateResponse {
        activation: activation.to_string(),
        calendar: viewer.calendar.snapshot(),
    }))
}

// ─── Range Selection ─────────────────────────────────────────

async fn toggle_range_mode(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CalendarSnapshot>> {
    let handle = state.sessions.open(&state.db, &user.uid).await?;
    let mut viewer = handle.lock().await;
    viewer.calendar.toggle_range_selection_mode();
    Ok(Json(viewer.calendar.snapshot()))
}

async fn exit_range_mode(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CalendarSnapshot>> {
    let handle = state.sessions.open(&state.db, &user.uid).await?;
    let mut viewer = handle.lock().await;
    viewer.calendar.exit_range_selection_mode();
    Ok(Json(viewer.calendar.snapshot()))
}

#[derive(Deserialize)]
struct RangeRequest {
    start: NaiveDate,
    /// Absent while only the first endpoint has been picked
    end: Option<NaiveDate>,
}

async fn change_range(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<RangeRequest>,
) -> Result<Json<CalendarSnapshot>> {
    let selection = match req.end {
        Some(end) => RangeSelection::Complete(req.start, end),
        None => RangeSelection::Single(req.start),
    };

    let handle = state.sessions.open(&state.db, &user.uid).await?;
    let mut viewer = handle.lock().await;
    viewer.calendar.handle_range_change(selection);
    Ok(Json(viewer.calendar.snapshot()))
}

// ─── Viewed Identity ─────────────────────────────────────────

async fn reload_calendar(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CalendarSnapshot>> {
    let handle = state.sessions.open(&state.db, &user.uid).await?;
    Ok(Json(handle.reload_calendar(&state.db).await?))
}

async fn return_to_own(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CalendarSnapshot>> {
    let handle = state.sessions.open(&state.db, &user.uid).await?;
    let mut viewer = handle.lock().await;
    viewer.calendar.return_to_own_calendar(&state.db).await?;
    Ok(Json(viewer.calendar.snapshot()))
}
