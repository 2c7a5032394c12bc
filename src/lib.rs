// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Markcal: shared day-marking calendars
//!
//! This crate provides the backend API for marking calendar days with a
//! double-click, computing statistics over a date range, and browsing the
//! calendars of fellow group members.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::CalendarDb;
use services::SessionRegistry;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: CalendarDb,
    pub sessions: SessionRegistry,
}
