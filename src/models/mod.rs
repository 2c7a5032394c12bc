// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod calendar;
pub mod group;
pub mod user;

pub use calendar::{DayTile, MarkedDates, SelectedRange, Statistics};
pub use group::{Group, GroupMember, GroupSummary};
pub use user::UserProfile;
