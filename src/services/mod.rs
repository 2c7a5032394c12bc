// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - calendar and group state over the document store.

pub mod calendar;
pub mod groups;
pub mod session;
pub mod viewer;

pub use calendar::{CalendarSnapshot, CalendarView, DayActivation, RangeSelection};
pub use groups::{GroupPanel, GroupPanelSnapshot, MemberSelected};
pub use session::{SessionContext, SessionSubscription};
pub use viewer::{SessionRegistry, ViewerHandle, ViewerSession};
