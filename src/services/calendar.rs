// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar view state: marked dates of the viewed identity, the
//! double-click toggle gesture and range-selection statistics.
//!
//! One view serves both the session's own calendar and a group member's
//! calendar; `selected_member` decides which. Only the own calendar can be
//! edited.

use crate::db::CalendarDb;
use crate::error::AppError;
use crate::models::calendar::{compute_statistics, month_tiles};
use crate::models::{DayTile, MarkedDates, SelectedRange, Statistics, UserProfile};
use crate::services::session::{SessionContext, SessionSubscription};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Two activations closer than this form a double-click.
pub const DOUBLE_CLICK_WINDOW_MS: i64 = 300;

/// Outcome of a day activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DayActivation {
    /// Editing is not allowed right now (member calendar or range mode).
    Ignored,
    /// First half of a potential double-click.
    Pending,
    /// Second half of a double-click: the day's flag was flipped and saved.
    Toggled { date: NaiveDate, marked: bool },
}

/// A change of the picker's selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSelection {
    /// A single date (or the first endpoint of a range).
    Single(NaiveDate),
    /// Both endpoints of a range.
    Complete(NaiveDate, NaiveDate),
}

/// An in-flight load. Results are applied only while the ticket is current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    /// Session identity the load runs for
    viewer: String,
    identity: String,
}

impl LoadTicket {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Read the ticket's profile, applying the shared-group check when it
    /// is not the viewer's own.
    pub async fn fetch(&self, db: &CalendarDb) -> Result<Option<UserProfile>, AppError> {
        db.get_calendar_for(&self.viewer, &self.identity).await
    }
}

/// Serializable view of the calendar state.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSnapshot {
    pub viewed_identity: Option<String>,
    pub nickname: String,
    pub own_calendar: bool,
    pub cursor: NaiveDate,
    pub range_mode: bool,
    pub selected_range: Option<SelectedRange>,
    pub statistics: Option<Statistics>,
    pub error: Option<String>,
    pub tiles: Vec<DayTile>,
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Per-session calendar view.
#[derive(Debug)]
pub struct CalendarView {
    session: SessionContext,
    subscription: SessionSubscription,
    cursor: NaiveDate,
    marked: MarkedDates,
    nickname: String,
    last_click: Option<DateTime<Utc>>,
    range_mode: bool,
    range: Option<SelectedRange>,
    statistics: Option<Statistics>,
    /// `None` means the session's own calendar.
    selected_member: Option<String>,
    error: Option<String>,
    generation: u64,
}

impl CalendarView {
    pub fn new(session: SessionContext) -> Self {
        let subscription = session.subscribe();
        Self {
            session,
            subscription,
            cursor: today(),
            marked: MarkedDates::new(),
            nickname: String::new(),
            last_click: None,
            range_mode: false,
            range: None,
            statistics: None,
            selected_member: None,
            error: None,
            generation: 0,
        }
    }

    // ─── Accessors ───────────────────────────────────────────────

    pub fn cursor(&self) -> NaiveDate {
        self.cursor
    }

    pub fn marked_dates(&self) -> &MarkedDates {
        &self.marked
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn range_mode(&self) -> bool {
        self.range_mode
    }

    pub fn selected_range(&self) -> Option<&SelectedRange> {
        self.range.as_ref()
    }

    pub fn statistics(&self) -> Option<&Statistics> {
        self.statistics.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whose calendar is shown.
    pub fn viewed_identity(&self) -> Option<String> {
        self.selected_member
            .clone()
            .or_else(|| self.session.current_identity())
    }

    pub fn is_own_calendar(&self) -> bool {
        match &self.selected_member {
            None => true,
            Some(member) => self.session.current_identity().as_deref() == Some(member.as_str()),
        }
    }

    /// Tile decoration: marked iff the day's key is truthy.
    pub fn is_marked(&self, date: NaiveDate) -> bool {
        self.marked.is_marked(date)
    }

    pub fn tiles(&self) -> Vec<DayTile> {
        month_tiles(self.cursor, &self.marked)
    }

    pub fn snapshot(&self) -> CalendarSnapshot {
        CalendarSnapshot {
            viewed_identity: self.viewed_identity(),
            nickname: self.nickname.clone(),
            own_calendar: self.is_own_calendar(),
            cursor: self.cursor,
            range_mode: self.range_mode,
            selected_range: self.range,
            statistics: self.statistics.clone(),
            error: self.error.clone(),
            tiles: self.tiles(),
        }
    }

    // ─── Session ─────────────────────────────────────────────────

    /// Reset per-identity state if the session identity changed.
    fn sync_session(&mut self) {
        if let Some(identity) = self.subscription.poll_change() {
            tracing::debug!(identity = ?identity, "Session changed, resetting calendar");
            self.selected_member = None;
            self.marked = MarkedDates::new();
            self.nickname.clear();
            self.last_click = None;
            self.range = None;
            self.statistics = None;
            self.error = None;
            // Invalidate loads started under the previous identity.
            self.generation += 1;
        }
    }

    fn require_identity(&mut self) -> Result<String, AppError> {
        self.session.current_identity().ok_or_else(|| {
            let err = AppError::AuthRequired;
            self.error = Some(err.to_string());
            err
        })
    }

    // ─── Loading ─────────────────────────────────────────────────

    /// Start loading the viewed identity's marked dates.
    pub fn begin_load(&mut self) -> Result<LoadTicket, AppError> {
        self.sync_session();
        let own = self.require_identity()?;
        let identity = self
            .selected_member
            .clone()
            .unwrap_or_else(|| own.clone());

        self.generation += 1;
        Ok(LoadTicket {
            generation: self.generation,
            viewer: own,
            identity,
        })
    }

    /// Apply the result of a load started with [`begin_load`](Self::begin_load).
    ///
    /// Returns `Ok(false)` when a newer load or a session change superseded
    /// the ticket; the result is then discarded.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Option<UserProfile>, AppError>,
    ) -> Result<bool, AppError> {
        self.sync_session();
        if ticket.generation != self.generation {
            tracing::debug!(
                identity = %ticket.identity,
                "Discarding stale calendar load"
            );
            return Ok(false);
        }

        match result {
            Ok(Some(profile)) => {
                self.nickname = profile.display_name(&ticket.identity);
                self.marked = profile.marked_dates;
                self.error = None;
                Ok(true)
            }
            Ok(None) => {
                self.marked = MarkedDates::new();
                self.nickname = ticket.identity.clone();
                let err = AppError::NotFound(format!("No calendar for {}", ticket.identity));
                self.error = Some(err.to_string());
                Err(err)
            }
            Err(err) => {
                tracing::warn!(identity = %ticket.identity, error = %err, "Failed to load calendar");
                self.error = Some(match &err {
                    AppError::PermissionDenied(msg) => format!(
                        "Permission denied: you can only view calendars of members who share a group with you ({})",
                        msg
                    ),
                    other => format!("Failed to load calendar: {}", other),
                });
                Err(err)
            }
        }
    }

    /// Load the viewed identity's marked dates.
    pub async fn load_marked_dates(&mut self, db: &CalendarDb) -> Result<(), AppError> {
        let ticket = self.begin_load()?;
        let result = ticket.fetch(db).await;
        self.finish_load(ticket, result).map(|_| ())
    }

    /// Point the view at another identity and start loading it.
    pub fn select_target(&mut self, identity: &str) -> Result<LoadTicket, AppError> {
        self.sync_session();
        let own = self.session.current_identity();
        self.selected_member = match own {
            Some(own) if own == identity => None,
            _ => Some(identity.to_string()),
        };
        self.last_click = None;
        self.begin_load()
    }

    /// Switch to another identity's calendar (member selection).
    pub async fn switch_viewed_identity(
        &mut self,
        db: &CalendarDb,
        identity: &str,
    ) -> Result<(), AppError> {
        let ticket = self.select_target(identity)?;
        let result = ticket.fetch(db).await;
        self.finish_load(ticket, result).map(|_| ())
    }

    /// Go back to the session's own calendar.
    pub async fn return_to_own_calendar(&mut self, db: &CalendarDb) -> Result<(), AppError> {
        self.sync_session();
        self.selected_member = None;
        self.load_marked_dates(db).await
    }

    // ─── Marking ─────────────────────────────────────────────────

    /// Handle a click on a day cell at time `now`.
    ///
    /// A second activation within [`DOUBLE_CLICK_WINDOW_MS`] of the first
    /// toggles the day of the *second* activation, whichever day the first
    /// one hit, and merge-writes the whole map to the own profile.
    pub async fn handle_day_activate(
        &mut self,
        db: &CalendarDb,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<DayActivation, AppError> {
        self.sync_session();
        if !self.is_own_calendar() || self.range_mode {
            return Ok(DayActivation::Ignored);
        }
        let own = self.require_identity()?;

        let within_window = self.last_click.is_some_and(|prev| {
            let elapsed = now.signed_duration_since(prev).num_milliseconds();
            (0..DOUBLE_CLICK_WINDOW_MS).contains(&elapsed)
        });
        if !within_window {
            self.last_click = Some(now);
            return Ok(DayActivation::Pending);
        }

        self.last_click = None;
        let mut updated = self.marked.clone();
        let marked = updated.toggle(day);

        if let Err(err) = db.save_marked_dates(&own, &updated).await {
            tracing::warn!(uid = %own, %day, error = %err, "Failed to save marked dates");
            self.error = Some(format!("Failed to save: {}", err));
            return Err(err);
        }

        tracing::debug!(uid = %own, %day, marked, "Toggled marked date");
        self.marked = updated;
        self.error = None;
        Ok(DayActivation::Toggled { date: day, marked })
    }

    // ─── Range Selection ─────────────────────────────────────────

    pub fn toggle_range_selection_mode(&mut self) {
        self.range_mode = !self.range_mode;
        if self.range_mode {
            self.range = None;
            self.statistics = None;
        }
    }

    pub fn exit_range_selection_mode(&mut self) {
        self.range_mode = false;
        self.range = None;
        self.statistics = None;
        self.cursor = today();
    }

    pub fn handle_range_change(&mut self, selection: RangeSelection) {
        match selection {
            RangeSelection::Complete(start, end) if self.range_mode => {
                let Some(range) = SelectedRange::new(start, end) else {
                    tracing::debug!(%start, %end, "Ignoring reversed range");
                    return;
                };
                self.range = Some(range);
                self.compute_statistics();
                self.cursor = end;
            }
            RangeSelection::Complete(_, end) => self.cursor = end,
            RangeSelection::Single(date) => self.cursor = date,
        }
    }

    /// Recompute statistics for the selected range, keeping the previous
    /// result when no range is selected.
    pub fn compute_statistics(&mut self) {
        if let Some(stats) = compute_statistics(&self.marked, self.range.as_ref()) {
            self.statistics = Some(stats);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use chrono::Duration;
    use std::sync::Arc;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-10T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    async fn setup() -> (CalendarView, CalendarDb, Arc<InMemoryStore>, SessionContext) {
        let store = Arc::new(InMemoryStore::new());
        let db = CalendarDb::new(store.clone());
        db.ensure_user("me").await.unwrap();
        let session = SessionContext::signed_in("me");
        let mut view = CalendarView::new(session.clone());
        view.load_marked_dates(&db).await.unwrap();
        (view, db, store, session)
    }

    /// Put `a` and `b` in a fresh group together.
    async fn share_group(db: &CalendarDb, a: &str, b: &str) {
        let name = format!("{}-{}", a, b);
        db.ensure_user(b).await.unwrap();
        db.create_group(&name, a).await.unwrap();
        db.add_user_group(a, &name).await.unwrap();
        db.add_group_member(&name, b).await.unwrap();
        db.add_user_group(b, &name).await.unwrap();
    }

    #[tokio::test]
    async fn test_double_click_toggles_second_day_only() {
        let (mut view, db, _, _) = setup().await;

        let first = view
            .handle_day_activate(&db, d(2024, 1, 10), t0())
            .await
            .unwrap();
        assert_eq!(first, DayActivation::Pending);

        let second = view
            .handle_day_activate(&db, d(2024, 1, 11), t0() + Duration::milliseconds(150))
            .await
            .unwrap();
        assert_eq!(
            second,
            DayActivation::Toggled {
                date: d(2024, 1, 11),
                marked: true
            }
        );

        assert!(view.is_marked(d(2024, 1, 11)));
        assert!(!view.is_marked(d(2024, 1, 10)));

        let saved = db.get_user("me").await.unwrap().unwrap();
        assert!(saved.marked_dates.is_marked(d(2024, 1, 11)));
        assert!(!saved.marked_dates.is_marked(d(2024, 1, 10)));
    }

    #[tokio::test]
    async fn test_slow_clicks_start_fresh_window() {
        let (mut view, db, store, _) = setup().await;
        let writes = store.write_count();

        let first = view
            .handle_day_activate(&db, d(2024, 1, 10), t0())
            .await
            .unwrap();
        let second = view
            .handle_day_activate(&db, d(2024, 1, 10), t0() + Duration::milliseconds(300))
            .await
            .unwrap();
        assert_eq!(first, DayActivation::Pending);
        assert_eq!(second, DayActivation::Pending);
        assert_eq!(store.write_count(), writes);

        // The second click opened a new window.
        let third = view
            .handle_day_activate(&db, d(2024, 1, 10), t0() + Duration::milliseconds(500))
            .await
            .unwrap();
        assert!(matches!(third, DayActivation::Toggled { marked: true, .. }));
    }

    #[tokio::test]
    async fn test_double_click_untoggles() {
        let (mut view, db, _, _) = setup().await;
        let day = d(2024, 5, 1);

        for offset in [0, 100, 1000, 1100] {
            view.handle_day_activate(&db, day, t0() + Duration::milliseconds(offset))
                .await
                .unwrap();
        }

        assert!(!view.is_marked(day));
        assert_eq!(view.marked_dates().len(), 1);
    }

    #[tokio::test]
    async fn test_activation_ignored_in_range_mode_and_member_view() {
        let (mut view, db, store, _) = setup().await;
        share_group(&db, "me", "friend").await;
        let writes = store.write_count();

        view.toggle_range_selection_mode();
        let result = view
            .handle_day_activate(&db, d(2024, 1, 10), t0())
            .await
            .unwrap();
        assert_eq!(result, DayActivation::Ignored);
        view.toggle_range_selection_mode();

        view.switch_viewed_identity(&db, "friend").await.unwrap();
        assert!(!view.is_own_calendar());
        for offset in [0, 50] {
            let result = view
                .handle_day_activate(&db, d(2024, 1, 10), t0() + Duration::milliseconds(offset))
                .await
                .unwrap();
            assert_eq!(result, DayActivation::Ignored);
        }
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_selecting_self_is_own_calendar() {
        let (mut view, db, _, _) = setup().await;
        view.switch_viewed_identity(&db, "me").await.unwrap();
        assert!(view.is_own_calendar());
        assert_eq!(view.viewed_identity().as_deref(), Some("me"));
    }

    #[tokio::test]
    async fn test_load_requires_session() {
        let store = Arc::new(InMemoryStore::new());
        let db = CalendarDb::new(store);
        let mut view = CalendarView::new(SessionContext::new(None));

        let err = view.load_marked_dates(&db).await.unwrap_err();
        assert!(matches!(err, AppError::AuthRequired));
        assert!(view.error().is_some());
    }

    #[tokio::test]
    async fn test_stranger_calendar_is_permission_denied() {
        let (mut view, db, _, _) = setup().await;
        db.ensure_user("stranger").await.unwrap();
        let marked: MarkedDates = [("3/3/2024".to_string(), true)].into_iter().collect();
        db.save_marked_dates("stranger", &marked).await.unwrap();

        let err = view
            .switch_viewed_identity(&db, "stranger")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PermissionDenied(_)));
        assert!(view.error().unwrap().contains("share a group"));
        assert!(!view.is_marked(d(2024, 3, 3)));
    }

    #[tokio::test]
    async fn test_store_permission_denied_is_surfaced() {
        let (mut view, db, store, _) = setup().await;
        share_group(&db, "me", "friend").await;
        store.deny_access("users", "friend");

        let err = view.switch_viewed_identity(&db, "friend").await.unwrap_err();

        assert!(matches!(err, AppError::PermissionDenied(_)));
        assert!(view.error().unwrap().contains("share a group"));
    }

    #[tokio::test]
    async fn test_load_replaces_map_and_nickname() {
        let (mut view, db, _, _) = setup().await;
        share_group(&db, "me", "friend").await;
        db.save_nickname("friend", "Kai").await.unwrap();
        let marked: MarkedDates = [("3/3/2024".to_string(), true)].into_iter().collect();
        db.save_marked_dates("friend", &marked).await.unwrap();

        view.switch_viewed_identity(&db, "friend").await.unwrap();

        assert_eq!(view.nickname(), "Kai");
        assert!(view.is_marked(d(2024, 3, 3)));
        assert_eq!(view.error(), None);

        view.return_to_own_calendar(&db).await.unwrap();
        assert!(view.is_own_calendar());
        assert_eq!(view.nickname(), "me");
        assert!(!view.is_marked(d(2024, 3, 3)));
    }

    #[tokio::test]
    async fn test_stale_load_is_discarded() {
        let (mut view, db, _, _) = setup().await;
        db.ensure_user("slow").await.unwrap();
        db.ensure_user("fast").await.unwrap();
        db.save_nickname("slow", "Slow").await.unwrap();
        db.save_nickname("fast", "Fast").await.unwrap();

        let slow = view.select_target("slow").unwrap();
        let fast = view.select_target("fast").unwrap();

        let fast_result = db.get_user(fast.identity()).await;
        assert!(view.finish_load(fast, fast_result).unwrap());

        let slow_result = db.get_user(slow.identity()).await;
        assert!(!view.finish_load(slow, slow_result).unwrap());

        assert_eq!(view.nickname(), "Fast");
    }

    #[tokio::test]
    async fn test_sign_out_resets_view() {
        let (mut view, db, _, session) = setup().await;
        view.handle_day_activate(&db, d(2024, 1, 10), t0())
            .await
            .unwrap();
        view.handle_day_activate(&db, d(2024, 1, 10), t0() + Duration::milliseconds(10))
            .await
            .unwrap();
        assert!(view.is_marked(d(2024, 1, 10)));

        session.sign_out();

        let err = view.load_marked_dates(&db).await.unwrap_err();
        assert!(matches!(err, AppError::AuthRequired));
        assert!(!view.is_marked(d(2024, 1, 10)));
    }

    #[tokio::test]
    async fn test_range_statistics_flow() {
        let (mut view, db, _, _) = setup().await;
        let marked: MarkedDates = [
            ("1/10/2024".to_string(), true),
            ("1/12/2024".to_string(), true),
        ]
        .into_iter()
        .collect();
        db.save_marked_dates("me", &marked).await.unwrap();
        view.load_marked_dates(&db).await.unwrap();

        view.toggle_range_selection_mode();
        assert!(view.range_mode());

        view.handle_range_change(RangeSelection::Single(d(2024, 1, 10)));
        assert_eq!(view.cursor(), d(2024, 1, 10));
        assert!(view.statistics().is_none());

        view.handle_range_change(RangeSelection::Complete(d(2024, 1, 10), d(2024, 1, 12)));
        let stats = view.statistics().unwrap();
        assert_eq!(stats.marked_count, 2);
        assert_eq!(stats.total_days, 3);
        assert_eq!(stats.percentage, "66.7");
        assert_eq!(view.cursor(), d(2024, 1, 12));

        // Reversed selection leaves everything as it was.
        view.handle_range_change(RangeSelection::Complete(d(2024, 2, 1), d(2024, 1, 1)));
        assert_eq!(view.statistics().unwrap().total_days, 3);

        view.exit_range_selection_mode();
        assert!(!view.range_mode());
        assert!(view.selected_range().is_none());
        assert!(view.statistics().is_none());
        assert_eq!(view.cursor(), today());
    }

    #[tokio::test]
    async fn test_entering_range_mode_clears_previous_selection() {
        let (mut view, _, _, _) = setup().await;

        view.toggle_range_selection_mode();
        view.handle_range_change(RangeSelection::Complete(d(2024, 1, 1), d(2024, 1, 2)));
        assert!(view.statistics().is_some());

        // Leaving through the toggle keeps the last result on screen.
        view.toggle_range_selection_mode();
        assert!(view.statistics().is_some());

        view.toggle_range_selection_mode();
        assert!(view.selected_range().is_none());
        assert!(view.statistics().is_none());
    }

    #[tokio::test]
    async fn test_range_outside_range_mode_only_moves_cursor() {
        let (mut view, _, _, _) = setup().await;

        view.handle_range_change(RangeSelection::Complete(d(2024, 1, 1), d(2024, 1, 5)));

        assert_eq!(view.cursor(), d(2024, 1, 5));
        assert!(view.selected_range().is_none());
        assert!(view.statistics().is_none());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_local_map() {
        let (mut view, db, store, _) = setup().await;
        store.deny_access("users", "me");

        view.handle_day_activate(&db, d(2024, 1, 10), t0())
            .await
            .unwrap();
        let err = view
            .handle_day_activate(&db, d(2024, 1, 10), t0() + Duration::milliseconds(20))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PermissionDenied(_)));
        assert!(!view.is_marked(d(2024, 1, 10)));
        assert!(view.error().is_some());
    }
}
