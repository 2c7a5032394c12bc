// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-identity viewer sessions.
//!
//! A viewer session composes one [`CalendarView`] and one [`GroupPanel`]
//! around a shared [`SessionContext`]. The two only talk through the
//! member-selection channel. Sessions are kept in a registry keyed by
//! identity id and live until sign-out.

use crate::db::CalendarDb;
use crate::error::AppError;
use crate::services::calendar::{CalendarSnapshot, CalendarView};
use crate::services::groups::{GroupPanel, MemberSelected};
use crate::services::session::SessionContext;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};

/// Sessions not opened for this long are dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Calendar view and group panel of one signed-in identity.
#[derive(Debug)]
pub struct ViewerSession {
    pub calendar: CalendarView,
    pub groups: GroupPanel,
    selections: mpsc::UnboundedReceiver<MemberSelected>,
}

impl ViewerSession {
    pub fn new(session: SessionContext) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            calendar: CalendarView::new(session.clone()),
            groups: GroupPanel::new(session, tx),
            selections: rx,
        }
    }

    /// Drain pending member selections, returning the most recent one.
    pub fn take_selection(&mut self) -> Option<MemberSelected> {
        let mut latest = None;
        while let Ok(event) = self.selections.try_recv() {
            latest = Some(event);
        }
        latest
    }
}

/// Shared handle on a registered viewer session.
#[derive(Clone, Debug)]
pub struct ViewerHandle {
    session: SessionContext,
    viewer: Arc<Mutex<ViewerSession>>,
}

impl ViewerHandle {
    fn new(session: SessionContext) -> Self {
        Self {
            viewer: Arc::new(Mutex::new(ViewerSession::new(session.clone()))),
            session,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, ViewerSession> {
        self.viewer.lock().await
    }

    /// Reload the calendar of whoever is currently viewed.
    ///
    /// The lock is released while the profile read is in flight; a newer
    /// load started meanwhile wins.
    pub async fn reload_calendar(&self, db: &CalendarDb) -> Result<CalendarSnapshot, AppError> {
        let ticket = self.lock().await.calendar.begin_load()?;
        let result = ticket.fetch(db).await;

        let mut viewer = self.lock().await;
        viewer.calendar.finish_load(ticket, result)?;
        Ok(viewer.calendar.snapshot())
    }

    /// Select a group member and switch the calendar to them.
    pub async fn select_member(
        &self,
        db: &CalendarDb,
        uid: &str,
    ) -> Result<CalendarSnapshot, AppError> {
        let ticket = {
            let mut viewer = self.lock().await;
            viewer.groups.select_member(uid);
            match viewer.take_selection() {
                Some(event) => viewer.calendar.select_target(&event.uid)?,
                None => return Ok(viewer.calendar.snapshot()),
            }
        };
        let result = ticket.fetch(db).await;

        let mut viewer = self.lock().await;
        viewer.calendar.finish_load(ticket, result)?;
        Ok(viewer.calendar.snapshot())
    }
}

struct RegistryEntry {
    handle: ViewerHandle,
    last_access: Instant,
}

/// Registry of live viewer sessions keyed by identity id.
///
/// Idle sessions are swept out whenever a session is opened.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, RegistryEntry>>,
    idle_timeout: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            idle_timeout,
        }
    }

    /// Get the viewer session for `uid`, creating it on first use.
    ///
    /// A new session bootstraps the profile document and loads the own
    /// calendar and group list.
    pub async fn open(&self, db: &CalendarDb, uid: &str) -> Result<ViewerHandle, AppError> {
        self.evict_idle();

        if let Some(mut entry) = self.sessions.get_mut(uid) {
            entry.last_access = Instant::now();
            return Ok(entry.handle.clone());
        }

        db.ensure_user(uid).await?;
        let handle = ViewerHandle::new(SessionContext::signed_in(uid));
        {
            let mut viewer = handle.lock().await;
            if let Err(e) = viewer.calendar.load_marked_dates(db).await {
                tracing::warn!(uid = %uid, error = %e, "Initial calendar load failed");
            }
            if let Err(e) = viewer.groups.load_user_groups(db).await {
                tracing::warn!(uid = %uid, error = %e, "Initial group load failed");
            }
        }

        // Another request may have raced us here; keep whichever landed first.
        let handle = self
            .sessions
            .entry(uid.to_string())
            .or_insert(RegistryEntry {
                handle,
                last_access: Instant::now(),
            })
            .handle
            .clone();
        tracing::info!(uid = %uid, "Viewer session opened");
        Ok(handle)
    }

    /// Sign out and drop every session idle for at least the idle timeout.
    /// Returns how many were dropped.
    pub fn evict_idle(&self) -> usize {
        let is_idle = |entry: &RegistryEntry| entry.last_access.elapsed() >= self.idle_timeout;

        let idle: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| is_idle(entry.value()))
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = 0;
        for uid in idle {
            if let Some((_, entry)) = self.sessions.remove_if(&uid, |_, entry| is_idle(entry)) {
                entry.handle.session.sign_out();
                tracing::info!(uid = %uid, "Idle viewer session evicted");
                evicted += 1;
            }
        }
        evicted
    }

    /// End the session for `uid`, signing it out. Returns `false` if none was open.
    pub fn close(&self, uid: &str) -> bool {
        match self.sessions.remove(uid) {
            Some((_, entry)) => {
                entry.handle.session.sign_out();
                tracing::info!(uid = %uid, "Viewer session closed");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
