// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Group membership panel: create, join and list groups.
//!
//! Create and join each perform two writes (group document, then the
//! user's group list) without a transaction. A failure between them is
//! reported and leaves the first write in place.

use crate::db::CalendarDb;
use crate::error::AppError;
use crate::models::{GroupMember, GroupSummary};
use crate::services::session::{SessionContext, SessionSubscription};
use futures_util::{stream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Upper bound on concurrent nickname lookups while listing groups.
const MAX_CONCURRENT_LOOKUPS: usize = 8;

/// Event emitted when a member is picked from an expanded group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSelected {
    pub uid: String,
}

/// Serializable view of the panel state.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct GroupPanelSnapshot {
    pub groups: Vec<GroupSummary>,
    pub expanded_group: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Trim a group name or join code and check it can be used as a document id.
fn validate_group_id<'a>(raw: &'a str, empty_message: &str) -> Result<&'a str, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation(empty_message.to_string()));
    }
    if name.contains('/') || name == "." || name == ".." {
        return Err(AppError::Validation(format!(
            "'{}' cannot be used as a group name",
            name
        )));
    }
    if name.starts_with("__") && name.ends_with("__") {
        return Err(AppError::Validation(format!(
            "'{}' is a reserved name",
            name
        )));
    }
    Ok(name)
}

/// Per-session group panel.
#[derive(Debug)]
pub struct GroupPanel {
    session: SessionContext,
    subscription: SessionSubscription,
    groups: Vec<GroupSummary>,
    expanded: Option<String>,
    error: Option<String>,
    success: Option<String>,
    selections: mpsc::UnboundedSender<MemberSelected>,
}

impl GroupPanel {
    pub fn new(session: SessionContext, selections: mpsc::UnboundedSender<MemberSelected>) -> Self {
        let subscription = session.subscribe();
        Self {
            session,
            subscription,
            groups: Vec::new(),
            expanded: None,
            error: None,
            success: None,
            selections,
        }
    }

    pub fn groups(&self) -> &[GroupSummary] {
        &self.groups
    }

    pub fn expanded_group(&self) -> Option<&str> {
        self.expanded.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn success(&self) -> Option<&str> {
        self.success.as_deref()
    }

    pub fn snapshot(&self) -> GroupPanelSnapshot {
        GroupPanelSnapshot {
            groups: self.groups.clone(),
            expanded_group: self.expanded.clone(),
            error: self.error.clone(),
            success: self.success.clone(),
        }
    }

    fn sync_session(&mut self) {
        if self.subscription.poll_change().is_some() {
            self.groups.clear();
            self.expanded = None;
            self.error = None;
            self.success = None;
        }
    }

    fn require_identity(&self) -> Result<String, AppError> {
        self.session
            .current_identity()
            .ok_or(AppError::AuthRequired)
    }

    /// Record the outcome of a user action as a visible message.
    fn finish_action(&mut self, result: Result<(), AppError>) -> Result<(), AppError> {
        if let Err(err) = &result {
            self.success = None;
            self.error = Some(err.to_string());
        }
        result
    }

    // ─── Create ──────────────────────────────────────────────────

    /// Create a group named `name` with the session identity as its only member.
    pub async fn create_group(&mut self, db: &CalendarDb, name: &str) -> Result<(), AppError> {
        self.sync_session();
        self.error = None;
        self.success = None;
        let result = self.try_create_group(db, name).await;
        self.finish_action(result)
    }

    async fn try_create_group(&mut self, db: &CalendarDb, name: &str) -> Result<(), AppError> {
        let uid = self.require_identity()?;
        let name = validate_group_id(name, "Please enter a group name")?;

        if db.get_group(name).await?.is_some() {
            return Err(AppError::NameTaken(name.to_string()));
        }

        db.ensure_user(&uid).await?;
        db.create_group(name, &uid).await?;
        db.add_user_group(&uid, name).await?;

        tracing::info!(uid = %uid, group = %name, "Group created");
        self.success = Some(format!("Group '{}' created", name));
        self.refresh_after_write(db).await;
        Ok(())
    }

    // ─── Join ────────────────────────────────────────────────────

    /// Join the group whose name is `code`.
    pub async fn join_group(&mut self, db: &CalendarDb, code: &str) -> Result<(), AppError> {
        self.sync_session();
        self.error = None;
        self.success = None;
        let result = self.try_join_group(db, code).await;
        self.finish_action(result)
    }

    async fn try_join_group(&mut self, db: &CalendarDb, code: &str) -> Result<(), AppError> {
        let uid = self.require_identity()?;
        let code = validate_group_id(code, "Please enter a group code")?;

        let group = db
            .get_group(code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group '{}' does not exist", code)))?;
        if group.has_member(&uid) {
            return Err(AppError::AlreadyMember(code.to_string()));
        }

        db.add_group_member(code, &uid).await?;
        db.ensure_user(&uid).await?;
        db.add_user_group(&uid, code).await?;

        tracing::info!(uid = %uid, group = %code, "Joined group");
        self.success = Some(format!("Joined group '{}'", code));
        self.refresh_after_write(db).await;
        Ok(())
    }

    // ─── Listing ─────────────────────────────────────────────────

    /// Reload the session identity's groups with member nicknames.
    pub async fn load_user_groups(&mut self, db: &CalendarDb) -> Result<(), AppError> {
        self.sync_session();
        let result = self.refresh(db).await;
        self.finish_action(result)
    }

    /// Refresh once an action's writes are done. The action stands even if
    /// the listing fails.
    async fn refresh_after_write(&mut self, db: &CalendarDb) {
        if let Err(e) = self.refresh(db).await {
            tracing::warn!(error = %e, "Group list refresh failed after write");
        }
    }

    async fn refresh(&mut self, db: &CalendarDb) -> Result<(), AppError> {
        let uid = self.require_identity()?;
        let group_names = db
            .get_user(&uid)
            .await?
            .map(|profile| profile.groups)
            .unwrap_or_default();

        let mut summaries = Vec::with_capacity(group_names.len());
        for name in group_names {
            let Some(group) = db.get_group(&name).await? else {
                tracing::warn!(uid = %uid, group = %name, "Listed group has no document");
                summaries.push(GroupSummary {
                    name,
                    member_count: 0,
                    members: Vec::new(),
                });
                continue;
            };

            // One profile read per member.
            let members = stream::iter(group.members)
                .map(|member| async move {
                    let nickname = db
                        .get_user(&member)
                        .await?
                        .map(|profile| profile.display_name(&member))
                        .unwrap_or_else(|| member.clone());
                    Ok::<_, AppError>(GroupMember {
                        uid: member,
                        nickname,
                    })
                })
                .buffered(MAX_CONCURRENT_LOOKUPS)
                .collect::<Vec<Result<GroupMember, AppError>>>()
                .await
                .into_iter()
                .collect::<Result<Vec<GroupMember>, AppError>>()?;

            summaries.push(GroupSummary {
                name,
                member_count: members.len() as u32,
                members,
            });
        }

        tracing::debug!(uid = %uid, count = summaries.len(), "Loaded groups");
        self.groups = summaries;
        Ok(())
    }

    // ─── Selection ───────────────────────────────────────────────

    /// Expand `name`, or collapse it if it is already expanded.
    pub fn toggle_group_expand(&mut self, name: &str) {
        if self.expanded.as_deref() == Some(name) {
            self.expanded = None;
        } else {
            self.expanded = Some(name.to_string());
        }
    }

    /// Announce that `uid` was picked from a member list.
    pub fn select_member(&self, uid: &str) {
        let event = MemberSelected {
            uid: uid.to_string(),
        };
        if self.selections.send(event).is_err() {
            tracing::warn!(member = %uid, "No listener for member selection");
        }
    }
}
