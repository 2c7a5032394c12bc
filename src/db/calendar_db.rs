// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed user and group operations over a [`DocumentStore`].
//!
//! Provides high-level operations for:
//! - Users (profile bootstrap, nickname, marked dates, group list)
//! - Groups (lookup, creation, membership)
//! - Reading another member's calendar (shared-group check)

use crate::db::{collections, Document, DocumentStore, FieldUpdate, SetOptions};
use crate::error::AppError;
use crate::models::group::fields as group_fields;
use crate::models::user::fields as user_fields;
use crate::models::{Group, MarkedDates, UserProfile};
use crate::time_utils::format_utc_rfc3339;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

/// Calendar database handle. Cheap to clone.
#[derive(Clone)]
pub struct CalendarDb {
    store: Arc<dyn DocumentStore>,
}

fn decode<T: DeserializeOwned>(collection: &str, id: &str, doc: Document) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(doc)).map_err(|e| {
        AppError::Store(format!("Malformed document {}/{}: {}", collection, id, e))
    })
}

fn document<const N: usize>(fields: [(&str, Value); N]) -> Document {
    fields
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

impl CalendarDb {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user profile by identity id.
    pub async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        self.store
            .get(collections::USERS, uid)
            .await?
            .map(|doc| decode(collections::USERS, uid, doc))
            .transpose()
    }

    /// Create the profile document if it does not exist yet.
    ///
    /// Returns `true` if a new profile was written.
    pub async fn ensure_user(&self, uid: &str) -> Result<bool, AppError> {
        if self.store.get(collections::USERS, uid).await?.is_some() {
            return Ok(false);
        }

        let fields = document([
            (user_fields::GROUPS, json!([])),
            (
                user_fields::CREATED_AT,
                json!(format_utc_rfc3339(chrono::Utc::now())),
            ),
        ]);
        self.store
            .set(collections::USERS, uid, fields, SetOptions::merge())
            .await?;

        tracing::info!(uid = %uid, "Created user profile");
        Ok(true)
    }

    /// Merge-write the full marked-date map, leaving other fields untouched.
    pub async fn save_marked_dates(&self, uid: &str, marked: &MarkedDates) -> Result<(), AppError> {
        let value = serde_json::to_value(marked)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Encoding marked dates: {}", e)))?;
        self.store
            .set(
                collections::USERS,
                uid,
                document([(user_fields::MARKED_DATES, value)]),
                SetOptions::merge(),
            )
            .await?;
        Ok(())
    }

    /// Merge-write the nickname.
    pub async fn save_nickname(&self, uid: &str, nickname: &str) -> Result<(), AppError> {
        self.store
            .set(
                collections::USERS,
                uid,
                document([(user_fields::NICKNAME, json!(nickname))]),
                SetOptions::merge(),
            )
            .await?;
        Ok(())
    }

    /// Append a group id to the user's group list (no duplicates).
    pub async fn add_user_group(&self, uid: &str, group: &str) -> Result<(), AppError> {
        self.store
            .update(
                collections::USERS,
                uid,
                vec![(
                    user_fields::GROUPS.to_string(),
                    FieldUpdate::AppendToSet(vec![json!(group)]),
                )],
            )
            .await?;
        Ok(())
    }

    // ─── Group Operations ────────────────────────────────────────

    /// Get a group by name.
    pub async fn get_group(&self, name: &str) -> Result<Option<Group>, AppError> {
        self.store
            .get(collections::GROUPS, name)
            .await?
            .map(|doc| decode(collections::GROUPS, name, doc))
            .transpose()
    }

    /// Write a new group document with the creator as its only member.
    pub async fn create_group(&self, name: &str, creator: &str) -> Result<Group, AppError> {
        let group = Group {
            created_by: creator.to_string(),
            members: vec![creator.to_string()],
            created_at: format_utc_rfc3339(chrono::Utc::now()),
        };

        let fields = document([
            (group_fields::CREATED_BY, json!(group.created_by)),
            (group_fields::MEMBERS, json!(group.members)),
            (group_fields::CREATED_AT, json!(group.created_at)),
        ]);
        self.store
            .set(collections::GROUPS, name, fields, SetOptions::overwrite())
            .await?;

        Ok(group)
    }

    /// Append a member to the group (no duplicates).
    pub async fn add_group_member(&self, name: &str, uid: &str) -> Result<(), AppError> {
        self.store
            .update(
                collections::GROUPS,
                name,
                vec![(
                    group_fields::MEMBERS.to_string(),
                    FieldUpdate::AppendToSet(vec![json!(uid)]),
                )],
            )
            .await?;
        Ok(())
    }

    // ─── Read Policy ─────────────────────────────────────────────

    /// True if some group on `viewer`'s list has both identities as members.
    pub async fn shares_group(&self, viewer: &str, member: &str) -> Result<bool, AppError> {
        let groups = self
            .get_user(viewer)
            .await?
            .map(|profile| profile.groups)
            .unwrap_or_default();

        for name in groups {
            if let Some(group) = self.get_group(&name).await? {
                if group.has_member(viewer) && group.has_member(member) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Read `target`'s profile on behalf of `viewer`.
    ///
    /// The service reads with its own credentials, so store-side rules do
    /// not apply; another identity's calendar is only returned when the two
    /// share a group.
    pub async fn get_calendar_for(
        &self,
        viewer: &str,
        target: &str,
    ) -> Result<Option<UserProfile>, AppError> {
        if target == viewer {
            return self.get_user(target).await;
        }
        if target.is_empty() || target.contains('/') {
            return Err(AppError::Validation(format!(
                "'{}' is not a valid member id",
                target
            )));
        }
        if !self.shares_group(viewer, target).await? {
            tracing::warn!(viewer = %viewer, target = %target, "Calendar read outside shared groups");
            return Err(AppError::PermissionDenied(format!(
                "{} does not share a group with {}",
                target, viewer
            )));
        }
        self.get_user(target).await
    }
}
