// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile model for storage and API.

use crate::models::calendar::MarkedDates;
use serde::{Deserialize, Serialize};

/// Firestore field names of a user document.
pub mod fields {
    pub const NICKNAME: &str = "nickname";
    pub const MARKED_DATES: &str = "markedDates";
    pub const GROUPS: &str = "groups";
    pub const CREATED_AT: &str = "createdAt";
}

/// User profile stored at `users/{uid}`.
///
/// The identity id is the document id and is not repeated in the body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Display nickname, unset until the first-login prompt is answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default)]
    pub marked_dates: MarkedDates,
    /// Ids of the groups this user belongs to
    #[serde(default)]
    pub groups: Vec<String>,
    /// When the profile was first created (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl UserProfile {
    /// Nickname for display, falling back to the raw identity id.
    pub fn display_name(&self, uid: &str) -> String {
        match self.nickname.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => uid.to_string(),
        }
    }
}
