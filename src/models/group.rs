// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Group model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Firestore field names of a group document.
pub mod fields {
    pub const CREATED_BY: &str = "createdBy";
    pub const MEMBERS: &str = "members";
    pub const CREATED_AT: &str = "createdAt";
}

/// Group stored at `groups/{name}`. The name doubles as the join code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Identity id of the creator
    #[serde(default)]
    pub created_by: String,
    /// Member identity ids in join order
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub created_at: String,
}

impl Group {
    pub fn has_member(&self, uid: &str) -> bool {
        self.members.iter().any(|m| m == uid)
    }
}

/// A group member resolved for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GroupMember {
    pub uid: String,
    pub nickname: String,
}

/// One entry of the user's group list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub name: String,
    /// 0 when the group document could not be found
    pub member_count: u32,
    pub members: Vec<GroupMember>,
}
