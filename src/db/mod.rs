// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! All persistence goes through the [`DocumentStore`] trait, addressed by
//! `(collection, document id)`. [`CalendarDb`] layers typed user/group
//! operations on top of it.

pub mod calendar_db;
pub mod firestore;
pub mod memory;

pub use self::calendar_db::CalendarDb;
pub use self::firestore::FirestoreStore;
pub use self::memory::InMemoryStore;

use async_trait::async_trait;
use serde_json::{Map, Value};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const GROUPS: &str = "groups";
}

/// A schema-less document: top-level field name to JSON value.
pub type Document = Map<String, Value>;

/// Options for [`DocumentStore::set`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Replace only the named fields and keep the rest of the document.
    pub merge: bool,
}

impl SetOptions {
    pub fn merge() -> Self {
        Self { merge: true }
    }

    pub fn overwrite() -> Self {
        Self { merge: false }
    }
}

/// A single field mutation for [`DocumentStore::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Replace the field value.
    Set(Value),
    /// Append each value to a list field unless already present.
    AppendToSet(Vec<Value>),
}

/// Errors reported by a document store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Backend(String),
}

/// Generic document-store interface.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, `None` if it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Write a document. With `merge`, fields not named in `fields` are kept;
    /// otherwise the document is replaced. Creates the document if absent.
    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        options: SetOptions,
    ) -> Result<(), StoreError>;

    /// Mutate fields of an existing document. Fails with
    /// [`StoreError::NotFound`] if the document does not exist.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Vec<(String, FieldUpdate)>,
    ) -> Result<(), StoreError>;
}
