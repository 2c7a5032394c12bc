// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory [`DocumentStore`] for tests and local development.

use crate::db::{Document, DocumentStore, FieldUpdate, SetOptions, StoreError};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

type DocKey = (String, String);

fn key(collection: &str, id: &str) -> DocKey {
    (collection.to_string(), id.to_string())
}

/// Document store held in a concurrent map.
///
/// Documents can be marked as access-denied to emulate security rules, and
/// every successful write is counted.
#[derive(Default)]
pub struct InMemoryStore {
    docs: DashMap<DocKey, Document>,
    denied: DashSet<DocKey>,
    writes: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every read and write of `collection/id` with `PermissionDenied`.
    pub fn deny_access(&self, collection: &str, id: &str) {
        self.denied.insert(key(collection, id));
    }

    /// Number of successful `set`/`update` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_access(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        if self.denied.contains(&key(collection, id)) {
            return Err(StoreError::PermissionDenied(
                "Missing or insufficient permissions.".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.check_access(collection, id)?;
        Ok(self.docs.get(&key(collection, id)).map(|doc| doc.clone()))
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        options: SetOptions,
    ) -> Result<(), StoreError> {
        self.check_access(collection, id)?;

        let mut entry = self.docs.entry(key(collection, id)).or_default();
        if options.merge {
            entry.extend(fields);
        } else {
            *entry = fields;
        }
        drop(entry);

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Vec<(String, FieldUpdate)>,
    ) -> Result<(), StoreError> {
        self.check_access(collection, id)?;

        let mut doc = self
            .docs
            .get_mut(&key(collection, id))
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection, id)))?;

        // Validate before mutating so a bad field leaves the document untouched.
        for (name, update) in &fields {
            if let FieldUpdate::AppendToSet(_) = update {
                if let Some(existing) = doc.get(name) {
                    if !existing.is_array() && !existing.is_null() {
                        return Err(StoreError::Backend(format!(
                            "field '{}' is not a list",
                            name
                        )));
                    }
                }
            }
        }

        for (name, update) in fields {
            match update {
                FieldUpdate::Set(value) => {
                    doc.insert(name, value);
                }
                FieldUpdate::AppendToSet(values) => {
                    let slot = doc.entry(name).or_insert_with(|| Value::Array(Vec::new()));
                    if slot.is_null() {
                        *slot = Value::Array(Vec::new());
                    }
                    if let Value::Array(items) = slot {
                        for value in values {
                            if !items.contains(&value) {
                                items.push(value);
                            }
                        }
                    }
                }
            }
        }
        drop(doc);

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
