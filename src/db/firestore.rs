// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed [`DocumentStore`].
//!
//! Merge-writes become field-masked updates, and append-to-set becomes a
//! server-side `append_missing_elements` transform so concurrent joins never
//! lose members.

use crate::db::{Document, DocumentStore, FieldUpdate, SetOptions, StoreError};
use async_trait::async_trait;
use serde_json::Value;

/// Prefix of the metadata fields the firestore crate injects when
/// deserializing a document into a map.
const RESERVED_FIELD_PREFIX: &str = "_firestore_";

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            StoreError::Backend(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Backend(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client. Every operation fails with a backend error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, StoreError> {
        self.client
            .as_ref()
            .ok_or_else(|| StoreError::Backend("Database not connected (offline mode)".to_string()))
    }
}

/// Classify a firestore error. Security-rule rejections surface as
/// `PermissionDenied` with the original message.
fn classify_error(err: impl std::fmt::Display) -> StoreError {
    let msg = err.to_string();
    let lowered = msg.to_ascii_lowercase();
    if lowered.contains("permissiondenied")
        || lowered.contains("permission denied")
        || lowered.contains("permission_denied")
        || lowered.contains("insufficient permissions")
    {
        StoreError::PermissionDenied(msg)
    } else {
        StoreError::Backend(msg)
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let doc: Option<Document> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(classify_error)?;

        Ok(doc.map(|mut fields| {
            fields.retain(|name, _| !name.starts_with(RESERVED_FIELD_PREFIX));
            fields
        }))
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        options: SetOptions,
    ) -> Result<(), StoreError> {
        let client = self.get_client()?;

        if options.merge {
            let mask: Vec<String> = fields.keys().cloned().collect();
            let _: () = client
                .fluent()
                .update()
                .fields(mask)
                .in_col(collection)
                .document_id(id)
                .object(&fields)
                .execute()
                .await
                .map_err(classify_error)?;
        } else {
            let _: () = client
                .fluent()
                .update()
                .in_col(collection)
                .document_id(id)
                .object(&fields)
                .execute()
                .await
                .map_err(classify_error)?;
        }

        tracing::debug!(collection, id, merge = options.merge, "Document written");
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Vec<(String, FieldUpdate)>,
    ) -> Result<(), StoreError> {
        if self.get(collection, id).await?.is_none() {
            return Err(StoreError::NotFound(format!("{}/{}", collection, id)));
        }

        let mut replaced = Document::new();
        let mut appended: Vec<(String, Vec<Value>)> = Vec::new();
        for (name, update) in fields {
            match update {
                FieldUpdate::Set(value) => {
                    replaced.insert(name, value);
                }
                FieldUpdate::AppendToSet(values) => appended.push((name, values)),
            }
        }

        let client = self.get_client()?;

        // Field replacements and transforms commit together.
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to begin transaction: {}", e)))?;

        if !replaced.is_empty() {
            let mask: Vec<String> = replaced.keys().cloned().collect();
            client
                .fluent()
                .update()
                .fields(mask)
                .in_col(collection)
                .document_id(id)
                .object(&replaced)
                .add_to_transaction(&mut transaction)
                .map_err(classify_error)?;
        }

        if !appended.is_empty() {
            client
                .fluent()
                .update()
                .in_col(collection)
                .document_id(id)
                .transforms(|t| {
                    t.fields(appended.iter().map(|(name, values)| {
                        t.field(name.as_str())
                            .append_missing_elements(values.clone())
                    }))
                })
                .only_transform()
                .add_to_transaction(&mut transaction)
                .map_err(classify_error)?;
        }

        transaction.commit().await.map_err(classify_error)?;

        tracing::debug!(collection, id, "Document updated");
        Ok(())
    }
}
