// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
};
use markcal::config::Config;
use markcal::db::{CalendarDb, FirestoreStore, InMemoryStore};
use markcal::middleware::auth::create_jwt;
use markcal::routes::create_router;
use markcal::services::SessionRegistry;
use markcal::AppState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> CalendarDb {
    let store = FirestoreStore::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator");
    CalendarDb::new(Arc::new(store))
}

/// Generate a unique identity id for test isolation.
#[allow(dead_code)]
pub fn unique_id(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}

/// Test app backed by an in-memory store.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: Arc<InMemoryStore>,
}

#[allow(dead_code)]
impl TestApp {
    /// Bearer token for `uid` signed with the test key.
    pub fn token(&self, uid: &str) -> String {
        create_jwt(uid, &self.state.config.jwt_signing_key).unwrap()
    }

    /// Send a request as `uid` and return the status and parsed JSON body.
    pub async fn call(
        &self,
        uid: &str,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(uid)));

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, json_body(response).await)
    }
}

/// Read a response body as JSON (`Null` when empty).
#[allow(dead_code)]
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

/// Create a test app with an in-memory document store.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let state = Arc::new(AppState {
        config: Config::default(),
        db: CalendarDb::new(store.clone()),
        sessions: SessionRegistry::new(),
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
    }
}
