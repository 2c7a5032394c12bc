// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Group API tests against the in-memory store.
//!
//! These tests verify that:
//! 1. Empty and unusable names are rejected without writes
//! 2. Taken names and repeat joins are rejected without writes
//! 3. Create and join update both the group and the user profile

use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;

#[tokio::test]
async fn test_create_group_empty_name() {
    let app = common::create_test_app();
    // Open the session first so bootstrap writes are not counted
    app.call("alice", "GET", "/api/groups", None).await;
    let writes = app.store.write_count();

    let (status, body) = app
        .call("alice", "POST", "/api/groups", Some(json!({ "name": "   " })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(app.store.write_count(), writes);
}

#[tokio::test]
async fn test_create_group_unusable_name() {
    let app = common::create_test_app();
    app.call("alice", "GET", "/api/groups", None).await;
    let writes = app.store.write_count();

    for name in ["a/b", "..", "__reserved__"] {
        let (status, _) = app
            .call("alice", "POST", "/api/groups", Some(json!({ "name": name })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "name {:?}", name);
    }
    assert_eq!(app.store.write_count(), writes);
}

#[tokio::test]
async fn test_create_group_name_too_long() {
    let app = common::create_test_app();
    let name = "x".repeat(101);

    let (status, body) = app
        .call("alice", "POST", "/api/groups", Some(json!({ "name": name })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_create_group_round_trip() {
    let app = common::create_test_app();

    let (status, body) = app
        .call("alice", "POST", "/api/groups", Some(json!({ "name": " Hikers " })))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], "Group 'Hikers' created");
    assert_eq!(body["groups"][0]["name"], "Hikers");
    assert_eq!(body["groups"][0]["memberCount"], 1);
    assert_eq!(body["groups"][0]["members"][0]["uid"], "alice");

    let group = app.state.db.get_group("Hikers").await.unwrap().unwrap();
    assert_eq!(group.created_by, "alice");
    assert_eq!(group.members, vec!["alice".to_string()]);

    let profile = app.state.db.get_user("alice").await.unwrap().unwrap();
    assert_eq!(profile.groups, vec!["Hikers".to_string()]);
}

#[tokio::test]
async fn test_create_group_name_taken() {
    let app = common::create_test_app();
    app.call("alice", "POST", "/api/groups", Some(json!({ "name": "Hikers" })))
        .await;
    app.call("bob", "GET", "/api/groups", None).await;
    let writes = app.store.write_count();

    let (status, body) = app
        .call("bob", "POST", "/api/groups", Some(json!({ "name": "Hikers" })))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "name_taken");
    assert_eq!(app.store.write_count(), writes);

    let group = app.state.db.get_group("Hikers").await.unwrap().unwrap();
    assert_eq!(group.created_by, "alice");
}

#[tokio::test]
async fn test_join_group_flow() {
    let app = common::create_test_app();
    app.state.db.save_nickname("alice", "Ally").await.unwrap();
    app.call("alice", "POST", "/api/groups", Some(json!({ "name": "Hikers" })))
        .await;

    let (status, body) = app
        .call("bob", "POST", "/api/groups/join", Some(json!({ "code": "Hikers" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], "Joined group 'Hikers'");
    assert_eq!(body["groups"][0]["memberCount"], 2);

    let members: Vec<Value> = body["groups"][0]["members"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    assert_eq!(members[0]["nickname"], "Ally");
    assert_eq!(members[1]["uid"], "bob");

    let profile = app.state.db.get_user("bob").await.unwrap().unwrap();
    assert_eq!(profile.groups, vec!["Hikers".to_string()]);
}

#[tokio::test]
async fn test_join_group_already_member() {
    let app = common::create_test_app();
    app.call("alice", "POST", "/api/groups", Some(json!({ "name": "Hikers" })))
        .await;
    let writes = app.store.write_count();

    let (status, body) = app
        .call("alice", "POST", "/api/groups/join", Some(json!({ "code": "Hikers" })))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_member");
    assert_eq!(app.store.write_count(), writes);
}

#[tokio::test]
async fn test_join_missing_group() {
    let app = common::create_test_app();

    let (status, body) = app
        .call("bob", "POST", "/api/groups/join", Some(json!({ "code": "Nowhere" })))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (_, panel) = app.call("bob", "GET", "/api/groups", None).await;
    assert_eq!(panel["groups"], json!([]));
}

#[tokio::test]
async fn test_expand_toggles() {
    let app = common::create_test_app();
    app.call("alice", "POST", "/api/groups", Some(json!({ "name": "Hikers" })))
        .await;

    let (_, body) = app
        .call("alice", "POST", "/api/groups/expand", Some(json!({ "name": "Hikers" })))
        .await;
    assert_eq!(body["expandedGroup"], "Hikers");

    let (_, body) = app
        .call("alice", "POST", "/api/groups/expand", Some(json!({ "name": "Hikers" })))
        .await;
    assert_eq!(body["expandedGroup"], Value::Null);
}
