// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running and
//! FIRESTORE_EMULATOR_HOST to be set. They are skipped otherwise.

use markcal::error::AppError;
use markcal::models::MarkedDates;

mod common;
use common::{test_db, unique_id};

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_ensure_user_is_idempotent() {
    require_emulator!();
    let db = test_db().await;
    let uid = unique_id("user");

    assert!(db.ensure_user(&uid).await.unwrap());
    assert!(!db.ensure_user(&uid).await.unwrap());

    let profile = db.get_user(&uid).await.unwrap().unwrap();
    assert!(profile.groups.is_empty());
    assert!(profile.created_at.is_some());
    assert!(profile.nickname.is_none());
}

#[tokio::test]
async fn test_marked_dates_merge_keeps_nickname() {
    require_emulator!();
    let db = test_db().await;
    let uid = unique_id("user");

    db.save_nickname(&uid, "Ally").await.unwrap();
    let marked: MarkedDates = [
        ("3/10/2024".to_string(), true),
        ("3/11/2024".to_string(), false),
    ]
    .into_iter()
    .collect();
    db.save_marked_dates(&uid, &marked).await.unwrap();

    let profile = db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(profile.nickname.as_deref(), Some("Ally"));
    assert_eq!(profile.marked_dates, marked);
}

#[tokio::test]
async fn test_missing_user() {
    require_emulator!();
    let db = test_db().await;

    assert!(db.get_user(&unique_id("ghost")).await.unwrap().is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// GROUP TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_group_membership_append_is_set_like() {
    require_emulator!();
    let db = test_db().await;
    let name = unique_id("group");
    let alice = unique_id("alice");
    let bob = unique_id("bob");

    let group = db.create_group(&name, &alice).await.unwrap();
    assert_eq!(group.members, vec![alice.clone()]);

    db.add_group_member(&name, &bob).await.unwrap();
    db.add_group_member(&name, &bob).await.unwrap();

    let group = db.get_group(&name).await.unwrap().unwrap();
    assert_eq!(group.members, vec![alice, bob]);
    assert!(!group.created_at.is_empty());
}

#[tokio::test]
async fn test_add_member_to_missing_group() {
    require_emulator!();
    let db = test_db().await;

    let result = db
        .add_group_member(&unique_id("missing"), &unique_id("bob"))
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}
