// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end behavior of the persistence controller over an on-disk store.

use burrow_core::BurrowError;
use burrow_core::types::{
    Command, ConsumerInfo, Cookie, Message, MessageType, PersistenceOperation, Upload,
};
use burrow_storage::Pipeline;
use burrow_test_utils::TestHarness;
use burrow_test_utils::fixtures::{event_at, seed_session, seed_standalone, session_at};

#[tokio::test]
async fn deleting_twice_matches_deleting_once() {
    let harness = TestHarness::new().await.unwrap();
    let controller = harness.controller();
    let (session, ids) = seed_session(controller, 1, 2).await.unwrap();
    let session_id = session.id.unwrap();

    let upload_id = controller
        .save_upload(&Upload::new(session_id, b"p".to_vec()), &ids, PersistenceOperation::Flag)
        .await
        .unwrap();
    controller.delete_upload_id(upload_id).await.unwrap();
    controller.delete_upload_id(upload_id).await.unwrap();
    assert!(controller.fetch_uploads_in_session(session_id).await.is_empty());

    controller.delete_session(&session).await.unwrap();
    controller.delete_session(&session).await.unwrap();
    assert!(controller.fetch_session(session_id).await.is_none());
    assert!(controller.fetch_messages_in_session(session_id).await.is_empty());
}

#[tokio::test]
async fn payload_bytes_round_trip_exactly() {
    let harness = TestHarness::new().await.unwrap();
    let controller = harness.controller();
    let session_id = controller.save_session(&session_at(1, 5.0)).await.unwrap();

    let payload: Vec<u8> = (0..=255u8).rev().chain(0..=255u8).collect();
    let message = Message::new(session_id, MessageType::CrashReport, payload.clone())
        .with_timestamp(1_700_000_000.25);
    let id = controller.save_message(&message).await.unwrap();

    harness.reopen().await.unwrap();
    let stored = controller.fetch_messages_in_session(session_id).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, Some(id));
    assert_eq!(stored[0].payload, payload);
    assert_eq!(stored[0].timestamp, 1_700_000_000.25);
    assert_eq!(stored[0].uuid, message.uuid);
}

#[tokio::test]
async fn ttl_sweep_removes_strictly_older_records() {
    let harness = TestHarness::new().await.unwrap();
    let controller = harness.controller();
    let session_id = controller.save_session(&session_at(1, 0.0)).await.unwrap();
    for ts in [10.0, 20.0, 30.0] {
        controller.save_message(&event_at(session_id, ts)).await.unwrap();
    }

    let report = controller.delete_records_older_than(25.0).await.unwrap();
    assert_eq!(report.deleted_from("messages"), 2);

    let left: Vec<f64> = controller
        .fetch_messages_in_session(session_id)
        .await
        .iter()
        .map(|m| m.timestamp)
        .collect();
    assert_eq!(left, [30.0]);
}

#[tokio::test]
async fn consumer_info_save_is_a_full_replace() {
    let harness = TestHarness::new().await.unwrap();
    let controller = harness.controller();
    controller
        .save_consumer_info(
            &ConsumerInfo::new(1)
                .with_cookie(Cookie::new("uid", "one"))
                .with_cookie(Cookie::new("rid", "two")),
        )
        .await
        .unwrap();
    controller
        .update_consumer_info(&ConsumerInfo::new(2).with_cookie(Cookie::new("sid", "three")))
        .await
        .unwrap();

    controller.purge_memory();
    let info = controller.fetch_consumer_info().await.unwrap();
    assert_eq!(info.mpid, 2);
    let names: Vec<&str> = info.cookies.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["sid"]);
    assert_eq!(controller.fetch_cookies().await.len(), 1);
}

#[tokio::test]
async fn orphaned_messages_and_commands_are_cleaned_up() {
    let harness = TestHarness::new().await.unwrap();
    let controller = harness.controller();
    let (kept, _) = seed_session(controller, 1, 2).await.unwrap();
    let kept_id = kept.id.unwrap();

    for orphan_session in [9_001, 9_002] {
        controller
            .save_message(&event_at(orphan_session, 1.0))
            .await
            .unwrap();
    }
    let command = Command::builder()
        .url("https://example.com/orphan")
        .http_method("POST")
        .timestamp(1.0)
        .build(9_001)
        .unwrap();
    controller.save_command(&command).await.unwrap();

    assert_eq!(controller.delete_messages_with_no_session().await.unwrap(), 3);
    assert_eq!(controller.fetch_messages_in_session(kept_id).await.len(), 2);
    assert!(controller.fetch_commands_in_session(9_001).await.is_empty());
    assert_eq!(controller.delete_messages_with_no_session().await.unwrap(), 0);
}

#[tokio::test]
async fn records_come_back_in_insertion_order() {
    let harness = TestHarness::new().await.unwrap();
    let controller = harness.controller();
    let (session, ids) = seed_session(controller, 1, 5).await.unwrap();

    let fetched: Vec<i64> = controller
        .fetch_messages_for_uploading_in_session(session.id.unwrap())
        .await
        .iter()
        .filter_map(|m| m.id)
        .collect();
    assert_eq!(fetched, ids);

    let standalone = seed_standalone(controller, 4).await.unwrap();
    let fetched: Vec<i64> = controller
        .fetch_standalone_messages()
        .await
        .iter()
        .filter_map(|m| m.id)
        .collect();
    assert_eq!(fetched, standalone);
}

#[tokio::test]
async fn released_upload_members_become_uploadable_again() {
    let harness = TestHarness::new().await.unwrap();
    let controller = harness.controller();
    let (session, ids) = seed_session(controller, 1, 3).await.unwrap();
    let session_id = session.id.unwrap();

    let upload_id = controller
        .save_upload(&Upload::new(session_id, vec![]), &ids, PersistenceOperation::Flag)
        .await
        .unwrap();
    assert_eq!(controller.count_messages_for_upload_in_session(session_id).await, 0);
    assert_eq!(
        controller
            .record_upload_attempt(Pipeline::Session, upload_id)
            .await
            .unwrap(),
        Some(1)
    );

    assert_eq!(
        controller.release_upload(Pipeline::Session, upload_id).await.unwrap(),
        3
    );
    assert_eq!(controller.count_messages_for_upload_in_session(session_id).await, 3);
    assert!(controller.fetch_uploads_in_session(session_id).await.is_empty());

    // The released members can be claimed again.
    controller
        .save_upload(&Upload::new(session_id, vec![]), &ids, PersistenceOperation::Delete)
        .await
        .unwrap();
    assert!(controller.fetch_messages_in_session(session_id).await.is_empty());
}

#[tokio::test]
async fn breadcrumbs_are_capped() {
    let harness = TestHarness::builder()
        .with_max_breadcrumbs(3)
        .build()
        .await
        .unwrap();
    let controller = harness.controller();
    let session = session_at(1, 0.0);
    for ts in 1..=10 {
        let crumb = Message::new(1, MessageType::Breadcrumb, vec![]).with_timestamp(f64::from(ts));
        controller.save_breadcrumb(&crumb, &session).await.unwrap();
    }
    let kept: Vec<f64> = controller
        .fetch_breadcrumbs()
        .await
        .iter()
        .map(|b| b.timestamp)
        .collect();
    assert_eq!(kept, [8.0, 9.0, 10.0]);
}

#[tokio::test]
async fn archived_session_becomes_previous_session() {
    let harness = TestHarness::new().await.unwrap();
    let controller = harness.controller();
    let mut session = session_at(7, 100.0);
    session.id = Some(controller.save_session(&session).await.unwrap());
    session.end_time = 50.0;

    let archived = controller.archive_session(&session).await.unwrap();
    assert!(archived.is_archived());
    assert_eq!(archived.end_time, 100.0);

    harness.reopen().await.unwrap();
    let previous = controller.fetch_previous_session().await.unwrap();
    assert_eq!(previous, archived);
    assert!(controller.fetch_session_from_crash().await.is_none());

    controller.delete_previous_session().await.unwrap();
    assert!(controller.fetch_previous_session().await.is_none());
}

#[tokio::test]
async fn closed_store_degrades_reads_and_fails_writes() {
    let harness = TestHarness::new().await.unwrap();
    let controller = harness.controller();
    seed_session(controller, 1, 2).await.unwrap();
    controller.close().await.unwrap();
    assert!(!controller.is_open().await);

    assert!(controller.fetch_sessions().await.is_empty());
    assert!(controller.fetch_standalone_uploads().await.is_empty());
    assert!(controller.fetch_product_bag("cart").await.is_none());
    assert!(matches!(
        controller.save_message(&event_at(1, 1.0)).await,
        Err(BurrowError::StoreUnavailable(_))
    ));

    assert!(controller.open().await);
    assert_eq!(controller.fetch_sessions().await.len(), 1);
}
