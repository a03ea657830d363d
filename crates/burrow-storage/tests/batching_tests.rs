// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Claim exclusivity and all-or-nothing bulk deletes.

use std::collections::HashSet;
use std::sync::Arc;

use burrow_core::BurrowError;
use burrow_core::types::{
    ForwardRecord, MessageType, PersistenceOperation, StandaloneMessage, StandaloneUpload, Upload,
};
use burrow_storage::Database;
use burrow_storage::queries::{forward_records, standalone, uploads};
use burrow_test_utils::TestHarness;
use burrow_test_utils::fixtures::seed_session;
use proptest::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_batchers_never_share_a_message() {
    let harness = Arc::new(TestHarness::new().await.unwrap());
    let (session, _) = seed_session(harness.controller(), 1, 40).await.unwrap();
    let session_id = session.id.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let harness = Arc::clone(&harness);
            tokio::spawn(async move {
                let controller = harness.controller();
                let batch: Vec<i64> = controller
                    .fetch_messages_for_uploading_in_session(session_id)
                    .await
                    .iter()
                    .filter_map(|m| m.id)
                    .take(10)
                    .collect();
                controller
                    .save_upload(
                        &Upload::new(session_id, vec![]),
                        &batch,
                        PersistenceOperation::Flag,
                    )
                    .await
            })
        })
        .collect();

    let mut rejected = 0;
    for result in futures::future::join_all(tasks).await {
        match result.unwrap() {
            Ok(_) => {}
            Err(BurrowError::AlreadyClaimed { .. }) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    let stored = harness.controller().fetch_uploads_in_session(session_id).await;
    assert_eq!(stored.len() + rejected, 8);
    let mut seen = HashSet::new();
    for upload in &stored {
        for id in &upload.message_ids {
            assert!(seen.insert(*id), "message {id} claimed twice");
        }
    }
    let claimed = harness
        .controller()
        .fetch_uploaded_messages_in_session(session_id, false)
        .await;
    assert_eq!(claimed.len(), seen.len());
}

#[tokio::test]
async fn bulk_delete_is_all_or_nothing() {
    let db = Database::open_in_memory().await.unwrap();
    let mut ids = Vec::new();
    for n in 0..4 {
        let message =
            StandaloneMessage::new(MessageType::Event, vec![n]).with_timestamp(f64::from(n));
        ids.push(standalone::insert_standalone_message(&db, &message).await.unwrap());
    }

    pin_row(&db, "standalone_messages", ids[2]).await;

    let err = standalone::delete_standalone_message_ids(&db, &ids)
        .await
        .unwrap_err();
    assert_partial_failure(err, 4);
    assert_eq!(standalone::count_standalone_messages(&db).await.unwrap(), 4);
    db.close().await.unwrap();
}

#[tokio::test]
async fn forward_record_bulk_delete_is_all_or_nothing() {
    let db = Database::open_in_memory().await.unwrap();
    let mut ids = Vec::new();
    for integration_id in [28, 92, 160] {
        let record = ForwardRecord::new(integration_id, b"relayed".to_vec());
        ids.push(forward_records::insert_forward_record(&db, &record).await.unwrap());
    }
    pin_row(&db, "forward_records", ids[1]).await;

    let err = forward_records::delete_forward_record_ids(&db, &ids)
        .await
        .unwrap_err();
    assert_partial_failure(err, 3);
    let left: Vec<i64> = forward_records::forward_records(&db)
        .await
        .unwrap()
        .iter()
        .filter_map(|r| r.id)
        .collect();
    assert_eq!(left, ids);
    db.close().await.unwrap();
}

/// Make deleting row `id` of `table` abort its statement.
async fn pin_row(db: &Database, table: &'static str, id: i64) {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(&format!(
                "CREATE TRIGGER pin_{table} BEFORE DELETE ON {table}
                 WHEN OLD.id = {id}
                 BEGIN SELECT RAISE(ABORT, 'row is pinned'); END;"
            ))
        })
        .await
        .unwrap();
}

fn assert_partial_failure(err: BurrowError, expected: usize) {
    match err {
        BurrowError::PartialBatchFailure { requested, reason } => {
            assert_eq!(requested, expected);
            assert!(reason.contains("pinned"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn claims_succeed_only_on_unclaimed_members(
        attempts in prop::collection::vec(
            prop::collection::btree_set(0usize..12, 1..5),
            1..12,
        )
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let db = Database::open_in_memory().await.unwrap();
            let mut ids = Vec::new();
            for _ in 0..12 {
                let message = StandaloneMessage::new(MessageType::Event, vec![]);
                ids.push(standalone::insert_standalone_message(&db, &message).await.unwrap());
            }

            let mut claimed: HashSet<i64> = HashSet::new();
            for attempt in &attempts {
                let members: Vec<i64> = attempt.iter().map(|&i| ids[i]).collect();
                let expect_ok = members.iter().all(|id| !claimed.contains(id));
                let result = uploads::save_standalone_upload(
                    &db,
                    &StandaloneUpload::new(vec![]),
                    &members,
                    PersistenceOperation::Flag,
                )
                .await;
                match result {
                    Ok(_) => {
                        prop_assert!(expect_ok);
                        claimed.extend(members);
                    }
                    Err(BurrowError::AlreadyClaimed { message_ids }) => {
                        prop_assert!(!expect_ok);
                        prop_assert!(message_ids.iter().all(|id| claimed.contains(id)));
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {}", other),
                }
            }

            let eligible = standalone::standalone_messages_for_upload(&db).await.unwrap();
            prop_assert_eq!(eligible.len(), 12 - claimed.len());
            db.close().await.unwrap();
            Ok(())
        })?;
    }
}
