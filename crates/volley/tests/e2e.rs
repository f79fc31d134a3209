// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete dispatch pipeline.
//!
//! Each test builds an isolated EngineHarness with scripted sessions and an
//! in-memory audit store, then drives the dispatcher the way the binary
//! does. Tests run on a paused clock; nothing here touches the network.

use std::time::Duration;

use volley_core::{JobStatus, VolleyError};
use volley_engine::DispatchConfig;
use volley_test_utils::{EngineHarness, ScriptedCall};

// ---- Fan-out ----

#[tokio::test(start_paused = true)]
async fn test_report_fans_out_once_per_idle_session() {
    let harness = EngineHarness::builder()
        .with_sessions(&["alpha", "bravo", "charlie"])
        .build()
        .await;

    let job = harness
        .dispatcher
        .dispatch_report(harness.owner(), "@target_chat")
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.requester, harness.owner());
    assert_eq!(job.dispatched.len(), 3);
    assert_eq!(job.attempts.len(), 3);

    let mut ids: Vec<String> = job
        .attempts
        .iter()
        .map(|a| a.session_id.to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, ["alpha", "bravo", "charlie"]);

    assert_eq!(harness.store.jobs().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_report_accepts_tme_links() {
    let harness = EngineHarness::builder()
        .with_sessions(&["alpha"])
        .build()
        .await;

    let job = harness
        .dispatcher
        .dispatch_report(harness.owner(), "check https://t.me/target_chat please")
        .await
        .unwrap();

    assert_eq!(job.chat.to_string(), "@target_chat");
}

#[tokio::test(start_paused = true)]
async fn test_unparseable_reference_is_rejected_before_any_call() {
    let harness = EngineHarness::builder()
        .with_sessions(&["alpha"])
        .build()
        .await;

    let err = harness
        .dispatcher
        .dispatch_report(harness.owner(), "just some words")
        .await
        .unwrap_err();

    assert!(matches!(err, VolleyError::InvalidInput(_)));
    assert_eq!(harness.connector.total_calls().await, 0);
    assert_eq!(harness.store.write_count(), 0);
}

// ---- Access control ----

#[tokio::test(start_paused = true)]
async fn test_only_the_owner_may_dispatch() {
    let harness = EngineHarness::builder()
        .with_sessions(&["alpha", "bravo"])
        .build()
        .await;

    let err = harness
        .dispatcher
        .dispatch_report(harness.stranger(), "@target_chat")
        .await
        .unwrap_err();

    assert!(matches!(err, VolleyError::AccessDenied { .. }));
    // A denied request leaves no trace: no platform calls, no writes.
    assert_eq!(harness.connector.total_calls().await, 0);
    assert_eq!(harness.store.write_count(), 0);

    let err = harness
        .dispatcher
        .dispatch_lookup(harness.stranger(), "@someone")
        .await
        .unwrap_err();
    assert!(matches!(err, VolleyError::AccessDenied { .. }));

    let err = harness
        .dispatcher
        .dispatch_broadcast(harness.stranger(), "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, VolleyError::AccessDenied { .. }));
}

// ---- Rate limiting ----

#[tokio::test(start_paused = true)]
async fn test_rate_limited_session_sits_out_its_cooldown() {
    let harness = EngineHarness::builder()
        .with_sessions(&["alpha"])
        .with_script(
            "alpha",
            vec![ScriptedCall::FloodWait(Some(Duration::from_secs(60)))],
        )
        .build()
        .await;

    let job = harness
        .dispatcher
        .dispatch_report(harness.owner(), "@target_chat")
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::PartiallyFailed);

    // Still cooling down: the pool has no usable session.
    let err = harness
        .dispatcher
        .dispatch_report(harness.owner(), "@target_chat")
        .await
        .unwrap_err();
    assert!(matches!(err, VolleyError::SessionUnavailable { .. }));

    tokio::time::advance(Duration::from_secs(61)).await;

    let job = harness
        .dispatcher
        .dispatch_report(harness.owner(), "@target_chat")
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_no_usable_session_is_an_explicit_error() {
    let harness = EngineHarness::builder().with_sessions(&[]).build().await;

    let err = harness
        .dispatcher
        .dispatch_report(harness.owner(), "@target_chat")
        .await
        .unwrap_err();

    assert!(matches!(err, VolleyError::SessionUnavailable { .. }));
}

// ---- Deadlines ----

#[tokio::test(start_paused = true)]
async fn test_job_deadline_abandons_hung_calls_but_frees_their_sessions() {
    let config = DispatchConfig {
        job_deadline: Duration::from_secs(5),
        ..DispatchConfig::default()
    };
    let harness = EngineHarness::builder()
        .with_sessions(&["alpha", "bravo"])
        .with_script(
            "alpha",
            vec![ScriptedCall::SucceedAfter(Duration::from_secs(300))],
        )
        .with_config(config)
        .build()
        .await;

    let job = harness
        .dispatcher
        .dispatch_report(harness.owner(), "@target_chat")
        .await
        .unwrap();

    // The job stopped waiting at the deadline with only bravo's answer.
    assert_eq!(job.status, JobStatus::PartiallyFailed);
    assert_eq!(job.dispatched.len(), 2);
    assert_eq!(job.attempts.len(), 1);
    assert_eq!(job.attempts[0].session_id.to_string(), "bravo");

    // The abandoned call still finishes and returns its session: both
    // slots must become acquirable again.
    let first = harness.pool.acquire(Duration::from_secs(600)).await.unwrap();
    let second = harness.pool.acquire(Duration::from_secs(600)).await.unwrap();
    let mut ids = [first.id.to_string(), second.id.to_string()];
    ids.sort();
    assert_eq!(ids, ["alpha", "bravo"]);
}

// ---- Completion semantics ----

#[tokio::test(start_paused = true)]
async fn test_completed_requires_every_answer_and_one_success() {
    let harness = EngineHarness::builder()
        .with_sessions(&["alpha", "bravo"])
        .with_script("bravo", vec![ScriptedCall::NotParticipant])
        .build()
        .await;

    let job = harness
        .dispatcher
        .dispatch_report(harness.owner(), "@target_chat")
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);

    let totals = harness.dispatcher.totals().await.unwrap();
    assert_eq!(totals.jobs, 1);
    assert_eq!(totals.attempts, 2);
    assert_eq!(totals.succeeded, 1);
    assert_eq!(totals.not_participant, 1);
}

#[tokio::test(start_paused = true)]
async fn test_partially_failed_when_nothing_succeeds() {
    let harness = EngineHarness::builder()
        .with_sessions(&["alpha", "bravo"])
        .with_script("alpha", vec![ScriptedCall::NotParticipant])
        .with_script("bravo", vec![ScriptedCall::Rpc("CHAT_WRITE_FORBIDDEN")])
        .build()
        .await;

    let job = harness
        .dispatcher
        .dispatch_report(harness.owner(), "@target_chat")
        .await
        .unwrap();

    // Every session answered, but none succeeded.
    assert_eq!(job.attempts.len(), 2);
    assert_eq!(job.status, JobStatus::PartiallyFailed);
}

// ---- Lookup ----

#[tokio::test(start_paused = true)]
async fn test_lookup_retries_on_a_second_session_after_flood_wait() {
    let harness = EngineHarness::builder()
        .with_sessions(&["alpha", "bravo"])
        .with_script(
            "alpha",
            vec![ScriptedCall::FloodWait(Some(Duration::from_secs(30)))],
        )
        .build()
        .await;

    let record = harness
        .dispatcher
        .dispatch_lookup(harness.owner(), "@ghost")
        .await
        .unwrap();

    assert_eq!(record.username.as_deref(), Some("ghost"));
    assert_eq!(harness.session("alpha").await.unwrap().calls_made(), 1);
    assert_eq!(harness.session("bravo").await.unwrap().calls_made(), 1);
    assert_eq!(harness.store.users().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_lookup_with_no_alternate_session_reports_the_cooldown() {
    let harness = EngineHarness::builder()
        .with_sessions(&["alpha"])
        .with_script(
            "alpha",
            vec![ScriptedCall::FloodWait(Some(Duration::from_secs(45)))],
        )
        .build()
        .await;

    let err = harness
        .dispatcher
        .dispatch_lookup(harness.owner(), "@ghost")
        .await
        .unwrap_err();

    match err {
        VolleyError::RateLimited { retry_after } => {
            assert_eq!(retry_after, Duration::from_secs(45));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
    assert!(harness.store.users().await.is_empty());
}

// ---- Broadcast ----

#[tokio::test(start_paused = true)]
async fn test_broadcast_touches_every_session_but_stores_nothing() {
    let harness = EngineHarness::builder()
        .with_sessions(&["alpha", "bravo"])
        .build()
        .await;

    let counts = harness
        .dispatcher
        .dispatch_broadcast(harness.owner(), "maintenance tonight")
        .await
        .unwrap();

    assert_eq!(counts.total_dispatched, 2);
    assert_eq!(counts.succeeded, 2);
    assert_eq!(harness.session("alpha").await.unwrap().calls_made(), 1);
    assert_eq!(harness.session("bravo").await.unwrap().calls_made(), 1);
    assert!(harness.store.jobs().await.is_empty());
    assert_eq!(harness.store.write_count(), 0);
}

// ---- Retries ----

#[tokio::test(start_paused = true)]
async fn test_network_errors_retry_on_the_same_session() {
    let harness = EngineHarness::builder()
        .with_sessions(&["alpha"])
        .with_script(
            "alpha",
            vec![ScriptedCall::NetworkError, ScriptedCall::Succeed],
        )
        .build()
        .await;

    let job = harness
        .dispatcher
        .dispatch_report(harness.owner(), "@target_chat")
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.attempts.len(), 1);
    assert!(job.attempts[0].outcome.is_success());
    assert_eq!(harness.session("alpha").await.unwrap().calls_made(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_network_failure_records_the_attempt() {
    let harness = EngineHarness::builder()
        .with_sessions(&["alpha"])
        .with_script(
            "alpha",
            vec![
                ScriptedCall::NetworkError,
                ScriptedCall::NetworkError,
                ScriptedCall::NetworkError,
            ],
        )
        .build()
        .await;

    let job = harness
        .dispatcher
        .dispatch_report(harness.owner(), "@target_chat")
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::PartiallyFailed);
    assert_eq!(job.attempts.len(), 1);
    assert!(!job.attempts[0].outcome.is_success());
    // Default retry budget is three calls in total.
    assert_eq!(harness.session("alpha").await.unwrap().calls_made(), 3);

    let totals = harness.dispatcher.totals().await.unwrap();
    assert_eq!(totals.errored, 1);
}

// ---- Connect failures ----

#[tokio::test(start_paused = true)]
async fn test_sessions_that_fail_to_connect_are_left_out() {
    let harness = EngineHarness::builder()
        .with_sessions(&["alpha", "bravo"])
        .with_failing_session("bravo")
        .build()
        .await;

    assert_eq!(harness.connect_failures.len(), 1);
    assert_eq!(harness.connect_failures[0].0, "bravo");

    let job = harness
        .dispatcher
        .dispatch_report(harness.owner(), "@target_chat")
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.attempts.len(), 1);
    assert_eq!(job.attempts[0].session_id.to_string(), "alpha");
}

// ---- Storage behavior ----

#[tokio::test(start_paused = true)]
async fn test_store_failure_surfaces_for_reports_but_not_lookups() {
    let harness = EngineHarness::builder()
        .with_sessions(&["alpha"])
        .build()
        .await;
    harness.store.fail_writes();

    let err = harness
        .dispatcher
        .dispatch_report(harness.owner(), "@target_chat")
        .await
        .unwrap_err();
    assert!(matches!(err, VolleyError::Storage { .. }));

    // A lookup still answers; only the audit row is lost.
    let record = harness
        .dispatcher
        .dispatch_lookup(harness.owner(), "@ghost")
        .await
        .unwrap();
    assert_eq!(record.remote_id, 4242);
    assert!(harness.store.users().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_totals_accumulate_across_jobs() {
    let harness = EngineHarness::builder()
        .with_sessions(&["alpha", "bravo"])
        .build()
        .await;

    for _ in 0..2 {
        harness
            .dispatcher
            .dispatch_report(harness.owner(), "@target_chat")
            .await
            .unwrap();
    }
    harness
        .dispatcher
        .dispatch_lookup(harness.owner(), "@ghost")
        .await
        .unwrap();

    let totals = harness.dispatcher.totals().await.unwrap();
    assert_eq!(totals.jobs, 2);
    assert_eq!(totals.attempts, 4);
    assert_eq!(totals.succeeded, 4);
    assert_eq!(totals.lookups, 1);
}
