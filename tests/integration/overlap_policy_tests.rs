/*!
 * Overlapping translation calls and release while calls are pending
 */

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use lingopad::app_config::{HandlePolicy, OverlapPolicy};
use lingopad::engine::simulated::SimulatedEngine;
use lingopad::errors::{CoordinatorError, ErrorCategory};
use lingopad::translation::CoordinatorState;

use crate::common::{WAIT_LIMIT, coordinator_with, settings, wait_for_state};

/// Give spawned calls a chance to reach the request slot
async fn let_queued_calls_settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn test_reject_policy_should_refuse_second_call() {
    let gate = Arc::new(Semaphore::new(0));
    let engine = SimulatedEngine::working().with_download_gate(Arc::clone(&gate));
    let coordinator = coordinator_with(
        &engine,
        settings(HandlePolicy::RecreateEachCall, OverlapPolicy::Reject),
    );

    let worker = Arc::clone(&coordinator);
    let first = tokio::spawn(async move { worker.translate("hello", "en", "es").await });
    wait_for_state(&coordinator, CoordinatorState::AcquiringModel).await;
    assert!(coordinator.is_busy());

    let second = coordinator.try_translate("bonjour", "fr", "de").await;
    assert_eq!(second, Err(CoordinatorError::Busy));
    assert!(second.unwrap_err().to_string().starts_with(ErrorCategory::Service.marker()));

    let rendered = coordinator.translate("bonjour", "fr", "de").await;
    assert!(rendered.contains("already in progress"));

    gate.add_permits(1);
    assert_eq!(first.await.unwrap(), "[en-es] hello");
    assert_eq!(engine.created_pairs(), vec![("en".to_string(), "es".to_string())]);
    assert_eq!(coordinator.bound_pair(), Some(("en".to_string(), "es".to_string())));
}

#[tokio::test]
async fn test_queue_policy_should_run_calls_in_turn() {
    let gate = Arc::new(Semaphore::new(0));
    let engine = SimulatedEngine::working().with_download_gate(Arc::clone(&gate));
    let coordinator = coordinator_with(
        &engine,
        settings(HandlePolicy::RecreateEachCall, OverlapPolicy::Queue),
    );

    let worker = Arc::clone(&coordinator);
    let first = tokio::spawn(async move { worker.translate("hello", "en", "es").await });
    wait_for_state(&coordinator, CoordinatorState::AcquiringModel).await;

    let worker = Arc::clone(&coordinator);
    let second = tokio::spawn(async move { worker.translate("bonjour", "fr", "de").await });
    let_queued_calls_settle().await;

    // The queued call must not have touched the first call's handle
    assert_eq!(engine.created_pairs().len(), 1);
    assert_eq!(engine.closed_handles(), 0);

    gate.add_permits(2);
    let (first, second) = tokio::time::timeout(WAIT_LIMIT, async { (first.await, second.await) })
        .await
        .expect("queued calls should finish");

    assert_eq!(first.unwrap(), "[en-es] hello");
    assert_eq!(second.unwrap(), "[fr-de] bonjour");
    assert_eq!(
        engine.created_pairs(),
        vec![
            ("en".to_string(), "es".to_string()),
            ("fr".to_string(), "de".to_string()),
        ]
    );
    assert_eq!(engine.live_handles(), 1);
    assert_eq!(coordinator.state(), CoordinatorState::Idle);
}

#[tokio::test]
async fn test_release_should_cancel_running_and_queued_calls() {
    let gate = Arc::new(Semaphore::new(0));
    let engine = SimulatedEngine::working().with_download_gate(gate);
    let coordinator = coordinator_with(
        &engine,
        settings(HandlePolicy::CacheByPair, OverlapPolicy::Queue),
    );

    let worker = Arc::clone(&coordinator);
    let running = tokio::spawn(async move { worker.translate("hello", "en", "es").await });
    wait_for_state(&coordinator, CoordinatorState::AcquiringModel).await;

    let worker = Arc::clone(&coordinator);
    let queued = tokio::spawn(async move { worker.translate("bonjour", "fr", "de").await });
    let_queued_calls_settle().await;

    coordinator.release();

    let (running, queued) = tokio::time::timeout(WAIT_LIMIT, async { (running.await, queued.await) })
        .await
        .expect("release should not leave calls hanging");

    let running = running.unwrap();
    assert!(running.starts_with(ErrorCategory::Download.marker()));
    assert!(running.contains("cancelled"));

    let queued = queued.unwrap();
    assert!(queued.starts_with(ErrorCategory::Service.marker()));
    assert!(queued.contains("queued"));

    assert_eq!(engine.created_pairs().len(), 1);
    assert_eq!(engine.live_handles(), 0);
    assert!(!coordinator.is_busy());
}

#[tokio::test]
async fn test_coordinator_should_accept_calls_after_release() {
    let gate = Arc::new(Semaphore::new(0));
    let engine = SimulatedEngine::working().with_download_gate(Arc::clone(&gate));
    let coordinator = coordinator_with(
        &engine,
        settings(HandlePolicy::RecreateEachCall, OverlapPolicy::Reject),
    );

    let worker = Arc::clone(&coordinator);
    let cancelled = tokio::spawn(async move { worker.translate("hello", "en", "es").await });
    wait_for_state(&coordinator, CoordinatorState::AcquiringModel).await;
    coordinator.release();
    assert!(cancelled.await.unwrap().contains("cancelled"));

    gate.add_permits(1);
    let result = coordinator.translate("hello", "en", "es").await;
    assert_eq!(result, "[en-es] hello");
}
