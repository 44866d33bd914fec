/*!
 * Common test utilities for the lingopad test suite
 */

use std::sync::Arc;
use std::time::Duration;

use lingopad::app_config::{CoordinatorConfig, HandlePolicy, OverlapPolicy};
use lingopad::engine::simulated::SimulatedEngine;
use lingopad::translation::{CoordinatorState, TranslationCoordinator};

/// Upper bound for anything a test waits on
pub const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// Route library logs to the test output
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Coordinator settings with the given policies and default timeouts
pub fn settings(handle_policy: HandlePolicy, overlap_policy: OverlapPolicy) -> CoordinatorConfig {
    CoordinatorConfig {
        handle_policy,
        overlap_policy,
        ..CoordinatorConfig::default()
    }
}

/// Coordinator driving a simulated engine and its model store
pub fn coordinator_with(
    engine: &SimulatedEngine,
    settings: CoordinatorConfig,
) -> Arc<TranslationCoordinator> {
    init_test_logging();
    Arc::new(TranslationCoordinator::new(
        Arc::new(engine.clone()),
        Arc::new(engine.model_store()),
        settings,
    ))
}

/// Wait until the coordinator reaches a state
pub async fn wait_for_state(coordinator: &TranslationCoordinator, expected: CoordinatorState) {
    let mut states = coordinator.subscribe_state();
    let reached = tokio::time::timeout(WAIT_LIMIT, states.wait_for(|state| *state == expected))
        .await
        .map(|result| result.is_ok())
        .unwrap_or(false);
    assert!(reached, "coordinator never reached {:?}", expected);
}
