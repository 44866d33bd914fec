/*!
 * Model availability queries through the coordinator
 */

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use lingopad::app_config::{Config, CoordinatorConfig, EngineBackend};
use lingopad::engine::ollama::{ModelRouting, OllamaClient, OllamaEngine};
use lingopad::engine::simulated::SimulatedEngine;
use lingopad::translation::TranslationCoordinator;

use crate::common::{self, coordinator_with};

#[tokio::test]
async fn test_is_model_available_should_reflect_installed_models() {
    let engine = SimulatedEngine::working().with_installed(&["en", "fr"]);
    let coordinator = coordinator_with(&engine, CoordinatorConfig::default());

    assert!(coordinator.is_model_available("en").await);
    assert!(coordinator.is_model_available("fra").await);
    assert!(coordinator.is_model_available("FR").await);
    assert!(!coordinator.is_model_available("de").await);
}

#[tokio::test]
async fn test_is_model_available_with_unknown_codes_should_be_false() {
    let engine = SimulatedEngine::working().with_installed(&["en"]);
    let coordinator = coordinator_with(&engine, CoordinatorConfig::default());

    assert!(!coordinator.is_model_available("xx").await);
    assert!(!coordinator.is_model_available("").await);
    assert!(!coordinator.is_model_available("nl").await);
}

#[tokio::test]
async fn test_is_model_available_with_failing_store_should_be_false() {
    let engine = SimulatedEngine::working()
        .with_installed(&["en"])
        .with_failing_store("permission denied");
    let coordinator = coordinator_with(&engine, CoordinatorConfig::default());

    assert!(!coordinator.is_model_available("en").await);
    assert!(coordinator.downloaded_languages().await.is_empty());
}

#[tokio::test]
async fn test_is_model_available_with_unreachable_server_should_be_false() {
    common::init_test_logging();
    let client = OllamaClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let engine = OllamaEngine::new(client, ModelRouting::new("llama3.2:3b", BTreeMap::new()), 0.2);
    let coordinator = TranslationCoordinator::new(
        Arc::new(engine.clone()),
        Arc::new(engine.model_store()),
        CoordinatorConfig::default(),
    );

    assert!(!coordinator.is_model_available("en").await);
}

#[tokio::test]
async fn test_model_should_become_available_after_translation() {
    let engine = SimulatedEngine::working();
    let coordinator = coordinator_with(&engine, CoordinatorConfig::default());
    assert!(!coordinator.is_model_available("ja").await);

    let result = coordinator.translate("hello", "en", "ja").await;

    assert_eq!(result, "[en-ja] hello");
    assert!(coordinator.is_model_available("ja").await);
    assert!(coordinator.is_model_available("en").await);
}

#[tokio::test]
async fn test_downloaded_languages_should_follow_catalog_order() {
    let engine = SimulatedEngine::working().with_installed(&["ko", "de", "en"]);
    let coordinator = coordinator_with(&engine, CoordinatorConfig::default());

    let codes: Vec<&str> = coordinator
        .downloaded_languages()
        .await
        .iter()
        .map(|language| language.code)
        .collect();

    assert_eq!(codes, vec!["en", "de", "ko"]);
}

#[tokio::test]
async fn test_configured_three_letter_codes_should_count_as_installed() {
    let mut config = Config::default();
    config.engine.backend = EngineBackend::Simulated;
    config.engine.installed_languages = vec!["eng".to_string(), "spa".to_string()];
    config.validate().unwrap();

    let coordinator = TranslationCoordinator::from_config(&config).unwrap();

    assert!(coordinator.is_model_available("en").await);
    assert!(coordinator.is_model_available("es").await);
    assert!(!coordinator.is_model_available("fr").await);
}
