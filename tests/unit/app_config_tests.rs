/*!
 * Tests for application configuration
 */

use anyhow::Result;
use tokio_test::{assert_err, assert_ok};

use lingopad::app_config::{Config, EngineBackend, HandlePolicy, LogLevel, OverlapPolicy};

use crate::common;

/// Test that a missing config file is created with defaults
#[test]
fn test_load_or_create_with_missing_file_should_write_defaults() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("conf.json");

    let config = Config::load_or_create(&path)?;

    assert!(path.exists());
    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "es");
    assert_eq!(config.engine.backend, EngineBackend::Ollama);
    assert_eq!(config.log_level, LogLevel::Info);
    Ok(())
}

/// Test that an existing file is loaded rather than overwritten
#[test]
fn test_load_or_create_with_existing_file_should_keep_its_values() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{
            "source_language": "ja",
            "target_language": "ko",
            "engine": { "backend": "simulated", "installed_languages": ["ja"] },
            "coordinator": { "allow_cellular": true, "overlap_policy": "reject" },
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.source_language, "ja");
    assert_eq!(config.engine.backend, EngineBackend::Simulated);
    assert_eq!(config.engine.installed_languages, vec!["ja".to_string()]);
    assert!(config.coordinator.allow_cellular);
    assert_eq!(config.coordinator.overlap_policy, OverlapPolicy::Reject);
    assert_eq!(config.coordinator.handle_policy, HandlePolicy::RecreateEachCall);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_ok!(config.validate());
    Ok(())
}

/// Test that a malformed file reports its path
#[test]
fn test_load_with_invalid_json_should_fail_with_context() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{ not json")?;

    let error = Config::load(&path).unwrap_err();
    assert!(format!("{:#}", error).contains("Failed to parse config file"));
    Ok(())
}

/// Test validation failures
#[test]
fn test_validate_should_reject_inconsistent_values() {
    common::init_test_logging();

    let mut config = Config::default();
    config.target_language = "nl".to_string();
    assert_err!(config.validate());

    let mut config = Config::default();
    config.engine.temperature = 1.5;
    assert_err!(config.validate());

    let mut config = Config::default();
    config.engine.default_model = "  ".to_string();
    assert_err!(config.validate());

    let mut config = Config::default();
    config.engine.language_models.insert("xx".to_string(), "model".to_string());
    assert_err!(config.validate());

    let mut config = Config::default();
    config.engine.backend = EngineBackend::Simulated;
    config.engine.installed_languages = vec!["en".to_string(), "tlh".to_string()];
    assert_err!(config.validate());
}

/// Test that languages may be given by name
#[test]
fn test_validate_should_accept_language_names() {
    let mut config = Config::default();
    config.source_language = "French".to_string();
    config.target_language = "ger".to_string();
    assert_ok!(config.validate());
}
