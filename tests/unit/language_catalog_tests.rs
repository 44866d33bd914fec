/*!
 * Tests for the language catalog
 */

use lingopad::language_catalog::{
    display_name, find_language, is_supported, normalize_code, resolve_language,
    supported_languages,
};

/// Test picker order of the catalog
#[test]
fn test_supported_languages_should_start_with_english_then_spanish() {
    let codes: Vec<&str> = supported_languages().iter().map(|language| language.code).collect();
    assert_eq!(codes[0], "en");
    assert_eq!(codes[1], "es");
    assert_eq!(codes.len(), 10);
}

/// Test that every catalog code resolves to itself
#[test]
fn test_every_catalog_code_should_resolve_to_its_entry() {
    for language in supported_languages() {
        let found = find_language(language.code).expect("catalog code should resolve");
        assert_eq!(found, language);
        assert_eq!(normalize_code(language.code).unwrap(), language.code);
    }
}

/// Test lookups with ISO 639-2 codes
#[test]
fn test_find_language_with_three_letter_codes_should_match_catalog() {
    assert_eq!(find_language("jpn").map(|l| l.code), Some("ja"));
    assert_eq!(find_language("KOR").map(|l| l.code), Some("ko"));
    assert_eq!(find_language("chi").map(|l| l.code), Some("zh"));
    assert_eq!(display_name("deu"), Some("German"));
}

/// Test real languages outside the catalog
#[test]
fn test_languages_outside_catalog_should_not_be_supported() {
    assert!(normalize_code("nl").is_ok());
    assert!(!is_supported("nl"));
    assert!(!is_supported("xx"));
    assert!(!is_supported(""));
    assert_eq!(display_name("sv"), None);
}

/// Test resolution of user input
#[test]
fn test_resolve_language_should_accept_names_and_codes() {
    assert_eq!(resolve_language("Portuguese").unwrap().code, "pt");
    assert_eq!(resolve_language("  russian ").unwrap().code, "ru");
    assert_eq!(resolve_language("it").unwrap().display_name, "Italian");

    let error = resolve_language("Dutch").unwrap_err().to_string();
    assert!(error.contains("Unsupported language"));
    assert!(error.contains("en, es"));
}
