/*!
 * Static catalog of the languages offered for translation.
 *
 * The catalog is fixed at build time and ordered the way language pickers
 * present it. Codes are ISO 639-1; lookups also accept ISO 639-2/T and
 * ISO 639-2/B codes, which are normalized with `isolang`.
 */

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use isolang::Language;
use once_cell::sync::Lazy;
use serde::Serialize;

/// A supported language: the name shown to users and its ISO 639-1 code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LanguagePair {
    /// Name shown in language pickers
    pub display_name: &'static str,
    /// ISO 639-1 code understood by the engines
    pub code: &'static str,
}

impl LanguagePair {
    const fn new(display_name: &'static str, code: &'static str) -> Self {
        Self { display_name, code }
    }
}

impl std::fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.display_name, self.code)
    }
}

/// Supported languages, in picker order
pub const SUPPORTED_LANGUAGES: [LanguagePair; 10] = [
    LanguagePair::new("English", "en"),
    LanguagePair::new("Spanish", "es"),
    LanguagePair::new("French", "fr"),
    LanguagePair::new("German", "de"),
    LanguagePair::new("Italian", "it"),
    LanguagePair::new("Portuguese", "pt"),
    LanguagePair::new("Russian", "ru"),
    LanguagePair::new("Chinese", "zh"),
    LanguagePair::new("Japanese", "ja"),
    LanguagePair::new("Korean", "ko"),
];

static BY_CODE: Lazy<HashMap<&'static str, &'static LanguagePair>> = Lazy::new(|| {
    SUPPORTED_LANGUAGES
        .iter()
        .map(|language| (language.code, language))
        .collect()
});

/// All supported languages, in picker order
pub fn supported_languages() -> &'static [LanguagePair] {
    &SUPPORTED_LANGUAGES
}

/// Map an ISO 639-2/B code to its ISO 639-2/T form
fn bibliographic_to_terminologic(code: &str) -> &str {
    match code {
        "fre" => "fra",
        "ger" => "deu",
        "dut" => "nld",
        "gre" => "ell",
        "chi" => "zho",
        "cze" => "ces",
        "ice" => "isl",
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "per" => "fas",
        "geo" => "kat",
        "may" => "msa",
        "mac" => "mkd",
        "rum" => "ron",
        "slo" => "slk",
        "wel" => "cym",
        other => other,
    }
}

/// Normalize a language code to ISO 639-1 (2-letter) format
///
/// Accepts ISO 639-1, ISO 639-2/T and ISO 639-2/B codes in any case.
/// Languages without a 2-letter code are rejected.
pub fn normalize_code(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    let language = match normalized_code.len() {
        2 => Language::from_639_1(&normalized_code),
        3 => Language::from_639_3(bibliographic_to_terminologic(&normalized_code)),
        _ => None,
    };

    language
        .and_then(|lang| lang.to_639_1())
        .map(|part1| part1.to_string())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Find a catalog entry by language code
pub fn find_language(code: &str) -> Option<&'static LanguagePair> {
    let normalized = normalize_code(code).ok()?;
    BY_CODE.get(normalized.as_str()).copied()
}

/// Check whether a code names a supported language
pub fn is_supported(code: &str) -> bool {
    find_language(code).is_some()
}

/// Display name of a supported language
pub fn display_name(code: &str) -> Option<&'static str> {
    find_language(code).map(|language| language.display_name)
}

/// Resolve user input, either a language code or a display name
pub fn resolve_language(input: &str) -> Result<&'static LanguagePair> {
    if let Some(language) = find_language(input) {
        return Ok(language);
    }

    let wanted = input.trim();
    SUPPORTED_LANGUAGES
        .iter()
        .find(|language| language.display_name.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| {
            anyhow!(
                "Unsupported language '{}'. Supported: {}",
                input,
                SUPPORTED_LANGUAGES
                    .iter()
                    .map(|language| language.code)
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
}

/// Check if two language codes name the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_code(code1), normalize_code(code2)) {
        (Ok(first), Ok(second)) => first == second,
        _ => code1.trim().eq_ignore_ascii_case(code2.trim()),
    }
}
