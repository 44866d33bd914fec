use crate::language_catalog;

/// One translation call's input, alive for the duration of that call
#[derive(Debug, Clone, Copy)]
pub struct TranslationRequest<'a> {
    /// Text to translate
    pub text: &'a str,
    /// Source language code
    pub source_language: &'a str,
    /// Target language code
    pub target_language: &'a str,
}

impl<'a> TranslationRequest<'a> {
    pub fn new(text: &'a str, source_language: &'a str, target_language: &'a str) -> Self {
        Self {
            text,
            source_language,
            target_language,
        }
    }

    /// Result for requests that need no engine at all
    ///
    /// Blank text and identical languages return the input unchanged.
    pub fn passthrough(&self) -> Option<&'a str> {
        if self.text.trim().is_empty()
            || language_catalog::language_codes_match(self.source_language, self.target_language)
        {
            Some(self.text)
        } else {
            None
        }
    }

    /// Whether this request targets the given pair
    pub fn is_for_pair(&self, source_language: &str, target_language: &str) -> bool {
        language_catalog::language_codes_match(self.source_language, source_language)
            && language_catalog::language_codes_match(self.target_language, target_language)
    }
}
