//! Localized string registry.
//!
//! An explicit, constructed-once registry rather than ambient module state.
//! English strings are embedded; other languages can be registered from
//! TOML at startup. Lookup falls back to the default language and finally
//! to a bracketed key marker, never an error: a missing translation must
//! not block a respondent.

use crate::error::Result;
use std::collections::BTreeMap;
use tracing::warn;

const BUILTIN_EN: &str = include_str!("../assets/locale_en.toml");

/// The language used when a key is missing in the requested one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Language-keyed string tables with default-language fallback.
pub struct LocaleRegistry {
    default_language: String,
    tables: BTreeMap<String, BTreeMap<String, String>>,
}

impl LocaleRegistry {
    /// Builds a registry containing only the embedded English table.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self {
            default_language: DEFAULT_LANGUAGE.to_string(),
            tables: BTreeMap::new(),
        };
        registry.add_language_toml(DEFAULT_LANGUAGE, BUILTIN_EN)?;
        Ok(registry)
    }

    /// Registers (or replaces) the string table for one language.
    pub fn add_language_toml(&mut self, language: &str, toml_src: &str) -> Result<()> {
        let table: BTreeMap<String, String> = toml::from_str(toml_src)?;
        self.tables.insert(language.to_string(), table);
        Ok(())
    }

    /// Looks up a key for a language.
    ///
    /// Falls back to the default language, then to `[key]` with a logged
    /// warning.
    pub fn text(&self, key: &str, language: &str) -> String {
        if let Some(text) = self.tables.get(language).and_then(|t| t.get(key)) {
            return text.clone();
        }
        if let Some(text) = self
            .tables
            .get(&self.default_language)
            .and_then(|t| t.get(key))
        {
            return text.clone();
        }
        warn!(key, language, "missing locale text");
        format!("[{key}]")
    }

    /// Looks up a key and substitutes `{name}` placeholders.
    pub fn text_with(&self, key: &str, language: &str, params: &[(&str, String)]) -> String {
        let mut text = self.text(key, language);
        for (name, value) in params {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }

    /// The fallback language code.
    pub fn default_language(&self) -> &str {
        &self.default_language
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_core_keys() {
        let registry = LocaleRegistry::builtin().unwrap();
        for key in [
            "welcome",
            "start_question",
            "please_select_option",
            "accepted_message",
            "rejected_message",
        ] {
            assert!(!registry.text(key, "en").starts_with('['), "missing {key}");
        }
    }

    #[test]
    fn test_fallback_to_default_language() {
        let registry = LocaleRegistry::builtin().unwrap();
        assert_eq!(registry.text("welcome", "xx"), registry.text("welcome", "en"));
    }

    #[test]
    fn test_missing_key_returns_marker() {
        let registry = LocaleRegistry::builtin().unwrap();
        assert_eq!(registry.text("no_such_key", "en"), "[no_such_key]");
    }

    #[test]
    fn test_parameter_substitution() {
        let registry = LocaleRegistry::builtin().unwrap();
        let text = registry.text_with(
            "question_header",
            "en",
            &[("current", "3".to_string()), ("total", "30".to_string())],
        );
        assert_eq!(text, "QUESTION 3 of 30");
    }

    #[test]
    fn test_override_language_table() {
        let mut registry = LocaleRegistry::builtin().unwrap();
        registry
            .add_language_toml("de", "welcome = \"Willkommen\"")
            .unwrap();
        assert_eq!(registry.text("welcome", "de"), "Willkommen");
        // Keys absent from the override fall back to English.
        assert_eq!(
            registry.text("start_question", "de"),
            registry.text("start_question", "en")
        );
    }
}
