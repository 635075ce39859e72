//! Immutable, language-keyed question catalog.
//!
//! Catalogs are parsed and validated once at startup and never change for
//! the process lifetime. A malformed question (empty prompt or a missing
//! option key) is a fatal configuration error; an unsupported language code
//! falls back to the default language with a logged warning so respondents
//! are never blocked by a missing translation.

use crate::category::{CATEGORY_COUNT, Category};
use crate::error::{Result, VetterError};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Built-in English catalog, embedded at compile time.
const BUILTIN_EN: &str = include_str!("../assets/questions_en.toml");

/// The language served when a respondent's language has no catalog.
pub const DEFAULT_LANGUAGE: &str = "en";

/// One questionnaire entry with exactly four category-keyed options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Stable question identifier within its catalog.
    pub id: u32,
    /// The prompt shown to the respondent.
    pub prompt: String,
    /// Option texts in category label order ("1".."4").
    options: [String; CATEGORY_COUNT],
}

impl Question {
    /// The option text for one category.
    pub fn option_text(&self, category: Category) -> &str {
        &self.options[category.index()]
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCatalog {
    questions: Vec<RawQuestion>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawQuestion {
    id: u32,
    prompt: String,
    options: BTreeMap<String, String>,
}

impl RawQuestion {
    fn validate(self, position: usize) -> Result<Question> {
        if self.prompt.trim().is_empty() {
            return Err(VetterError::config(format!(
                "question {} (id {}): empty prompt",
                position + 1,
                self.id
            )));
        }

        let mut options: [String; CATEGORY_COUNT] = Default::default();
        for category in Category::ALL {
            let text = self.options.get(category.label()).ok_or_else(|| {
                VetterError::config(format!(
                    "question {} (id {}): missing option '{}'",
                    position + 1,
                    self.id,
                    category.label()
                ))
            })?;
            if text.trim().is_empty() {
                return Err(VetterError::config(format!(
                    "question {} (id {}): empty option '{}'",
                    position + 1,
                    self.id,
                    category.label()
                )));
            }
            options[category.index()] = text.clone();
        }

        if self.options.len() != CATEGORY_COUNT {
            return Err(VetterError::config(format!(
                "question {} (id {}): expected exactly {} options, got {}",
                position + 1,
                self.id,
                CATEGORY_COUNT,
                self.options.len()
            )));
        }

        Ok(Question {
            id: self.id,
            prompt: self.prompt,
            options,
        })
    }
}

/// Immutable language-keyed question catalog.
pub struct QuestionCatalog {
    default_language: String,
    languages: BTreeMap<String, Vec<Question>>,
}

impl QuestionCatalog {
    /// Builds a catalog containing only the embedded English question set.
    pub fn builtin() -> Result<Self> {
        let mut catalog = Self {
            default_language: DEFAULT_LANGUAGE.to_string(),
            languages: BTreeMap::new(),
        };
        catalog.add_language_toml(DEFAULT_LANGUAGE, BUILTIN_EN)?;
        Ok(catalog)
    }

    /// Parses and validates a TOML question set for one language.
    ///
    /// Fails fast on any malformed question; a half-valid language is never
    /// registered.
    pub fn add_language_toml(&mut self, language: &str, toml_src: &str) -> Result<()> {
        let raw: RawCatalog = toml::from_str(toml_src)?;
        if raw.questions.is_empty() {
            return Err(VetterError::config(format!(
                "catalog for language '{language}' has no questions"
            )));
        }
        let questions = raw
            .questions
            .into_iter()
            .enumerate()
            .map(|(i, q)| q.validate(i))
            .collect::<Result<Vec<_>>>()?;
        self.languages.insert(language.to_string(), questions);
        Ok(())
    }

    /// The ordered question sequence for a language.
    ///
    /// Unsupported language codes fall back to the default language.
    pub fn questions_for(&self, language: &str) -> &[Question] {
        if let Some(questions) = self.languages.get(language) {
            return questions;
        }
        warn!(language, default = %self.default_language, "unknown catalog language, falling back");
        self.languages
            .get(&self.default_language)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of questions served for a language (after fallback).
    pub fn question_count(&self, language: &str) -> usize {
        self.questions_for(language).len()
    }

    /// Whether a language has its own catalog (no fallback involved).
    pub fn has_language(&self, language: &str) -> bool {
        self.languages.contains_key(language)
    }

    /// Registered language codes in sorted order.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
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
    fn test_builtin_catalog_is_valid() {
        let catalog = QuestionCatalog::builtin().unwrap();
        let questions = catalog.questions_for("en");
        assert_eq!(questions.len(), 30);
        for question in questions {
            assert!(!question.prompt.is_empty());
            for category in Category::ALL {
                assert!(!question.option_text(category).is_empty());
            }
        }
    }

    #[test]
    fn test_unknown_language_falls_back_to_default() {
        let catalog = QuestionCatalog::builtin().unwrap();
        assert!(!catalog.has_language("xx"));
        assert_eq!(
            catalog.questions_for("xx").len(),
            catalog.questions_for(DEFAULT_LANGUAGE).len()
        );
    }

    #[test]
    fn test_missing_option_key_is_fatal() {
        let mut catalog = QuestionCatalog::builtin().unwrap();
        let toml_src = r#"
            [[questions]]
            id = 1
            prompt = "Incomplete"
            [questions.options]
            1 = "a"
            2 = "b"
            3 = "c"
        "#;
        let err = catalog.add_language_toml("de", toml_src).unwrap_err();
        assert!(err.is_config());
        assert!(!catalog.has_language("de"));
    }

    #[test]
    fn test_empty_prompt_is_fatal() {
        let mut catalog = QuestionCatalog::builtin().unwrap();
        let toml_src = r#"
            [[questions]]
            id = 7
            prompt = "  "
            [questions.options]
            1 = "a"
            2 = "b"
            3 = "c"
            4 = "d"
        "#;
        assert!(catalog.add_language_toml("de", toml_src).is_err());
    }

    #[test]
    fn test_empty_catalog_is_fatal() {
        let mut catalog = QuestionCatalog::builtin().unwrap();
        assert!(catalog.add_language_toml("de", "questions = []").is_err());
    }
}
