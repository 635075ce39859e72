//! Startup loading of additional question catalogs and locale tables.
//!
//! The English content is compiled in; more languages are dropped into the
//! questions/ and locales/ directories as `<lang>.toml` files and picked up
//! at startup. A malformed file is fatal: serving a broken questionnaire is
//! worse than refusing to start.

use std::fs;
use std::path::Path;
use tracing::{debug, info};
use vetter_core::error::Result;
use vetter_core::{LocaleRegistry, QuestionCatalog};

fn language_files(dir: &Path) -> Result<Vec<(String, String)>> {
    let mut found = Vec::new();
    if !dir.exists() {
        debug!(dir = %dir.display(), "content directory absent, skipping");
        return Ok(found);
    }
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|entry| entry.file_name());
    for entry in entries {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
            continue;
        }
        let Some(language) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let source = fs::read_to_string(&path)?;
        found.push((language.to_string(), source));
    }
    Ok(found)
}

/// Loads every `<lang>.toml` question file from `dir` into the catalog.
pub fn load_question_catalogs(catalog: &mut QuestionCatalog, dir: &Path) -> Result<()> {
    for (language, source) in language_files(dir)? {
        catalog.add_language_toml(&language, &source)?;
        info!(language, "question catalog loaded");
    }
    Ok(())
}

/// Loads every `<lang>.toml` locale file from `dir` into the registry.
pub fn load_locale_tables(locales: &mut LocaleRegistry, dir: &Path) -> Result<()> {
    for (language, source) in language_files(dir)? {
        locales.add_language_toml(&language, &source)?;
        info!(language, "locale table loaded");
    }
    Ok(())
}
