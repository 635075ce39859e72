//! Unified path management for vetter data files.
//!
//! All durable records live under one base directory. By default that is
//! the platform data directory (e.g. `~/.local/share/vetter/`); every path
//! can be redirected to a custom base for tests and deployments.
//!
//! # Directory Structure
//!
//! ```text
//! <base>/
//! ├── progress/        # Per-respondent session records
//! │   └── <id>.toml
//! ├── results/         # Per-respondent test result records
//! │   └── <id>.toml
//! ├── questions/       # Additional question catalogs (<lang>.toml)
//! ├── locales/         # Additional locale tables (<lang>.toml)
//! └── vetter.lock      # Single-instance guard
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during path resolution.
#[derive(Error, Debug)]
pub enum PathError {
    #[error("Cannot find home directory")]
    HomeDirNotFound,
}

impl From<PathError> for vetter_core::VetterError {
    fn from(err: PathError) -> Self {
        vetter_core::VetterError::config(err.to_string())
    }
}

/// Resolved data layout rooted at one base directory.
#[derive(Debug, Clone)]
pub struct VetterPaths {
    base: PathBuf,
}

impl VetterPaths {
    /// Platform default location (`<data_dir>/vetter/`).
    pub fn default_location() -> Result<Self, PathError> {
        let base = dirs::data_dir()
            .ok_or(PathError::HomeDirNotFound)?
            .join("vetter");
        Ok(Self { base })
    }

    /// A layout rooted at an explicit base directory.
    pub fn at(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base
    }

    pub fn progress_dir(&self) -> PathBuf {
        self.base.join("progress")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.base.join("results")
    }

    pub fn questions_dir(&self) -> PathBuf {
        self.base.join("questions")
    }

    pub fn locales_dir(&self) -> PathBuf {
        self.base.join("locales")
    }

    pub fn instance_lock_file(&self) -> PathBuf {
        self.base.join("vetter.lock")
    }
}
