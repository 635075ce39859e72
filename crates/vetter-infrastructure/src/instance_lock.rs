//! Single-instance guard.
//!
//! Two processes polling the same transport would steal each other's
//! updates, so startup takes an exclusive lock on a well-known file and
//! holds it for the process lifetime.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use vetter_core::error::Result;
use vetter_core::VetterError;

/// Held for the process lifetime; the lock releases when dropped.
pub struct InstanceLock {
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Acquires the lock, failing immediately if another instance holds it.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        file.try_lock_exclusive().map_err(|_| {
            VetterError::config(format!(
                "another instance is already running (lock held on {})",
                path.display()
            ))
        })?;

        // Best-effort pid note for operators inspecting the lock file.
        let _ = file.set_len(0);
        let _ = writeln!(file, "{}", std::process::id());

        info!(path = %path.display(), "instance lock acquired");
        Ok(Self { file, path })
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_fails_while_held() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vetter.lock");

        let first = InstanceLock::acquire(&path).unwrap();
        assert!(InstanceLock::acquire(&path).is_err());
        drop(first);

        // Released on drop.
        let _second = InstanceLock::acquire(&path).unwrap();
    }
}
