//! Ephemeral build directories.
//!
//! One build owns one working directory for its whole lifetime. The scope
//! allocates it under the system temp root, switches the process into it,
//! and removes it on every exit path; nothing is retained afterward.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::BuildError;

/// RAII working-directory scope.
///
/// Dropping the scope restores the previous working directory and removes
/// the build directory and all contents.
pub struct WorkDirScope {
    dir: PathBuf,
    previous: PathBuf,
}

impl WorkDirScope {
    /// Allocate a fresh uniquely named directory derived from
    /// `project_name` and make it the current working directory.
    ///
    /// Fails before any other side effect if allocation is impossible.
    pub fn enter(project_name: &str) -> Result<Self, BuildError> {
        let previous = env::current_dir().map_err(|e| BuildError::Resource {
            path: PathBuf::from("."),
            source: e,
        })?;

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        let dir = env::temp_dir().join(format!(
            "{}-build-{}-{:09}",
            project_name,
            std::process::id(),
            nanos
        ));

        fs::create_dir_all(&dir).map_err(|e| BuildError::Resource {
            path: dir.clone(),
            source: e,
        })?;
        // Canonicalize so paths derived from the scope compare cleanly
        // even when the temp root is itself a symlink.
        let dir = fs::canonicalize(&dir).map_err(|e| BuildError::Resource {
            path: dir.clone(),
            source: e,
        })?;

        if let Err(e) = env::set_current_dir(&dir) {
            let _ = fs::remove_dir_all(&dir);
            return Err(BuildError::Resource {
                path: dir,
                source: e,
            });
        }

        Ok(Self { dir, previous })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

impl Drop for WorkDirScope {
    fn drop(&mut self) {
        // Best-effort on both steps; the directory must not outlive the
        // build even if the cwd restore fails.
        let _ = env::set_current_dir(&self.previous);
        let _ = fs::remove_dir_all(&self.dir);
    }
}
