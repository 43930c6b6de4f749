//! Application manifest (composer.json) handling.
//!
//! The project root must carry a manifest naming the package and at least
//! one entry-point script in `bin`; everything the pipeline derives about
//! the application comes from here.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::BuildError;

#[derive(Debug, Clone, Deserialize)]
struct ComposerManifest {
    name: String,
    #[serde(default)]
    bin: Vec<String>,
}

/// A packageable project: root directory plus the manifest facts the
/// pipeline needs.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    /// Manifest filename relative to the root (usually composer.json).
    pub manifest_file: String,
    /// Full package name, `vendor/package`.
    pub name: String,
    /// Entry-point script path relative to the root, e.g. `bin/app`.
    pub entry_script: String,
}

impl Project {
    /// Load the project rooted at `root`, reading `manifest_file`.
    pub fn load(root: &Path, manifest_file: &str) -> Result<Self, BuildError> {
        let manifest_path = root.join(manifest_file);
        let content = fs::read_to_string(&manifest_path).map_err(|e| BuildError::Project {
            path: manifest_path.clone(),
            message: e.to_string(),
        })?;

        let manifest: ComposerManifest =
            serde_json::from_str(&content).map_err(|e| BuildError::Project {
                path: manifest_path.clone(),
                message: e.to_string(),
            })?;

        if !manifest.name.contains('/') {
            return Err(BuildError::Project {
                path: manifest_path.clone(),
                message: format!("package name `{}` is not vendor/package", manifest.name),
            });
        }

        let entry_script = manifest
            .bin
            .first()
            .cloned()
            .ok_or_else(|| BuildError::Project {
                path: manifest_path,
                message: "no `bin` entry names the entry-point script".to_string(),
            })?;

        Ok(Self {
            root: root.to_path_buf(),
            manifest_file: manifest_file.to_string(),
            name: manifest.name,
            entry_script,
        })
    }

    /// The package half of the name (after the slash).
    pub fn package_name(&self) -> &str {
        self.name.split('/').nth(1).unwrap_or(&self.name)
    }

    /// Application name: basename of the first `bin` entry. Names the
    /// archive alias and the default artifact file.
    pub fn app_name(&self) -> &str {
        self.entry_script
            .rsplit('/')
            .next()
            .unwrap_or(&self.entry_script)
    }

    /// Default artifact path: `<artifacts_dir>/<app>.phar` under the root.
    pub fn default_destination(&self, artifacts_dir: &str) -> PathBuf {
        let dir = Path::new(artifacts_dir);
        let dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.root.join(dir)
        };
        dir.join(format!("{}.phar", self.app_name()))
    }
}
