//! Configuration management for pharbuild.
//!
//! Reads configuration from a .env file and environment variables.
//! Environment variables take precedence over the .env file.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Default application manifest filename, overridable via `COMPOSER`
/// (the same contract composer itself honors).
pub const DEFAULT_MANIFEST_FILE: &str = "composer.json";

/// pharbuild configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Application manifest filename (default: composer.json)
    pub manifest_file: String,
    /// Package manager executable (default: composer)
    pub composer_bin: String,
    /// Source-control executable (default: git)
    pub git_bin: String,
    /// Directory the artifact lands in, relative to the project root
    /// unless absolute (default: artifacts)
    pub artifacts_dir: String,
}

impl Config {
    /// Load configuration from a .env file in `base_dir` and the process
    /// environment.
    pub fn load(base_dir: &Path) -> Self {
        let mut env_vars = HashMap::new();

        let env_path = base_dir.join(".env");
        if env_path.exists() {
            if let Ok(content) = fs::read_to_string(&env_path) {
                for line in content.lines() {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((key, value)) = line.split_once('=') {
                        let key = key.trim();
                        let value = value.trim().trim_matches('"').trim_matches('\'');
                        env_vars.insert(key.to_string(), value.to_string());
                    }
                }
            }
        }

        // Environment variables override .env file
        for (key, value) in std::env::vars() {
            env_vars.insert(key, value);
        }

        let manifest_file = env_vars
            .get("COMPOSER")
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_MANIFEST_FILE.to_string());

        let composer_bin = env_vars
            .get("PHARBUILD_COMPOSER")
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| "composer".to_string());

        let git_bin = env_vars
            .get("PHARBUILD_GIT")
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| "git".to_string());

        let artifacts_dir = env_vars
            .get("PHARBUILD_ARTIFACTS_DIR")
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| "artifacts".to_string());

        Self {
            manifest_file,
            composer_bin,
            git_bin,
            artifacts_dir,
        }
    }

    /// Print the resolved configuration.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  COMPOSER (manifest file): {}", self.manifest_file);
        println!("  PHARBUILD_COMPOSER: {}", self.composer_bin);
        println!("  PHARBUILD_GIT: {}", self.git_bin);
        println!("  PHARBUILD_ARTIFACTS_DIR: {}", self.artifacts_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "COMPOSER",
            "PHARBUILD_COMPOSER",
            "PHARBUILD_GIT",
            "PHARBUILD_ARTIFACTS_DIR",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn defaults_without_env_or_file() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path());
        assert_eq!(config.manifest_file, "composer.json");
        assert_eq!(config.composer_bin, "composer");
        assert_eq!(config.git_bin, "git");
        assert_eq!(config.artifacts_dir, "artifacts");
    }

    #[test]
    #[serial]
    fn env_file_is_read() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "# build settings\nPHARBUILD_COMPOSER=\"composer2\"\nPHARBUILD_ARTIFACTS_DIR=dist\n",
        )
        .unwrap();
        let config = Config::load(dir.path());
        assert_eq!(config.composer_bin, "composer2");
        assert_eq!(config.artifacts_dir, "dist");
    }

    #[test]
    #[serial]
    fn environment_overrides_env_file() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "COMPOSER=composer.json\n").unwrap();
        std::env::set_var("COMPOSER", "composer-local.json");
        let config = Config::load(dir.path());
        std::env::remove_var("COMPOSER");
        assert_eq!(config.manifest_file, "composer-local.json");
    }
}
