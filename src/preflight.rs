//! Preflight checks for a build.
//!
//! Validates the external tools and the project layout before starting a
//! build. Run with `pharbuild preflight` to check everything is ready.

use std::path::Path;

use crate::config::Config;
use crate::project::Project;

/// Result of a single preflight check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed.
    Pass,
    /// Check failed - build will fail.
    Fail,
    /// Check passed but with a warning.
    Warn,
}

impl CheckResult {
    fn pass_with(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass,
            details: Some(details.to_string()),
        }
    }

    fn fail(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Fail,
            details: Some(details.to_string()),
        }
    }

    fn warn(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warn,
            details: Some(details.to_string()),
        }
    }
}

/// Results of all preflight checks.
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// Returns true if all checks passed (no failures).
    pub fn all_passed(&self) -> bool {
        !self.checks.iter().any(|c| c.status == CheckStatus::Fail)
    }

    pub fn fail_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Fail)
            .count()
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        println!("=== Preflight Check Results ===\n");

        for check in &self.checks {
            let status_str = match check.status {
                CheckStatus::Pass => "PASS",
                CheckStatus::Fail => "FAIL",
                CheckStatus::Warn => "WARN",
            };
            print!("  [{}] {}", status_str, check.name);
            if let Some(details) = &check.details {
                println!(": {}", details);
            } else {
                println!();
            }
        }

        println!();
        let failed = self.fail_count();
        if failed > 0 {
            println!("{} check(s) failed; the build would abort.", failed);
        } else {
            println!("All checks passed.");
        }
    }
}

/// Run every check against `root` with the given configuration.
pub fn run_checks(root: &Path, config: &Config) -> PreflightReport {
    let mut checks = Vec::new();

    checks.push(check_executable("source control", &config.git_bin));
    checks.push(check_executable("package manager", &config.composer_bin));

    match Project::load(root, &config.manifest_file) {
        Ok(project) => {
            checks.push(CheckResult::pass_with(
                "application manifest",
                &format!("{} ({})", config.manifest_file, project.name),
            ));
            let entry = root.join(&project.entry_script);
            if entry.is_file() {
                checks.push(CheckResult::pass_with("entry script", &project.entry_script));
            } else {
                checks.push(CheckResult::fail(
                    "entry script",
                    &format!("{} not found", project.entry_script),
                ));
            }
        }
        Err(e) => {
            checks.push(CheckResult::fail("application manifest", &e.to_string()));
        }
    }

    if !root.join(".git").exists() {
        checks.push(CheckResult::warn(
            "repository",
            "no .git here; the tracked-file listing may come from a parent",
        ));
    }

    PreflightReport { checks }
}

fn check_executable(name: &str, program: &str) -> CheckResult {
    // Absolute or relative override: check the path directly.
    if program.contains('/') {
        return if Path::new(program).is_file() {
            CheckResult::pass_with(name, program)
        } else {
            CheckResult::fail(name, &format!("{program} not found"))
        };
    }
    match which::which(program) {
        Ok(path) => CheckResult::pass_with(name, &path.display().to_string()),
        Err(_) => CheckResult::fail(name, &format!("`{program}` not found on PATH")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config_with(composer: &str) -> Config {
        Config {
            manifest_file: "composer.json".to_string(),
            composer_bin: composer.to_string(),
            git_bin: "git".to_string(),
            artifacts_dir: "artifacts".to_string(),
        }
    }

    #[test]
    fn well_formed_project_passes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("composer.json"),
            r#"{"name": "acme/tool", "bin": ["bin/tool"]}"#,
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("bin")).unwrap();
        fs::write(dir.path().join("bin/tool"), "#!/usr/bin/env php\n").unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();

        let report = run_checks(dir.path(), &config_with("sh"));
        assert!(report.all_passed(), "{:?}", report.checks);
    }

    #[test]
    fn missing_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_checks(dir.path(), &config_with("sh"));
        assert!(!report.all_passed());
        assert!(report
            .checks
            .iter()
            .any(|c| c.name == "application manifest" && c.status == CheckStatus::Fail));
    }

    #[test]
    fn missing_entry_script_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("composer.json"),
            r#"{"name": "acme/tool", "bin": ["bin/tool"]}"#,
        )
        .unwrap();
        let report = run_checks(dir.path(), &config_with("sh"));
        assert!(report
            .checks
            .iter()
            .any(|c| c.name == "entry script" && c.status == CheckStatus::Fail));
    }

    #[test]
    fn unknown_package_manager_fails() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_checks(dir.path(), &config_with("pharbuild-no-such-tool-12345"));
        assert!(report
            .checks
            .iter()
            .any(|c| c.name == "package manager" && c.status == CheckStatus::Fail));
    }
}
