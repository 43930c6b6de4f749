//! File manifests and filter rules.
//!
//! A manifest is an ordered, duplicate-free list of `/`-separated relative
//! paths together with the base directory they resolve against. Each
//! pipeline stage produces its own sub-manifest; `absorb` merges them
//! under the duplicate-free invariant.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use crate::error::BuildError;

/// Ordered, duplicate-free relative file paths under a base directory.
#[derive(Debug)]
pub struct FileManifest {
    base: PathBuf,
    files: Vec<String>,
    seen: HashSet<String>,
}

impl FileManifest {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            files: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Append a relative path. Duplicates are ignored; the first
    /// occurrence wins.
    pub fn push(&mut self, rel: impl Into<String>) {
        let rel = rel.into();
        if self.seen.insert(rel.clone()) {
            self.files.push(rel);
        }
    }

    /// Append every entry of `other`, re-rooted under `prefix` (empty for
    /// none). Duplicates against the current contents are dropped.
    pub fn absorb(&mut self, other: &FileManifest, prefix: &str) {
        for rel in &other.files {
            if prefix.is_empty() {
                self.push(rel.clone());
            } else {
                self.push(format!("{}/{}", prefix.trim_end_matches('/'), rel));
            }
        }
    }

    pub fn contains(&self, rel: &str) -> bool {
        self.seen.contains(rel)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    /// Absolute path of one entry.
    pub fn resolve(&self, rel: &str) -> PathBuf {
        self.base.join(rel)
    }
}

/// Path-based inclusion/exclusion rules for a manifest walk.
///
/// The same rule set is applied to the vendor root and to every symlinked
/// package's resolved tree, so exclusions survive path resolution.
#[derive(Debug, Clone)]
pub struct FilterRules {
    /// Directory components pruned anywhere in the relative path.
    exclude_dirs: Vec<&'static str>,
    /// Basename patterns excluded.
    exclude_names: Vec<Pattern>,
    /// If set, only basenames matching one of these are kept.
    include_names: Option<Vec<Pattern>>,
}

/// Directory names that never ship: executables, test suites, reports,
/// nested vendor trees and VCS bookkeeping.
const PACKAGE_EXCLUDE_DIRS: &[&str] = &["bin", "tests", "Test", "reports", "vendor", ".git", ".svn", ".hg"];

/// Basenames that never ship from a dependency package.
const PACKAGE_EXCLUDE_NAMES: &[&str] = &[
    "composer.json",
    "composer.lock",
    "codeception*",
    "phpcs.xml",
    "phpcs.xml.dist",
    "phpunit.xml",
    "phpunit.xml.dist",
    "phpstan.neon",
    "phpstan.dist.neon",
    "robo.yml",
    "robo.yml.dist",
    "RoboFile.php",
    "*.md",
];

impl FilterRules {
    /// Rules for the project's own source tree: PHP sources only.
    pub fn php_sources() -> Self {
        Self {
            exclude_dirs: vec![".git", ".svn", ".hg"],
            exclude_names: Vec::new(),
            include_names: Some(vec![Pattern::new("*.php").unwrap()]),
        }
    }

    /// Rules for installed dependency packages, symlinked or not.
    pub fn dependency_package() -> Self {
        Self {
            exclude_dirs: PACKAGE_EXCLUDE_DIRS.to_vec(),
            exclude_names: PACKAGE_EXCLUDE_NAMES
                .iter()
                .map(|p| Pattern::new(p).unwrap())
                .collect(),
            include_names: None,
        }
    }

    /// Whether `rel` is excluded by these rules.
    pub fn excludes(&self, rel: &Path) -> bool {
        let components: Vec<&str> = rel
            .iter()
            .filter_map(|c| c.to_str())
            .collect();
        let Some((&name, dirs)) = components.split_last() else {
            return true;
        };

        if dirs.iter().any(|d| self.exclude_dirs.contains(d)) {
            return true;
        }
        if self.exclude_names.iter().any(|p| p.matches(name)) {
            return true;
        }
        if let Some(include) = &self.include_names {
            if !include.iter().any(|p| p.matches(name)) {
                return true;
            }
        }
        false
    }
}

/// Walk `root` recursively and collect every file the rules keep.
///
/// Entries are visited in file-name order so a given tree always yields
/// the same manifest. Symbolic links are not followed; a symlinked
/// directory contributes nothing here (the symlink resolver flattens it
/// explicitly).
pub fn collect(root: &Path, rules: &FilterRules) -> Result<FileManifest, BuildError> {
    let mut manifest = FileManifest::new(root);

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            BuildError::filesystem(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .expect("walk entries live under the walk root");
        if rules.excludes(rel) {
            continue;
        }
        manifest.push(rel_to_string(rel));
    }

    Ok(manifest)
}

/// Render a relative path with `/` separators.
fn rel_to_string(rel: &Path) -> String {
    rel.iter()
        .map(|c| c.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn php_sources_keep_only_php() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Command/Ping.php");
        touch(dir.path(), "Command/notes.txt");
        touch(dir.path(), "Application.php");

        let manifest = collect(dir.path(), &FilterRules::php_sources()).unwrap();
        let files: Vec<&str> = manifest.iter().collect();
        assert_eq!(files, vec!["Application.php", "Command/Ping.php"]);
    }

    #[test]
    fn package_rules_drop_tests_docs_and_tool_configs() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "psr/log/src/LoggerInterface.php");
        touch(dir.path(), "psr/log/tests/LoggerTest.php");
        touch(dir.path(), "psr/log/composer.json");
        touch(dir.path(), "psr/log/README.md");
        touch(dir.path(), "psr/log/phpunit.xml.dist");
        touch(dir.path(), "psr/log/codeception.dist.yml");
        touch(dir.path(), "acme/dev/vendor/nested/file.php");
        touch(dir.path(), "acme/dev/Test/Helper.php");
        touch(dir.path(), "autoload.php");

        let manifest = collect(dir.path(), &FilterRules::dependency_package()).unwrap();
        let files: Vec<&str> = manifest.iter().collect();
        assert_eq!(files, vec!["autoload.php", "psr/log/src/LoggerInterface.php"]);
    }

    #[test]
    fn walk_is_sorted_and_stable() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.php");
        touch(dir.path(), "a.php");
        touch(dir.path(), "sub/c.php");

        let first = collect(dir.path(), &FilterRules::php_sources()).unwrap();
        let second = collect(dir.path(), &FilterRules::php_sources()).unwrap();
        assert_eq!(
            first.iter().collect::<Vec<_>>(),
            second.iter().collect::<Vec<_>>()
        );
        assert_eq!(first.iter().collect::<Vec<_>>(), vec!["a.php", "b.php", "sub/c.php"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_descended() {
        let dir = tempfile::tempdir().unwrap();
        let real = tempfile::tempdir().unwrap();
        touch(real.path(), "src/Linked.php");
        touch(dir.path(), "plain/src/File.php");
        std::os::unix::fs::symlink(real.path(), dir.path().join("plain/linked")).unwrap();

        let manifest = collect(dir.path(), &FilterRules::dependency_package()).unwrap();
        let files: Vec<&str> = manifest.iter().collect();
        assert_eq!(files, vec!["plain/src/File.php"]);
    }

    #[test]
    fn absorb_re_roots_and_deduplicates() {
        let mut merged = FileManifest::new("/work");
        merged.push("composer.json");
        merged.push("src/App.php");

        let mut vendor = FileManifest::new("/work/vendor");
        vendor.push("psr/log/src/Logger.php");
        vendor.push("psr/log/src/Logger.php");

        merged.absorb(&vendor, "vendor");
        merged.absorb(&vendor, "vendor");

        let files: Vec<&str> = merged.iter().collect();
        assert_eq!(
            files,
            vec!["composer.json", "src/App.php", "vendor/psr/log/src/Logger.php"]
        );
        assert!(merged.contains("vendor/psr/log/src/Logger.php"));
    }

    #[test]
    fn resolve_joins_base() {
        let mut manifest = FileManifest::new("/work");
        manifest.push("src/App.php");
        assert_eq!(manifest.resolve("src/App.php"), PathBuf::from("/work/src/App.php"));
    }
}
