//! Symlinked dependency packages.
//!
//! A package manager install is transparent about symlinks (composer path
//! repositories land as `vendor/<vendor>/<package>` symlinks to a local
//! working copy), but the archive stores regular files only. Every
//! symlinked package's real tree must therefore be flattened in explicitly
//! at the location a normal install would occupy.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BuildError;
use crate::manifest::{self, FileManifest, FilterRules};

/// A dependency whose on-disk location under the vendor root is a
/// symbolic link to a separate source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkedPackage {
    /// Location under the vendor root, `<vendor-name>/<package-name>`.
    pub link_path: String,
    /// Resolved real filesystem path of the package.
    pub real_path: PathBuf,
}

/// Find every symlinked package directly under `vendor_root`.
///
/// Only entries at package depth (`vendor/<vendor>/<package>`) qualify;
/// symlinks deeper inside a package are file content, not package roots.
/// Results are sorted by link path for stable manifests.
pub fn discover_symlinked_packages(
    vendor_root: &Path,
) -> Result<Vec<SymlinkedPackage>, BuildError> {
    let mut packages = Vec::new();

    for vendor_entry in read_dir_sorted(vendor_root)? {
        if !vendor_entry.is_dir() || fs::symlink_metadata(&vendor_entry)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
        {
            continue;
        }
        for package_entry in read_dir_sorted(&vendor_entry)? {
            let meta = fs::symlink_metadata(&package_entry)
                .map_err(|e| BuildError::filesystem(&package_entry, e))?;
            if !meta.file_type().is_symlink() {
                continue;
            }
            // Must resolve to a directory to count as a package root.
            let Ok(target) = fs::metadata(&package_entry) else {
                continue;
            };
            if !target.is_dir() {
                continue;
            }
            let real_path = fs::canonicalize(&package_entry)
                .map_err(|e| BuildError::filesystem(&package_entry, e))?;
            packages.push(SymlinkedPackage {
                link_path: format!(
                    "{}/{}",
                    file_name(&vendor_entry),
                    file_name(&package_entry)
                ),
                real_path,
            });
        }
    }

    Ok(packages)
}

/// Collect a symlinked package's real tree with the standard dependency
/// rules, re-rooted so the archive sees it under the vendor root.
pub fn flatten_package(
    package: &SymlinkedPackage,
    rules: &FilterRules,
    into: &mut FileManifest,
    vendor_prefix: &str,
) -> Result<(), BuildError> {
    let resolved = manifest::collect(&package.real_path, rules)?;
    let prefix = format!("{}/{}", vendor_prefix.trim_end_matches('/'), package.link_path);
    into.absorb(&resolved, &prefix);
    Ok(())
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let entries = fs::read_dir(dir).map_err(|e| BuildError::filesystem(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BuildError::filesystem(dir, e))?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[cfg(unix)]
    fn symlink_dir(target: &Path, link: &Path) {
        fs::create_dir_all(link.parent().unwrap()).unwrap();
        std::os::unix::fs::symlink(target, link).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn finds_only_package_level_symlinks() {
        let vendor = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        touch(local.path(), "src/Differ.php");

        // Ordinary installed package.
        touch(vendor.path(), "psr/log/src/LoggerInterface.php");
        // Symlinked local development copy.
        symlink_dir(local.path(), &vendor.path().join("acme/differ"));
        // A symlink deeper than package depth is not a package root.
        symlink_dir(local.path(), &vendor.path().join("psr/log/src/linked"));
        // Stray file at the vendor root.
        touch(vendor.path(), "autoload.php");

        let packages = discover_symlinked_packages(vendor.path()).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].link_path, "acme/differ");
        assert_eq!(
            packages[0].real_path,
            fs::canonicalize(local.path()).unwrap()
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_file_is_not_a_package() {
        let vendor = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        touch(local.path(), "notes.txt");
        symlink_dir(&local.path().join("notes.txt"), &vendor.path().join("acme/link"));

        let packages = discover_symlinked_packages(vendor.path()).unwrap();
        assert!(packages.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn flatten_applies_package_rules_and_re_roots() {
        let vendor = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        touch(local.path(), "src/Differ.php");
        touch(local.path(), "tests/DifferTest.php");
        touch(local.path(), "composer.json");
        touch(local.path(), "CHANGELOG.md");
        symlink_dir(local.path(), &vendor.path().join("acme/differ"));

        let packages = discover_symlinked_packages(vendor.path()).unwrap();
        let mut merged = FileManifest::new("/work");
        flatten_package(
            &packages[0],
            &FilterRules::dependency_package(),
            &mut merged,
            "vendor",
        )
        .unwrap();

        let files: Vec<&str> = merged.iter().collect();
        assert_eq!(files, vec!["vendor/acme/differ/src/Differ.php"]);
    }
}
