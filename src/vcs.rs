//! Tracked-file listing via the source-control executable.

use std::path::Path;

use crate::error::BuildError;
use crate::manifest::FileManifest;
use crate::process::Cmd;

/// List every file git currently tracks under `root`, relative to `root`,
/// in the order git reports them.
///
/// NUL-separated output so paths with unusual characters survive intact.
pub fn list_tracked_files(root: &Path, git_bin: &str) -> Result<FileManifest, BuildError> {
    let output = Cmd::new(git_bin)
        .args(["ls-files", "-z"])
        .dir(root)
        .run()?;

    let mut manifest = FileManifest::new(root);
    for raw in output.stdout.split(|&b| b == 0) {
        if raw.is_empty() {
            continue;
        }
        manifest.push(String::from_utf8_lossy(raw).into_owned());
    }

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn git(dir: &Path, args: &[&str]) {
        Cmd::new("git").args(args).dir(dir).run().unwrap();
    }

    fn init_repo(dir: &Path) {
        git(dir, &["init", "--quiet"]);
    }

    #[test]
    fn lists_tracked_files_only() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        fs::write(dir.path().join("composer.json"), "{}").unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/App.php"), "<?php").unwrap();
        fs::write(dir.path().join("untracked.txt"), "x").unwrap();
        git(dir.path(), &["add", "composer.json", "src/App.php"]);

        let manifest = list_tracked_files(dir.path(), "git").unwrap();
        let files: Vec<&str> = manifest.iter().collect();
        assert_eq!(files, vec!["composer.json", "src/App.php"]);
    }

    #[test]
    fn outside_a_repository_is_a_process_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_tracked_files(dir.path(), "git").unwrap_err();
        assert!(matches!(err, BuildError::Process { .. }));
    }
}
