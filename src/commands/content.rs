//! Content command - lists a finished archive's entries.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::phar;
use crate::project::Project;

/// Execute the content command. Defaults to the project's own artifact
/// when no path is given.
pub fn cmd_content(root: &Path, config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => {
            let project = Project::load(root, &config.manifest_file)
                .context("no archive path given and no project here")?;
            project.default_destination(&config.artifacts_dir)
        }
    };

    let entries = phar::list_contents(&path)
        .with_context(|| format!("cannot list {}", path.display()))?;

    for entry in &entries {
        println!("./{entry}");
    }
    println!("\n{} entries in {}", entries.len(), path.display());

    Ok(())
}
