//! Clean command - removes build artifacts.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::Config;

/// Execute the clean command: remove the artifacts directory.
pub fn cmd_clean(root: &Path, config: &Config) -> Result<()> {
    let dir = {
        let configured = Path::new(&config.artifacts_dir);
        if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            root.join(configured)
        }
    };

    if dir.exists() {
        fs::remove_dir_all(&dir)
            .with_context(|| format!("cannot remove {}", dir.display()))?;
        println!("Removed {}", dir.display());
    } else {
        println!("Nothing to clean at {}", dir.display());
    }

    Ok(())
}
