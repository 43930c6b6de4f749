//! Build command - assembles the executable archive.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::Config;
use crate::pipeline;
use crate::project::Project;

/// Execute the build command.
pub fn cmd_build(
    root: &Path,
    config: &Config,
    destination: Option<PathBuf>,
    tag: Option<String>,
) -> Result<()> {
    let project = Project::load(root, &config.manifest_file)
        .context("cannot package this directory")?;

    println!("=== PHAR Build: {} ===", project.name);
    match &tag {
        Some(tag) if !tag.is_empty() => println!("  version tag: {tag}"),
        _ => println!("  version tag: none (authored version ships)"),
    }
    let build_start = Instant::now();

    let mut builder = pipeline::Builder::new(&project, config, destination, tag);
    let outcome = builder.run().with_context(|| {
        format!(
            "build aborted during {} for {}",
            builder.failed_during().unwrap_or("an unknown stage"),
            project.name
        )
    })?;

    let secs = build_start.elapsed().as_secs_f64();
    println!("\n=== Build Complete ({:.1}s) ===", secs);
    println!("  Artifact: {}", outcome.artifact.display());
    println!("  Entries:  {}", outcome.entry_count);
    println!("\nNext: pharbuild content");

    Ok(())
}
