//! Build pipeline orchestration.
//!
//! One build is a strictly sequential pass through the stages below; each
//! stage is a full barrier and observes only the completed results of its
//! predecessors. The first failure aborts the remaining stages, the
//! working-directory scope cleans up on the way out, and the error
//! propagates to the caller.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use crate::config::Config;
use crate::error::BuildError;
use crate::manifest::{self, FileManifest, FilterRules};
use crate::phar::{self, MemoryEntry};
use crate::process::Cmd;
use crate::project::Project;
use crate::stamp;
use crate::vcs;
use crate::vendor;
use crate::workdir::WorkDirScope;

/// Shared build state, created once per invocation and passed by
/// reference to every stage. No stage reads anything it was not handed.
#[derive(Debug)]
pub struct BuildContext {
    pub source_root: PathBuf,
    pub work_dir: PathBuf,
    pub destination: PathBuf,
    pub version_tag: Option<String>,
}

/// Pipeline states. Every transition is a single stage call; `Aborted`
/// is reachable from any state on first failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    DirPrepared,
    ProjectCopied,
    DepsInstalled,
    ManifestResolved,
    Stamped,
    Assembled,
    Done,
    Aborted,
}

impl Stage {
    /// Label of the stage attempted once this one has completed. Used to
    /// name the failing stage in user-visible messages.
    fn next_label(self) -> &'static str {
        match self {
            Stage::Init => "working directory preparation",
            Stage::DirPrepared => "project copy",
            Stage::ProjectCopied => "dependency install",
            Stage::DepsInstalled => "manifest resolution",
            Stage::ManifestResolved => "version stamp",
            Stage::Stamped => "archive assembly",
            Stage::Assembled | Stage::Done => "completion",
            Stage::Aborted => "abort",
        }
    }
}

/// What a finished build produced.
#[derive(Debug)]
pub struct BuildOutcome {
    pub artifact: PathBuf,
    pub entry_count: usize,
}

/// Sequences the stages for one build.
pub struct Builder<'a> {
    project: &'a Project,
    config: &'a Config,
    destination: PathBuf,
    version_tag: Option<String>,
    stage: Stage,
    failed_during: Option<&'static str>,
}

impl<'a> Builder<'a> {
    /// `destination` defaults to `<artifacts_dir>/<app>.phar` under the
    /// project root; a relative path resolves against the project root
    /// (the working directory switch must not move it).
    pub fn new(
        project: &'a Project,
        config: &'a Config,
        destination: Option<PathBuf>,
        version_tag: Option<String>,
    ) -> Self {
        let destination = match destination {
            Some(path) if path.is_absolute() => path,
            Some(path) => project.root.join(path),
            None => project.default_destination(&config.artifacts_dir),
        };
        Self {
            project,
            config,
            destination,
            version_tag,
            stage: Stage::Init,
            failed_during: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Which stage was running when the build aborted, if it did.
    pub fn failed_during(&self) -> Option<&'static str> {
        self.failed_during
    }

    /// Run the whole pipeline. Any stage failure is terminal: the state
    /// machine lands in `Aborted` and the error propagates unchanged.
    pub fn run(&mut self) -> Result<BuildOutcome, BuildError> {
        let result = self.run_stages();
        if result.is_err() {
            self.failed_during = Some(self.stage.next_label());
            self.stage = Stage::Aborted;
        }
        result
    }

    fn run_stages(&mut self) -> Result<BuildOutcome, BuildError> {
        let scope = WorkDirScope::enter(self.project.package_name())?;
        self.advance(Stage::Init, Stage::DirPrepared);

        let ctx = BuildContext {
            source_root: self.project.root.clone(),
            work_dir: scope.path().to_path_buf(),
            destination: self.destination.clone(),
            version_tag: self.version_tag.clone(),
        };

        let tracked = vcs::list_tracked_files(&ctx.source_root, &self.config.git_bin)?;
        copy_project(&ctx, &tracked)?;
        self.advance(Stage::DirPrepared, Stage::ProjectCopied);

        install_dependencies(&ctx, &self.config.composer_bin)?;
        self.advance(Stage::ProjectCopied, Stage::DepsInstalled);

        let merged = resolve_manifest(&ctx)?;
        self.advance(Stage::DepsInstalled, Stage::ManifestResolved);

        let embedded = stamp_entry_script(&ctx, &self.project.entry_script)?;
        self.advance(Stage::ManifestResolved, Stage::Stamped);

        let entry_count = merged.len()
            + if merged.contains(&embedded.path) { 0 } else { 1 };
        phar::assemble(&ctx.destination, self.project.app_name(), &merged, embedded)?;
        self.advance(Stage::Stamped, Stage::Assembled);

        // The working directory is gone before the build counts as done.
        drop(scope);
        self.advance(Stage::Assembled, Stage::Done);

        Ok(BuildOutcome {
            artifact: ctx.destination,
            entry_count,
        })
    }

    fn advance(&mut self, from: Stage, to: Stage) {
        debug_assert_eq!(self.stage, from, "stage ran out of order");
        self.stage = to;
    }
}

/// Convenience wrapper: the `buildArchive` surface.
pub fn build_archive(
    project: &Project,
    config: &Config,
    destination: Option<PathBuf>,
    version_tag: Option<String>,
) -> Result<BuildOutcome, BuildError> {
    Builder::new(project, config, destination, version_tag).run()
}

/// Copy every tracked file into the working directory, preserving
/// relative paths.
fn copy_project(ctx: &BuildContext, tracked: &FileManifest) -> Result<(), BuildError> {
    for rel in tracked.iter() {
        let source = tracked.resolve(rel);
        let target = ctx.work_dir.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::filesystem(parent, e))?;
        }
        fs::copy(&source, &target).map_err(|e| BuildError::filesystem(source, e))?;
    }
    Ok(())
}

/// Materialize production dependencies with one blocking package-manager
/// run. Its own output goes to the terminal unmodified; only the exit
/// status is interpreted.
fn install_dependencies(ctx: &BuildContext, composer_bin: &str) -> Result<(), BuildError> {
    Cmd::new(composer_bin)
        .args(["install", "--no-dev", "--no-interaction"])
        .dir(&ctx.work_dir)
        .run_streaming()
}

/// Merge the project, vendor and symlinked-package sub-manifests into the
/// final duplicate-free archive manifest, all relative to the working
/// directory.
fn resolve_manifest(ctx: &BuildContext) -> Result<FileManifest, BuildError> {
    let mut merged = FileManifest::new(&ctx.work_dir);

    let sources = manifest::collect(&ctx.work_dir.join("src"), &FilterRules::php_sources())?;
    merged.absorb(&sources, "src");

    // The runtime autoloader reads the root manifest.
    if ctx.work_dir.join("composer.json").is_file() {
        merged.push("composer.json");
    }

    let vendor_root = ctx.work_dir.join("vendor");
    let rules = FilterRules::dependency_package();
    let installed = manifest::collect(&vendor_root, &rules)?;
    merged.absorb(&installed, "vendor");

    // A symlink is transparent to the install but not to the archive:
    // flatten each linked package in at the path a normal install would
    // occupy, under the same rules.
    for package in vendor::discover_symlinked_packages(&vendor_root)? {
        vendor::flatten_package(&package, &rules, &mut merged, "vendor")?;
    }

    Ok(merged)
}

/// Load the entry script from the working directory and stamp it in
/// memory; the archive never re-reads it from disk.
fn stamp_entry_script(ctx: &BuildContext, entry_script: &str) -> Result<MemoryEntry, BuildError> {
    let path = ctx.work_dir.join(entry_script);
    let source =
        fs::read_to_string(&path).map_err(|e| BuildError::filesystem(path.clone(), e))?;
    let content = stamp::stamp_entry_script(&source, ctx.version_tag.as_deref());

    let meta = fs::metadata(&path).map_err(|e| BuildError::filesystem(path.clone(), e))?;
    let timestamp = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0);

    Ok(MemoryEntry {
        path: entry_script.to_string(),
        content: content.into_bytes(),
        mode: meta.permissions().mode(),
        timestamp,
    })
}
