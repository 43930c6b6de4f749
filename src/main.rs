//! pharbuild - packages a PHP command-line project into one executable
//! PHAR archive.
//!
//! The pipeline copies the git-tracked sources into an ephemeral working
//! directory, composer-installs production dependencies there, flattens
//! locally symlinked packages, stamps the entry script and writes a
//! stub-fronted, signed archive into the artifacts directory.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pharbuild::commands;
use pharbuild::config::Config;

#[derive(Parser)]
#[command(name = "pharbuild")]
#[command(about = "Package a PHP CLI project into an executable PHAR")]
#[command(
    after_help = "QUICK START:\n  pharbuild preflight  Check tools and project layout\n  pharbuild build      Build the archive\n  pharbuild content    List what went into it"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the executable archive
    Build {
        /// Where the artifact lands (default: artifacts/<app>.phar)
        destination: Option<PathBuf>,

        /// Version string stamped into the entry script
        #[arg(long)]
        tag: Option<String>,
    },

    /// List the entries of a finished archive
    Content {
        /// Archive path (default: artifacts/<app>.phar)
        path: Option<PathBuf>,
    },

    /// Run preflight checks (verify tools before a build)
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },

    /// Show the resolved configuration
    Config,

    /// Remove the artifacts directory
    Clean,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = std::env::current_dir()?;

    // Load .env if present
    dotenvy::dotenv().ok();
    let config = Config::load(&root);

    match cli.command {
        Commands::Build { destination, tag } => {
            commands::cmd_build(&root, &config, destination, tag)?;
        }

        Commands::Content { path } => {
            commands::cmd_content(&root, &config, path)?;
        }

        Commands::Preflight { strict } => {
            commands::cmd_preflight(&root, &config, strict)?;
        }

        Commands::Config => {
            commands::cmd_config(&config)?;
        }

        Commands::Clean => {
            commands::cmd_clean(&root, &config)?;
        }
    }

    Ok(())
}
