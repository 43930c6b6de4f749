//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `build` - Assemble the executable archive
//! - `content` - List a finished archive's entries
//! - `preflight` - Run preflight checks
//! - `config` - Print the resolved configuration
//! - `clean` - Remove the artifacts directory

pub mod build;
pub mod clean;
pub mod config;
pub mod content;
pub mod preflight;

pub use build::cmd_build;
pub use clean::cmd_clean;
pub use config::cmd_config;
pub use content::cmd_content;
pub use preflight::cmd_preflight;
