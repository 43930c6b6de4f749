//! Config command - prints the resolved configuration.

use anyhow::Result;

use crate::config::Config;

/// Execute the config command.
pub fn cmd_config(config: &Config) -> Result<()> {
    config.print();
    Ok(())
}
