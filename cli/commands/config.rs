use crate::cli_args::ConfigArgs;
use crate::output::{confirm_overwrite, write_to_stdout};
use anyhow::{Context, Result};
use colored::*;
use xpack_core::Config;

/// Prints the default configuration, or writes it to `<root>/.xtools/xpack/xpack.toml`.
pub fn handle_config_command(args: &ConfigArgs, quiet: bool) -> Result<()> {
    let defaults = Config::default();
    if !args.save {
        let toml = defaults
            .to_toml()
            .context("Failed to serialize default config")?;
        return write_to_stdout(&toml);
    }

    let project_root = Config::determine_project_root(args.dir.as_ref())
        .context("Failed to determine project root for config command")?;
    let path = Config::default_path(&project_root);
    if !confirm_overwrite(&path, quiet)? {
        println!("Save cancelled.");
        return Ok(());
    }
    defaults
        .save_to_path(&path)
        .with_context(|| format!("Failed to save config to {}", path.display()))?;
    if !quiet {
        println!(
            "{} Default config saved to: {}",
            "✅".green(),
            path.display().to_string().blue()
        );
    }
    Ok(())
}
