use crate::cli_args::{Cli, CompletionArgs};
use crate::output::confirm_overwrite;
use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use colored::*;
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use xpack_core::AppError;

pub fn handle_completion_command(args: &CompletionArgs, quiet: bool) -> Result<()> {
    let shell = parse_shell(args.shell.as_deref().unwrap_or("fish"))?;
    let mut command = Cli::command();
    let bin_name = command.get_name().to_string();

    if !args.save {
        generate(shell, &mut command, bin_name, &mut io::stdout());
        return Ok(());
    }

    let save_path = default_save_path(shell, &bin_name)?;
    if !confirm_overwrite(&save_path, quiet)? {
        println!("Save cancelled.");
        return Ok(());
    }
    if let Some(save_dir) = save_path.parent() {
        fs::create_dir_all(save_dir)
            .with_context(|| format!("Failed to create directory {}", save_dir.display()))?;
    }
    let mut file = File::create(&save_path)
        .with_context(|| format!("Failed to create file {}", save_path.display()))?;
    generate(shell, &mut command, bin_name, &mut file);

    if !quiet {
        println!(
            "{} {} completions saved to: {}",
            "✅".green(),
            shell.to_string().cyan(),
            save_path.display().to_string().blue()
        );
    }
    Ok(())
}

fn parse_shell(name: &str) -> Result<Shell, AppError> {
    match name.trim().to_lowercase().as_str() {
        "fish" => Ok(Shell::Fish),
        "bash" => Ok(Shell::Bash),
        "zsh" => Ok(Shell::Zsh),
        other => Err(AppError::InvalidRequest(format!(
            "Unsupported shell for completion: {} (use fish, bash or zsh)",
            other
        ))),
    }
}

fn default_save_path(shell: Shell, bin_name: &str) -> Result<PathBuf> {
    let location = match shell {
        Shell::Fish => dirs::config_dir().map(|p| p.join("fish").join("completions")),
        Shell::Bash => dirs::data_local_dir().map(|p| p.join("bash-completion").join("completions")),
        _ => dirs::data_local_dir().map(|p| p.join("zsh").join("site-functions")),
    };
    let dir = location
        .ok_or_else(|| anyhow::anyhow!("Could not determine standard completion directory."))?;
    Ok(dir.join(completion_file_name(shell, bin_name)))
}

fn completion_file_name(shell: Shell, bin_name: &str) -> String {
    match shell {
        Shell::Fish => format!("{}.fish", bin_name),
        Shell::Zsh => format!("_{}", bin_name),
        _ => bin_name.to_string(),
    }
}
