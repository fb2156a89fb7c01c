mod cli_args;
mod commands;
mod error;
mod output;
mod remote;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use log;
use std::path::Path;
use std::process;

use cli_args::{Cli, Commands, FilterOpts, ProjectConfigOpts};
use error::CliError;
use xpack_core::{AppError, Config};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = exit_code_for(&e);
            if !quiet || exit_code == 1 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }
            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return cli_err.exit_code();
    }
    match err.downcast_ref::<AppError>() {
        Some(e) if e.is_request_error() => 1,
        Some(AppError::Io(_))
        | Some(AppError::FileRead { .. })
        | Some(AppError::ThreadPool(_)) => 2,
        Some(AppError::JsonSerialize(_))
        | Some(AppError::YamlError(_))
        | Some(AppError::XmlSerialize(_))
        | Some(AppError::TomlSerialize(_)) => 6,
        Some(_) => 1,
        None => 1,
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::Pack(args) => {
                log::debug!("Executing 'pack' command...");
                commands::pack::handle_pack_command(args, quiet)?;
            }
            Commands::Metrics(args) => {
                log::debug!("Executing 'metrics' command...");
                commands::metrics::handle_metrics_command(args, quiet)?;
            }
            Commands::Debug(args) => {
                log::debug!("Executing 'debug' command...");
                commands::debug::handle_debug_command(args, quiet)?;
            }
            Commands::Completion(args) => {
                log::debug!("Executing 'completion' command...");
                commands::completion::handle_completion_command(&args, quiet)?;
            }
            Commands::Config(args) => {
                log::debug!("Executing 'config' command...");
                commands::config::handle_config_command(&args, quiet)?;
            }
        },
    }
    Ok(())
}

/// Loads the TOML config for `project_root` (unless disabled) and applies the
/// flags shared by every scanning command.
pub fn load_config_for_command(
    project_root: &Path,
    project_opts: &ProjectConfigOpts,
    filters: &FilterOpts,
) -> Result<Config> {
    let config_path = Config::resolve_config_path(
        project_root,
        project_opts.config_file.as_ref(),
        project_opts.disable_config_file,
    )
    .context("Failed to resolve configuration path")?;

    let config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    Ok(merge_filter_overrides(config, project_opts, filters))
}

fn merge_filter_overrides(
    mut config: Config,
    project_opts: &ProjectConfigOpts,
    filters: &FilterOpts,
) -> Config {
    log::trace!("Applying CLI filter overrides to config...");
    if let Some(name) = &project_opts.display_name {
        config.general.display_name = Some(name.clone());
    }
    config.filters.include.extend(filters.include.iter().cloned());
    config.filters.ignore.extend(filters.ignore.iter().cloned());
    if filters.no_default_patterns {
        config.ignore.use_default_patterns = false;
    }
    if filters.no_rule_files {
        config.ignore.use_rule_files = false;
    }
    if let Some(size) = &filters.max_file_size {
        config.limits.max_file_size = size.clone();
    }
    if let Some(size) = &filters.max_read_size {
        config.limits.max_read_size = size.clone();
    }
    log::trace!("Config after CLI overrides: {:?}", config);
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use xpack_core::AppError;

    #[test]
    fn flags_extend_and_override_file_values() {
        let config = Config::from_toml(
            "[filters]\nignore = [\"*.snap\"]\n[limits]\nmax_file_size = \"2MiB\"\n",
        )
        .unwrap();
        let filters = FilterOpts {
            include: vec!["*.rs".to_string()],
            ignore: vec!["docs/".to_string()],
            no_rule_files: true,
            max_file_size: Some("10KiB".to_string()),
            ..FilterOpts::default()
        };
        let opts = ProjectConfigOpts {
            display_name: Some("demo".to_string()),
            ..ProjectConfigOpts::default()
        };
        let merged = merge_filter_overrides(config, &opts, &filters);
        assert_eq!(merged.filters.ignore, vec!["*.snap", "docs/"]);
        assert_eq!(merged.filters.include, vec!["*.rs"]);
        assert!(!merged.ignore.use_rule_files);
        assert!(merged.ignore.use_default_patterns);
        assert_eq!(merged.limits.max_file_size, "10KiB");
        assert_eq!(merged.general.display_name.as_deref(), Some("demo"));
    }

    #[test]
    fn exit_codes_follow_error_family() {
        let request = anyhow::Error::new(AppError::InvalidRequest("bad".into()));
        assert_eq!(exit_code_for(&request), 1);
        let io = anyhow::Error::new(AppError::FileRead {
            path: PathBuf::from("/x"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });
        assert_eq!(exit_code_for(&io), 2);
        let xml = anyhow::Error::new(AppError::XmlSerialize("x".into()));
        assert_eq!(exit_code_for(&xml), 6);
        let remote = anyhow::Error::new(CliError::GitNotFound).context("cloning");
        assert_eq!(exit_code_for(&remote), 9);
        let emit = anyhow::Error::new(CliError::Clipboard("none".into()));
        assert_eq!(exit_code_for(&emit), 10);
        let tokens = anyhow::Error::new(CliError::Tokenizer("bpe".into()));
        assert_eq!(exit_code_for(&tokens), 8);
    }
}
