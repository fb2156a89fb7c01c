use crate::cli_args::DebugArgs;
use crate::load_config_for_command;
use crate::output::{print_diagnostics, print_json};
use anyhow::{Context, Result};
use colored::*;
use log;
use serde::Serialize;
use toml;
use xpack_core::{self as core, CollectingSink, Config, Diagnostic, IgnoreReport, PackRequest};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DebugInfo<'a> {
    request: &'a PackRequest,
    ignore_patterns: &'a IgnoreReport,
    files_to_pack: Vec<String>,
    skipped: Vec<Diagnostic>,
}

pub fn handle_debug_command(args: DebugArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.dir.as_ref())
        .context("Failed to determine source directory")?;
    log::info!("Project root determined: {}", project_root.display());

    let config = load_config_for_command(&project_root, &args.project_config, &args.filters)
        .context("Failed to load configuration for debug command")?;
    let request = config
        .to_request(&project_root)
        .and_then(PackRequest::validate)
        .context("Failed to build pack request")?;

    log::debug!("Debug: Scanning...");
    let sink = CollectingSink::new();
    let outcome = core::scan(&request, &sink).context("Failed to scan source directory")?;
    let files = core::load_files(&request, &outcome.paths, &sink)
        .context("Failed to load files for debug")?;
    log::debug!("Debug: {} of {} scanned files survive loading", files.len(), outcome.paths.len());

    let debug_data = DebugInfo {
        request: &request,
        ignore_patterns: &outcome.ignore_report,
        files_to_pack: files.into_iter().map(|f| f.path).collect(),
        skipped: sink.diagnostics(),
    };

    if args.json {
        print_json(&debug_data)
    } else {
        print_debug_info_pretty(&debug_data, &config, quiet)
    }
}

fn print_debug_info_pretty(debug_info: &DebugInfo, config: &Config, quiet: bool) -> Result<()> {
    println!(
        "{}",
        "\n--- Effective Configuration ---"
            .green()
            .bold()
            .underline()
    );
    let config_toml = toml::to_string_pretty(config)
        .context("Failed to serialize effective config to TOML")?;
    println!("{}", config_toml);
    println!(
        "{} {}",
        "Source:".green(),
        debug_info.request.source_dir.display().to_string().cyan()
    );

    let report = debug_info.ignore_patterns;
    print_path_list("Default Ignore Patterns", &report.default_patterns);
    print_path_list("Caller Ignore Patterns", &report.caller_patterns);
    print_path_list("Rule File Patterns", &report.rule_file_patterns);
    print_path_list("Include Patterns", &debug_info.request.include_patterns);
    print_path_list("Files To Pack", &debug_info.files_to_pack);

    print_diagnostics(&debug_info.skipped, quiet);
    println!("{}", "\n--- End Debug Info ---".green().bold());
    Ok(())
}

fn print_path_list(title: &str, items: &[String]) {
    println!(
        "{}",
        format!("\n--- {} ---", title).green().bold().underline()
    );
    if items.is_empty() {
        println!("{}", "(None)".dimmed());
    } else {
        items.iter().for_each(|p| println!("- {}", p.cyan()));
    }
}
