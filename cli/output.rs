use crate::error::CliError;
use anyhow::{Context, Result};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use log;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use xpack_core::{Diagnostic, format_size};

use crate::commands::metrics::ProjectMetrics;

/// Clipboard programs tried in order; the first one that runs wins.
const CLIPBOARD_COMMANDS: [(&str, &[&str]); 5] = [
    ("pbcopy", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("clip", &[]),
];

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

pub fn write_to_file(path: &Path, content: &str) -> Result<(), CliError> {
    let wrap = |source| CliError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    fs::write(path, content).map_err(wrap)?;
    log::info!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

pub fn copy_to_clipboard(content: &str) -> Result<(), CliError> {
    for (program, args) in CLIPBOARD_COMMANDS {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                log::trace!("Clipboard program '{}' unavailable: {}", program, e);
                continue;
            }
        };
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(content.as_bytes())
                .map_err(|e| CliError::Clipboard(format!("{}: {}", program, e)))?;
        }
        let status = child
            .wait()
            .map_err(|e| CliError::Clipboard(format!("{}: {}", program, e)))?;
        if status.success() {
            log::debug!("Copied document to clipboard with {}", program);
            return Ok(());
        }
        log::debug!("Clipboard program '{}' exited with {}", program, status);
    }
    Err(CliError::Clipboard(
        "no working clipboard program found (tried pbcopy, wl-copy, xclip, xsel, clip)"
            .to_string(),
    ))
}

/// Asks before replacing `path`. In quiet mode an existing file is never replaced.
pub fn confirm_overwrite(path: &Path, quiet: bool) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    if quiet {
        anyhow::bail!(
            "Target file '{}' exists. Overwrite prevented in quiet mode.",
            path.display()
        );
    }
    print!(
        "{} File already exists at '{}'. Overwrite? [{}/{}] ",
        "⚠️".yellow(),
        path.display().to_string().cyan(),
        "y".green(),
        "N".red()
    );
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut response = String::new();
    io::stdin()
        .read_line(&mut response)
        .context("Failed to read user input")?;
    Ok(response.trim().eq_ignore_ascii_case("y"))
}

pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let content =
        serde_json::to_string_pretty(data).context("Failed to serialize output to JSON")?;
    write_to_stdout(&content)
}

/// Prints skipped entities to stderr, so stdout stays clean for the document.
pub fn print_diagnostics(diagnostics: &[Diagnostic], quiet: bool) {
    if quiet || diagnostics.is_empty() {
        return;
    }
    eprintln!(
        "{} {} path(s) skipped:",
        "Warning:".yellow().bold(),
        diagnostics.len()
    );
    for diagnostic in diagnostics {
        eprintln!("  - {}", diagnostic.to_string().dimmed());
    }
}

pub fn print_metrics_pretty_table(metrics: &ProjectMetrics) {
    println!();
    println!("{}", " Project Metrics Summary ".green().bold().underline());
    println!(
        "{:<20} {}",
        "Total Files:".green(),
        metrics.total_files.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Total Lines:".green(),
        metrics.total_lines.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Total Size:".green(),
        format_size(metrics.total_bytes).cyan()
    );
    println!(
        "{:<20} {}",
        "Est. Tokens:".green(),
        metrics.estimated_tokens.to_string().cyan()
    );

    if metrics.files.is_empty() {
        println!("\n{}", "(No files would be packed)".yellow());
    } else {
        println!("\n{}", " File Details ".green().bold().underline());
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Path").fg(Color::Green),
            Cell::new("Lines").fg(Color::Green),
            Cell::new("Size").fg(Color::Green),
            Cell::new("Tokens").fg(Color::Green),
        ]);
        for file in &metrics.files {
            table.add_row(vec![
                Cell::new(&file.path).fg(Color::Cyan),
                Cell::new(file.lines).set_alignment(CellAlignment::Right),
                Cell::new(format_size(file.bytes))
                    .set_alignment(CellAlignment::Right)
                    .fg(Color::DarkGrey),
                Cell::new(file.estimated_tokens).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("{table}");
    }
    println!();
}
