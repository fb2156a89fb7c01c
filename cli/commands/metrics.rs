use crate::cli_args::MetricsArgs;
use crate::error::CliError;
use crate::load_config_for_command;
use crate::output::{print_diagnostics, print_json, print_metrics_pretty_table};
use anyhow::{Context, Result};
use log;
use serde::Serialize;
use tiktoken_rs::{CoreBPE, cl100k_base};
use xpack_core::{self as core, CollectingSink, Config, PackRequest, ProcessedFile};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetrics {
    pub total_files: usize,
    pub total_lines: usize,
    pub total_bytes: u64,
    pub estimated_tokens: usize,
    pub files: Vec<FileMetrics>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetrics {
    pub path: String,
    pub lines: usize,
    pub bytes: u64,
    pub estimated_tokens: usize,
}

pub fn handle_metrics_command(args: MetricsArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.dir.as_ref())
        .context("Failed to determine source directory")?;
    log::info!("Project root determined: {}", project_root.display());

    let config = load_config_for_command(&project_root, &args.project_config, &args.filters)
        .context("Failed to load configuration for metrics command")?;
    let request = config
        .to_request(&project_root)
        .and_then(PackRequest::validate)
        .context("Failed to build pack request")?;

    let sink = CollectingSink::new();
    let outcome = core::scan(&request, &sink).context("Failed to scan source directory")?;
    let files = core::load_files(&request, &outcome.paths, &sink)
        .context("Failed to load files for metrics calculation")?;
    print_diagnostics(&sink.diagnostics(), quiet);

    let bpe = cl100k_base().map_err(|e| CliError::Tokenizer(e.to_string()))?;
    let metrics = calculate_metrics(&files, &bpe);
    log::debug!("Metrics calculated for {} files", metrics.total_files);

    if args.json {
        print_json(&metrics)
    } else {
        print_metrics_pretty_table(&metrics);
        Ok(())
    }
}

fn calculate_metrics(files: &[ProcessedFile], bpe: &CoreBPE) -> ProjectMetrics {
    let files: Vec<FileMetrics> = files
        .iter()
        .map(|file| FileMetrics {
            path: file.path.clone(),
            lines: file.content.lines().count(),
            bytes: file.content.len() as u64,
            estimated_tokens: bpe.encode_ordinary(&file.content).len(),
        })
        .collect();

    ProjectMetrics {
        total_files: files.len(),
        total_lines: files.iter().map(|f| f.lines).sum(),
        total_bytes: files.iter().map(|f| f.bytes).sum(),
        estimated_tokens: files.iter().map(|f| f.estimated_tokens).sum(),
        files,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, content: &str) -> ProcessedFile {
        ProcessedFile {
            path: path.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn totals_sum_per_file_values() {
        let bpe = cl100k_base().unwrap();
        let files = vec![
            file("a.rs", "fn a() {}\nfn b() {}\n"),
            file("b.md", "# Title\n"),
            file("empty.txt", ""),
        ];
        let metrics = calculate_metrics(&files, &bpe);
        assert_eq!(metrics.total_files, 3);
        assert_eq!(metrics.total_lines, 3);
        assert_eq!(metrics.total_bytes, 28);
        assert_eq!(metrics.files[2].estimated_tokens, 0);
        assert!(metrics.files[0].estimated_tokens > 0);
        assert_eq!(
            metrics.estimated_tokens,
            metrics.files.iter().map(|f| f.estimated_tokens).sum::<usize>()
        );
    }
}
