use crate::cli_args::PackArgs;
use crate::load_config_for_command;
use crate::output;
use crate::remote::{self, ClonedRepo};
use anyhow::{Context, Result};
use colored::Colorize;
use log;
use std::env;
use std::path::{Path, PathBuf};
use xpack_core::{CollectingSink, Config, OutputFormat, PackRequest, format_size, pack};

pub fn handle_pack_command(args: PackArgs, quiet: bool) -> Result<()> {
    // Held until the end of the function; the clone is removed on every exit path.
    let cloned: Option<ClonedRepo> = match &args.remote {
        Some(url) => Some(
            remote::clone_repo(url, args.remote_branch.as_deref())
                .with_context(|| format!("Failed to acquire remote repository {}", url))?,
        ),
        None => None,
    };

    let project_root = Config::determine_project_root(args.dir.as_ref())
        .context("Failed to determine source directory")?;
    log::info!("Project root determined: {}", project_root.display());

    let config = load_config_for_command(&project_root, &args.project_config, &args.filters)
        .context("Failed to load configuration")?;
    let config = merge_pack_overrides(config, &args)?;

    let source_dir = match &cloned {
        Some(repo) => repo.path().to_path_buf(),
        None => project_root.clone(),
    };
    let mut request = config
        .to_request(&source_dir)
        .context("Failed to build pack request")?;
    if let Some(repo) = &cloned {
        if args.project_config.display_name.is_none() {
            request = request.with_display_name(repo.url.clone());
        }
    }

    let output_path = resolve_output_path(&args, &config, &project_root)?;
    if let Some(path) = &output_path {
        request = ignore_own_output(request, path);
    }

    let sink = CollectingSink::with_log_echo();
    let packed = pack(&request, &sink).context("Packing failed")?;
    output::print_diagnostics(&sink.diagnostics(), quiet);

    match &output_path {
        Some(path) => {
            output::write_to_file(path, &packed.document)?;
            if !quiet {
                println!(
                    "{} Packed {} files ({} characters, {}) into: {}",
                    "✅".green(),
                    packed.file_count.to_string().cyan(),
                    packed.total_chars,
                    format_size(packed.document.len() as u64),
                    path.display().to_string().blue()
                );
            }
        }
        None => output::write_to_stdout(&packed.document)?,
    }

    if args.copy || config.output.copy_to_clipboard {
        output::copy_to_clipboard(&packed.document)?;
        if !quiet {
            eprintln!("{} Copied to clipboard.", "📋".blue());
        }
    }
    Ok(())
}

fn merge_pack_overrides(mut config: Config, args: &PackArgs) -> Result<Config> {
    if let Some(format) = &args.format {
        config.output.format = format.parse::<OutputFormat>()?;
    }
    if args.remove_comments {
        config.output.remove_comments = true;
    }
    if args.remove_empty_lines {
        config.output.remove_empty_lines = true;
    }
    if args.no_summary {
        config.output.summary = false;
    }
    if args.no_directory_structure {
        config.output.directory_structure = false;
    }
    Ok(config)
}

/// `-o` is relative to the working directory, a configured `file_path` to the project root.
/// `--stdout` wins over both.
fn resolve_output_path(
    args: &PackArgs,
    config: &Config,
    project_root: &Path,
) -> Result<Option<PathBuf>> {
    if args.stdout {
        return Ok(None);
    }
    if let Some(path) = &args.output {
        let cwd = env::current_dir().context("Failed to read current directory")?;
        return Ok(Some(absolutize(path, &cwd)));
    }
    Ok(config
        .output
        .file_path
        .as_ref()
        .map(|path| absolutize(path, project_root)))
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref());
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

/// Adds an anchored ignore for the output file when it lies inside the
/// source tree, so a re-run never packs its own previous output.
fn ignore_own_output(mut request: PackRequest, output_path: &Path) -> PackRequest {
    let Some(rel) = relative_to_source(&request.source_dir, output_path) else {
        return request;
    };
    log::debug!("Ignoring own output file: {}", rel);
    request
        .ignore_patterns
        .push(format!("/{}", globset::escape(&rel)));
    request
}

fn relative_to_source(source_dir: &Path, output_path: &Path) -> Option<String> {
    let source = source_dir
        .canonicalize()
        .unwrap_or_else(|_| source_dir.to_path_buf());
    let name = output_path.file_name()?;
    let parent = output_path.parent()?;
    let parent = parent
        .canonicalize()
        .unwrap_or_else(|_| parent.to_path_buf());
    let rel = parent.join(name).strip_prefix(&source).ok()?.to_path_buf();
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}
