use crate::error::CliError;
use log;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const ALLOWED_SCHEMES: [&str; 4] = ["https://", "git@", "ssh://", "file://"];

/// A shallow clone living in a temporary directory.
///
/// The directory is removed when the guard is dropped, whether packing
/// succeeded or not.
#[derive(Debug)]
pub struct ClonedRepo {
    path: PathBuf,
    /// The URL as the user typed it; used as the display name of the source.
    pub url: String,
    _temp_dir: TempDir,
}

impl ClonedRepo {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Expands `owner/repo` to a GitHub URL and checks the scheme of anything else.
pub fn resolve_url(input: &str) -> Result<String, CliError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::InvalidUrl("URL is empty".to_string()));
    }
    if ALLOWED_SCHEMES.iter().any(|s| input.starts_with(s)) {
        return Ok(input.to_string());
    }
    if is_shorthand(input) {
        let url = format!("https://github.com/{}.git", input.trim_end_matches(".git"));
        log::debug!("Expanded shorthand '{}' to {}", input, url);
        return Ok(url);
    }
    Err(CliError::InvalidUrl(format!(
        "'{}' must start with https://, git@, ssh://, file:// or be owner/repo",
        input
    )))
}

fn is_shorthand(input: &str) -> bool {
    let mut parts = input.split('/');
    let (Some(owner), Some(repo), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    let valid = |s: &str| {
        !s.is_empty()
            && !s.starts_with('.')
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    valid(owner) && valid(repo)
}

/// Clones `url` with depth 1 into a fresh temporary directory.
pub fn clone_repo(url: &str, branch: Option<&str>) -> Result<ClonedRepo, CliError> {
    let clone_url = resolve_url(url)?;
    Command::new("git")
        .arg("--version")
        .output()
        .map_err(|_| CliError::GitNotFound)?;

    let temp_dir = TempDir::new().map_err(|e| CliError::TempDir(e.to_string()))?;
    let path = temp_dir.path().join("repo");

    let mut cmd = Command::new("git");
    cmd.env("GIT_TEMPLATE_DIR", "")
        .env("GIT_TERMINAL_PROMPT", "0")
        .args([
            "clone",
            "--depth",
            "1",
            "--single-branch",
            "--no-tags",
            "-c",
            "core.hooksPath=/dev/null",
            "-c",
            "advice.detachedHead=false",
        ]);
    if let Some(branch) = branch.map(str::trim).filter(|b| !b.is_empty()) {
        cmd.args(["--branch", branch]);
    }
    cmd.arg(&clone_url).arg(&path);

    log::info!("Cloning {} into {}", clone_url, path.display());
    let output = cmd.output().map_err(|e| CliError::CloneFailed {
        url: clone_url.clone(),
        message: e.to_string(),
    })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CliError::CloneFailed {
            url: clone_url,
            message: stderr.trim().to_string(),
        });
    }

    Ok(ClonedRepo {
        path,
        url: url.trim().to_string(),
        _temp_dir: temp_dir,
    })
}
