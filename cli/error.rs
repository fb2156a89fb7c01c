use std::path::PathBuf;
use thiserror::Error;

/// Failures that only the front end can hit; core failures stay `AppError`.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid repository URL: {0}")]
    InvalidUrl(String),

    #[error("git executable not found in PATH")]
    GitNotFound,

    #[error("Failed to clone '{url}': {message}")]
    CloneFailed { url: String, message: String },

    #[error("Temporary directory error: {0}")]
    TempDir(String),

    #[error("Failed to write output to '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Clipboard copy failed: {0}")]
    Clipboard(String),

    #[error("Token counting error: {0}")]
    Tokenizer(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidUrl(_)
            | CliError::GitNotFound
            | CliError::CloneFailed { .. }
            | CliError::TempDir(_) => 9,
            CliError::OutputWrite { .. } | CliError::Clipboard(_) => 10,
            CliError::Tokenizer(_) => 8,
        }
    }
}
