use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("TOML Parsing Error: {0}")]
    TomlParse(String),

    #[error("TOML Serialization Error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON Serialization Error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("YAML Parsing Error: {0}")]
    YamlError(#[from] serde_yml::Error),

    #[error("XML Serialization Error: {0}")]
    XmlSerialize(String),

    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File Read Error: Path '{path}', Error: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Glob Pattern Error: {0}")]
    Glob(String),

    #[error("Size Parsing Error: {0}")]
    SizeParse(String),

    #[error("Data Loading Error: {0}")]
    DataLoading(String),

    #[error("Directory Tree Conflict: {0}")]
    TreeConflict(String),

    #[error("Worker Pool Error: {0}")]
    ThreadPool(String),
}

impl From<globset::Error> for AppError {
    fn from(err: globset::Error) -> Self {
        AppError::Glob(format!("Globset error: {}", err))
    }
}

impl From<std::str::Utf8Error> for AppError {
    fn from(err: std::str::Utf8Error) -> Self {
        AppError::DataLoading(format!("UTF-8 decoding error: {}", err))
    }
}

impl From<rayon::ThreadPoolBuildError> for AppError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        AppError::ThreadPool(err.to_string())
    }
}

impl AppError {
    /// True for errors caused by a malformed request or configuration rather than I/O.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            AppError::InvalidRequest(_)
                | AppError::Config(_)
                | AppError::TomlParse(_)
                | AppError::Glob(_)
                | AppError::SizeParse(_)
        )
    }
}
