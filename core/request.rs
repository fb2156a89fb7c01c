//! The immutable request value handed to the packaging engine.
//!
//! Front ends build a [`PackRequest`] once, with every default already
//! resolved, and the engine only ever borrows it.

use crate::error::{AppError, Result};
use crate::patterns::split_patterns;
use byte_unit::{Byte, UnitType};
use log;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;
pub const DEFAULT_MAX_READ_SIZE: u64 = 5 * 1024 * 1024;
pub const DEFAULT_RULE_FILES: [&str; 2] = [".gitignore", ".xpackignore"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Xml,
    Markdown,
    Plain,
    Json,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Xml,
        OutputFormat::Markdown,
        OutputFormat::Plain,
        OutputFormat::Json,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Xml => "xml",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Plain => "plain",
            OutputFormat::Json => "json",
        }
    }

    /// File extension used for the default output file name.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Xml => "xml",
            OutputFormat::Markdown => "md",
            OutputFormat::Plain => "txt",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "xml" => Ok(OutputFormat::Xml),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "plain" | "text" | "txt" => Ok(OutputFormat::Plain),
            "json" => Ok(OutputFormat::Json),
            other => Err(AppError::InvalidRequest(format!(
                "Unsupported output format '{}'. Use one of: xml, markdown, plain, json.",
                other
            ))),
        }
    }
}

/// Parses a human readable size such as `"1MiB"`, `"512KB"` or `"2048"`.
pub fn parse_size(value: &str) -> Result<u64> {
    let byte = Byte::from_str(value.trim()).map_err(|e| {
        AppError::SizeParse(format!(
            "Invalid size '{}': {}. Use B, KiB, MiB, KB, MB, etc.",
            value, e
        ))
    })?;
    Ok(byte.as_u64())
}

/// Formats a byte count with binary units, e.g. `1 MiB`.
pub fn format_size(bytes: u64) -> String {
    Byte::from_u64(bytes)
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackRequest {
    pub source_dir: PathBuf,
    display_name: Option<String>,
    pub include_patterns: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub use_default_patterns: bool,
    pub use_rule_files: bool,
    pub rule_file_names: Vec<String>,
    pub max_file_size: u64,
    pub max_read_size: u64,
    pub format: OutputFormat,
    pub include_summary: bool,
    pub include_directory_structure: bool,
    pub remove_comments: bool,
    pub remove_empty_lines: bool,
}

impl PackRequest {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            display_name: None,
            include_patterns: Vec::new(),
            ignore_patterns: Vec::new(),
            use_default_patterns: true,
            use_rule_files: true,
            rule_file_names: DEFAULT_RULE_FILES.iter().map(|s| s.to_string()).collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_read_size: DEFAULT_MAX_READ_SIZE,
            format: OutputFormat::default(),
            include_summary: true,
            include_directory_structure: true,
            remove_comments: false,
            remove_empty_lines: false,
        }
    }

    /// Label shown in the summary; the source directory unless overridden (e.g. by a URL).
    pub fn display_name(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.source_dir.display().to_string())
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.display_name = if name.trim().is_empty() {
            None
        } else {
            Some(name)
        };
        self
    }

    /// Adds comma-separated include patterns.
    pub fn with_include(mut self, csv: &str) -> Self {
        self.include_patterns.extend(split_patterns(csv));
        self
    }

    /// Adds comma-separated ignore patterns.
    pub fn with_ignore(mut self, csv: &str) -> Self {
        self.ignore_patterns.extend(split_patterns(csv));
        self
    }

    pub fn with_default_patterns(mut self, enabled: bool) -> Self {
        self.use_default_patterns = enabled;
        self
    }

    pub fn with_rule_files(mut self, enabled: bool) -> Self {
        self.use_rule_files = enabled;
        self
    }

    pub fn with_rule_file_names(mut self, names: Vec<String>) -> Self {
        self.rule_file_names = names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_max_read_size(mut self, bytes: u64) -> Self {
        self.max_read_size = bytes;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_summary(mut self, enabled: bool) -> Self {
        self.include_summary = enabled;
        self
    }

    pub fn with_directory_structure(mut self, enabled: bool) -> Self {
        self.include_directory_structure = enabled;
        self
    }

    pub fn with_remove_comments(mut self, enabled: bool) -> Self {
        self.remove_comments = enabled;
        self
    }

    pub fn with_remove_empty_lines(mut self, enabled: bool) -> Self {
        self.remove_empty_lines = enabled;
        self
    }

    /// Checks the request and canonicalizes the source directory.
    pub fn validate(mut self) -> Result<Self> {
        self.source_dir = canonical_source_dir(&self.source_dir)?;
        if self.max_file_size == 0 || self.max_read_size == 0 {
            return Err(AppError::InvalidRequest(
                "Size limits must be greater than 0 bytes".to_string(),
            ));
        }
        if self.use_rule_files && self.rule_file_names.iter().any(|n| n.contains('/')) {
            return Err(AppError::InvalidRequest(
                "Rule file names must be plain file names without '/'".to_string(),
            ));
        }
        log::debug!("Validated pack request for {}", self.source_dir.display());
        Ok(self)
    }
}

fn canonical_source_dir(path: &Path) -> Result<PathBuf> {
    let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref());
    let canonical = expanded.canonicalize().map_err(|e| {
        AppError::InvalidRequest(format!(
            "Source directory '{}' cannot be resolved: {}",
            expanded.display(),
            e
        ))
    })?;
    if !canonical.is_dir() {
        return Err(AppError::InvalidRequest(format!(
            "Source path '{}' is not a directory",
            canonical.display()
        )));
    }
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_resolved_at_construction() {
        let req = PackRequest::new("/tmp/project");
        assert!(req.use_default_patterns);
        assert!(req.use_rule_files);
        assert_eq!(req.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(req.max_read_size, DEFAULT_MAX_READ_SIZE);
        assert_eq!(req.format, OutputFormat::Xml);
        assert_eq!(req.rule_file_names, vec![".gitignore", ".xpackignore"]);
        assert_eq!(req.display_name(), "/tmp/project");
    }

    #[test]
    fn csv_patterns_are_split_and_trimmed() {
        let req = PackRequest::new(".")
            .with_include(" *.md , src/**/*.rs,")
            .with_ignore("target/, ,*.log");
        assert_eq!(req.include_patterns, vec!["*.md", "src/**/*.rs"]);
        assert_eq!(req.ignore_patterns, vec!["target/", "*.log"]);
    }

    #[test]
    fn display_name_override() {
        let req = PackRequest::new(".").with_display_name("https://github.com/o/r");
        assert_eq!(req.display_name(), "https://github.com/o/r");
        let req = req.with_display_name("  ");
        assert_eq!(req.display_name(), ".");
    }

    #[test]
    fn format_parsing() {
        assert_eq!("XML".parse::<OutputFormat>().unwrap(), OutputFormat::Xml);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Plain);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        let err = "yaml".parse::<OutputFormat>().unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[test]
    fn size_parsing() {
        assert_eq!(parse_size("1MiB").unwrap(), 1024 * 1024);
        assert_eq!(parse_size("512KiB").unwrap(), 512 * 1024);
        assert_eq!(parse_size("2048").unwrap(), 2048);
        assert!(matches!(
            parse_size("lots").unwrap_err(),
            AppError::SizeParse(_)
        ));
    }

    #[test]
    fn validate_rejects_missing_and_non_directory_sources() {
        let dir = tempdir().unwrap();
        let missing = PackRequest::new(dir.path().join("nope")).validate();
        assert!(matches!(missing, Err(AppError::InvalidRequest(_))));

        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        let not_dir = PackRequest::new(&file).validate();
        assert!(matches!(not_dir, Err(AppError::InvalidRequest(_))));
    }

    #[test]
    fn validate_rejects_zero_caps() {
        let dir = tempdir().unwrap();
        let req = PackRequest::new(dir.path()).with_max_file_size(0).validate();
        assert!(matches!(req, Err(AppError::InvalidRequest(_))));
    }

    #[test]
    fn validate_canonicalizes() {
        let dir = tempdir().unwrap();
        let req = PackRequest::new(dir.path()).validate().unwrap();
        assert!(req.source_dir.is_absolute());
        assert_eq!(req.source_dir, dir.path().canonicalize().unwrap());
    }
}
