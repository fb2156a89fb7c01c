use crate::error::{AppError, Result};
use crate::request::{DEFAULT_RULE_FILES, OutputFormat, PackRequest, parse_size};
use log;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_DIR: &str = ".xtools/xpack";
pub const DEFAULT_CONFIG_FILENAME: &str = "xpack.toml";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub ignore: IgnoreConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Label shown as the source in the summary; defaults to the directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct FiltersConfig {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub ignore: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IgnoreConfig {
    #[serde(default = "default_true")]
    pub use_default_patterns: bool,
    #[serde(default = "default_true")]
    pub use_rule_files: bool,
    #[serde(default = "default_rule_files")]
    pub rule_files: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: String,
    #[serde(default = "default_max_read_size")]
    pub max_read_size: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub summary: bool,
    #[serde(default = "default_true")]
    pub directory_structure: bool,
    #[serde(default)]
    pub remove_comments: bool,
    #[serde(default)]
    pub remove_empty_lines: bool,
    #[serde(default)]
    pub copy_to_clipboard: bool,
}

fn default_true() -> bool {
    true
}
fn default_rule_files() -> Vec<String> {
    DEFAULT_RULE_FILES.iter().map(|s| s.to_string()).collect()
}
fn default_max_file_size() -> String {
    "1MiB".to_string()
}
fn default_max_read_size() -> String {
    "5MiB".to_string()
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            use_default_patterns: default_true(),
            use_rule_files: default_true(),
            rule_files: default_rule_files(),
        }
    }
}
impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_read_size: default_max_read_size(),
        }
    }
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            file_path: None,
            summary: default_true(),
            directory_structure: default_true(),
            remove_comments: false,
            remove_empty_lines: false,
            copy_to_clipboard: false,
        }
    }
}

impl Config {
    pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
        let path_str_opt = cli_project_root
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env::var("PROJECT_ROOT").ok().filter(|s| !s.is_empty()));

        let path_to_resolve = match path_str_opt {
            Some(p_str) => PathBuf::from(shellexpand::tilde(&p_str).as_ref()),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        path_to_resolve.canonicalize().map_err(|e| {
            AppError::InvalidRequest(format!(
                "Failed to resolve source directory '{}': {}",
                path_to_resolve.display(),
                e
            ))
        })
    }

    /// Finds the configuration file to load, if any.
    ///
    /// `cli_config_file` may be a path, or a bare name looked up in
    /// `<root>/.xtools/xpack/` (`.toml` is appended when missing).
    pub fn resolve_config_path(
        project_root: &Path,
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        let Some(p_str) = cli_config_file else {
            let default_path = Self::default_path(project_root);
            if default_path.exists() {
                log::debug!("Using default config file path: {}", default_path.display());
                return Ok(Some(default_path));
            }
            log::debug!(
                "No config file specified and default not found at: {}",
                default_path.display()
            );
            return Ok(None);
        };

        let mut path = PathBuf::from(shellexpand::tilde(p_str).as_ref());
        let looks_like_path =
            path.is_absolute() || path.components().count() > 1 || p_str.contains(['/', '\\']);

        if looks_like_path {
            if !path.exists() && path.extension().is_none() {
                path.set_extension("toml");
            }
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "Specified config file not found at path: {}",
                    path.display()
                )));
            }
            log::debug!("Using specified config file path: {}", path.display());
            return Ok(Some(path));
        }

        let filename = if path.extension().is_none_or(|e| e != "toml") {
            format!("{}.toml", path.to_string_lossy())
        } else {
            path.to_string_lossy().to_string()
        };
        let config_dir = project_root.join(DEFAULT_CONFIG_DIR);
        let full_path = config_dir.join(filename);
        if !full_path.exists() {
            return Err(AppError::Config(format!(
                "Specified config file '{}' not found in default directory: {}",
                path.display(),
                config_dir.display()
            )));
        }
        log::debug!(
            "Using specified config filename in default directory: {}",
            full_path.display()
        );
        Ok(Some(full_path))
    }

    pub fn default_path(project_root: &Path) -> PathBuf {
        project_root
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILENAME)
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&toml_content).map_err(|e| {
            AppError::TomlParse(format!(
                "Error parsing config file '{}': {}. Check TOML syntax and structure.",
                config_path.display(),
                e
            ))
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str::<Config>(content)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the configuration to `path`, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        log::info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Resolves the configuration into the request handed to the engine.
    pub fn to_request(&self, source_dir: impl Into<PathBuf>) -> Result<PackRequest> {
        let mut request = PackRequest::new(source_dir)
            .with_default_patterns(self.ignore.use_default_patterns)
            .with_rule_files(self.ignore.use_rule_files)
            .with_rule_file_names(self.ignore.rule_files.clone())
            .with_max_file_size(parse_size(&self.limits.max_file_size)?)
            .with_max_read_size(parse_size(&self.limits.max_read_size)?)
            .with_format(self.output.format)
            .with_summary(self.output.summary)
            .with_directory_structure(self.output.directory_structure)
            .with_remove_comments(self.output.remove_comments)
            .with_remove_empty_lines(self.output.remove_empty_lines);
        for pattern in &self.filters.include {
            request = request.with_include(pattern);
        }
        for pattern in &self.filters.ignore {
            request = request.with_ignore(pattern);
        }
        if let Some(name) = &self.general.display_name {
            request = request.with_display_name(name.clone());
        }
        Ok(request)
    }
}
