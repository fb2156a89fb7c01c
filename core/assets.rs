use crate::error::{AppError, Result};
use log;
use once_cell::sync::OnceCell;
use rust_embed::RustEmbed;
use serde::Deserialize;
use serde::de::DeserializeOwned;

#[derive(RustEmbed)]
#[folder = "../data/"]
struct DataAssets;

#[derive(Debug, Clone, Deserialize)]
pub struct DefaultIgnores {
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryText {
    pub intro: String,
    pub purpose: String,
    pub usage_guidelines: Vec<String>,
    pub notes: SummaryNotes,
    pub format: FormatDescriptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryNotes {
    pub always: Vec<String>,
    pub default_patterns: String,
    pub caller_patterns: String,
    pub include_patterns: String,
    pub size_limit: String,
    pub comments_removed: String,
    pub empty_lines_removed: String,
    pub rule_files_disabled: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormatDescriptions {
    pub xml: String,
    pub markdown: String,
    pub plain: String,
    pub json: String,
}

static DEFAULT_IGNORES: OnceCell<DefaultIgnores> = OnceCell::new();
static SUMMARY_TEXT: OnceCell<SummaryText> = OnceCell::new();

fn load_yaml<T: DeserializeOwned>(name: &str) -> Result<T> {
    log::trace!("Loading embedded data file: {}", name);
    let asset = DataAssets::get(name)
        .ok_or_else(|| AppError::DataLoading(format!("Embedded data file not found: {}", name)))?;
    let text = std::str::from_utf8(asset.data.as_ref())?;
    serde_yml::from_str(text).map_err(|e| {
        AppError::DataLoading(format!("Failed to parse embedded {}: {}", name, e))
    })
}

pub fn default_ignores() -> Result<&'static DefaultIgnores> {
    DEFAULT_IGNORES.get_or_try_init(|| load_yaml("default_ignores.yaml"))
}

pub fn summary_text() -> Result<&'static SummaryText> {
    SUMMARY_TEXT.get_or_try_init(|| load_yaml("summary.yaml"))
}
