use crate::assets::{self, SummaryText};
use crate::content::ProcessedFile;
use crate::error::Result;
use crate::request::{OutputFormat, PackRequest, format_size};
use crate::rules::IgnoreReport;
use crate::tree::{TreeNode, build_tree, render_tree};
use chrono::{DateTime, SecondsFormat, Utc};
use log;
use serde::Serialize;

/// The summary section that opens every packed document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub source: String,
    pub intro: String,
    pub purpose: String,
    pub file_format: String,
    pub usage_guidelines: Vec<String>,
    pub notes: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl FileSummary {
    pub fn timestamp(&self) -> String {
        self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Everything a serializer needs, assembled once per run and consumed once.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackContext {
    #[serde(rename = "fileSummary", skip_serializing_if = "Option::is_none")]
    pub summary: Option<FileSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_structure: Option<String>,
    #[serde(skip)]
    pub tree: Option<TreeNode>,
    pub ignore_patterns: IgnoreReport,
    pub files: Vec<ProcessedFile>,
}

impl PackContext {
    pub fn build(
        request: &PackRequest,
        ignore_patterns: IgnoreReport,
        files: Vec<ProcessedFile>,
        generated_at: DateTime<Utc>,
    ) -> Result<Self> {
        log::debug!("Building pack context for {} files...", files.len());

        let summary = if request.include_summary {
            Some(build_summary(request, assets::summary_text()?, generated_at))
        } else {
            log::trace!("Summary section disabled.");
            None
        };

        let tree = if request.include_directory_structure {
            let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
            Some(build_tree(&paths))
        } else {
            log::trace!("Directory structure section disabled.");
            None
        };

        Ok(PackContext {
            summary,
            directory_structure: tree.as_ref().map(render_tree),
            tree,
            ignore_patterns,
            files,
        })
    }

    pub fn total_chars(&self) -> usize {
        self.files.iter().map(ProcessedFile::char_count).sum()
    }
}

fn format_description(text: &SummaryText, format: OutputFormat) -> String {
    match format {
        OutputFormat::Xml => text.format.xml.clone(),
        OutputFormat::Markdown => text.format.markdown.clone(),
        OutputFormat::Plain => text.format.plain.clone(),
        OutputFormat::Json => text.format.json.clone(),
    }
}

/// Notes describing every processing rule that applied to this run.
pub fn processing_notes(request: &PackRequest, text: &SummaryText) -> Vec<String> {
    let notes = &text.notes;
    let mut out: Vec<String> = Vec::new();
    if request.use_rule_files {
        out.extend(notes.always.iter().cloned());
    } else {
        out.extend(notes.always.iter().skip(1).cloned());
        out.push(notes.rule_files_disabled.clone());
    }
    if request.use_default_patterns {
        out.push(notes.default_patterns.clone());
    }
    if !request.ignore_patterns.is_empty() {
        out.push(
            notes
                .caller_patterns
                .replace("{patterns}", &request.ignore_patterns.join(", ")),
        );
    }
    if !request.include_patterns.is_empty() {
        out.push(
            notes
                .include_patterns
                .replace("{patterns}", &request.include_patterns.join(", ")),
        );
    }
    out.push(
        notes
            .size_limit
            .replace("{size}", &format_size(request.max_file_size)),
    );
    if request.remove_comments {
        out.push(notes.comments_removed.clone());
    }
    if request.remove_empty_lines {
        out.push(notes.empty_lines_removed.clone());
    }
    out
}

fn build_summary(
    request: &PackRequest,
    text: &SummaryText,
    generated_at: DateTime<Utc>,
) -> FileSummary {
    FileSummary {
        source: request.display_name(),
        intro: text.intro.clone(),
        purpose: text.purpose.clone(),
        file_format: format_description(text, request.format),
        usage_guidelines: text.usage_guidelines.clone(),
        notes: processing_notes(request, text),
        generated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn file(path: &str, content: &str) -> ProcessedFile {
        ProcessedFile {
            path: path.to_string(),
            content: content.to_string(),
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn notes_follow_request_flags() {
        let text = assets::summary_text().unwrap();
        let request = PackRequest::new("/src")
            .with_ignore("*.snap")
            .with_include("*.rs")
            .with_remove_comments(true)
            .with_rule_files(false)
            .with_default_patterns(false);
        let notes = processing_notes(&request, text);
        assert!(notes.contains(&text.notes.rule_files_disabled));
        assert!(!notes.contains(&text.notes.default_patterns));
        assert!(notes.iter().any(|n| n.contains("*.snap")));
        assert!(notes.iter().any(|n| n.contains("*.rs")));
        assert!(notes.iter().any(|n| n.contains("1 MiB")));
        assert!(notes.contains(&text.notes.comments_removed));
        assert!(!notes.contains(&text.notes.empty_lines_removed));
    }

    #[test]
    fn sections_follow_request() {
        let files = vec![file("src/b.rs", "b"), file("a.txt", "a")];
        let request = PackRequest::new("/src").with_display_name("demo");
        let ctx =
            PackContext::build(&request, IgnoreReport::default(), files.clone(), fixed_time())
                .unwrap();
        let summary = ctx.summary.as_ref().unwrap();
        assert_eq!(summary.source, "demo");
        assert_eq!(summary.timestamp(), "2025-01-02T03:04:05Z");
        assert_eq!(ctx.directory_structure.as_deref(), Some("src/\n  b.rs\na.txt\n"));
        assert_eq!(ctx.total_chars(), 2);

        let bare = PackContext::build(
            &request.with_summary(false).with_directory_structure(false),
            IgnoreReport::default(),
            files,
            fixed_time(),
        )
        .unwrap();
        assert!(bare.summary.is_none());
        assert!(bare.directory_structure.is_none());
        assert!(bare.tree.is_none());
    }

    #[test]
    fn empty_file_set_has_empty_structure() {
        let ctx = PackContext::build(
            &PackRequest::new("/src"),
            IgnoreReport::default(),
            Vec::new(),
            fixed_time(),
        )
        .unwrap();
        assert_eq!(ctx.directory_structure.as_deref(), Some(""));
        assert!(ctx.files.is_empty());
    }
}
