//! Serializers for the packed document.
//!
//! All encodings carry the same information in the same order: summary,
//! directory structure, ignore patterns, files. Only the timestamp inside the
//! summary may differ between two renders of the same context.

use crate::context::{FileSummary, PackContext};
use crate::error::{AppError, Result};
use crate::request::OutputFormat;
use crate::rules::IgnoreReport;
use log;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use std::fmt::Write as _;
use std::io::Cursor;
use std::path::Path;

const NONE_NOTE: &str = "(none)";
const BANNER: &str = "================================================================";
const FILE_BANNER: &str = "================";

pub fn render(ctx: &PackContext, format: OutputFormat) -> Result<String> {
    log::debug!("Rendering {} document with {} files", format, ctx.files.len());
    match format {
        OutputFormat::Xml => render_xml(ctx),
        OutputFormat::Markdown => Ok(render_markdown(ctx)),
        OutputFormat::Plain => Ok(render_plain(ctx)),
        OutputFormat::Json => render_json(ctx),
    }
}

fn pattern_buckets(report: &IgnoreReport) -> [(&'static str, &'static str, &[String]); 3] {
    [
        (
            "default_patterns",
            "Default Patterns",
            report.default_patterns.as_slice(),
        ),
        (
            "caller_patterns",
            "Caller Patterns",
            report.caller_patterns.as_slice(),
        ),
        (
            "rule_file_patterns",
            "Rule File Patterns",
            report.rule_file_patterns.as_slice(),
        ),
    ]
}

// ---------------------------------------------------------------- XML

struct XmlOut {
    writer: Writer<Cursor<Vec<u8>>>,
}

fn xml_err(e: impl std::fmt::Display) -> AppError {
    AppError::XmlSerialize(e.to_string())
}

impl XmlOut {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2),
        }
    }

    fn start(&mut self, name: &str) -> Result<()> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(xml_err)
    }

    fn start_with(&mut self, name: &str, attr: (&str, &str)) -> Result<()> {
        let mut element = BytesStart::new(name);
        element.push_attribute(attr);
        self.writer
            .write_event(Event::Start(element))
            .map_err(xml_err)
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_err)
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.start(name)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_err)?;
        self.end(name)
    }

    fn cdata(&mut self, content: &str) -> Result<()> {
        for section in cdata_sections(content) {
            self.writer
                .write_event(Event::CData(BytesCData::new(section)))
                .map_err(xml_err)?;
        }
        Ok(())
    }

    fn finish(self) -> Result<String> {
        let mut bytes = self.writer.into_inner().into_inner();
        bytes.push(b'\n');
        String::from_utf8(bytes).map_err(xml_err)
    }
}

/// Splits content so that no section contains `]]>`.
///
/// Concatenating the sections gives back the original text; each `]]>` ends
/// up as `]]` closing one section and `>` opening the next.
pub fn cdata_sections(content: &str) -> Vec<String> {
    let parts: Vec<&str> = content.split("]]>").collect();
    let last = parts.len() - 1;
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let mut section = String::with_capacity(part.len() + 3);
            if i > 0 {
                section.push('>');
            }
            section.push_str(part);
            if i < last {
                section.push_str("]]");
            }
            section
        })
        .collect()
}

fn render_xml(ctx: &PackContext) -> Result<String> {
    let mut out = XmlOut::new();
    out.start("xpack")?;

    if let Some(summary) = &ctx.summary {
        out.start("file_summary")?;
        out.text_element("source", &summary.source)?;
        out.text_element("intro", &summary.intro)?;
        out.text_element("purpose", &summary.purpose)?;
        out.text_element("file_format", &summary.file_format)?;
        out.start("usage_guidelines")?;
        for guideline in &summary.usage_guidelines {
            out.text_element("guideline", guideline)?;
        }
        out.end("usage_guidelines")?;
        out.start("notes")?;
        for note in &summary.notes {
            out.text_element("note", note)?;
        }
        out.end("notes")?;
        out.text_element("generated_at", &summary.timestamp())?;
        out.end("file_summary")?;
    }

    if let Some(structure) = &ctx.directory_structure {
        out.start("directory_structure")?;
        out.cdata(structure)?;
        out.end("directory_structure")?;
    }

    out.start("ignore_patterns")?;
    for (tag, _, patterns) in pattern_buckets(&ctx.ignore_patterns) {
        if patterns.is_empty() {
            out.text_element(tag, NONE_NOTE)?;
            continue;
        }
        out.start(tag)?;
        for pattern in patterns {
            out.text_element("pattern", pattern)?;
        }
        out.end(tag)?;
    }
    out.end("ignore_patterns")?;

    out.start("files")?;
    for file in &ctx.files {
        out.start_with("file", ("path", file.path.as_str()))?;
        out.cdata(&file.content)?;
        out.end("file")?;
    }
    out.end("files")?;

    out.end("xpack")?;
    out.finish()
}

// ---------------------------------------------------------------- Markdown

/// A backtick fence longer than any backtick run inside `content`, at least three long.
pub fn fence_for(content: &str) -> String {
    "`".repeat((longest_backtick_run(content) + 1).max(3))
}

/// Inline code span whose delimiter is longer than any backtick run inside `text`.
fn inline_code(text: &str) -> String {
    let ticks = "`".repeat(longest_backtick_run(text) + 1);
    format!("{} {} {}", ticks, text, ticks)
}

fn longest_backtick_run(content: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in content.chars() {
        if ch == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Code fence language hint derived from the file extension.
pub fn language_hint(path: &str) -> &str {
    let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) else {
        return "";
    };
    match ext {
        "rs" => "rust",
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "tsx",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "jsx",
        "py" | "pyi" => "python",
        "rb" => "ruby",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hh" | "hpp" | "hxx" => "cpp",
        "cs" => "csharp",
        "swift" => "swift",
        "sh" | "bash" | "zsh" => "bash",
        "md" | "markdown" => "markdown",
        "yml" | "yaml" => "yaml",
        "json" => "json",
        "toml" => "toml",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "sql" => "sql",
        "lua" => "lua",
        "xml" => "xml",
        other => other,
    }
}

fn push_fenced(out: &mut String, language: &str, content: &str) {
    let fence = fence_for(content);
    let _ = writeln!(out, "{}{}", fence, language);
    out.push_str(content);
    if !content.is_empty() && !content.ends_with('\n') {
        out.push('\n');
    }
    let _ = writeln!(out, "{}", fence);
}

fn push_list(out: &mut String, items: &[String]) {
    for item in items {
        let _ = writeln!(out, "- {}", item);
    }
}

fn markdown_summary(out: &mut String, summary: &FileSummary) {
    out.push_str("# File Summary\n\n");
    let _ = writeln!(out, "Source: {}\n", summary.source);
    let _ = writeln!(out, "{}\n", summary.intro);
    let _ = writeln!(out, "## Purpose\n\n{}\n", summary.purpose);
    let _ = writeln!(out, "## File Format\n\n{}\n", summary.file_format);
    out.push_str("## Usage Guidelines\n\n");
    push_list(out, &summary.usage_guidelines);
    out.push_str("\n## Notes\n\n");
    push_list(out, &summary.notes);
    let _ = writeln!(out, "\nGenerated: {}\n", summary.timestamp());
}

fn render_markdown(ctx: &PackContext) -> String {
    let mut out = String::new();
    if let Some(summary) = &ctx.summary {
        markdown_summary(&mut out, summary);
    }

    if let Some(structure) = &ctx.directory_structure {
        out.push_str("# Directory Structure\n\n");
        push_fenced(&mut out, "", structure);
        out.push('\n');
    }

    out.push_str("# Ignore Patterns\n\n");
    for (_, title, patterns) in pattern_buckets(&ctx.ignore_patterns) {
        let _ = writeln!(out, "## {}\n", title);
        if patterns.is_empty() {
            let _ = writeln!(out, "{}", NONE_NOTE);
        }
        for pattern in patterns {
            let _ = writeln!(out, "- {}", inline_code(pattern));
        }
        out.push('\n');
    }

    out.push_str("# Files\n");
    for file in &ctx.files {
        let _ = writeln!(out, "\n## File: {}\n", file.path);
        push_fenced(&mut out, language_hint(&file.path), &file.content);
    }
    out
}

// ---------------------------------------------------------------- Plain text

fn plain_banner(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}\n{}\n{}", BANNER, title, BANNER);
}

fn push_verbatim(out: &mut String, content: &str) {
    out.push_str(content);
    if !content.is_empty() && !content.ends_with('\n') {
        out.push('\n');
    }
}

fn render_plain(ctx: &PackContext) -> String {
    let mut out = String::new();
    if let Some(summary) = &ctx.summary {
        plain_banner(&mut out, "File Summary");
        let _ = writeln!(out, "Source: {}\n", summary.source);
        let _ = writeln!(out, "{}\n", summary.intro);
        let _ = writeln!(out, "Purpose:\n{}\n", summary.purpose);
        let _ = writeln!(out, "File Format:\n{}\n", summary.file_format);
        out.push_str("Usage Guidelines:\n");
        push_list(&mut out, &summary.usage_guidelines);
        out.push_str("\nNotes:\n");
        push_list(&mut out, &summary.notes);
        let _ = writeln!(out, "\nGenerated: {}\n", summary.timestamp());
    }

    if let Some(structure) = &ctx.directory_structure {
        plain_banner(&mut out, "Directory Structure");
        push_verbatim(&mut out, structure);
        out.push('\n');
    }

    plain_banner(&mut out, "Ignore Patterns");
    for (_, title, patterns) in pattern_buckets(&ctx.ignore_patterns) {
        let _ = writeln!(out, "{}:", title);
        if patterns.is_empty() {
            let _ = writeln!(out, "  {}", NONE_NOTE);
        }
        for pattern in patterns {
            let _ = writeln!(out, "- {}", pattern);
        }
        out.push('\n');
    }

    plain_banner(&mut out, "Files");
    for file in &ctx.files {
        let _ = writeln!(out, "\n{}\nFile: {}\n{}", FILE_BANNER, file.path, FILE_BANNER);
        push_verbatim(&mut out, &file.content);
    }
    out
}

// ---------------------------------------------------------------- JSON

fn render_json(ctx: &PackContext) -> Result<String> {
    let mut json = serde_json::to_string_pretty(ctx)?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ProcessedFile;
    use crate::request::PackRequest;
    use chrono::{TimeZone, Utc};

    fn context(files: &[(&str, &str)]) -> PackContext {
        let files = files
            .iter()
            .map(|(path, content)| ProcessedFile {
                path: path.to_string(),
                content: content.to_string(),
            })
            .collect();
        let report = IgnoreReport {
            default_patterns: vec!["node_modules/".to_string()],
            caller_patterns: Vec::new(),
            rule_file_patterns: vec!["logs/*.tmp".to_string()],
        };
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        PackContext::build(&PackRequest::new("/repo"), report, files, at).unwrap()
    }

    #[test]
    fn cdata_sections_never_contain_terminator() {
        assert_eq!(cdata_sections("plain"), vec!["plain"]);
        assert_eq!(cdata_sections(""), vec![""]);
        let sections = cdata_sections("a]]>b]]>");
        assert_eq!(sections, vec!["a]]", ">b]]", ">"]);
        assert!(sections.iter().all(|s| !s.contains("]]>")));
        assert_eq!(sections.concat(), "a]]>b]]>");
    }

    #[test]
    fn xml_embeds_content_in_cdata() {
        let ctx = context(&[("src/a.ts", "if (a < b && c]]>d) {}\n")]);
        let xml = render(&ctx, OutputFormat::Xml).unwrap();
        assert!(xml.starts_with("<xpack>"));
        assert!(xml.contains("<file path=\"src/a.ts\"><![CDATA[if (a < b && c]]]]><![CDATA[>d) {}\n]]></file>"));
        assert!(xml.contains("<pattern>node_modules/</pattern>"));
        assert!(xml.contains("<caller_patterns>(none)</caller_patterns>"));
        assert!(xml.contains("<generated_at>2025-06-01T12:00:00Z</generated_at>"));
        let summary = xml.find("<file_summary>").unwrap();
        let tree = xml.find("<directory_structure>").unwrap();
        let ignores = xml.find("<ignore_patterns>").unwrap();
        let files = xml.find("<files>").unwrap();
        assert!(summary < tree && tree < ignores && ignores < files);
    }

    #[test]
    fn markdown_fence_outgrows_content_backticks() {
        assert_eq!(fence_for("no ticks"), "```");
        assert_eq!(fence_for("a ``` b"), "````");
        assert_eq!(fence_for("`````"), "``````");

        let ctx = context(&[("README.md", "```rust\nfn a() {}\n```\n"), ("lib.rs", "x")]);
        let md = render(&ctx, OutputFormat::Markdown).unwrap();
        assert!(md.contains("## File: README.md\n\n````markdown\n```rust\nfn a() {}\n```\n````\n"));
        assert!(md.contains("## File: lib.rs\n\n```rust\nx\n```\n"));
        assert!(md.contains("## Caller Patterns\n\n(none)\n"));
        assert!(md.contains("- ` logs/*.tmp `"));
    }

    #[test]
    fn inline_pattern_spans_outgrow_pattern_backticks() {
        assert_eq!(inline_code("*.tmp"), "` *.tmp `");
        assert_eq!(inline_code("a`b"), "`` a`b ``");
        assert_eq!(inline_code("x```y"), "```` x```y ````");

        let report = IgnoreReport {
            default_patterns: Vec::new(),
            caller_patterns: vec!["we`ird``name".to_string()],
            rule_file_patterns: Vec::new(),
        };
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let ctx = PackContext::build(&PackRequest::new("/repo"), report, Vec::new(), at).unwrap();
        let md = render(&ctx, OutputFormat::Markdown).unwrap();
        assert!(md.contains("## Caller Patterns\n\n- ``` we`ird``name ```\n"));
    }

    #[test]
    fn plain_uses_file_banners() {
        let ctx = context(&[("a.txt", "alpha")]);
        let text = render(&ctx, OutputFormat::Plain).unwrap();
        assert!(text.contains(&format!(
            "{}\nFile: a.txt\n{}\nalpha\n",
            FILE_BANNER, FILE_BANNER
        )));
        assert!(text.contains("Caller Patterns:\n  (none)\n"));
        assert!(text.find("Directory Structure").unwrap() < text.find("Ignore Patterns").unwrap());
    }

    #[test]
    fn json_carries_every_section() {
        let ctx = context(&[("a.txt", "alpha")]);
        let json = render(&ctx, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["files"][0]["path"], "a.txt");
        assert_eq!(value["files"][0]["content"], "alpha");
        assert_eq!(value["directoryStructure"], "a.txt\n");
        assert_eq!(value["ignorePatterns"]["ruleFilePatterns"][0], "logs/*.tmp");
        assert_eq!(value["fileSummary"]["source"], "/repo");
    }

    #[test]
    fn rendering_is_deterministic() {
        let files = [("b/c.rs", "fn c() {}"), ("a.md", "# A")];
        for format in OutputFormat::ALL {
            let first = render(&context(&files), format).unwrap();
            let second = render(&context(&files), format).unwrap();
            assert_eq!(first, second, "{}", format);
        }
    }

    #[test]
    fn empty_context_is_well_formed() {
        let ctx = context(&[]);
        let xml = render(&ctx, OutputFormat::Xml).unwrap();
        assert!(xml.contains("<files>"));
        assert!(xml.trim_end().ends_with("</xpack>"));
        let json: serde_json::Value =
            serde_json::from_str(&render(&ctx, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["files"].as_array().unwrap().len(), 0);
        assert_eq!(json["directoryStructure"], "");
    }
}
