//! Content loading and transformation.
//!
//! Every discovered path goes through the same ordered pipeline:
//! [`read_bytes`] then [`decode_text`] then the enabled [`ContentFilter`]s.
//! A stage failure drops the file with a diagnostic; it never aborts the run.

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::Result;
use crate::request::PackRequest;
use log;
use rayon::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

/// Upper bound for the read pool, whatever the machine offers.
pub const MAX_READ_THREADS: usize = 12;

/// A file that survived filtering and was read, decoded and transformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedFile {
    /// Forward-slash path relative to the source root.
    pub path: String,
    pub content: String,
}

impl ProcessedFile {
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

type StageResult<T> = std::result::Result<T, Diagnostic>;

/// Reads a file, enforcing `max_read_size` both on the stat and on the bytes actually read.
pub fn read_bytes(path: &Path, rel_path: &str, max_read_size: u64) -> StageResult<Vec<u8>> {
    let access_failed =
        |e: std::io::Error| Diagnostic::new(DiagnosticKind::FileAccess, rel_path, e.to_string());
    let too_large = |size: u64| {
        Diagnostic::new(
            DiagnosticKind::SizeLimit,
            rel_path,
            format!(
                "{} bytes exceeds the {} byte read limit",
                size, max_read_size
            ),
        )
    };

    let size = fs::metadata(path).map_err(access_failed)?.len();
    if size > max_read_size {
        return Err(too_large(size));
    }

    // The file may have grown since the stat; never read past the cap.
    let mut bytes = Vec::with_capacity(size as usize);
    File::open(path)
        .and_then(|file| file.take(max_read_size.saturating_add(1)).read_to_end(&mut bytes))
        .map_err(access_failed)?;
    if bytes.len() as u64 > max_read_size {
        return Err(too_large(bytes.len() as u64));
    }
    Ok(bytes)
}

/// Decodes strict UTF-8, dropping a leading byte-order mark.
pub fn decode_text(rel_path: &str, bytes: Vec<u8>) -> StageResult<String> {
    let text = String::from_utf8(bytes).map_err(|e| {
        Diagnostic::new(
            DiagnosticKind::Decode,
            rel_path,
            format!("not valid UTF-8: {}", e.utf8_error()),
        )
    })?;
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => Ok(stripped.to_string()),
        None => Ok(text),
    }
}

/// A text transformation applied to decoded file content.
///
/// Implementations must be idempotent.
pub trait ContentFilter: Send + Sync {
    fn apply(&self, rel_path: &str, content: &str) -> String;
    fn name(&self) -> &'static str;
}

pub struct RemoveCommentsFilter;

impl ContentFilter for RemoveCommentsFilter {
    fn apply(&self, rel_path: &str, content: &str) -> String {
        strip_comments(rel_path, content)
    }

    fn name(&self) -> &'static str {
        "remove-comments"
    }
}

pub struct RemoveEmptyLinesFilter;

impl ContentFilter for RemoveEmptyLinesFilter {
    fn apply(&self, _rel_path: &str, content: &str) -> String {
        strip_empty_lines(content)
    }

    fn name(&self) -> &'static str {
        "remove-empty-lines"
    }
}

/// The filters enabled by `request`, in pipeline order.
pub fn filters_for(request: &PackRequest) -> Vec<Box<dyn ContentFilter>> {
    let mut filters: Vec<Box<dyn ContentFilter>> = Vec::new();
    if request.remove_comments {
        filters.push(Box::new(RemoveCommentsFilter));
    }
    if request.remove_empty_lines {
        filters.push(Box::new(RemoveEmptyLinesFilter));
    }
    filters
}

/// Removes lines made only of whitespace, keeping every other line ending as is.
pub fn strip_empty_lines(content: &str) -> String {
    content
        .split_inclusive('\n')
        .filter(|line| !line.trim().is_empty())
        .collect()
}

struct CommentStyle {
    line: &'static [&'static str],
    block: Option<(&'static str, &'static str)>,
    quotes: &'static [char],
    /// `'x'` is a character literal, any other `'` is plain text (Rust lifetimes).
    char_literals: bool,
    /// Python style `"""` and `'''` strings.
    triple_quotes: bool,
    /// Line markers only count at the start of a line or after whitespace (`$#` in shell).
    line_needs_boundary: bool,
    /// Keep a `#!` first line.
    keep_shebang: bool,
    /// Rust raw strings: `r"..."`, `r#"..."#`, `br`/`cr` prefixed.
    raw_strings: bool,
}

static C_FAMILY: CommentStyle = CommentStyle {
    line: &["//"],
    block: Some(("/*", "*/")),
    quotes: &['"', '`'],
    char_literals: true,
    triple_quotes: false,
    line_needs_boundary: false,
    keep_shebang: false,
    raw_strings: false,
};

static RUST_FAMILY: CommentStyle = CommentStyle {
    line: &["//"],
    block: Some(("/*", "*/")),
    quotes: &['"'],
    char_literals: true,
    triple_quotes: false,
    line_needs_boundary: false,
    keep_shebang: false,
    raw_strings: true,
};

static JS_FAMILY: CommentStyle = CommentStyle {
    line: &["//"],
    block: Some(("/*", "*/")),
    quotes: &['"', '\'', '`'],
    char_literals: false,
    triple_quotes: false,
    line_needs_boundary: false,
    keep_shebang: true,
    raw_strings: false,
};

static CSS_FAMILY: CommentStyle = CommentStyle {
    line: &[],
    block: Some(("/*", "*/")),
    quotes: &['"', '\''],
    char_literals: false,
    triple_quotes: false,
    line_needs_boundary: false,
    keep_shebang: false,
    raw_strings: false,
};

static HASH_FAMILY: CommentStyle = CommentStyle {
    line: &["#"],
    block: None,
    quotes: &['"', '\''],
    char_literals: false,
    triple_quotes: true,
    line_needs_boundary: true,
    keep_shebang: true,
    raw_strings: false,
};

static SQL_FAMILY: CommentStyle = CommentStyle {
    line: &["--"],
    block: Some(("/*", "*/")),
    quotes: &['\'', '"'],
    char_literals: false,
    triple_quotes: false,
    line_needs_boundary: false,
    keep_shebang: false,
    raw_strings: false,
};

static LUA_FAMILY: CommentStyle = CommentStyle {
    line: &["--"],
    block: Some(("--[[", "]]")),
    quotes: &['"', '\''],
    char_literals: false,
    triple_quotes: false,
    line_needs_boundary: false,
    keep_shebang: true,
    raw_strings: false,
};

static HASKELL_FAMILY: CommentStyle = CommentStyle {
    line: &["--"],
    block: Some(("{-", "-}")),
    quotes: &['"'],
    char_literals: true,
    triple_quotes: false,
    line_needs_boundary: false,
    keep_shebang: false,
    raw_strings: false,
};

static MARKUP_FAMILY: CommentStyle = CommentStyle {
    line: &[],
    block: Some(("<!--", "-->")),
    quotes: &[],
    char_literals: false,
    triple_quotes: false,
    line_needs_boundary: false,
    keep_shebang: false,
    raw_strings: false,
};

fn comment_style(rel_path: &str) -> Option<&'static CommentStyle> {
    let path = Path::new(rel_path);
    let file_name = path.file_name()?.to_string_lossy();
    match file_name.as_ref() {
        "Makefile" | "makefile" | "Dockerfile" | "Containerfile" | "CMakeLists.txt" => {
            return Some(&HASH_FAMILY);
        }
        _ => {}
    }
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    let style = match ext.as_str() {
        "rs" => &RUST_FAMILY,
        "c" | "h" | "cc" | "cpp" | "cxx" | "hh" | "hpp" | "hxx" | "java" | "cs" | "go"
        | "kt" | "kts" | "scala" | "swift" | "proto" | "zig" => &C_FAMILY,
        "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" | "mts" | "cts" | "dart" | "groovy"
        | "gradle" => &JS_FAMILY,
        "css" | "scss" | "sass" | "less" => &CSS_FAMILY,
        "py" | "pyi" | "sh" | "bash" | "zsh" | "fish" | "rb" | "pl" | "pm" | "r" | "yaml"
        | "yml" | "toml" | "ps1" | "cmake" | "nim" | "ex" | "exs" | "tf" | "mk" | "jl" => {
            &HASH_FAMILY
        }
        "sql" => &SQL_FAMILY,
        "lua" => &LUA_FAMILY,
        "hs" | "elm" => &HASKELL_FAMILY,
        "html" | "htm" | "xml" | "xhtml" | "svg" | "vue" | "svelte" => &MARKUP_FAMILY,
        _ => return None,
    };
    Some(style)
}

/// Strips comments using the syntax family chosen by the file extension.
///
/// Unknown extensions are returned unchanged. String literals are copied
/// untouched. The single pass is repeated until nothing changes, so the
/// result is stable under re-application.
pub fn strip_comments(rel_path: &str, content: &str) -> String {
    let Some(style) = comment_style(rel_path) else {
        log::trace!("No comment syntax known for {}, leaving content as is", rel_path);
        return content.to_string();
    };
    let mut current = strip_comments_once(content, style);
    loop {
        let next = strip_comments_once(&current, style);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_comments_once(content: &str, style: &CommentStyle) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    if style.keep_shebang && rest.starts_with("#!") {
        let end = rest.find('\n').unwrap_or(rest.len());
        out.push_str(&rest[..end]);
        rest = &rest[end..];
    }

    while let Some(ch) = rest.chars().next() {
        if let Some((open, close)) = style.block {
            if rest.starts_with(open) {
                match rest[open.len()..].find(close) {
                    Some(end) => {
                        rest = &rest[open.len() + end + close.len()..];
                        continue;
                    }
                    None => {
                        // Unterminated: keep the remainder verbatim.
                        out.push_str(rest);
                        break;
                    }
                }
            }
        }

        if style.line.iter().any(|marker| rest.starts_with(marker))
            && (!style.line_needs_boundary || out.is_empty() || out.ends_with(char::is_whitespace))
        {
            let end = rest.find('\n').unwrap_or(rest.len());
            let kept = out.trim_end_matches([' ', '\t']).len();
            out.truncate(kept);
            rest = &rest[end..];
            continue;
        }

        if style.triple_quotes && (rest.starts_with("\"\"\"") || rest.starts_with("'''")) {
            let delimiter = &rest[..3];
            let len = match rest[3..].find(delimiter) {
                Some(end) => 3 + end + 3,
                None => rest.len(),
            };
            out.push_str(&rest[..len]);
            rest = &rest[len..];
            continue;
        }

        if style.raw_strings && !out.ends_with(|c: char| c.is_alphanumeric() || c == '_') {
            if let Some(len) = raw_string_len(rest) {
                out.push_str(&rest[..len]);
                rest = &rest[len..];
                continue;
            }
        }

        if style.quotes.contains(&ch) {
            let len = string_literal_len(rest, ch);
            out.push_str(&rest[..len]);
            rest = &rest[len..];
            continue;
        }

        if style.char_literals && ch == '\'' {
            if let Some(len) = char_literal_len(rest) {
                out.push_str(&rest[..len]);
                rest = &rest[len..];
                continue;
            }
        }

        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    out
}

/// Byte length of the string literal opening `rest`, including both quotes.
///
/// Literals other than backtick templates end at an unescaped newline.
fn string_literal_len(rest: &str, quote: char) -> usize {
    let mut chars = rest.char_indices().skip(1);
    while let Some((idx, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == quote {
            return idx + c.len_utf8();
        } else if c == '\n' && quote != '`' {
            return idx;
        }
    }
    rest.len()
}

/// Byte length of a raw string literal opening `rest`, prefix and hashes included.
fn raw_string_len(rest: &str) -> Option<usize> {
    let after_prefix = ["br", "cr", "r"]
        .iter()
        .find_map(|prefix| rest.strip_prefix(prefix))?;
    let hashes = after_prefix.len() - after_prefix.trim_start_matches('#').len();
    let body = after_prefix[hashes..].strip_prefix('"')?;
    let opening = rest.len() - body.len();
    let closing = format!("\"{}", "#".repeat(hashes));
    match body.find(&closing) {
        Some(end) => Some(opening + end + closing.len()),
        None => Some(rest.len()),
    }
}

fn char_literal_len(rest: &str) -> Option<usize> {
    let body = &rest[1..];
    if let Some(escaped) = body.strip_prefix('\\') {
        let close = escaped.char_indices().skip(1).take(10).find(|(_, c)| *c == '\'')?;
        return Some(2 + close.0 + 1);
    }
    let mut chars = body.chars();
    let c = chars.next()?;
    if c == '\'' || c == '\n' {
        return None;
    }
    match chars.next() {
        Some('\'') => Some(1 + c.len_utf8() + 1),
        _ => None,
    }
}

fn load_one(
    request: &PackRequest,
    filters: &[Box<dyn ContentFilter>],
    rel_path: &str,
) -> StageResult<ProcessedFile> {
    let absolute = request.source_dir.join(rel_path);
    let bytes = read_bytes(&absolute, rel_path, request.max_read_size)?;
    let mut content = decode_text(rel_path, bytes)?;
    for filter in filters {
        log::trace!("Applying {} to {}", filter.name(), rel_path);
        content = filter.apply(rel_path, &content);
    }
    Ok(ProcessedFile {
        path: rel_path.to_string(),
        content,
    })
}

/// Loads `paths` on a bounded pool and returns them in the same order.
pub fn load_files(
    request: &PackRequest,
    paths: &[String],
    sink: &dyn DiagnosticSink,
) -> Result<Vec<ProcessedFile>> {
    let threads = rayon::current_num_threads().min(MAX_READ_THREADS);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    let filters = filters_for(request);
    log::info!(
        "Reading {} files with {} threads ({} content filters)",
        paths.len(),
        threads,
        filters.len()
    );

    let loaded: Vec<Option<ProcessedFile>> = pool.install(|| {
        paths
            .par_iter()
            .map(|rel_path| match load_one(request, &filters, rel_path) {
                Ok(file) => Some(file),
                Err(diagnostic) => {
                    sink.report(diagnostic);
                    None
                }
            })
            .collect()
    });

    let files: Vec<ProcessedFile> = loaded.into_iter().flatten().collect();
    log::info!("File reading complete. {} of {} files loaded.", files.len(), paths.len());
    Ok(files)
}
