//! Ignore rule resolution.
//!
//! Three provenance buckets feed the effective rule set of a directory:
//! the embedded defaults, the caller's ignore patterns, and the rule files
//! (`.gitignore`, `.xpackignore`) found on the way down from the source root.
//! The first two are compiled once per run. Rule-file patterns are appended
//! to a per-directory copy of the parent's scope, so siblings never see each
//! other's rules. Patterns are only ever appended: there is no negation and
//! no re-ordering.

use crate::assets;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::{AppError, Result};
use crate::patterns::{PatternMatcher, compile_glob, normalize_pattern};
use crate::request::PackRequest;
use indexmap::IndexSet;
use log;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// The ignore patterns that took part in a run, as reported in the output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IgnoreReport {
    pub default_patterns: Vec<String>,
    pub caller_patterns: Vec<String>,
    /// Rule-file lines as written, prefixed by the directory of the rule file, deduplicated.
    pub rule_file_patterns: Vec<String>,
}

impl IgnoreReport {
    pub fn is_empty(&self) -> bool {
        self.default_patterns.is_empty()
            && self.caller_patterns.is_empty()
            && self.rule_file_patterns.is_empty()
    }
}

/// Rules that apply to every directory of a run: defaults, caller ignores and includes.
#[derive(Debug, Clone)]
pub struct BaseRules {
    pub default_patterns: Vec<String>,
    pub caller_patterns: Vec<String>,
    ignore: Arc<PatternMatcher>,
    include: PatternMatcher,
}

impl BaseRules {
    pub fn from_request(request: &PackRequest) -> Result<Self> {
        let default_patterns = if request.use_default_patterns {
            assets::default_ignores()?.patterns.clone()
        } else {
            log::debug!("Default ignore patterns disabled.");
            Vec::new()
        };
        let caller_patterns = request.ignore_patterns.clone();

        let normalized_ignores: Vec<String> = default_patterns
            .iter()
            .chain(caller_patterns.iter())
            .filter_map(|p| normalize_pattern(p, ""))
            .collect();
        let ignore = PatternMatcher::new(&normalized_ignores).map_err(into_request_error)?;

        let normalized_includes: Vec<String> = request
            .include_patterns
            .iter()
            .filter_map(|p| normalize_pattern(p, ""))
            .collect();
        let include = PatternMatcher::new(&normalized_includes).map_err(into_request_error)?;

        log::debug!(
            "Base rules compiled: {} default, {} caller, {} include patterns",
            default_patterns.len(),
            caller_patterns.len(),
            normalized_includes.len()
        );
        Ok(Self {
            default_patterns,
            caller_patterns,
            ignore: Arc::new(ignore),
            include,
        })
    }

    pub fn has_includes(&self) -> bool {
        !self.include.is_empty()
    }

    /// True when no include patterns were given or the path matches one of them.
    pub fn is_included(&self, relative_path: &str) -> bool {
        self.include.is_empty() || self.include.is_match(relative_path)
    }

    /// The scope of the source root, before any rule file has been read.
    pub fn root_scope(&self) -> RuleScope {
        RuleScope {
            base: Arc::clone(&self.ignore),
            rule_patterns: Arc::new(Vec::new()),
            rule_matcher: Arc::new(PatternMatcher::empty()),
        }
    }
}

fn into_request_error(err: AppError) -> AppError {
    match err {
        AppError::Glob(message) => AppError::InvalidRequest(message),
        other => other,
    }
}

/// The effective ignore rule set visible inside one directory.
///
/// Cloning is cheap; extending always produces a new scope and leaves the
/// parent untouched.
#[derive(Debug, Clone)]
pub struct RuleScope {
    base: Arc<PatternMatcher>,
    rule_patterns: Arc<Vec<String>>,
    rule_matcher: Arc<PatternMatcher>,
}

impl RuleScope {
    /// Returns a child scope with `patterns` appended to the inherited rule-file patterns.
    pub fn extend(&self, patterns: &[String]) -> Result<RuleScope> {
        if patterns.is_empty() {
            return Ok(self.clone());
        }
        let mut combined = Vec::with_capacity(self.rule_patterns.len() + patterns.len());
        combined.extend(self.rule_patterns.iter().cloned());
        combined.extend(patterns.iter().cloned());
        let rule_matcher = PatternMatcher::new(&combined)?;
        Ok(RuleScope {
            base: Arc::clone(&self.base),
            rule_patterns: Arc::new(combined),
            rule_matcher: Arc::new(rule_matcher),
        })
    }

    pub fn rule_patterns(&self) -> &[String] {
        &self.rule_patterns
    }

    pub fn is_file_ignored(&self, relative_path: &str) -> bool {
        self.base.is_match(relative_path) || self.rule_matcher.is_match(relative_path)
    }

    pub fn is_dir_ignored(&self, relative_path: &str) -> bool {
        self.base.is_dir_match(relative_path) || self.rule_matcher.is_dir_match(relative_path)
    }
}

/// Extracts the pattern lines of a rule file: blank lines and `#` comments are dropped.
pub fn parse_rule_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| {
            if line.starts_with('!') {
                log::debug!("Negation patterns are not supported, skipping: {}", line);
                false
            } else {
                true
            }
        })
        .map(String::from)
        .collect()
}

/// One rule-file line in the two forms a run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulePattern {
    /// The line as written, prefixed by the rule file's directory (`logs/*.tmp`).
    pub reported: String,
    /// The normalized glob scoped to that directory (`logs/**/*.tmp`).
    pub glob: String,
}

impl RulePattern {
    fn new(line: &str, dir_rel: &str) -> Option<Self> {
        let glob = normalize_pattern(line, dir_rel)?;
        let reported = if dir_rel.is_empty() {
            line.to_string()
        } else {
            join_relative(dir_rel, line.trim_start_matches('/'))
        };
        Some(Self { reported, glob })
    }
}

/// Reads the rule files directly inside `dir` and returns their patterns scoped to `dir_rel`.
///
/// Unreadable files and invalid globs are reported to the sink and skipped.
pub fn read_rule_files(
    dir: &Path,
    dir_rel: &str,
    rule_file_names: &[String],
    sink: &dyn DiagnosticSink,
) -> Vec<RulePattern> {
    let mut patterns = Vec::new();
    for name in rule_file_names {
        let rule_path = dir.join(name);
        if !rule_path.is_file() {
            continue;
        }
        let rel_rule_path = join_relative(dir_rel, name);
        let content = match fs::read_to_string(&rule_path) {
            Ok(content) => content,
            Err(e) => {
                sink.report(Diagnostic::new(
                    DiagnosticKind::RuleFile,
                    rel_rule_path,
                    format!("cannot read rule file: {}", e),
                ));
                continue;
            }
        };
        for line in parse_rule_lines(&content) {
            let Some(pattern) = RulePattern::new(&line, dir_rel) else {
                continue;
            };
            if let Err(e) = compile_glob(&pattern.glob) {
                sink.report(Diagnostic::new(
                    DiagnosticKind::RuleFile,
                    rel_rule_path.clone(),
                    e.to_string(),
                ));
                continue;
            }
            log::trace!("Rule file {} adds pattern {}", rel_rule_path, pattern.glob);
            patterns.push(pattern);
        }
    }
    patterns
}

/// Removes duplicates while keeping first-seen order.
pub fn dedupe_patterns(patterns: impl IntoIterator<Item = String>) -> Vec<String> {
    patterns
        .into_iter()
        .collect::<IndexSet<String>>()
        .into_iter()
        .collect()
}

/// Joins a forward-slash relative directory and an entry name.
pub fn join_relative(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use tempfile::tempdir;

    #[test]
    fn parse_rule_lines_skips_blank_comment_and_negation() {
        let content = "# build output\n\n*.log\n  dist/  \n!keep.log\n#another\n";
        assert_eq!(parse_rule_lines(content), vec!["*.log", "dist/"]);
        assert!(parse_rule_lines("\n\n# only comments\n").is_empty());
    }

    #[test]
    fn extend_never_mutates_parent() {
        let request = PackRequest::new(".").with_default_patterns(false);
        let base = BaseRules::from_request(&request).unwrap();
        let root = base.root_scope();

        let a = root.extend(&["a/**/*.tmp".to_string()]).unwrap();
        let b = root.extend(&["b/**/*.bak".to_string()]).unwrap();

        assert!(root.rule_patterns().is_empty());
        assert!(a.is_file_ignored("a/x.tmp"));
        assert!(!a.is_file_ignored("b/x.bak"));
        assert!(b.is_file_ignored("b/x.bak"));
        assert!(!b.is_file_ignored("a/x.tmp"));
    }

    #[test]
    fn child_scope_inherits_parent_rules() {
        let request = PackRequest::new(".").with_default_patterns(false);
        let base = BaseRules::from_request(&request).unwrap();
        let parent = base.root_scope().extend(&["**/*.log".to_string()]).unwrap();
        let child = parent.extend(&["logs/**/*.tmp".to_string()]).unwrap();
        assert_eq!(child.rule_patterns(), &["**/*.log", "logs/**/*.tmp"]);
        assert!(child.is_file_ignored("logs/old.log"));
        assert!(child.is_file_ignored("logs/cache.tmp"));
    }

    #[test]
    fn base_rules_report_raw_patterns() {
        let request = PackRequest::new(".")
            .with_ignore("*.snap, fixtures/")
            .with_include("*.rs");
        let base = BaseRules::from_request(&request).unwrap();
        assert_eq!(base.caller_patterns, vec!["*.snap", "fixtures/"]);
        assert!(base.default_patterns.iter().any(|p| p == "node_modules/"));
        assert!(base.has_includes());
        assert!(base.is_included("src/main.rs"));
        assert!(!base.is_included("README.md"));

        let root = base.root_scope();
        assert!(root.is_file_ignored("tests/a.snap"));
        assert!(root.is_dir_ignored("tests/fixtures"));
        assert!(root.is_dir_ignored("node_modules"));
    }

    #[test]
    fn invalid_caller_pattern_is_an_invalid_request() {
        let request = PackRequest::new(".").with_ignore("src/[");
        let err = BaseRules::from_request(&request).unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[test]
    fn read_rule_files_scopes_patterns_to_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "*.tmp\n/cache/\n").unwrap();
        fs::write(dir.path().join(".xpackignore"), "# nothing\nsecret.txt\n").unwrap();
        let sink = CollectingSink::new();
        let names = vec![".gitignore".to_string(), ".xpackignore".to_string()];
        let patterns = read_rule_files(dir.path(), "logs", &names, &sink);
        let globs: Vec<&str> = patterns.iter().map(|p| p.glob.as_str()).collect();
        assert_eq!(
            globs,
            vec!["logs/**/*.tmp", "logs/cache/**", "logs/**/secret.txt"]
        );
        let reported: Vec<&str> = patterns.iter().map(|p| p.reported.as_str()).collect();
        assert_eq!(reported, vec!["logs/*.tmp", "logs/cache/", "logs/secret.txt"]);
        assert!(sink.is_empty());
    }

    #[test]
    fn root_rule_lines_are_reported_verbatim() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "*.bak\n/build/\n").unwrap();
        let sink = CollectingSink::new();
        let patterns = read_rule_files(dir.path(), "", &[".gitignore".to_string()], &sink);
        assert_eq!(
            patterns,
            vec![
                RulePattern {
                    reported: "*.bak".to_string(),
                    glob: "**/*.bak".to_string(),
                },
                RulePattern {
                    reported: "/build/".to_string(),
                    glob: "build/**".to_string(),
                },
            ]
        );
    }

    #[test]
    fn invalid_rule_line_is_reported_and_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "ok.txt\nbad[\n").unwrap();
        let sink = CollectingSink::new();
        let patterns = read_rule_files(dir.path(), "", &[".gitignore".to_string()], &sink);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].reported, "ok.txt");
        assert_eq!(patterns[0].glob, "**/ok.txt");
        assert_eq!(sink.count_of(DiagnosticKind::RuleFile), 1);
    }

    #[test]
    fn dedupe_keeps_first_occurrence_order() {
        let deduped = dedupe_patterns(vec![
            "b".to_string(),
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
            "a".to_string(),
        ]);
        assert_eq!(deduped, vec!["b", "a", "c"]);
    }
}
