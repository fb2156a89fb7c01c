//! Glob pattern normalization and matching.
//!
//! Every pattern that reaches the scanner (defaults, caller patterns, rule
//! file lines, include patterns) goes through [`normalize_pattern`] first, so
//! the three ignore buckets share one set of semantics:
//!
//! - a leading `/` anchors the pattern to its scope root,
//! - a pattern with no inner `/` matches at any depth (`**/` is prepended),
//! - a trailing `/` means "everything under this directory" (`/**` is appended),
//! - `*` and `?` never cross a path separator, `**` does.

use crate::error::{AppError, Result};
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use log;

/// Splits a comma-separated pattern list, trimming entries and dropping empty ones.
pub fn split_patterns(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Rewrites a user pattern into the anchored glob the matcher compiles.
///
/// `scope` is the forward-slash directory the pattern belongs to (empty for
/// the source root). Returns `None` for blank patterns.
pub fn normalize_pattern(raw: &str, scope: &str) -> Option<String> {
    let trimmed = raw.trim();
    let anchored = trimmed.starts_with('/');
    let dir_only = trimmed.ends_with('/');
    let body = trimmed.trim_start_matches('/').trim_end_matches('/');
    if body.is_empty() {
        return None;
    }

    let mut pattern = if anchored || body.contains('/') {
        body.to_string()
    } else {
        format!("**/{}", body)
    };
    if dir_only {
        pattern.push_str("/**");
    }

    let scope = scope.trim_matches('/');
    if scope.is_empty() {
        Some(pattern)
    } else {
        Some(format!("{}/{}", scope, pattern))
    }
}

/// Compiles a single normalized pattern with path-aware wildcard semantics.
pub fn compile_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| AppError::Glob(format!("Invalid glob pattern \"{}\": {}", pattern, e)))
}

/// A compiled set of normalized patterns.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    set: GlobSet,
    patterns: Vec<String>,
}

impl PatternMatcher {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            log::trace!("Adding glob pattern: {}", pattern);
            builder.add(compile_glob(pattern)?);
        }
        let set = builder.build().map_err(|e| {
            log::error!("Error building glob set: {}", e);
            AppError::Glob(e.to_string())
        })?;
        Ok(Self {
            set,
            patterns: patterns.to_vec(),
        })
    }

    pub fn empty() -> Self {
        Self {
            set: GlobSet::empty(),
            patterns: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Tests a forward-slash relative file path.
    pub fn is_match(&self, relative_path: &str) -> bool {
        self.set.is_match(relative_path)
    }

    /// Tests a directory both as a plain path and with a trailing separator.
    pub fn is_dir_match(&self, relative_path: &str) -> bool {
        if self.set.is_match(relative_path) {
            return true;
        }
        let with_separator = format!("{}/", relative_path.trim_end_matches('/'));
        self.set.is_match(with_separator.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(raw: &[&str]) -> PatternMatcher {
        let normalized: Vec<String> = raw
            .iter()
            .filter_map(|p| normalize_pattern(p, ""))
            .collect();
        PatternMatcher::new(&normalized).unwrap()
    }

    #[test]
    fn split_trims_and_drops_empty_entries() {
        assert_eq!(
            split_patterns(" *.md, ,src/**/*.rs,, docs/ "),
            vec!["*.md", "src/**/*.rs", "docs/"]
        );
        assert!(split_patterns("").is_empty());
        assert!(split_patterns(" , ,").is_empty());
    }

    #[test]
    fn normalization_rules() {
        assert_eq!(normalize_pattern("*.log", "").as_deref(), Some("**/*.log"));
        assert_eq!(
            normalize_pattern("node_modules/", "").as_deref(),
            Some("**/node_modules/**")
        );
        assert_eq!(normalize_pattern("/build", "").as_deref(), Some("build"));
        assert_eq!(
            normalize_pattern("src/*.rs", "").as_deref(),
            Some("src/*.rs")
        );
        assert_eq!(
            normalize_pattern("**/dist/**", "").as_deref(),
            Some("**/dist/**")
        );
        assert_eq!(
            normalize_pattern("*.tmp", "logs").as_deref(),
            Some("logs/**/*.tmp")
        );
        assert_eq!(
            normalize_pattern("/cache/", "a/b/").as_deref(),
            Some("a/b/cache/**")
        );
        assert_eq!(normalize_pattern("   ", ""), None);
        assert_eq!(normalize_pattern("/", ""), None);
    }

    #[test]
    fn unanchored_patterns_match_at_any_depth() {
        let m = matcher(&["*.log"]);
        assert!(m.is_match("a.log"));
        assert!(m.is_match("logs/old.log"));
        assert!(m.is_match("deep/er/still.log"));
        assert!(!m.is_match("a.log.txt"));
    }

    #[test]
    fn anchored_patterns_do_not_cross_separators() {
        let m = matcher(&["src/*.rs"]);
        assert!(m.is_match("src/lib.rs"));
        assert!(!m.is_match("src/nested/lib.rs"));
        assert!(!m.is_match("other/src/lib.rs"));
    }

    #[test]
    fn directory_patterns_match_with_trailing_separator() {
        let m = matcher(&["node_modules/"]);
        assert!(m.is_dir_match("node_modules"));
        assert!(m.is_dir_match("packages/app/node_modules"));
        assert!(m.is_match("node_modules/pkg/index.js"));
        assert!(!m.is_dir_match("src"));
    }

    #[test]
    fn recursive_suffix_matches_directory_itself() {
        let m = matcher(&["build/**"]);
        assert!(m.is_dir_match("build"));
        assert!(m.is_match("build/out.o"));
        assert!(!m.is_dir_match("src/build"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let m = matcher(&["*.MD"]);
        assert!(m.is_match("README.MD"));
        assert!(!m.is_match("README.md"));
    }

    #[test]
    fn invalid_glob_is_reported() {
        let err = PatternMatcher::new(&["src/[".to_string()]).unwrap_err();
        assert!(matches!(err, AppError::Glob(_)));
    }

    #[test]
    fn empty_matcher_matches_nothing() {
        let m = PatternMatcher::empty();
        assert!(m.is_empty());
        assert!(!m.is_match("anything"));
        assert!(!m.is_dir_match("anything"));
    }
}
