//! Directory scanning.
//!
//! The scanner is a single-threaded recursive descent: a directory must know
//! its own rule set before any of its children can be judged. Each call
//! returns an immutable [`ScanResult`] for its subtree that the parent merges.

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::{AppError, Result};
use crate::request::PackRequest;
use crate::rules::{BaseRules, IgnoreReport, RuleScope, dedupe_patterns, join_relative, read_rule_files};
use log;
use serde::Serialize;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// What one subtree contributed: surviving file paths and rule-file patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub paths: Vec<String>,
    pub rule_file_patterns: Vec<String>,
}

impl ScanResult {
    fn merge(&mut self, child: ScanResult) {
        self.paths.extend(child.paths);
        self.rule_file_patterns.extend(child.rule_file_patterns);
    }
}

/// The outcome of scanning a whole source tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    /// Forward-slash paths relative to the source root, in depth-first discovery order.
    pub paths: Vec<String>,
    pub ignore_report: IgnoreReport,
}

struct Scanner<'a> {
    request: &'a PackRequest,
    base: &'a BaseRules,
    sink: &'a dyn DiagnosticSink,
}

/// Walks `request.source_dir` and returns the files that survive every filter.
///
/// Only a failure to list the source root itself is an error; everything
/// below it is reported to `sink` and skipped.
pub fn scan(request: &PackRequest, sink: &dyn DiagnosticSink) -> Result<ScanOutcome> {
    let base = BaseRules::from_request(request)?;
    let scanner = Scanner {
        request,
        base: &base,
        sink,
    };

    log::info!("Scanning source directory: {}", request.source_dir.display());
    let result = scanner.scan_dir(&request.source_dir, "", &base.root_scope())?;
    log::info!(
        "Scan complete. {} files survived filtering, {} rule-file patterns discovered.",
        result.paths.len(),
        result.rule_file_patterns.len()
    );

    Ok(ScanOutcome {
        paths: result.paths,
        ignore_report: IgnoreReport {
            default_patterns: base.default_patterns.clone(),
            caller_patterns: base.caller_patterns.clone(),
            rule_file_patterns: dedupe_patterns(result.rule_file_patterns),
        },
    })
}

fn list_dir(dir: &Path) -> std::result::Result<Vec<DirEntry>, walkdir::Error> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .collect()
}

impl Scanner<'_> {
    fn scan_dir(&self, dir: &Path, dir_rel: &str, inherited: &RuleScope) -> Result<ScanResult> {
        let mut result = ScanResult::default();

        let scope = if self.request.use_rule_files {
            let discovered =
                read_rule_files(dir, dir_rel, &self.request.rule_file_names, self.sink);
            let globs: Vec<String> = discovered.iter().map(|p| p.glob.clone()).collect();
            let scope = inherited.extend(&globs)?;
            if !discovered.is_empty() {
                log::debug!(
                    "{} rule-file patterns apply below '{}'",
                    discovered.len(),
                    display_rel(dir_rel)
                );
            }
            result.rule_file_patterns = discovered.into_iter().map(|p| p.reported).collect();
            scope
        } else {
            inherited.clone()
        };

        let entries = match list_dir(dir) {
            Ok(entries) => entries,
            Err(e) if dir_rel.is_empty() => {
                return Err(AppError::InvalidRequest(format!(
                    "Cannot list source directory '{}': {}",
                    dir.display(),
                    e
                )));
            }
            Err(e) => {
                self.sink.report(Diagnostic::new(
                    DiagnosticKind::DirectoryListing,
                    dir_rel,
                    e.to_string(),
                ));
                return Ok(result);
            }
        };

        for entry in entries {
            let name = entry.file_name().to_string_lossy();
            let rel_path = join_relative(dir_rel, &name);
            let file_type = entry.file_type();

            if file_type.is_symlink() {
                log::debug!("Skipping symbolic link: {}", rel_path);
            } else if file_type.is_dir() {
                if scope.is_dir_ignored(&rel_path) {
                    log::trace!("Directory ignored: {}", rel_path);
                    continue;
                }
                let child = self.scan_dir(entry.path(), &rel_path, &scope)?;
                result.merge(child);
            } else if !file_type.is_file() {
                // FIFOs, sockets and device nodes would block or never end on read.
                log::debug!("Skipping special file: {}", rel_path);
            } else if let Some(path) = self.check_file(&entry, rel_path, &scope) {
                result.paths.push(path);
            }
        }
        Ok(result)
    }

    fn check_file(&self, entry: &DirEntry, rel_path: String, scope: &RuleScope) -> Option<String> {
        if scope.is_file_ignored(&rel_path) {
            log::trace!("File ignored: {}", rel_path);
            return None;
        }
        if !self.base.is_included(&rel_path) {
            log::trace!("File not matched by include patterns: {}", rel_path);
            return None;
        }
        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                self.sink.report(Diagnostic::new(
                    DiagnosticKind::FileAccess,
                    rel_path,
                    e.to_string(),
                ));
                return None;
            }
        };
        if size > self.request.max_file_size {
            self.sink.report(Diagnostic::new(
                DiagnosticKind::SizeLimit,
                rel_path,
                format!(
                    "{} bytes exceeds the {} byte scan limit",
                    size, self.request.max_file_size
                ),
            ));
            return None;
        }
        log::trace!("File included: {}", rel_path);
        Some(rel_path)
    }
}

fn display_rel(rel: &str) -> &str {
    if rel.is_empty() { "." } else { rel }
}
