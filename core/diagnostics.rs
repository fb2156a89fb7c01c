//! Non-fatal diagnostics raised while packing.
//!
//! The engine never prints on its own. Everything that is skipped (a directory
//! that cannot be listed, a file over the size cap, a file that is not valid
//! UTF-8) is reported to a [`DiagnosticSink`] handed in by the caller.

use log;
use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    DirectoryListing,
    FileAccess,
    SizeLimit,
    Decode,
    RuleFile,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiagnosticKind::DirectoryListing => "directory listing failed",
            DiagnosticKind::FileAccess => "file access failed",
            DiagnosticKind::SizeLimit => "size limit exceeded",
            DiagnosticKind::Decode => "decode failed",
            DiagnosticKind::RuleFile => "rule file problem",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Forward-slash path relative to the source root; empty for the root itself.
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "." } else { &self.path };
        write!(f, "{} ({}): {}", path, self.kind, self.message)
    }
}

/// Receives diagnostics from the scanner and the content loader.
///
/// Content loading runs on several threads, so implementations must accept
/// concurrent calls. Reports are append-only.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards every diagnostic to `log::warn!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, diagnostic: Diagnostic) {
        log::warn!("Skipped {}", diagnostic);
    }
}

/// Keeps every diagnostic in memory, optionally echoing it to the log.
#[derive(Debug, Default)]
pub struct CollectingSink {
    entries: Mutex<Vec<Diagnostic>>,
    echo_to_log: bool,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_echo() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            echo_to_log: true,
        }
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics()
            .iter()
            .filter(|d| d.kind == kind)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics().is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        if self.echo_to_log {
            log::warn!("Skipped {}", diagnostic);
        }
        // A poisoned lock still holds every earlier report; keep appending.
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn collecting_sink_accepts_concurrent_reports() {
        let sink = Arc::new(CollectingSink::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::FileAccess,
                        format!("file_{}.txt", i),
                        "denied",
                    ));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sink.diagnostics().len(), 8);
        assert_eq!(sink.count_of(DiagnosticKind::FileAccess), 8);
        assert_eq!(sink.count_of(DiagnosticKind::Decode), 0);
    }

    #[test]
    fn display_uses_dot_for_root() {
        let d = Diagnostic::new(DiagnosticKind::DirectoryListing, "", "permission denied");
        assert_eq!(
            d.to_string(),
            ". (directory listing failed): permission denied"
        );
    }
}
