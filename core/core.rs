pub mod assets;
pub mod config;
pub mod content;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod gather;
pub mod output_formats;
pub mod pack;
pub mod patterns;
pub mod request;
pub mod rules;
pub mod tree;

pub use config::Config;
pub use content::{ProcessedFile, load_files};
pub use context::{FileSummary, PackContext};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticKind, DiagnosticSink, LogSink};
pub use error::{AppError, Result};
pub use gather::{ScanOutcome, scan};
pub use output_formats::render;
pub use pack::{PackOutput, pack, pack_at};
pub use request::{OutputFormat, PackRequest, format_size, parse_size};
pub use rules::IgnoreReport;
pub use tree::{TreeNode, build_tree, render_tree};
