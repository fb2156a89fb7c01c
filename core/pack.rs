use crate::content::load_files;
use crate::context::PackContext;
use crate::diagnostics::DiagnosticSink;
use crate::error::Result;
use crate::gather::scan;
use crate::output_formats::render;
use crate::request::{OutputFormat, PackRequest};
use crate::rules::IgnoreReport;
use chrono::{DateTime, Utc};
use log;
use serde::Serialize;

/// The packed document plus what front ends need to report on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackOutput {
    pub document: String,
    pub format: OutputFormat,
    pub file_count: usize,
    pub total_chars: usize,
    pub paths: Vec<String>,
    pub ignore_report: IgnoreReport,
}

/// Packs the source tree described by `request` into a single document.
///
/// The request is validated first. Skipped entities go to `sink`; only an
/// invalid request, an unreadable source root or a serialization failure is
/// returned as an error.
pub fn pack(request: &PackRequest, sink: &dyn DiagnosticSink) -> Result<PackOutput> {
    pack_at(request, sink, Utc::now())
}

/// Same as [`pack`] with a fixed generation timestamp.
pub fn pack_at(
    request: &PackRequest,
    sink: &dyn DiagnosticSink,
    generated_at: DateTime<Utc>,
) -> Result<PackOutput> {
    let request = request.clone().validate()?;
    log::info!(
        "Packing {} as {}",
        request.display_name(),
        request.format
    );

    let outcome = scan(&request, sink)?;
    let files = load_files(&request, &outcome.paths, sink)?;
    let paths: Vec<String> = files.iter().map(|f| f.path.clone()).collect();

    let context = PackContext::build(&request, outcome.ignore_report.clone(), files, generated_at)?;
    let total_chars = context.total_chars();
    let document = render(&context, request.format)?;

    log::info!(
        "Packed {} files ({} characters) into a {} byte document",
        paths.len(),
        total_chars,
        document.len()
    );
    Ok(PackOutput {
        document,
        format: request.format,
        file_count: paths.len(),
        total_chars,
        paths,
        ignore_report: outcome.ignore_report,
    })
}
