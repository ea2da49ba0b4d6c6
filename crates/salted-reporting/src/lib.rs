//! Renders `salted_core::StoreViews` into the supported report formats.
//!
//! Hand-rolled per format rather than templated, matching the teacher's own
//! `export.rs` — no templating crate appears in the example pack for this
//! kind of structured-data-to-text rendering.

pub mod export;

use salted_core::StoreViews;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Csv,
    Markdown,
    Text,
    Html,
}

/// One row of the per-error-code breakdown (§6 supplemented feature): the
/// original's `list_errors(code)` grouped by HTTP status rather than only
/// by file.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorsByCode {
    pub code: u16,
    pub count: usize,
}

pub fn errors_by_code(views: &StoreViews, errors: &[salted_core::ErrorRow]) -> Vec<ErrorsByCode> {
    use std::collections::HashMap;
    let _ = views; // views carries the per-file breakdown; this is the per-code one.
    let mut counts: HashMap<u16, usize> = HashMap::new();
    for e in errors {
        *counts.entry(e.code).or_insert(0) += 1;
    }
    let mut rows: Vec<ErrorsByCode> = counts
        .into_iter()
        .map(|(code, count)| ErrorsByCode { code, count })
        .collect();
    rows.sort_by_key(|r| r.code);
    rows
}

pub fn render(views: &StoreViews, errors: &[salted_core::ErrorRow], format: ReportFormat) -> String {
    match format {
        ReportFormat::Json => export::render_json(views, errors),
        ReportFormat::Csv => export::render_csv(views),
        ReportFormat::Markdown => export::render_markdown(views, errors),
        ReportFormat::Text => export::render_text(views, errors),
        ReportFormat::Html => export::render_html(views, errors),
    }
}
