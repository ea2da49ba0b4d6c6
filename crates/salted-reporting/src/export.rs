use crate::errors_by_code;
use salted_core::{ErrorRow, StoreViews};
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Serialize)]
struct JsonReport<'a> {
    errors_by_file: &'a std::collections::HashMap<String, usize>,
    redirects_by_file: &'a std::collections::HashMap<String, usize>,
    exceptions_by_file: &'a std::collections::HashMap<String, usize>,
    errors: &'a [(String, String, String, u16)],
    redirects: &'a [(String, String, String, u16)],
    exceptions: &'a [(String, String, String, String)],
    errors_by_code: Vec<crate::ErrorsByCode>,
}

pub fn render_json(views: &StoreViews, errors: &[ErrorRow]) -> String {
    let report = JsonReport {
        errors_by_file: &views.error_count_by_file,
        redirects_by_file: &views.redirect_count_by_file,
        exceptions_by_file: &views.exception_count_by_file,
        errors: &views.errors_by_file,
        redirects: &views.redirects_by_file,
        exceptions: &views.exceptions_by_file,
        errors_by_code: errors_by_code(views, errors),
    };
    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_owned())
}

pub fn render_csv(views: &StoreViews) -> String {
    let mut out = String::from("category,file_path,raw_url,link_text,code_or_reason\n");
    for (file, url, text, code) in &views.errors_by_file {
        let _ = writeln!(out, "error,{file},{url},{text},{code}");
    }
    for (file, url, text, code) in &views.redirects_by_file {
        let _ = writeln!(out, "redirect,{file},{url},{text},{code}");
    }
    for (file, url, text, reason) in &views.exceptions_by_file {
        let _ = writeln!(out, "exception,{file},{url},{text},{reason}");
    }
    out
}

pub fn render_markdown(views: &StoreViews, errors: &[ErrorRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Link check report\n");

    let _ = writeln!(out, "## Errors\n");
    for (file, url, text, code) in &views.errors_by_file {
        let _ = writeln!(out, "- `{code}` [{text}]({url}) — {file}");
    }

    let _ = writeln!(out, "\n## Redirects\n");
    for (file, url, text, code) in &views.redirects_by_file {
        let _ = writeln!(out, "- `{code}` [{text}]({url}) — {file}");
    }

    let _ = writeln!(out, "\n## Exceptions\n");
    for (file, url, text, reason) in &views.exceptions_by_file {
        let _ = writeln!(out, "- `{reason}` [{text}]({url}) — {file}");
    }

    let by_code = errors_by_code(views, errors);
    if !by_code.is_empty() {
        let _ = writeln!(out, "\n## Errors by HTTP code\n");
        for row in by_code {
            let _ = writeln!(out, "- {}: {}", row.code, row.count);
        }
    }

    out
}

pub fn render_text(views: &StoreViews, errors: &[ErrorRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} error(s), {} redirect(s), {} exception(s)",
        views.errors_by_file.len(),
        views.redirects_by_file.len(),
        views.exceptions_by_file.len()
    );
    for (file, url, _text, code) in &views.errors_by_file {
        let _ = writeln!(out, "  [error {code}] {file}: {url}");
    }
    for (file, url, _text, code) in &views.redirects_by_file {
        let _ = writeln!(out, "  [redirect {code}] {file}: {url}");
    }
    for (file, url, _text, reason) in &views.exceptions_by_file {
        let _ = writeln!(out, "  [exception {reason}] {file}: {url}");
    }
    for row in errors_by_code(views, errors) {
        let _ = writeln!(out, "  code {}: {} occurrence(s)", row.code, row.count);
    }
    out
}

pub fn render_html(views: &StoreViews, errors: &[ErrorRow]) -> String {
    let mut out = String::new();
    out.push_str("<html><body>\n<h1>Link check report</h1>\n");

    out.push_str("<h2>Errors</h2>\n<ul>\n");
    for (file, url, text, code) in &views.errors_by_file {
        let _ = writeln!(
            out,
            "<li>[{code}] <a href=\"{url}\">{text}</a> — {file}</li>"
        );
    }
    out.push_str("</ul>\n");

    out.push_str("<h2>Redirects</h2>\n<ul>\n");
    for (file, url, text, code) in &views.redirects_by_file {
        let _ = writeln!(
            out,
            "<li>[{code}] <a href=\"{url}\">{text}</a> — {file}</li>"
        );
    }
    out.push_str("</ul>\n");

    out.push_str("<h2>Exceptions</h2>\n<ul>\n");
    for (file, url, text, reason) in &views.exceptions_by_file {
        let _ = writeln!(
            out,
            "<li>[{reason}] <a href=\"{url}\">{text}</a> — {file}</li>"
        );
    }
    out.push_str("</ul>\n");

    let by_code = errors_by_code(views, errors);
    if !by_code.is_empty() {
        out.push_str("<h2>Errors by HTTP code</h2>\n<ul>\n");
        for row in by_code {
            let _ = writeln!(out, "<li>{}: {}</li>", row.code, row.count);
        }
        out.push_str("</ul>\n");
    }

    out.push_str("</body></html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use salted_core::Store;

    fn sample_store() -> Store {
        let mut store = Store::new();
        store.insert_links([salted_core::LinkRecord {
            file_path: "a.html".to_owned(),
            hostname: "example.com".to_owned(),
            raw_url: "https://example.com/dead".to_owned(),
            normalized_url: "https://example.com/dead".to_owned(),
            link_text: "dead link".to_owned(),
        }]);
        store.mark_error("https://example.com/dead", 404);
        store.build_views();
        store
    }

    #[test]
    fn json_report_contains_error_row() {
        let store = sample_store();
        let json = render_json(&store.views, &store.errors);
        assert!(json.contains("https://example.com/dead"));
        assert!(json.contains("404"));
    }

    #[test]
    fn csv_report_has_header_and_one_row() {
        let store = sample_store();
        let csv = render_csv(&store.views);
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), "category,file_path,raw_url,link_text,code_or_reason");
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn errors_by_code_groups_duplicates() {
        let mut store = sample_store();
        store.mark_error("https://example.com/other-dead", 404);
        let rows = errors_by_code(&store.views, &store.errors);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].code, 404);
        assert_eq!(rows[0].count, 2);
    }
}
