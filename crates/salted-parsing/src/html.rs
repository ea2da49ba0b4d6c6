//! HTML link extraction via `scraper`.

use crate::ExtractedLink;
use scraper::{Html, Selector};

/// Extract `(href, link text)` from every `<a>` tag with an `href`
/// attribute. Links without visible text use an empty string, matching S1's
/// expectation of exactly one record per anchor regardless of text content.
pub fn extract_links(contents: &str) -> Vec<ExtractedLink> {
    let document = Html::parse_document(contents);
    // Selector::parse only fails on malformed selector strings, never on
    // document content, so this literal is infallible.
    let anchor = Selector::parse("a[href]").expect("static selector is valid");

    document
        .select(&anchor)
        .filter_map(|el| {
            let href = el.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            let text: String = el.text().collect::<Vec<_>>().join("").trim().to_owned();
            Some(ExtractedLink {
                raw_url: href.to_owned(),
                link_text: text,
            })
        })
        .collect()
}
