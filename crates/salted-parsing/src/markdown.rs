//! Markdown link extraction via regex.
//!
//! No Markdown AST crate appears anywhere in the example pack this was
//! built from, so extraction follows the same regex-based approach the
//! teacher uses for its own lightweight markup (`.bbl` citation parsing).

use crate::ExtractedLink;
use once_cell::sync::Lazy;
use regex::Regex;

static INLINE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[([^\]]*)\]\(([^)\s]+)(?:\s+"[^"]*")?\)"#).expect("valid regex")
});

static AUTOLINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(https?://[^>\s]+)>").expect("valid regex"));

/// Extract inline-style (`[text](url)`, with an optional `"title"`) and
/// autolink-style (`<url>`) links, in document order.
pub fn extract_links(contents: &str) -> Vec<ExtractedLink> {
    let mut matches: Vec<(usize, ExtractedLink)> = Vec::new();

    for m in INLINE_LINK.captures_iter(contents) {
        let whole = m.get(0).expect("capture 0 always present");
        matches.push((
            whole.start(),
            ExtractedLink {
                raw_url: m[2].to_owned(),
                link_text: m[1].to_owned(),
            },
        ));
    }

    for m in AUTOLINK.captures_iter(contents) {
        let whole = m.get(0).expect("capture 0 always present");
        matches.push((
            whole.start(),
            ExtractedLink {
                raw_url: m[1].to_owned(),
                link_text: m[1].to_owned(),
            },
        ));
    }

    matches.sort_by_key(|(pos, _)| *pos);
    matches.into_iter().map(|(_, link)| link).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_inline_autolink_and_titled_links() {
        let md = r#"[inline-style link](https://www.google.com) <https://www.example.com> [link with title](http://www.example.com/index.php?id=foo "Title")"#;
        let links = extract_links(md);
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].raw_url, "https://www.google.com");
        assert_eq!(links[0].link_text, "inline-style link");
        assert_eq!(links[1].raw_url, "https://www.example.com");
        assert_eq!(links[2].raw_url, "http://www.example.com/index.php?id=foo");
        assert_eq!(links[2].link_text, "link with title");
    }
}
