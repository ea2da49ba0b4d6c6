//! LaTeX link extraction via regex: `\url{...}` and `\href[...]{...}{...}`.

use crate::ExtractedLink;
use once_cell::sync::Lazy;
use regex::Regex;

static URL_MACRO: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\url\{([^}]*)\}").expect("valid regex"));

static HREF_MACRO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\href(?:\[[^\]]*\])?\{([^}]*)\}\{([^}]*)\}").expect("valid regex")
});

/// Extract links in document order. `\url{u}` has no link text (the URL
/// itself is used); `\href[...]{u}{t}` carries an explicit `t`.
pub fn extract_links(contents: &str) -> Vec<ExtractedLink> {
    let mut matches: Vec<(usize, ExtractedLink)> = Vec::new();

    for m in URL_MACRO.captures_iter(contents) {
        let whole = m.get(0).expect("capture 0 always present");
        matches.push((
            whole.start(),
            ExtractedLink {
                raw_url: m[1].to_owned(),
                link_text: m[1].to_owned(),
            },
        ));
    }

    for m in HREF_MACRO.captures_iter(contents) {
        let whole = m.get(0).expect("capture 0 always present");
        matches.push((
            whole.start(),
            ExtractedLink {
                raw_url: m[1].to_owned(),
                link_text: m[2].to_owned(),
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
    fn extracts_url_and_href_including_optional_argument() {
        let tex = r"\url{https://www.example.com/1}
                     \href{https://latex.example.com/}{linktext}
                     \url{https://www.example.com/2}
                     \href[x]{https://with-optional.example.com}{t}";
        let links = extract_links(tex);
        assert_eq!(links.len(), 4);
        assert_eq!(links[0].raw_url, "https://www.example.com/1");
        assert_eq!(links[1].raw_url, "https://latex.example.com/");
        assert_eq!(links[1].link_text, "linktext");
        assert_eq!(links[2].raw_url, "https://www.example.com/2");
        assert_eq!(links[3].raw_url, "https://with-optional.example.com");
        assert_eq!(links[3].link_text, "t");
    }
}
