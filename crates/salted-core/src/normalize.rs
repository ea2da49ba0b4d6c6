//! URL normalization: a deduplication/cache key, never the request target.
//!
//! Lowercases scheme and host, strips default ports, percent-decodes
//! unreserved characters, collapses duplicate path slashes, sorts query
//! parameters by key (falling back to the original query on a duplicate-key
//! conflict), and strips the fragment.

use url::Url;

/// Normalize `raw` into its canonical deduplication key.
///
/// Malformed input (anything `url::Url::parse` rejects) is returned
/// unchanged, lowercased — the caller still needs a stable key even for
/// URLs that will fail to probe.
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw) else {
        return raw.trim().to_lowercase();
    };

    let scheme = parsed.scheme().to_lowercase();
    let _ = parsed.set_scheme(&scheme);

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        let _ = parsed.set_host(Some(&host));
    }

    if is_default_port(&scheme, parsed.port()) {
        let _ = parsed.set_port(None);
    }

    let decoded_path = decode_unreserved(parsed.path());
    let collapsed_path = collapse_slashes(&decoded_path);
    parsed.set_path(&collapsed_path);

    if let Some(query) = parsed.query() {
        match sort_query(query) {
            Some(sorted) => parsed.set_query(Some(&sorted)),
            None => parsed.set_query(Some(query)),
        }
    }

    parsed.set_fragment(None);

    parsed.into()
}

fn is_default_port(scheme: &str, port: Option<u16>) -> bool {
    match (scheme, port) {
        ("http", Some(80)) => true,
        ("https", Some(443)) => true,
        _ => false,
    }
}

/// Decode only the percent-triplets whose escaped byte falls in RFC 3986's
/// `unreserved` class (`ALPHA` / `DIGIT` / `-` / `.` / `_` / `~`); every other
/// triplet (`%2F`, `%3F`, `%23`, `%26`, `%3D`, …) is left exactly as written,
/// since decoding those would change which byte is a structural separator
/// versus a literal byte inside a path segment.
fn decode_unreserved(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                let decoded = hi * 16 + lo;
                if is_unreserved(decoded) {
                    out.push(decoded);
                } else {
                    out.extend_from_slice(&bytes[i..i + 3]);
                }
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| path.to_owned())
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_was_slash = false;
    for c in path.chars() {
        if c == '/' {
            if prev_was_slash {
                continue;
            }
            prev_was_slash = true;
        } else {
            prev_was_slash = false;
        }
        out.push(c);
    }
    out
}

/// Sort query parameters by key, stable for duplicate keys. Returns `None`
/// if the same key appears with different values (a "duplicate-key
/// conflict"), signaling the caller to preserve the query verbatim instead.
fn sort_query(query: &str) -> Option<String> {
    let mut pairs: Vec<(String, String)> = query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| match p.split_once('=') {
            Some((k, v)) => (k.to_owned(), v.to_owned()),
            None => (p.to_owned(), String::new()),
        })
        .collect();

    let mut seen: std::collections::HashMap<&str, &str> = std::collections::HashMap::new();
    for (k, v) in &pairs {
        if let Some(prev) = seen.get(k.as_str()) {
            if *prev != v {
                return None;
            }
        } else {
            seen.insert(k.as_str(), v.as_str());
        }
    }

    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    Some(
        pairs
            .into_iter()
            .map(|(k, v)| if v.is_empty() { k } else { format!("{k}={v}") })
            .collect::<Vec<_>>()
            .join("&"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_scheme_and_host() {
        assert_eq!(
            normalize_url("HTTPS://Example.COM/path"),
            "https://example.com/path"
        );
    }

    #[test]
    fn strips_default_port() {
        assert_eq!(
            normalize_url("http://example.com:80/a"),
            "http://example.com/a"
        );
        assert_eq!(
            normalize_url("https://example.com:443/a"),
            "https://example.com/a"
        );
        assert_eq!(
            normalize_url("http://example.com:8080/a"),
            "http://example.com:8080/a"
        );
    }

    #[test]
    fn collapses_duplicate_slashes() {
        assert_eq!(
            normalize_url("https://example.com/a//b///c"),
            "https://example.com/a/b/c"
        );
    }

    #[test]
    fn sorts_query_parameters() {
        assert_eq!(
            normalize_url("https://example.com/?b=2&a=1"),
            "https://example.com/?a=1&b=2"
        );
    }

    #[test]
    fn preserves_query_on_duplicate_key_conflict() {
        let normalized = normalize_url("https://example.com/?a=1&a=2");
        assert_eq!(normalized, "https://example.com/?a=1&a=2");
    }

    #[test]
    fn strips_fragment() {
        assert_eq!(
            normalize_url("https://example.com/page#section"),
            "https://example.com/page"
        );
    }

    #[test]
    fn decodes_unreserved_percent_encoding() {
        assert_eq!(
            normalize_url("https://example.com/a%7Eb"),
            "https://example.com/a~b"
        );
    }

    #[test]
    fn preserves_encoded_slash_inside_a_path_segment() {
        // %2F decodes to a reserved separator byte, not an unreserved one —
        // decoding it would turn one path segment into two.
        assert_eq!(
            normalize_url("https://example.com/a%2Fb"),
            "https://example.com/a%2Fb"
        );
    }

    #[test]
    fn preserves_other_reserved_percent_triplets() {
        for (raw, expected) in [
            ("https://example.com/a%3Fb", "https://example.com/a%3Fb"),
            ("https://example.com/a%23b", "https://example.com/a%23b"),
            ("https://example.com/a%26b", "https://example.com/a%26b"),
            ("https://example.com/a%3Db", "https://example.com/a%3Db"),
        ] {
            assert_eq!(normalize_url(raw), expected);
        }
    }

    #[test]
    fn is_idempotent() {
        let cases = [
            "https://www.example.com/",
            "HTTP://Example.com:80/a//b?z=1&a=2#frag",
            "https://example.com/a%20b",
        ];
        for raw in cases {
            let once = normalize_url(raw);
            let twice = normalize_url(&once);
            assert_eq!(once, twice, "not idempotent for {raw}");
        }
    }

    proptest::proptest! {
        /// spec.md §8 invariant 2: `normalize(normalize(u)) == normalize(u)`
        /// for arbitrary input, not just a hand-picked case list — including
        /// strings `url::Url::parse` rejects outright.
        #[test]
        fn normalize_is_idempotent_for_arbitrary_input(raw in ".*") {
            let once = normalize_url(&raw);
            let twice = normalize_url(&once);
            proptest::prop_assert_eq!(once, twice);
        }

        /// Same invariant restricted to well-formed `https://` URLs with a
        /// host, path segments and query pairs drawn from a small alphabet —
        /// exercises the scheme/host lowercasing, slash-collapsing and
        /// query-sorting passes the free-form generator above rarely reaches.
        #[test]
        fn normalize_is_idempotent_for_well_formed_urls(
            host in "[a-zA-Z]{1,10}\\.(com|org|net)",
            segments in proptest::collection::vec("[a-zA-Z0-9_.~-]{0,6}", 0..4),
            query_pairs in proptest::collection::vec(("[a-z]{1,4}", "[a-z0-9]{0,4}"), 0..4),
        ) {
            let path = segments.iter().map(|s| format!("/{s}")).collect::<String>();
            let query = query_pairs
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&");
            let raw = if query.is_empty() {
                format!("HTTPS://{host}{path}")
            } else {
                format!("HTTPS://{host}{path}?{query}")
            };

            let once = normalize_url(&raw);
            let twice = normalize_url(&once);
            proptest::prop_assert_eq!(once, twice);
        }
    }
}
