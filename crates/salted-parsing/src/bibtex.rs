//! BibTeX link/DOI extraction via `biblatex`.

use crate::{ExtractedDoi, ExtractedLink, ExtractionResult};

/// Extract the `doi` and `url` fields of every entry. Per S4, a single
/// `@Article` with both fields yields one `ExtractedLink` and one
/// `ExtractedDoi` — field values are not validated here, only pulled out;
/// `doi = {invalidDOI}` is extracted verbatim and left for the DOI prober
/// to reject.
pub fn extract(contents: &str) -> Result<ExtractionResult, biblatex::ParseError> {
    let bibliography = biblatex::Bibliography::parse(contents)?;

    let mut result = ExtractionResult::default();
    for entry in bibliography.iter() {
        let context = entry.key.clone();

        if let Some(doi_chunks) = entry.get("doi") {
            let doi = chunks_to_string(doi_chunks);
            if !doi.is_empty() {
                result.dois.push(ExtractedDoi {
                    doi,
                    context: context.clone(),
                });
            }
        }

        if let Some(url_chunks) = entry.get("url") {
            let url = chunks_to_string(url_chunks);
            if !url.is_empty() {
                result.links.push(ExtractedLink {
                    raw_url: url,
                    link_text: context,
                });
            }
        }
    }

    Ok(result)
}

fn chunks_to_string(chunks: &[biblatex::Spanned<biblatex::Chunk>]) -> String {
    chunks
        .iter()
        .map(|c| match &c.v {
            biblatex::Chunk::Normal(s) => s.as_str(),
            biblatex::Chunk::Verbatim(s) => s.as_str(),
            biblatex::Chunk::Math(s) => s.as_str(),
        })
        .collect::<Vec<_>>()
        .join("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_entry_yields_one_url_and_one_doi() {
        let bib = r#"@Article{example2021,
            author = {Someone},
            title = {A Title},
            journal = {A Journal},
            year = {2021},
            doi = {invalidDOI},
            url = {https://www.example.com/},
        }"#;
        let result = extract(bib).unwrap();
        assert_eq!(result.links.len(), 1);
        assert_eq!(result.links[0].raw_url, "https://www.example.com/");
        assert_eq!(result.dois.len(), 1);
        assert_eq!(result.dois[0].doi, "invalidDOI");
    }

    #[test]
    fn entries_without_doi_or_url_yield_nothing() {
        let bib = r#"@Article{example2021,
            author = {Someone},
            title = {A Title},
            journal = {A Journal},
            year = {2021},
        }"#;
        let result = extract(bib).unwrap();
        assert!(result.links.is_empty());
        assert!(result.dois.is_empty());
    }
}
