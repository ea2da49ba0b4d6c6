//! Format-specific link and DOI extraction.
//!
//! Each parser takes the raw text of one source file and returns the
//! `(raw_url, link_text)` and `(doi, context)` pairs found in it. The core
//! engine (`salted-core`) has no knowledge of any of these formats; it only
//! consumes the extracted pairs.

pub mod bibtex;
pub mod html;
pub mod latex;
pub mod markdown;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParsingError {
    #[error("unrecognized file extension: {0}")]
    UnrecognizedExtension(String),
    #[error("bibtex parse error: {0}")]
    Bibtex(#[from] biblatex::ParseError),
}

/// One extracted hyperlink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub raw_url: String,
    pub link_text: String,
}

/// One extracted DOI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDoi {
    pub doi: String,
    pub context: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub links: Vec<ExtractedLink>,
    pub dois: Vec<ExtractedDoi>,
}

/// Dispatch to the right parser by file extension. `extension` is expected
/// lowercase and without the leading dot (`"html"`, not `".HTML"`).
pub fn extract(extension: &str, contents: &str) -> Result<ExtractionResult, ParsingError> {
    match extension {
        "htm" | "html" => Ok(ExtractionResult {
            links: html::extract_links(contents),
            dois: Vec::new(),
        }),
        "md" => Ok(ExtractionResult {
            links: markdown::extract_links(contents),
            dois: Vec::new(),
        }),
        "tex" => Ok(ExtractionResult {
            links: latex::extract_links(contents),
            dois: Vec::new(),
        }),
        "bib" => bibtex::extract(contents).map_err(ParsingError::from),
        other => Err(ParsingError::UnrecognizedExtension(other.to_owned())),
    }
}
