//! File discovery and ingest wiring: walks a file or directory, extracts
//! links/DOIs via `salted-parsing`, and hands the core the tuples it needs.
//!
//! Per-file read errors are recorded, never fatal — the file is skipped and
//! the walk continues, matching the three-plane error model the core
//! expects its collaborators to honor.

pub mod discover;

use salted_core::{IngestedDoi, IngestedLink};
use salted_parsing::ExtractionResult;
use std::path::Path;
use thiserror::Error;

pub use discover::{FileTypes, discover_files};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("path does not exist: {0}")]
    NotFound(std::path::PathBuf),
    #[error("unsupported file extension: {0}")]
    UnsupportedFile(std::path::PathBuf),
}

/// One file's worth of extracted records, tagged with its source path.
#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub links: Vec<IngestedLink>,
    pub dois: Vec<IngestedDoi>,
    /// `(file_path, reason)` pairs for files that could not be read or
    /// parsed. Never aborts the walk.
    pub file_access_errors: Vec<(String, String)>,
}

/// Walk `path` (file or directory) per `file_types`, extract links/DOIs from
/// every matching file, and collect the result. Read/parse failures on an
/// individual file are recorded in `file_access_errors`, not propagated.
pub fn ingest(path: &Path, file_types: FileTypes) -> Result<IngestOutcome, IngestError> {
    if !path.exists() {
        return Err(IngestError::NotFound(path.to_path_buf()));
    }

    let files = if path.is_dir() {
        discover_files(path, file_types)
    } else {
        let ext = extension_of(path);
        if !file_types.accepts(&ext) {
            return Err(IngestError::UnsupportedFile(path.to_path_buf()));
        }
        vec![path.to_path_buf()]
    };

    let mut outcome = IngestOutcome::default();
    for file in files {
        let file_path_str = file.display().to_string();
        let ext = extension_of(&file);

        let contents = match std::fs::read_to_string(&file) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(file = %file_path_str, error = %e, "skipping unreadable file");
                outcome
                    .file_access_errors
                    .push((file_path_str, e.to_string()));
                continue;
            }
        };

        match salted_parsing::extract(&ext, &contents) {
            Ok(extracted) => merge_into(&mut outcome, &file_path_str, extracted),
            Err(e) => {
                tracing::debug!(file = %file_path_str, error = %e, "skipping unparseable file");
                outcome
                    .file_access_errors
                    .push((file_path_str, e.to_string()));
            }
        }
    }

    Ok(outcome)
}

fn merge_into(outcome: &mut IngestOutcome, file_path: &str, extracted: ExtractionResult) {
    for link in extracted.links {
        outcome.links.push(IngestedLink {
            file_path: file_path.to_owned(),
            raw_url: link.raw_url,
            link_text: link.link_text,
        });
    }
    for doi in extracted.dois {
        outcome.dois.push(IngestedDoi {
            file_path: file_path.to_owned(),
            doi: doi.doi,
            context: doi.context,
        });
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_rejects_missing_path() {
        let err = ingest(Path::new("/does/not/exist"), FileTypes::Supported).unwrap_err();
        assert!(matches!(err, IngestError::NotFound(_)));
    }

    #[test]
    fn ingest_single_html_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("page.html");
        std::fs::write(&file, r#"<a href="https://www.example.com/">x</a>"#).unwrap();

        let outcome = ingest(&file, FileTypes::Supported).unwrap();
        assert_eq!(outcome.links.len(), 1);
        assert_eq!(outcome.links[0].raw_url, "https://www.example.com/");
    }

    #[test]
    fn ingest_does_not_descend_into_suffix_matching_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.html"), r#"<a href="https://a.example.com/">x</a>"#)
            .unwrap();
        // A directory whose name happens to end in a supported suffix must
        // not be treated as a file.
        std::fs::create_dir(dir.path().join("bogus.html")).unwrap();

        let outcome = ingest(dir.path(), FileTypes::Supported).unwrap();
        assert_eq!(outcome.links.len(), 1);
        assert!(outcome.file_access_errors.is_empty());
    }
}
