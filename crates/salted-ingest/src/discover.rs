//! Recursive directory descent by file extension.

use std::path::{Path, PathBuf};

/// The `file_types` option (§6): restricts which suffixes are descended
/// into. `Supported` is every format the core understands; the others
/// narrow to a single family, as in the original's CLI surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileTypes {
    Supported,
    Html,
    Tex,
    Markdown,
}

impl FileTypes {
    pub fn accepts(&self, extension: &str) -> bool {
        match self {
            FileTypes::Supported => matches!(extension, "htm" | "html" | "md" | "tex" | "bib"),
            FileTypes::Html => matches!(extension, "htm" | "html"),
            FileTypes::Tex => extension == "tex",
            FileTypes::Markdown => extension == "md",
        }
    }
}

impl std::str::FromStr for FileTypes {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "supported" => Ok(FileTypes::Supported),
            "html" => Ok(FileTypes::Html),
            "tex" => Ok(FileTypes::Tex),
            "markdown" => Ok(FileTypes::Markdown),
            other => Err(format!("unknown file_types value: {other}")),
        }
    }
}

/// Recursively descend `root`, returning every file whose extension
/// `file_types` accepts. Directories that cannot be read are skipped
/// silently — `ingest` records per-file errors, but an unreadable directory
/// simply yields no entries from that branch.
pub fn discover_files(root: &Path, file_types: FileTypes) -> Vec<PathBuf> {
    let mut out = Vec::new();
    walk(root, file_types, &mut out);
    out
}

fn walk(dir: &Path, file_types: FileTypes, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk(&path, file_types, out);
        } else if path.is_file() {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default()
                .to_lowercase();
            if file_types.accepts(&ext) {
                out.push(path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_only_supported_suffixes_recursively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.html"), "").unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("c.md"), "").unwrap();

        let mut found = discover_files(dir.path(), FileTypes::Supported);
        found.sort();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn html_filter_excludes_bib() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.html"), "").unwrap();
        std::fs::write(dir.path().join("b.bib"), "").unwrap();

        let found = discover_files(dir.path(), FileTypes::Html);
        assert_eq!(found.len(), 1);
    }
}
