//! INI config-file loading (§6): sections `BEHAVIOR`, `CACHE`, `FILES`,
//! `TEMPLATE`; any other section name is a fatal configuration error.
//!
//! Case-sensitive parsing (`Ini::new_cs`) so the four section names are
//! matched exactly rather than folded to lowercase, matching the spec's
//! literal section headers.

use configparser::ini::Ini;
use std::path::Path;
use thiserror::Error;

const KNOWN_SECTIONS: &[&str] = &["BEHAVIOR", "CACHE", "FILES", "TEMPLATE"];

#[derive(Error, Debug)]
pub enum ConfigFileError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },
    #[error("unknown config section [{0}] (expected one of BEHAVIOR, CACHE, FILES, TEMPLATE)")]
    UnknownSection(String),
}

/// Everything the config file may supply. Every field is optional: absence
/// means "defer to the default", per the CLI > config file > defaults
/// precedence this feeds into.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub searchpath: Option<String>,
    pub file_types: Option<String>,
    pub num_workers: Option<String>,
    pub timeout: Option<u64>,
    pub raise_for_dead_links: Option<bool>,
    pub user_agent: Option<String>,
    pub crossref_contact: Option<String>,
    pub cache_file: Option<String>,
    pub dont_check_again_within_hours: Option<u64>,
    pub template_searchpath: Option<String>,
    pub template_name: Option<String>,
    pub write_to: Option<String>,
    pub base_url: Option<String>,
}

pub fn load(path: &Path) -> Result<ConfigFile, ConfigFileError> {
    if !path.exists() {
        return Err(ConfigFileError::Io {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
    }

    let mut ini = Ini::new_cs();
    let map = ini.load(path).map_err(|reason| ConfigFileError::Parse {
        path: path.display().to_string(),
        reason,
    })?;

    for section in map.keys() {
        // configparser groups keys that precede any `[section]` header under
        // an implicit "default" bucket; that bucket is always present and
        // does not count as an explicit (and therefore checkable) section.
        if section.eq_ignore_ascii_case("default") {
            continue;
        }
        if !KNOWN_SECTIONS.contains(&section.as_str()) {
            return Err(ConfigFileError::UnknownSection(section.clone()));
        }
    }

    let mut out = ConfigFile::default();

    out.searchpath = ini.get("FILES", "searchpath");
    out.file_types = ini.get("FILES", "file_types");
    out.cache_file = ini.get("CACHE", "cache_file");
    out.dont_check_again_within_hours = ini
        .getuint("CACHE", "dont_check_again_within_hours")
        .unwrap_or(None);
    out.num_workers = ini.get("BEHAVIOR", "num_workers");
    out.timeout = ini.getuint("BEHAVIOR", "timeout").unwrap_or(None);
    out.raise_for_dead_links = ini
        .getbool("BEHAVIOR", "raise_for_dead_links")
        .unwrap_or(None);
    out.user_agent = ini.get("BEHAVIOR", "user_agent");
    out.crossref_contact = ini.get("BEHAVIOR", "crossref_contact");
    out.template_searchpath = ini.get("TEMPLATE", "template_searchpath");
    out.template_name = ini.get("TEMPLATE", "template_name");
    out.write_to = ini.get("TEMPLATE", "write_to");
    out.base_url = ini.get("TEMPLATE", "base_url");

    Ok(out)
}
