//! The staging store: a small module exposing explicit insert/mark/query
//! operations rather than a free-for-all cursor passed among components.
//!
//! Realized as typed hash maps plus indexed slices, per the design note that
//! an embedded SQL engine is not required as long as the contract holds.

use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct LinkRecord {
    pub file_path: String,
    pub hostname: String,
    pub raw_url: String,
    pub normalized_url: String,
    pub link_text: String,
}

#[derive(Debug, Clone)]
pub struct DoiRecord {
    pub file_path: String,
    pub doi: String,
    pub context: String,
}

#[derive(Debug, Clone)]
pub struct ErrorRow {
    pub normalized_url: String,
    pub code: u16,
}

#[derive(Debug, Clone)]
pub struct RedirectRow {
    pub normalized_url: String,
    pub code: u16,
}

#[derive(Debug, Clone)]
pub struct ExceptionRow {
    pub normalized_url: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct FileAccessErrorRow {
    pub file_path: String,
    pub reason: String,
}

/// Per-file counts and joined lists, computed once after the probe phases.
#[derive(Debug, Clone, Default)]
pub struct StoreViews {
    pub error_count_by_file: HashMap<String, usize>,
    pub redirect_count_by_file: HashMap<String, usize>,
    pub exception_count_by_file: HashMap<String, usize>,
    pub errors_by_file: Vec<(String, String, String, u16)>,
    pub redirects_by_file: Vec<(String, String, String, u16)>,
    pub exceptions_by_file: Vec<(String, String, String, String)>,
}

/// All mutable run state for one invocation of `Engine::check`.
///
/// Owns all records; callers never hold a live reference across an await
/// point without going through the single writer (`Engine` wraps this in a
/// `tokio::sync::Mutex`).
pub struct Store {
    pub links: Vec<LinkRecord>,
    pub dois: Vec<DoiRecord>,
    pub valid_urls: HashMap<String, i64>,
    pub valid_dois: HashMap<String, i64>,
    pub errors: Vec<ErrorRow>,
    pub redirects: Vec<RedirectRow>,
    pub exceptions: Vec<ExceptionRow>,
    pub file_access_errors: Vec<FileAccessErrorRow>,
    pub invalid_dois: HashSet<String>,
    /// Count of GET fallbacks issued after a HEAD attempt came back 403 or
    /// any other non-terminal code (§4.2), mirroring the original's
    /// `cnt['neededFullRequest']`.
    pub full_requests: usize,

    classified_urls: HashSet<String>,
    classified_dois: HashSet<String>,
    index_by_normalized_url: HashMap<String, Vec<usize>>,
    pub views: StoreViews,
}

impl Store {
    pub fn new() -> Self {
        Self {
            links: Vec::new(),
            dois: Vec::new(),
            valid_urls: HashMap::new(),
            valid_dois: HashMap::new(),
            errors: Vec::new(),
            redirects: Vec::new(),
            exceptions: Vec::new(),
            file_access_errors: Vec::new(),
            invalid_dois: HashSet::new(),
            full_requests: 0,
            classified_urls: HashSet::new(),
            classified_dois: HashSet::new(),
            index_by_normalized_url: HashMap::new(),
            views: StoreViews::default(),
        }
    }

    /// Idempotent bulk insert: duplicate `(file_path, normalized_url)` pairs
    /// are kept (they're distinct link occurrences) but do not affect the
    /// probe set, which is always deduplicated by normalized URL.
    pub fn insert_links(&mut self, batch: impl IntoIterator<Item = LinkRecord>) {
        self.links.extend(batch);
    }

    pub fn insert_dois(&mut self, batch: impl IntoIterator<Item = DoiRecord>) {
        self.dois.extend(batch);
    }

    pub fn log_file_access_error(&mut self, file_path: impl Into<String>, reason: impl Into<String>) {
        self.file_access_errors.push(FileAccessErrorRow {
            file_path: file_path.into(),
            reason: reason.into(),
        });
    }

    /// Merge fresh cache rows (URLs valid within `ttl_hours`; all DOIs, which
    /// are treated as permanent) into `valid_urls`/`valid_dois`.
    pub fn merge_cached_valid_urls(&mut self, rows: impl IntoIterator<Item = (String, i64)>) {
        for (url, last_valid) in rows {
            self.valid_urls.insert(url, last_valid);
        }
    }

    pub fn merge_cached_valid_dois(&mut self, rows: impl IntoIterator<Item = (String, i64)>) {
        for (doi, last_seen) in rows {
            self.valid_dois.insert(doi, last_seen);
        }
    }

    /// Delete from `links`/`dois` those rows whose normalized key is already
    /// in `valid_urls`/`valid_dois`. Returns the number of distinct probes
    /// remaining across both sets.
    pub fn prune_probed(&mut self) -> usize {
        self.links
            .retain(|l| !self.valid_urls.contains_key(&l.normalized_url));
        self.dois.retain(|d| !self.valid_dois.contains_key(&d.doi));
        self.distinct_urls_to_probe().len() + self.distinct_dois_to_probe().len()
    }

    pub fn distinct_urls_to_probe(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for l in &self.links {
            if seen.insert(l.normalized_url.clone()) {
                out.push(l.normalized_url.clone());
            }
        }
        out
    }

    pub fn distinct_dois_to_probe(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for d in &self.dois {
            if seen.insert(d.doi.clone()) {
                out.push(d.doi.clone());
            }
        }
        out
    }

    /// Record a URL as `fine`. Enforces that a normalized URL appears in at
    /// most one of `{ValidUrl (this run), Error, Redirect, Exception}` — a
    /// later call for the same URL is a no-op rather than a duplicate write.
    pub fn mark_fine(&mut self, normalized_url: &str) {
        if !self.classified_urls.insert(normalized_url.to_owned()) {
            return;
        }
        self.valid_urls
            .insert(normalized_url.to_owned(), now_epoch());
    }

    pub fn mark_redirect(&mut self, normalized_url: &str, code: u16) {
        if !self.classified_urls.insert(normalized_url.to_owned()) {
            return;
        }
        self.redirects.push(RedirectRow {
            normalized_url: normalized_url.to_owned(),
            code,
        });
    }

    pub fn mark_error(&mut self, normalized_url: &str, code: u16) {
        if !self.classified_urls.insert(normalized_url.to_owned()) {
            return;
        }
        self.errors.push(ErrorRow {
            normalized_url: normalized_url.to_owned(),
            code,
        });
    }

    pub fn mark_exception(&mut self, normalized_url: &str, reason: impl Into<String>) {
        if !self.classified_urls.insert(normalized_url.to_owned()) {
            return;
        }
        self.exceptions.push(ExceptionRow {
            normalized_url: normalized_url.to_owned(),
            reason: reason.into(),
        });
    }

    /// Record that a URL probe fell back to a full GET after its HEAD
    /// attempt came back 403 or some other non-terminal code.
    pub fn mark_full_request(&mut self) {
        self.full_requests += 1;
    }

    pub fn mark_doi_valid(&mut self, doi: &str) {
        if !self.classified_dois.insert(doi.to_owned()) {
            return;
        }
        self.valid_dois.insert(doi.to_owned(), now_epoch());
    }

    pub fn mark_doi_invalid(&mut self, doi: &str) {
        if !self.classified_dois.insert(doi.to_owned()) {
            return;
        }
        self.invalid_dois.insert(doi.to_owned());
    }

    /// Build the normalized-URL index. Deliberately a separate pass run
    /// after bulk insert — building it incrementally would slow down insert
    /// throughput for no benefit, since nothing queries it until the probe
    /// phase.
    pub fn build_indices(&mut self) {
        self.index_by_normalized_url.clear();
        for (i, l) in self.links.iter().enumerate() {
            self.index_by_normalized_url
                .entry(l.normalized_url.clone())
                .or_default()
                .push(i);
        }
    }

    /// Build per-file counts and joined lists for reporting. Read-only,
    /// derived, computed once after both probe phases complete.
    pub fn build_views(&mut self) {
        let mut views = StoreViews::default();

        let error_urls: HashSet<&str> = self.errors.iter().map(|e| e.normalized_url.as_str()).collect();
        let redirect_urls: HashSet<&str> = self
            .redirects
            .iter()
            .map(|r| r.normalized_url.as_str())
            .collect();
        let exception_urls: HashSet<&str> = self
            .exceptions
            .iter()
            .map(|e| e.normalized_url.as_str())
            .collect();

        let error_code: HashMap<&str, u16> = self
            .errors
            .iter()
            .map(|e| (e.normalized_url.as_str(), e.code))
            .collect();
        let redirect_code: HashMap<&str, u16> = self
            .redirects
            .iter()
            .map(|r| (r.normalized_url.as_str(), r.code))
            .collect();
        let exception_reason: HashMap<&str, &str> = self
            .exceptions
            .iter()
            .map(|e| (e.normalized_url.as_str(), e.reason.as_str()))
            .collect();

        for link in &self.links {
            let key = link.normalized_url.as_str();
            if error_urls.contains(key) {
                *views
                    .error_count_by_file
                    .entry(link.file_path.clone())
                    .or_insert(0) += 1;
                views.errors_by_file.push((
                    link.file_path.clone(),
                    link.raw_url.clone(),
                    link.link_text.clone(),
                    error_code[key],
                ));
            }
            if redirect_urls.contains(key) {
                *views
                    .redirect_count_by_file
                    .entry(link.file_path.clone())
                    .or_insert(0) += 1;
                views.redirects_by_file.push((
                    link.file_path.clone(),
                    link.raw_url.clone(),
                    link.link_text.clone(),
                    redirect_code[key],
                ));
            }
            if exception_urls.contains(key) {
                *views
                    .exception_count_by_file
                    .entry(link.file_path.clone())
                    .or_insert(0) += 1;
                views.exceptions_by_file.push((
                    link.file_path.clone(),
                    link.raw_url.clone(),
                    link.link_text.clone(),
                    exception_reason[key].to_owned(),
                ));
            }
        }

        self.views = views;
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
