//! Validation engine for salted.
//!
//! Drives the staged pipeline documented at the workspace root: normalize and
//! stage ingested links/DOIs, join against the disk cache, probe distinct
//! URLs and DOIs with bounded concurrency, write the cache back, and expose
//! read-only views for reporting.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub mod cache;
pub mod doi_probe;
pub mod normalize;
pub mod store;
pub mod url_probe;

pub use cache::CacheError;
pub use normalize::normalize_url;
pub use store::{
    DoiRecord, ErrorRow, ExceptionRow, LinkRecord, RedirectRow, Store, StoreViews,
};
pub use url_probe::NumWorkers;

/// Raw input handed to the engine by an ingest adapter: one candidate link.
#[derive(Debug, Clone)]
pub struct IngestedLink {
    pub file_path: String,
    pub raw_url: String,
    pub link_text: String,
}

/// Raw input handed to the engine by an ingest adapter: one candidate DOI.
#[derive(Debug, Clone)]
pub struct IngestedDoi {
    pub file_path: String,
    pub doi: String,
    pub context: String,
}

/// Progress events emitted during a run. Treated as a capability: the engine
/// never branches on whether anyone is listening.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    UrlPhaseStarted { total: usize, workers: usize },
    UrlProbed { done: usize, total: usize },
    UrlPhaseFinished,
    DoiPhaseStarted { total: usize, workers: usize },
    DoiProbed { done: usize, total: usize },
    DoiPhaseFinished,
}

pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

fn noop_progress() -> ProgressSink {
    Arc::new(|_event| {})
}

#[derive(Error, Debug)]
pub enum SaltedError {
    #[error("path does not exist: {0}")]
    NotFound(PathBuf),
    #[error("unsupported file extension: {0}")]
    UnsupportedFile(PathBuf),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("at least one broken link was found")]
    DeadLinks,
}

/// Configuration resolved from CLI flags, config file and defaults
/// (in that precedence order). See `salted-cli` for the layer that builds
/// this from the outside world.
#[derive(Debug, Clone)]
pub struct Config {
    pub num_workers: NumWorkers,
    pub timeout: std::time::Duration,
    pub raise_for_dead_links: bool,
    pub user_agent: String,
    pub crossref_contact: Option<String>,
    pub cache_file: PathBuf,
    pub dont_check_again_within_hours: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_workers: NumWorkers::Automatic,
            timeout: std::time::Duration::from_secs(5),
            raise_for_dead_links: false,
            user_agent: format!("salted/{}", env!("CARGO_PKG_VERSION")),
            crossref_contact: None,
            cache_file: PathBuf::from("salted-cache.sqlite3"),
            dont_check_again_within_hours: 24,
        }
    }
}

/// The validation engine. Owns no state between calls to [`Engine::check`]
/// beyond configuration — every invocation reinitializes the staging store
/// so that counters and error tables never leak across runs.
pub struct Engine {
    config: Config,
    progress: ProgressSink,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            progress: noop_progress(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Run the full pipeline against already-ingested links and DOIs.
    ///
    /// File discovery and format-specific extraction are external
    /// collaborators (see `salted-ingest`, `salted-parsing`); this entry
    /// point takes their output directly so the core has no knowledge of
    /// markup formats.
    pub async fn check(
        &self,
        links: Vec<IngestedLink>,
        dois: Vec<IngestedDoi>,
        cancel: CancellationToken,
    ) -> Result<Arc<Mutex<Store>>, SaltedError> {
        let store = Arc::new(Mutex::new(Store::new()));

        {
            let mut guard = store.lock().await;
            guard.insert_links(links.into_iter().map(|l| LinkRecord {
                file_path: l.file_path,
                normalized_url: normalize_url(&l.raw_url),
                hostname: hostname_of(&l.raw_url),
                raw_url: l.raw_url,
                link_text: l.link_text,
            }));
            guard.insert_dois(dois.into_iter().map(|d| DoiRecord {
                file_path: d.file_path,
                doi: d.doi,
                context: d.context,
            }));

            match cache::load_into_store(
                &self.config.cache_file,
                self.config.dont_check_again_within_hours,
                &mut guard,
            ) {
                Ok(()) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "no usable disk cache, proceeding with empty cache");
                }
            }

            guard.prune_probed();
            guard.build_indices();
        }

        let urls = {
            let guard = store.lock().await;
            guard.distinct_urls_to_probe()
        };
        url_probe::run(
            urls,
            &self.config,
            Arc::clone(&store),
            Arc::clone(&self.progress),
            cancel.clone(),
        )
        .await;

        let doi_list = {
            let guard = store.lock().await;
            guard.distinct_dois_to_probe()
        };
        doi_probe::run(
            doi_list,
            &self.config,
            Arc::clone(&store),
            Arc::clone(&self.progress),
            cancel,
        )
        .await;

        {
            let mut guard = store.lock().await;
            guard.build_views();
            cache::snapshot_to_disk(&self.config.cache_file, &guard)?;
        }

        Ok(store)
    }

    /// Whether `store` (as returned by [`Engine::check`]) should convert into
    /// a terminal outcome under `raise_for_dead_links` (§6 exit semantics).
    /// Split out from `check` itself so a caller can still render a report
    /// from the returned store before deciding whether to exit non-zero —
    /// the gate only ever looks at data that is already persisted to the
    /// cache by the time `check` returns.
    pub fn dead_links_gate(&self, store: &Store) -> Result<(), SaltedError> {
        if self.config.raise_for_dead_links && !store.errors.is_empty() {
            return Err(SaltedError::DeadLinks);
        }
        Ok(())
    }

    /// Validate `path` as a supported single file or directory, per the
    /// public entry-point contract. Actual discovery and extraction are left
    /// to `salted-ingest`/`salted-parsing`; this only validates the input
    /// before handing it to those collaborators.
    pub fn validate_path(path: &Path) -> Result<(), SaltedError> {
        if !path.exists() {
            return Err(SaltedError::NotFound(path.to_path_buf()));
        }
        if path.is_file() {
            let supported = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|ext| matches!(ext, "htm" | "html" | "md" | "tex" | "bib"))
                .unwrap_or(false);
            if !supported {
                return Err(SaltedError::UnsupportedFile(path.to_path_buf()));
            }
        }
        Ok(())
    }
}

fn hostname_of(raw_url: &str) -> String {
    url::Url::parse(raw_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_path_rejects_missing() {
        let err = Engine::validate_path(Path::new("/does/not/exist.html")).unwrap_err();
        assert!(matches!(err, SaltedError::NotFound(_)));
    }

    #[test]
    fn validate_path_rejects_unsupported_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("notes.txt");
        std::fs::write(&p, "hi").unwrap();
        let err = Engine::validate_path(&p).unwrap_err();
        assert!(matches!(err, SaltedError::UnsupportedFile(_)));
    }

    #[test]
    fn validate_path_accepts_supported_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("notes.html");
        std::fs::write(&p, "hi").unwrap();
        assert!(Engine::validate_path(&p).is_ok());
    }
}
