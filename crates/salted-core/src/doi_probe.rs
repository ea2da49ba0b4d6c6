//! Rate-limited DOI validator against the CrossRef works API.
//!
//! The rate limiter is grounded in the teacher's `AdaptiveDbLimiter`
//! (`ArcSwap`-guarded parameters, swapped in from observed server state)
//! but specialized to this API's header-driven formula rather than
//! governor's `Quota`: CrossRef advertises `X-Rate-Limit-Limit` /
//! `X-Rate-Limit-Interval` on every response, and each worker sleeps
//! `(interval / (0.9 * max_queries)) * N_workers` before dequeuing again.

use crate::store::Store;
use crate::{Config, ProgressEvent, ProgressSink};
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Reference worker count for the DOI pool: small and fixed, since the
/// bottleneck is the server's advertised rate, not local concurrency.
pub const NUM_DOI_WORKERS: usize = 5;

const CROSSREF_BASE: &str = "https://api.crossref.org/works";

#[derive(Debug, Clone, Copy)]
struct RateLimitParams {
    max_queries: f64,
    interval_secs: f64,
}

impl Default for RateLimitParams {
    fn default() -> Self {
        // Conservative fallback used until the server has told us otherwise.
        Self {
            max_queries: 5.0,
            interval_secs: 1.0,
        }
    }
}

struct AdaptiveCrossrefLimiter {
    params: ArcSwap<RateLimitParams>,
    num_workers: usize,
}

impl AdaptiveCrossrefLimiter {
    fn new(num_workers: usize) -> Self {
        Self {
            params: ArcSwap::from_pointee(RateLimitParams::default()),
            num_workers,
        }
    }

    /// Parse `X-Rate-Limit-Limit`/`X-Rate-Limit-Interval` from a response and
    /// swap in the new parameters. Missing or malformed headers leave the
    /// current parameters untouched.
    fn observe(&self, headers: &reqwest::header::HeaderMap) {
        let max_queries = headers
            .get("X-Rate-Limit-Limit")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<f64>().ok());
        let interval_secs = headers
            .get("X-Rate-Limit-Interval")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim_end_matches('s').parse::<f64>().ok());

        if let (Some(max_queries), Some(interval_secs)) = (max_queries, interval_secs) {
            if max_queries > 0.0 && interval_secs > 0.0 {
                self.params.store(Arc::new(RateLimitParams {
                    max_queries,
                    interval_secs,
                }));
            }
        }
    }

    /// The per-worker delay that keeps the aggregate request rate at 90% of
    /// the advertised budget across all `num_workers` workers.
    fn sleep_duration(&self) -> Duration {
        let params = self.params.load();
        let secs = (params.interval_secs / (0.9 * params.max_queries)) * self.num_workers as f64;
        Duration::from_secs_f64(secs.max(0.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DoiOutcome {
    Valid,
    Invalid,
    Other,
}

/// Drain `dois` through a small fixed worker pool, sharing one adaptive
/// rate limiter and one HTTP client.
pub async fn run(
    dois: Vec<String>,
    config: &Config,
    store: Arc<Mutex<Store>>,
    progress: ProgressSink,
    cancel: CancellationToken,
) {
    if dois.is_empty() {
        return;
    }

    let total = dois.len();
    progress(ProgressEvent::DoiPhaseStarted {
        total,
        workers: NUM_DOI_WORKERS,
    });

    let user_agent = polite_user_agent(config.crossref_contact.as_deref());
    let client = match reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(config.timeout)
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "failed to build HTTP client for DOI probe pool");
            return;
        }
    };

    let limiter = Arc::new(AdaptiveCrossrefLimiter::new(NUM_DOI_WORKERS));

    let (tx, rx) = async_channel::unbounded();
    for doi in dois {
        let _ = tx.send(doi).await;
    }
    tx.close();

    let done = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let mut handles = Vec::with_capacity(NUM_DOI_WORKERS);
    for _ in 0..NUM_DOI_WORKERS {
        let rx = rx.clone();
        let client = client.clone();
        let store = Arc::clone(&store);
        let progress = Arc::clone(&progress);
        let cancel = cancel.clone();
        let done = Arc::clone(&done);
        let limiter = Arc::clone(&limiter);

        handles.push(tokio::spawn(async move {
            loop {
                let doi = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(doi) => doi,
                        Err(_) => break,
                    },
                };

                let outcome = probe_one(&client, &doi, &limiter).await;
                {
                    let mut guard = store.lock().await;
                    match outcome {
                        DoiOutcome::Valid => guard.mark_doi_valid(&doi),
                        DoiOutcome::Invalid => guard.mark_doi_invalid(&doi),
                        DoiOutcome::Other => {}
                    }
                }

                let n = done.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
                progress(ProgressEvent::DoiProbed { done: n, total });

                tokio::time::sleep(limiter.sleep_duration()).await;
            }
        }));
    }

    for h in handles {
        let _ = h.await;
    }

    progress(ProgressEvent::DoiPhaseFinished);
}

async fn probe_one(
    client: &reqwest::Client,
    doi: &str,
    limiter: &AdaptiveCrossrefLimiter,
) -> DoiOutcome {
    probe_one_against(client, CROSSREF_BASE, doi, limiter).await
}

async fn probe_one_against(
    client: &reqwest::Client,
    base: &str,
    doi: &str,
    limiter: &AdaptiveCrossrefLimiter,
) -> DoiOutcome {
    let url = format!("{base}/{doi}");
    match client.get(&url).send().await {
        Ok(response) => {
            limiter.observe(response.headers());
            match response.status().as_u16() {
                200 => DoiOutcome::Valid,
                404 => DoiOutcome::Invalid,
                other => {
                    tracing::debug!(doi, status = other, "DOI probe returned unhandled status");
                    DoiOutcome::Other
                }
            }
        }
        Err(e) => {
            tracing::debug!(doi, error = %e, "DOI probe transport error");
            DoiOutcome::Other
        }
    }
}

/// Identify honestly rather than impersonate a browser — CrossRef routes
/// polite, contactable clients to a dedicated pool with a higher limit.
fn polite_user_agent(contact: Option<&str>) -> String {
    let version = env!("CARGO_PKG_VERSION");
    match contact {
        Some(contact) => format!(
            "salted/{version} (https://github.com/RuedigerVoigt/salted; mailto:{contact})"
        ),
        None => format!("salted/{version} (https://github.com/RuedigerVoigt/salted)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rate_limit_matches_conservative_fallback() {
        let limiter = AdaptiveCrossrefLimiter::new(5);
        // (1 / (0.9 * 5)) * 5 == 1.111...
        let expected = (1.0 / (0.9 * 5.0)) * 5.0;
        assert!((limiter.sleep_duration().as_secs_f64() - expected).abs() < 1e-9);
    }

    #[test]
    fn observe_updates_params_from_headers() {
        let limiter = AdaptiveCrossrefLimiter::new(5);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("X-Rate-Limit-Limit", "50".parse().unwrap());
        headers.insert("X-Rate-Limit-Interval", "1s".parse().unwrap());
        limiter.observe(&headers);

        let expected = (1.0 / (0.9 * 50.0)) * 5.0;
        assert!((limiter.sleep_duration().as_secs_f64() - expected).abs() < 1e-9);
    }

    #[test]
    fn observe_ignores_malformed_headers() {
        let limiter = AdaptiveCrossrefLimiter::new(5);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("X-Rate-Limit-Limit", "not-a-number".parse().unwrap());
        limiter.observe(&headers);

        let expected = (1.0 / (0.9 * 5.0)) * 5.0;
        assert!((limiter.sleep_duration().as_secs_f64() - expected).abs() < 1e-9);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn valid_doi_is_marked_valid() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/10.1000/xyz123")
            .with_status(200)
            .with_header("X-Rate-Limit-Limit", "50")
            .with_header("X-Rate-Limit-Interval", "1s")
            .create_async()
            .await;
        let client = reqwest::Client::new();
        let limiter = AdaptiveCrossrefLimiter::new(5);
        let outcome = probe_one_against(&client, &server.url(), "10.1000/xyz123", &limiter).await;
        assert_eq!(outcome, DoiOutcome::Valid);
        let expected = (1.0 / (0.9 * 50.0)) * 5.0;
        assert!((limiter.sleep_duration().as_secs_f64() - expected).abs() < 1e-9);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_doi_is_marked_invalid() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/10.1000/bogus")
            .with_status(404)
            .create_async()
            .await;
        let client = reqwest::Client::new();
        let limiter = AdaptiveCrossrefLimiter::new(5);
        let outcome = probe_one_against(&client, &server.url(), "10.1000/bogus", &limiter).await;
        assert_eq!(outcome, DoiOutcome::Invalid);
    }
}
