//! Bounded-concurrency HTTP HEAD/GET prober.
//!
//! Modeled on the drainer-pool shape in the teacher's per-reference worker
//! pool: an `async-channel` queue, N `tokio::spawn` workers sharing one
//! `reqwest::Client`, a `CancellationToken` for shutdown, and writes that
//! funnel through a single mutex-guarded store.

use crate::store::Store;
use crate::{Config, ProgressEvent, ProgressSink};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Worker count for the URL probe pool: either a caller-chosen fixed count
/// or automatic sizing from the probe-set cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumWorkers {
    Automatic,
    Fixed(usize),
}

impl NumWorkers {
    pub fn resolve(&self, probe_count: usize) -> usize {
        match self {
            NumWorkers::Fixed(n) => (*n).max(1),
            NumWorkers::Automatic => recommend_num_workers(probe_count),
        }
    }
}

fn recommend_num_workers(num_checks: usize) -> usize {
    match num_checks {
        0..=24 => 4,
        25..=99 => 12,
        100..=4999 => 32,
        _ => 64,
    }
}

/// The bounded-read cap applied to the GET fallback, per the reference
/// behavior: enough to distinguish a real 200 from a server streaming
/// megabytes, without paying for the whole body.
const FALLBACK_READ_CAP_BYTES: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Classification {
    Fine,
    Redirect(u16),
    Error(u16),
    Exception(String),
}

/// Drain `urls` through a bounded worker pool, classifying each exactly
/// once and writing the result back into `store`.
pub async fn run(
    urls: Vec<String>,
    config: &Config,
    store: Arc<Mutex<Store>>,
    progress: ProgressSink,
    cancel: CancellationToken,
) {
    if urls.is_empty() {
        return;
    }

    let worker_count = config.num_workers.resolve(urls.len());
    let total = urls.len();
    progress(ProgressEvent::UrlPhaseStarted {
        total,
        workers: worker_count,
    });

    let client = match build_client(&config.user_agent, config.timeout) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "failed to build HTTP client for URL probe pool");
            return;
        }
    };

    let (tx, rx) = async_channel::unbounded();
    for url in urls {
        let _ = tx.send(url).await;
    }
    tx.close();

    let done = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let rx = rx.clone();
        let client = client.clone();
        let store = Arc::clone(&store);
        let progress = Arc::clone(&progress);
        let cancel = cancel.clone();
        let done = Arc::clone(&done);
        let timeout = config.timeout;

        handles.push(tokio::spawn(async move {
            loop {
                let url = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(url) => url,
                        Err(_) => break,
                    },
                };

                let (classification, used_fallback) = probe_one(&client, &url, timeout).await;
                {
                    let mut guard = store.lock().await;
                    if used_fallback {
                        guard.mark_full_request();
                    }
                    apply_classification(&mut guard, &url, classification);
                }

                let n = done.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
                progress(ProgressEvent::UrlProbed { done: n, total });
            }
        }));
    }

    for h in handles {
        let _ = h.await;
    }

    progress(ProgressEvent::UrlPhaseFinished);
}

fn apply_classification(store: &mut Store, url: &str, classification: Classification) {
    match classification {
        Classification::Fine => store.mark_fine(url),
        Classification::Redirect(code) => store.mark_redirect(url, code),
        Classification::Error(code) => store.mark_error(url, code),
        Classification::Exception(reason) => store.mark_exception(url, reason),
    }
}

/// Probe `url`, returning its classification and whether a GET fallback was
/// needed after the HEAD attempt (§4.2's "full-request counter").
async fn probe_one(client: &reqwest::Client, url: &str, timeout: Duration) -> (Classification, bool) {
    match head_request(client, url, timeout).await {
        Ok(status) => classify_status(client, url, status, timeout).await,
        Err(reason) => (Classification::Exception(reason), false),
    }
}

async fn head_request(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<u16, String> {
    let response = client
        .head(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(classify_transport_error)?;
    Ok(response.status().as_u16())
}

/// Classify a HEAD response's status code, attempting the bounded-read GET
/// fallback exactly once for 403 or any code that isn't otherwise fine,
/// redirect or a well-known error/exception.
async fn classify_status(
    client: &reqwest::Client,
    url: &str,
    status: u16,
    timeout: Duration,
) -> (Classification, bool) {
    match status {
        200 | 302 | 303 | 307 => (Classification::Fine, false),
        301 | 308 => (Classification::Redirect(status), false),
        403 => {
            let classification = match bounded_get(client, url, timeout).await {
                Ok(200) => Classification::Fine,
                Ok(_) => Classification::Error(403),
                Err(reason) => Classification::Exception(reason),
            };
            (classification, true)
        }
        404 | 410 => (Classification::Error(status), false),
        429 => (Classification::Exception("Rate Limit (429)".to_owned()), false),
        other => {
            let classification = match bounded_get(client, url, timeout).await {
                Ok(200) | Ok(302) | Ok(303) | Ok(307) => Classification::Fine,
                Ok(301) | Ok(308) => Classification::Redirect(other),
                Ok(404) | Ok(410) => Classification::Error(other),
                Ok(_) => Classification::Exception(format!("Other({other})")),
                Err(reason) => Classification::Exception(reason),
            };
            (classification, true)
        }
    }
}

/// A full GET that reads at most [`FALLBACK_READ_CAP_BYTES`] of the body —
/// enough to confirm the response is real without paying for a large
/// download on a HEAD-hostile server.
async fn bounded_get(client: &reqwest::Client, url: &str, timeout: Duration) -> Result<u16, String> {
    use futures_util::StreamExt;

    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(classify_transport_error)?;
    let status = response.status().as_u16();

    let mut read = 0usize;
    let mut stream = response.bytes_stream();
    while read < FALLBACK_READ_CAP_BYTES {
        match stream.next().await {
            Some(Ok(chunk)) => read += chunk.len(),
            Some(Err(_)) => break,
            None => break,
        }
    }

    Ok(status)
}

/// Map a transport-level failure onto the fixed exception taxonomy. Any
/// condition not recognized here is `"Unknown"` rather than propagated —
/// a worker must never die mid-pool.
fn classify_transport_error(err: reqwest::Error) -> String {
    if err.is_timeout() {
        "Timeout".to_owned()
    } else if err.is_connect() {
        "ClientConnectorError".to_owned()
    } else if err.is_status() {
        "ClientResponseError".to_owned()
    } else if err.is_body() || err.is_decode() {
        "ClientOSError".to_owned()
    } else if err.to_string().contains("connection closed") {
        "ServerDisconnectedError".to_owned()
    } else {
        tracing::debug!(error = %err, "unclassified transport error");
        "Unknown".to_owned()
    }
}

fn build_client(user_agent: &str, timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn automatic_sizing_matches_reference_table() {
        assert_eq!(NumWorkers::Automatic.resolve(1), 4);
        assert_eq!(NumWorkers::Automatic.resolve(24), 4);
        assert_eq!(NumWorkers::Automatic.resolve(25), 12);
        assert_eq!(NumWorkers::Automatic.resolve(99), 12);
        assert_eq!(NumWorkers::Automatic.resolve(100), 32);
        assert_eq!(NumWorkers::Automatic.resolve(4999), 32);
        assert_eq!(NumWorkers::Automatic.resolve(5000), 64);
    }

    #[test]
    fn fixed_sizing_honors_explicit_count() {
        assert_eq!(NumWorkers::Fixed(7).resolve(10_000), 7);
        assert_eq!(NumWorkers::Fixed(0).resolve(1), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn head_200_classifies_as_fine() {
        let mut server = mockito::Server::new_async().await;
        let _m = server.mock("HEAD", "/ok").with_status(200).create_async().await;
        let client = build_client("salted-test", Duration::from_secs(5)).unwrap();
        let status = head_request(&client, &format!("{}/ok", server.url()), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(status, 200);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn head_403_falls_back_to_get_and_classifies_fine_on_200() {
        let mut server = mockito::Server::new_async().await;
        let _head = server
            .mock("HEAD", "/secured")
            .with_status(403)
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/secured")
            .with_status(200)
            .with_body("hello world")
            .create_async()
            .await;
        let client = build_client("salted-test", Duration::from_secs(5)).unwrap();
        let url = format!("{}/secured", server.url());
        let (outcome, used_fallback) = probe_one(&client, &url, Duration::from_secs(5)).await;
        assert_eq!(outcome, Classification::Fine);
        assert!(used_fallback, "403 on HEAD must trigger exactly one full-request fallback");

        let mut store = Store::new();
        if used_fallback {
            store.mark_full_request();
        }
        apply_classification(&mut store, &url, outcome);
        assert_eq!(store.full_requests, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn head_404_classifies_as_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server.mock("HEAD", "/gone").with_status(404).create_async().await;
        let client = build_client("salted-test", Duration::from_secs(5)).unwrap();
        let url = format!("{}/gone", server.url());
        let (outcome, used_fallback) = probe_one(&client, &url, Duration::from_secs(5)).await;
        assert_eq!(outcome, Classification::Error(404));
        assert!(!used_fallback);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn head_429_classifies_as_exception_without_retry() {
        let mut server = mockito::Server::new_async().await;
        let m = server.mock("HEAD", "/busy").with_status(429).create_async().await;
        let client = build_client("salted-test", Duration::from_secs(5)).unwrap();
        let url = format!("{}/busy", server.url());
        let (outcome, used_fallback) = probe_one(&client, &url, Duration::from_secs(5)).await;
        assert_eq!(outcome, Classification::Exception("Rate Limit (429)".to_owned()));
        assert!(!used_fallback, "429 must not trigger a GET retry");
        m.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn end_to_end_pool_marks_store() {
        let mut server = mockito::Server::new_async().await;
        let _m = server.mock("HEAD", "/ok").with_status(200).create_async().await;
        let url = format!("{}/ok", server.url());

        let store = Arc::new(Mutex::new(Store::new()));
        let config = Config {
            num_workers: NumWorkers::Fixed(2),
            ..Config::default()
        };
        let progress: ProgressSink = Arc::new(|_| {});
        run(
            vec![url.clone()],
            &config,
            Arc::clone(&store),
            progress,
            CancellationToken::new(),
        )
        .await;

        let guard = store.lock().await;
        assert!(guard.valid_urls.contains_key(&url));
    }
}
