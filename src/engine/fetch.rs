use crate::error::{BatchDownloadError, FetchError};
use crate::model::{ExportConfig, ExportEvent, FileDescriptor};
use anyhow::{Context, Result};
use bytes::Bytes;
use futures::future::join_all;
use reqwest::Url;
use std::future::Future;
use tokio::sync::mpsc;

/// Query parameter carrying the cache-busting timestamp.
const CACHE_BUST_PARAM: &str = "t";

/// Append a cache-busting parameter derived from `millis` to `url`.
pub fn cache_busted_url_at(url: &str, millis: i128) -> String {
    let (base, fragment) = match url.split_once('#') {
        Some((b, f)) => (b, Some(f)),
        None => (url, None),
    };
    let sep = if base.contains('?') { '&' } else { '?' };
    let mut out = format!("{base}{sep}{CACHE_BUST_PARAM}={millis}");
    if let Some(f) = fragment {
        out.push('#');
        out.push_str(f);
    }
    out
}

/// Append a cache-busting parameter derived from the current time (ms resolution).
///
/// Calls within the same millisecond may return the same string.
pub fn cache_busted_url(url: &str) -> String {
    let millis = time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    cache_busted_url_at(url, millis)
}

/// Fetches the binary body of a single file.
pub trait FileFetcher: Send + Sync {
    fn fetch(
        &self,
        file: &FileDescriptor,
    ) -> impl Future<Output = Result<Bytes, FetchError>> + Send;
}

/// reqwest-backed fetcher. One GET per call, no retries.
#[derive(Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
    base_url: Option<Url>,
    event_tx: Option<mpsc::UnboundedSender<ExportEvent>>,
}

impl HttpFetcher {
    pub fn new(
        cfg: &ExportConfig,
        event_tx: Option<mpsc::UnboundedSender<ExportEvent>>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .build()
            .context("build http client")?;
        let base_url = cfg
            .base_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .context("invalid base url")?;
        Ok(Self {
            http,
            base_url,
            event_tx,
        })
    }

    /// Resolve a (possibly relative) download URL into the absolute, cache-busted target.
    fn resolve(&self, raw: &str) -> Result<Url, FetchError> {
        let busted = cache_busted_url(raw);
        let invalid = |reason: String| FetchError::InvalidUrl {
            url: raw.to_string(),
            reason,
        };
        match Url::parse(&busted) {
            Ok(u) => Ok(u),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base.join(&busted).map_err(|e| invalid(e.to_string())),
                None => Err(invalid("relative url and no base url configured".into())),
            },
            Err(e) => Err(invalid(e.to_string())),
        }
    }
}

impl FileFetcher for HttpFetcher {
    async fn fetch(&self, file: &FileDescriptor) -> Result<Bytes, FetchError> {
        let url = self.resolve(&file.download_url)?;
        tracing::debug!(file = %file.name, %url, "fetching file");

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            // hyper only records the phrase when it differs from the canonical one.
            let status_text = match resp.extensions().get::<hyper::ext::ReasonPhrase>() {
                Some(phrase) => String::from_utf8_lossy(phrase.as_bytes()).into_owned(),
                None => status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| status.as_str().to_string()),
            };
            tracing::warn!(file = %file.name, status = status.as_u16(), %status_text, "fetch failed");
            return Err(FetchError::Status {
                status: status.as_u16(),
                status_text,
            });
        }

        let body = resp.bytes().await?;
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(ExportEvent::FileFetched {
                name: file.name.clone(),
                bytes: body.len() as u64,
            });
        }
        Ok(body)
    }
}

/// Fetch every file concurrently.
///
/// Bodies come back index-aligned with `files`. Every fetch runs to completion
/// before the batch settles; if any of them failed the whole batch fails, the
/// error carries all requested names and successful bodies are dropped.
pub async fn download_blobs<F: FileFetcher>(
    fetcher: &F,
    files: &[FileDescriptor],
) -> Result<Vec<Bytes>, BatchDownloadError> {
    let results = join_all(files.iter().map(|f| fetcher.fetch(f))).await;

    let mut blobs = Vec::with_capacity(results.len());
    let mut failed = 0usize;
    for (file, result) in files.iter().zip(results) {
        match result {
            Ok(body) => blobs.push(body),
            Err(err) => {
                failed += 1;
                tracing::warn!(file = %file.name, error = %err, "file download failed");
            }
        }
    }

    if failed > 0 {
        tracing::warn!(failed, files = files.len(), "batch download failed");
        return Err(BatchDownloadError {
            names: files.iter().map(|f| f.name.clone()).collect(),
        });
    }
    Ok(blobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{self, Route};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn file(name: &str, url: &str) -> FileDescriptor {
        FileDescriptor {
            name: name.into(),
            download_url: url.into(),
            description: format!("{name} description"),
            size: 15,
        }
    }

    fn config(base_url: Option<&str>) -> ExportConfig {
        ExportConfig {
            base_url: base_url.map(str::to_string),
            out_dir: ".".into(),
            timeout: Duration::from_secs(5),
            user_agent: "submission-export/test".into(),
        }
    }

    /// Serves canned bodies after a per-file delay; `None` fails with a 500.
    struct FakeFetcher {
        bodies: HashMap<String, (Option<&'static [u8]>, u64)>,
        finished: AtomicUsize,
    }

    impl FakeFetcher {
        fn new(bodies: HashMap<String, (Option<&'static [u8]>, u64)>) -> Self {
            Self {
                bodies,
                finished: AtomicUsize::new(0),
            }
        }
    }

    impl FileFetcher for FakeFetcher {
        async fn fetch(&self, file: &FileDescriptor) -> Result<Bytes, FetchError> {
            let (body, delay_ms) = self.bodies[&file.name];
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            match body {
                Some(b) => Ok(Bytes::from_static(b)),
                None => Err(FetchError::Status {
                    status: 500,
                    status_text: "Internal Server Error".into(),
                }),
            }
        }
    }

    #[test]
    fn cache_bust_appends_query() {
        assert_eq!(cache_busted_url_at("home/a.jpg", 42), "home/a.jpg?t=42");
        assert_eq!(
            cache_busted_url_at("https://x.test/a?sig=1", 42),
            "https://x.test/a?sig=1&t=42"
        );
        assert_eq!(
            cache_busted_url_at("https://x.test/a#frag", 7),
            "https://x.test/a?t=7#frag"
        );
    }

    #[test]
    fn cache_bust_changes_across_milliseconds() {
        let first = cache_busted_url("home/a.jpg");
        std::thread::sleep(Duration::from_millis(3));
        let second = cache_busted_url("home/a.jpg");
        assert_ne!(first, second);
        assert!(first.starts_with("home/a.jpg?t="));
    }

    #[tokio::test]
    async fn batch_is_index_aligned_regardless_of_completion_order() {
        let fetcher = FakeFetcher::new(HashMap::from([
            ("f1".to_string(), (Some(&b"one"[..]), 40)),
            ("f2".to_string(), (Some(&b"two"[..]), 0)),
        ]));
        let files = [file("f1", "home/f1"), file("f2", "home/f2")];
        let blobs = download_blobs(&fetcher, &files).await.unwrap();
        assert_eq!(blobs, vec![Bytes::from("one"), Bytes::from("two")]);
    }

    #[tokio::test]
    async fn batch_fails_with_all_requested_names() {
        let fetcher = FakeFetcher::new(HashMap::from([
            ("f1".to_string(), (Some(&b"one"[..]), 0)),
            ("f2".to_string(), (None, 5)),
        ]));
        let files = [file("f1", "home/f1"), file("f2", "home/f2")];
        let err = download_blobs(&fetcher, &files).await.unwrap_err();
        assert_eq!(err.names, ["f1", "f2"]);
    }

    #[tokio::test]
    async fn early_failure_lets_slower_fetches_finish() {
        let fetcher = FakeFetcher::new(HashMap::from([
            ("f1".to_string(), (None, 0)),
            ("f2".to_string(), (Some(&b"two"[..]), 30)),
        ]));
        let files = [file("f1", "home/f1"), file("f2", "home/f2")];

        let err = download_blobs(&fetcher, &files).await.unwrap_err();

        assert_eq!(err.names, ["f1", "f2"]);
        assert_eq!(fetcher.finished.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_batch_resolves_empty() {
        let fetcher = FakeFetcher::new(HashMap::new());
        assert!(download_blobs(&fetcher, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn http_fetch_resolves_relative_url_and_busts_cache() {
        let server = test_server::start(vec![("/home/test-file1.jpg", Route::ok(b"jpeg-bytes"))]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let fetcher = HttpFetcher::new(&config(Some(server.base_url.as_str())), Some(tx)).unwrap();

        let body = fetcher
            .fetch(&file("test-file1.jpg", "home/test-file1.jpg"))
            .await
            .unwrap();

        assert_eq!(body, Bytes::from("jpeg-bytes"));
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("/home/test-file1.jpg?t="));
        match rx.try_recv().unwrap() {
            ExportEvent::FileFetched { name, bytes } => {
                assert_eq!(name, "test-file1.jpg");
                assert_eq!(bytes, 10);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_fetch_non_success_carries_status_text() {
        let server = test_server::start(vec![("/gone.pdf", Route::status(404, "Not Found"))]);
        let fetcher = HttpFetcher::new(&config(None), None).unwrap();
        let url = format!("{}gone.pdf", server.base_url);

        let err = fetcher.fetch(&file("gone.pdf", &url)).await.unwrap_err();

        match err {
            FetchError::Status {
                status,
                status_text,
            } => {
                assert_eq!(status, 404);
                assert_eq!(status_text, "Not Found");
            }
            other => panic!("unexpected error: {other}"),
        }
        // No retry.
        assert_eq!(server.requests().len(), 1);
    }

    async fn status_error_for(route: Route) -> (u16, String) {
        let server = test_server::start(vec![("/purged.pdf", route)]);
        let fetcher = HttpFetcher::new(&config(None), None).unwrap();
        let url = format!("{}purged.pdf", server.base_url);
        match fetcher.fetch(&file("purged.pdf", &url)).await.unwrap_err() {
            FetchError::Status {
                status,
                status_text,
            } => (status, status_text),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn http_fetch_keeps_custom_reason_phrase() {
        let (status, text) = status_error_for(Route::status(404, "Submission Purged")).await;
        assert_eq!(status, 404);
        assert_eq!(text, "Submission Purged");
    }

    #[tokio::test]
    async fn http_fetch_keeps_phrase_for_nonstandard_code() {
        let (status, text) = status_error_for(Route::status(599, "Upstream Gone")).await;
        assert_eq!(status, 599);
        assert_eq!(text, "Upstream Gone");
    }

    #[tokio::test]
    async fn relative_url_without_base_is_rejected() {
        let fetcher = HttpFetcher::new(&config(None), None).unwrap();
        let err = fetcher.fetch(&file("a.jpg", "home/a.jpg")).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }
}
