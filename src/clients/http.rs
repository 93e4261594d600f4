use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use crate::error::Error;

/// Upper bound on pages followed for one paginated query
pub const MAX_PAGES: usize = 100;

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure
    pub initial_backoff: Duration,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based)
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Whether a failed response is worth retrying
#[must_use]
pub fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::REQUEST_TIMEOUT
}

/// One page of a paginated REST listing
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// Blocking JSON client for one collaborator service.
///
/// Requests run on a private tokio runtime so the resolvers, which are
/// synchronous and run on rayon threads, can call it directly.
#[derive(Clone)]
pub struct HttpClient {
    service: &'static str,
    base_url: Url,
    client: reqwest::Client,
    runtime: Arc<Runtime>,
    retry: RetryPolicy,
    not_found: Vec<StatusCode>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("service", &self.service)
            .field("base_url", &self.base_url.as_str())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a client for `service` rooted at `base_url`
    ///
    /// # Errors
    ///
    /// `Error::ExternalService` for an invalid base URL or when the HTTP
    /// client or runtime cannot be built.
    pub fn new(service: &'static str, base_url: &str, retry: RetryPolicy) -> Result<Self, Error> {
        let failed = |message: String| Error::ExternalService {
            service: service.to_string(),
            message,
        };

        // A trailing slash makes Url::join append to the path rather than replace it
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| failed(format!("invalid base URL '{base_url}': {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(retry.timeout)
            .user_agent(concat!("bedmaker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| failed(format!("failed to create HTTP client: {e}")))?;
        let runtime = Runtime::new().map_err(|e| failed(format!("failed to start runtime: {e}")))?;

        Ok(Self {
            service,
            base_url,
            client,
            runtime: Arc::new(runtime),
            retry,
            not_found: vec![StatusCode::NOT_FOUND],
        })
    }

    /// Treat these statuses as "no such record" rather than failures
    #[must_use]
    pub fn with_not_found(mut self, statuses: &[StatusCode]) -> Self {
        self.not_found = statuses.to_vec();
        self
    }

    #[must_use]
    pub fn service(&self) -> &'static str {
        self.service
    }

    /// Build a URL below the base URL
    ///
    /// # Errors
    ///
    /// `Error::ExternalService` when the path does not form a valid URL.
    pub fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, Error> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| self.failure(format!("invalid path '{path}': {e}")))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    pub(crate) fn failure(&self, message: impl Into<String>) -> Error {
        Error::ExternalService {
            service: self.service.to_string(),
            message: message.into(),
        }
    }

    /// GET a JSON document, retrying transient failures.
    ///
    /// Returns `Ok(None)` for a "not found" status.
    ///
    /// # Errors
    ///
    /// `Error::ExternalService` once retries are exhausted, for a
    /// non-retryable status, or for a body that does not parse.
    pub fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<Option<T>, Error> {
        self.runtime.block_on(self.get_json_async(url))
    }

    /// GET every page of a paginated listing
    ///
    /// # Errors
    ///
    /// As for [`HttpClient::get_json`], plus `Error::ExternalService` when the
    /// listing exceeds [`MAX_PAGES`].
    pub fn get_pages<T: DeserializeOwned>(&self, url: &Url) -> Result<Vec<T>, Error> {
        let mut results = Vec::new();
        let mut next = Some(url.clone());

        for _ in 0..MAX_PAGES {
            let Some(url) = next.take() else {
                return Ok(results);
            };
            let Some(page) = self.get_json::<Page<T>>(&url)? else {
                return Ok(results);
            };
            results.extend(page.results);
            next = page
                .next
                .map(|n| Url::parse(&n).map_err(|e| self.failure(format!("invalid next page URL '{n}': {e}"))))
                .transpose()?;
        }
        if next.is_some() {
            return Err(self.failure(format!("more than {MAX_PAGES} pages for {url}")));
        }
        Ok(results)
    }

    async fn get_json_async<T: DeserializeOwned>(&self, url: &Url) -> Result<Option<T>, Error> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!("GET {url} ({}, attempt {attempt})", self.service);

            let error = match self.client.get(url.clone()).header("Accept", "application/json").send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body = response
                            .bytes()
                            .await
                            .map_err(|e| self.failure(format!("failed to read response from {url}: {e}")))?;
                        return serde_json::from_slice(&body)
                            .map(Some)
                            .map_err(|e| self.failure(format!("unexpected response from {url}: {e}")));
                    }
                    if self.not_found.contains(&status) {
                        debug!("{url} returned {status}; treating as not found");
                        return Ok(None);
                    }
                    if !is_retryable(status) {
                        return Err(self.failure(format!("{url} returned {status}")));
                    }
                    format!("{url} returned {status}")
                }
                Err(e) => format!("request to {url} failed: {e}"),
            };

            if attempt >= self.retry.max_attempts {
                return Err(self.failure(format!("{error} (gave up after {attempt} attempts)")));
            }
            let delay = self.retry.backoff(attempt);
            warn!("{error}; retrying in {} ms", delay.as_millis());
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.backoff(1), Duration::from_millis(250));
        assert_eq!(retry.backoff(2), Duration::from_millis(500));
        assert_eq!(retry.backoff(3), Duration::from_millis(1000));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_url_building() {
        let client = HttpClient::new("test", "https://example.org/api", RetryPolicy::default()).unwrap();
        let url = client
            .url("/transcript/", &[("stable_id", "NM_007294"), ("expand", "exons,genes")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.org/api/transcript/?stable_id=NM_007294&expand=exons%2Cgenes"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpClient::new("test", "not a url", RetryPolicy::default()),
            Err(Error::ExternalService { .. })
        ));
    }

    #[test]
    fn test_page_defaults() {
        let page: Page<u32> = serde_json::from_str(r#"{"count": 0}"#).unwrap();
        assert!(page.next.is_none());
        assert!(page.results.is_empty());
    }
}
