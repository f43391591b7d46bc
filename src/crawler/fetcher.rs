//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with browser-like headers, timeout and proxy
//! - GET requests with bounded retry on transient failures
//! - Handing successful bodies to the raw response archive
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Timeout | Retry after delay |
//! | Connection error | Retry after delay |
//! | Non-2xx status | Retry after delay |
//! | Body read or decode error | Fail immediately |
//! | Invalid request | Fail immediately |
//!
//! Once attempts run out the caller gets `HarvestError::Fetch`.

use crate::config::{Config, HttpConfig, ProxyConfig};
use crate::crawler::scheduler::{RequestLimiter, RetryPolicy};
use crate::output::ResponseArchive;
use crate::url::response_id;
use crate::{ConfigError, HarvestError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Proxy};
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `http` - Headers and timeout
/// * `proxy` - Optional outbound proxy
///
/// # Example
///
/// ```no_run
/// use metro_harvest::config::HttpConfig;
/// use metro_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default(), None).unwrap();
/// ```
pub fn build_http_client(
    http: &HttpConfig,
    proxy: Option<&ProxyConfig>,
) -> Result<Client, HarvestError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(&http.accept_language).map_err(|e| {
            ConfigError::Validation(format!(
                "Invalid accept_language '{}': {}",
                http.accept_language, e
            ))
        })?,
    );

    let mut builder = Client::builder()
        .user_agent(http.user_agent.as_str())
        .default_headers(headers)
        .timeout(http.timeout())
        .gzip(true)
        .brotli(true)
        .deflate(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(build_proxy(proxy)?);
        tracing::info!("Routing requests through {} proxy {}", proxy.kind.scheme(), proxy.url());
    }

    Ok(builder.build()?)
}

fn build_proxy(config: &ProxyConfig) -> Result<Proxy, reqwest::Error> {
    let proxy = Proxy::all(config.url())?;
    Ok(match &config.username {
        Some(username) => proxy.basic_auth(username, config.password.as_deref().unwrap_or("")),
        None => proxy,
    })
}

/// Retrieves pages for one crawl run
///
/// The underlying connection pool lives exactly as long as the fetcher and is
/// released when it is dropped, whichever way the run ends.
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
    limiter: RequestLimiter,
    archive: ResponseArchive,
}

impl Fetcher {
    pub fn new(
        client: Client,
        policy: RetryPolicy,
        limiter: RequestLimiter,
        archive: ResponseArchive,
    ) -> Self {
        Self {
            client,
            policy,
            limiter,
            archive,
        }
    }

    /// Builds a fetcher from the transport, proxy and raw response settings
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.http, config.proxy.as_ref())?;
        let archive = ResponseArchive::new(
            config.output.responses_path(),
            config.output.save_raw_responses,
        );

        Ok(Self::new(
            client,
            RetryPolicy::from_config(&config.http),
            RequestLimiter::new(config.http.max_concurrent_requests as usize),
            archive,
        ))
    }

    /// Fetches a URL and returns its body, retrying transient failures
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The full response body
    /// * `Err(HarvestError::Fetch)` - Every allowed attempt failed
    /// * `Err(HarvestError::Http)` - A failure that retrying cannot fix
    pub async fn fetch(&self, url: &Url) -> Result<String, HarvestError> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.attempt(url).await {
                Ok(body) => {
                    tracing::info!("Loaded {}", url);
                    self.archive_body(url, &body).await;
                    return Ok(body);
                }
                Err(AttemptError::Fatal(source)) => {
                    tracing::error!("Request to {} failed: {}", url, source);
                    return Err(HarvestError::Http {
                        url: url.to_string(),
                        source,
                    });
                }
                Err(AttemptError::Transient(source)) => {
                    tracing::error!(
                        "Request to {} failed: {} (attempt {}/{})",
                        url,
                        source,
                        attempts,
                        self.policy.max_attempts
                    );
                }
                Err(AttemptError::Closed) => break,
            }

            if !self.policy.should_retry(attempts) {
                break;
            }

            if let Some(delay) = self.policy.delay_after(attempts) {
                tracing::debug!("Retrying {} in {:?}", url, delay);
                tokio::time::sleep(delay).await;
            }
        }

        tracing::error!("Giving up on {} after {} attempts", url, attempts);
        Err(HarvestError::Fetch {
            url: url.to_string(),
            attempts,
        })
    }

    /// One GET request, holding a limiter slot only while the request is live
    async fn attempt(&self, url: &Url) -> Result<String, AttemptError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| AttemptError::Closed)?;
        tracing::trace!("GET {} ({} requests in flight)", url, self.limiter.in_flight());

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(AttemptError::classify)?;

        response.text().await.map_err(AttemptError::classify)
    }

    async fn archive_body(&self, url: &Url, body: &str) {
        if !self.archive.is_enabled() {
            return;
        }

        let id = response_id(url.as_str(), chrono::Local::now());
        if let Err(e) = self.archive.save(body, &id).await {
            tracing::warn!("Failed to save raw response for {}: {}", url, e);
        }
    }
}

/// Outcome of a single failed attempt
#[derive(Debug)]
enum AttemptError {
    /// Timeout, connection or status failure; worth another attempt
    Transient(reqwest::Error),

    /// Request could not be built or the body could not be read
    Fatal(reqwest::Error),

    /// The request limiter was shut down
    Closed,
}

impl AttemptError {
    fn classify(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() || error.is_status() || error.is_request() {
            Self::Transient(error)
        } else {
            Self::Fatal(error)
        }
    }
}
