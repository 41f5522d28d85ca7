use async_trait::async_trait;
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// All fetches go through this relay; targets are never contacted directly.
pub const PROXY_ENDPOINT: &str = "https://api.allorigins.win/raw";

pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:89.0) Gecko/20100101 Firefox/89.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 14_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Windows NT 6.1; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
];

const MAX_ATTEMPTS: u32 = 5;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid target URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to create request: {0}")]
    Request(reqwest::Error),

    #[error("failed to fetch URL: {0}")]
    Transport(reqwest::Error),

    #[error("rate limited (HTTP 429)")]
    RateLimited { retry_after: Option<u64> },

    #[error("non-200 response: {0}")]
    Status(StatusCode),

    #[error("failed to read response body: {0}")]
    Body(reqwest::Error),
}

impl FetchError {
    /// Transient failures worth another attempt. Everything else is terminal
    /// for the URL.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Transport(_) | FetchError::RateLimited { .. }
        )
    }

    /// The server-requested wait, when a 429 carried a usable Retry-After.
    pub fn retry_after_hint(&self) -> Option<u64> {
        match self {
            FetchError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limit_ms: u64,
    pub honor_retry_after: bool,
}

impl RetryPolicy {
    pub fn new(rate_limit_ms: u64, honor_retry_after: bool) -> Self {
        RetryPolicy {
            max_attempts: MAX_ATTEMPTS,
            rate_limit_ms,
            honor_retry_after,
        }
    }

    /// Uniform delay in `[rate/2, rate*3/2)`. Pacing and backoff share this
    /// distribution so concurrent retries stay desynchronized.
    pub fn jitter_delay(&self) -> Duration {
        if self.rate_limit_ms == 0 {
            return Duration::ZERO;
        }
        let half = self.rate_limit_ms / 2;
        let ms = rand::thread_rng().gen_range(half..self.rate_limit_ms + half);
        Duration::from_millis(ms)
    }

    /// Delay before the next attempt: the server-requested wait when we honor
    /// Retry-After and one was given, jitter otherwise.
    pub fn backoff_delay(&self, retry_after: Option<u64>) -> Duration {
        match retry_after {
            Some(secs) if self.honor_retry_after => Duration::from_secs(secs),
            _ => self.jitter_delay(),
        }
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Fetches target pages through the relay proxy, pacing and retrying per its
/// `RetryPolicy` and rotating the User-Agent on every call.
pub struct ProxyFetcher {
    client: Client,
    endpoint: String,
    policy: RetryPolicy,
}

impl ProxyFetcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_endpoint(PROXY_ENDPOINT, policy)
    }

    pub fn with_endpoint(endpoint: &str, policy: RetryPolicy) -> Self {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        ProxyFetcher {
            client,
            endpoint: endpoint.to_string(),
            policy,
        }
    }

    fn proxy_url(&self, target: &str) -> String {
        format!("{}?url={}", self.endpoint, urlencoding::encode(target))
    }

    fn random_user_agent(&self) -> &'static str {
        USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0])
    }

    async fn attempt(&self, proxy_url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(proxy_url)
            .header(USER_AGENT, self.random_user_agent())
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    FetchError::Request(e)
                } else {
                    FetchError::Transport(e)
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited {
                retry_after: parse_retry_after(response.headers()),
            });
        }
        if status != StatusCode::OK {
            return Err(FetchError::Status(status));
        }

        response.text().await.map_err(FetchError::Body)
    }
}

#[async_trait]
impl PageFetcher for ProxyFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        // Validate the target but forward the original string untouched.
        Url::parse(url)?;
        let proxy_url = self.proxy_url(url);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self.attempt(&proxy_url).await {
                Ok(body) => {
                    info!("fetched {} ({} bytes)", url, body.len());
                    return Ok(body);
                }
                Err(err) => err,
            };

            if attempt >= self.policy.max_attempts || !err.is_retryable() {
                return Err(err);
            }

            let delay = self.policy.backoff_delay(err.retry_after_hint());
            warn!(
                "attempt {}/{} for {} failed: {}; retrying in {:?}",
                attempt, self.policy.max_attempts, url, err, delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}
