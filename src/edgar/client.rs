// src/edgar/client.rs
use crate::config::Config;
use crate::edgar::pacing::RateLimiter;
use crate::utils::error::EdgarError;
use async_trait::async_trait;
use reqwest::header;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// A single GET against the archive. Implementations map 404 to
/// `EdgarError::NotFound` and 429/5xx to `EdgarError::Transient`.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>, EdgarError>;
}

/// reqwest-backed fetcher with the mandatory User-Agent and request pacing.
pub struct EdgarClient {
    http: reqwest::Client,
    limiter: Arc<dyn RateLimiter>,
}

impl EdgarClient {
    pub fn new(config: &Config, limiter: Arc<dyn RateLimiter>) -> Result<Self, EdgarError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str()) // Set the required User-Agent
            .timeout(config.request_timeout)
            .gzip(true)
            .build()?;

        tracing::debug!("Using User-Agent: {}", config.user_agent);
        Ok(Self { http, limiter })
    }
}

#[async_trait]
impl Fetch for EdgarClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, EdgarError> {
        self.limiter.until_ready().await;
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .header(header::ACCEPT, "application/json,text/html,text/plain,*/*")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, url));
        }

        let body = response.bytes().await?;
        tracing::debug!("Downloaded {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}

/// Maps a non-success status onto the error taxonomy.
pub fn classify_status(status: reqwest::StatusCode, url: &str) -> EdgarError {
    if status == reqwest::StatusCode::NOT_FOUND {
        return EdgarError::NotFound(url.to_string());
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return EdgarError::Transient(format!("HTTP {} for {}", status, url));
    }
    if status == reqwest::StatusCode::FORBIDDEN {
        tracing::warn!("Received 403 Forbidden - check User-Agent and rate limits.");
        return EdgarError::RateLimited;
    }
    EdgarError::Http(status)
}

/// Fetches a body as text, replacing invalid UTF-8.
pub async fn get_text(fetch: &dyn Fetch, url: &str) -> Result<String, EdgarError> {
    let bytes = fetch.get(url).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Single-attempt JSON fetch.
pub async fn get_json<T: DeserializeOwned>(fetch: &dyn Fetch, url: &str) -> Result<T, EdgarError> {
    let bytes = fetch.get(url).await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| EdgarError::Parse(format!("Invalid JSON from {}: {}", url, e)))
}

/// Bounded retries with linearly increasing backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            backoff: config.retry_backoff,
        }
    }

    /// Sleep before retrying after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

/// JSON fetch that retries transient failures (429, 5xx, network errors).
pub async fn get_json_with_retry<T: DeserializeOwned>(
    fetch: &dyn Fetch,
    url: &str,
    policy: &RetryPolicy,
) -> Result<T, EdgarError> {
    let mut attempt = 1;
    loop {
        match get_json(fetch, url).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let wait = policy.delay_after(attempt);
                tracing::warn!(
                    "retry {}/{} for {} after {}; sleeping {:?}",
                    attempt,
                    policy.max_attempts,
                    url,
                    e,
                    wait
                );
                if !wait.is_zero() {
                    tokio::time::sleep(wait).await;
                }
                attempt += 1;
            }
            Err(e) => {
                if e.is_transient() {
                    tracing::error!("GET {} failed after {} attempts: {}", url, attempt, e);
                }
                return Err(e);
            }
        }
    }
}
