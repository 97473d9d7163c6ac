use crate::config::Config;
use crate::constants::PLAYER_PLACEHOLDER;
use crate::error::{Result, ScraperError};
use crate::rate_limiter::{Limits, RateLimiter};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Retrieves the raw body of a page
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }
}

pub struct HttpFetcher {
    client: Client,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(client: Client, limiter: RateLimiter, retry: RetryPolicy) -> Self {
        Self {
            client,
            limiter,
            retry,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/json;q=0.9,*/*;q=0.8"),
        );
        if let Some(token) = &config.site.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ScraperError::Config(format!("invalid token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(config.site.user_agent.clone())
            .timeout(config.site.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| ScraperError::Config(format!("failed to build HTTP client: {e}")))?;

        let limiter = RateLimiter::new(Limits {
            requests_per_min: Some(config.limits.requests_per_min),
            min_delay: config.limits.delay(),
        });
        let retry = RetryPolicy {
            max_retries: config.limits.max_retries,
            delay: config.limits.retry_delay(),
        };

        Ok(Self::new(client, limiter, retry))
    }

    async fn get_once(&self, url: &str) -> Result<String> {
        self.limiter.acquire().await;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Network {
                url: url.to_string(),
                status: Some(status.as_u16()),
                message: format!("request failed with status: {status}"),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.get_once(url).await {
                Ok(body) => {
                    debug!("Fetched {} bytes", body.len());
                    return Ok(body);
                }
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(
                        "Request failed ({}), retry {}/{}",
                        e, attempt, self.retry.max_retries
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Builds the profile URL for a player, percent-encoding the name.
pub fn profile_url(template: &str, player: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(player.as_bytes()).collect();
    // form encoding uses '+' for spaces, which is wrong inside a path
    template.replace(PLAYER_PLACEHOLDER, &encoded.replace('+', "%20"))
}
