// Page sources: where HTML comes from.
//
// The collector only needs "give me the page at this URL". Production uses a
// throttled HTTP client; tests plug in canned pages.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use puckrank_core::config::ScraperConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("no page for {url}")]
    NotFound { url: String },
}

/// Anything that can hand back the HTML at a URL.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// HTTP page source with a fixed pause before every request.
pub struct HttpPageSource {
    client: reqwest::Client,
    delay: Duration,
}

impl HttpPageSource {
    pub fn new(config: &ScraperConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            client,
            delay: config.rate_limit_delay(),
        })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        tokio::time::sleep(self.delay).await;
        debug!("GET {url}");

        let http_error = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;
        debug!("fetched {} bytes from {url}", body.len());
        Ok(body)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
