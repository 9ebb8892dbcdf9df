use std::time::Duration;

use url::Url;

use crate::errors::WatchError;

/// Default per-request timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of page bodies for the watcher.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, WatchError>;
}

/// Parse a watchable page address; only http and https are accepted.
pub fn parse_page_url(raw: &str) -> Result<Url, WatchError> {
    let raw = raw.trim();
    let parsed = Url::parse(raw).map_err(|_| WatchError::InvalidUrl(raw.to_string()))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        _ => Err(WatchError::InvalidUrl(raw.to_string())),
    }
}

#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, WatchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("novilunio-watch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WatchError::Fetch {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, WatchError> {
        let parsed = parse_page_url(url)?;

        let failed = |e: reqwest::Error| WatchError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(failed)?
            .error_for_status()
            .map_err(failed)?;

        response.text().await.map_err(failed)
    }
}
