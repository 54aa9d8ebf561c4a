//! HTTP probing. One fetch trait for the whole pipeline so tests can
//! swap in canned responses, plus the status-band policies that decide
//! what "reachable" means per call site.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use tracing::debug;

// Plenty of real sites answer 403 to obvious scripts while serving the
// same page to a browser, so the probe looks like one.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANG: &str = "en-US,en;q=0.5";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResponse>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANG));
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(FetchResponse { status, body })
    }
}

/// Which status codes count as an answer. Picking the band is a per-call
/// decision: existence checks tolerate bot walls, blind path guessing
/// cannot afford to treat 404 as a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBand {
    /// 200-499. The site exists even if it refuses automated clients.
    Exists,
    /// 200-399. The exact page answered, redirects included.
    Confirmed,
    /// 200-299. Success only.
    Strict,
}

impl StatusBand {
    pub fn contains(self, status: u16) -> bool {
        match self {
            StatusBand::Exists => (200..500).contains(&status),
            StatusBand::Confirmed => (200..400).contains(&status),
            StatusBand::Strict => (200..300).contains(&status),
        }
    }
}

/// True when `url` answers with a status inside `band`. Transport errors
/// and empty URLs are plain "unreachable", never failures.
pub async fn is_reachable(fetcher: &dyn Fetcher, url: &str, band: StatusBand) -> bool {
    if url.trim().is_empty() {
        return false;
    }
    match fetcher.fetch(url).await {
        Ok(resp) => band.contains(resp.status),
        Err(err) => {
            debug!("unreachable {url}: {err}");
            false
        }
    }
}

/// Page body regardless of status code. Soft-404s and bot walls often
/// still carry the listings we want to read.
pub async fn fetch_content(fetcher: &dyn Fetcher, url: &str) -> Option<String> {
    if url.trim().is_empty() {
        return None;
    }
    match fetcher.fetch(url).await {
        Ok(resp) if !resp.body.is_empty() => Some(resp.body),
        Ok(resp) => {
            debug!("empty body from {url} (status {})", resp.status);
            None
        }
        Err(err) => {
            debug!("fetch failed for {url}: {err}");
            None
        }
    }
}
