//! Page fetching from URLs, files, and stdin.
//!
//! HTTP retrieval uses browser-like headers so platforms that gate on
//! fingerprint (WeChat in particular) serve the full article markup.

use std::fs;
use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::{Result, WebclipError};

/// HTTP client configuration for fetching article pages.
///
/// Immutable per request; batch callers build one per article rather than
/// mutating shared state.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// Fetch the raw HTML of an article page.
///
/// Performs a single GET, following redirects, with the configured timeout.
/// A non-success status is reported as [`WebclipError::PageUnavailable`];
/// a timeout maps to [`WebclipError::Timeout`].
pub async fn fetch_url(url: &str, config: &FetchConfig) -> Result<String> {
    let parsed_url = Url::parse(url).map_err(|e| WebclipError::InvalidUrl(e.to_string()))?;

    if parsed_url.scheme() != "http" && parsed_url.scheme() != "https" {
        return Err(WebclipError::InvalidUrl(
            "URL must include a scheme (http:// or https://)".to_string(),
        ));
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .build()
        .map_err(WebclipError::HttpError)?;

    let response = client
        .get(parsed_url)
        .header("User-Agent", &config.user_agent)
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        )
        .header("Accept-Language", "zh-CN,zh;q=0.9,en;q=0.8")
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                WebclipError::Timeout { timeout: config.timeout }
            } else {
                WebclipError::HttpError(e)
            }
        })?;

    if !response.status().is_success() {
        return Err(WebclipError::PageUnavailable { status: response.status().as_u16() });
    }

    let content = response.text().await?;

    Ok(content)
}

/// Read HTML content from a local file.
pub fn fetch_file(path: &str) -> Result<String> {
    fs::read_to_string(path).map_err(WebclipError::from)
}

/// Read HTML content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(WebclipError::from)?;

    Ok(buffer)
}
