//! Image reference discovery, download, and URL rewriting.
//!
//! [`find_image_urls`] scans a content fragment for image sources and
//! normalizes them to absolute URLs. [`download_all`] fetches each one
//! sequentially with browser-like headers and builds an [`ImageMap`]: every
//! input URL gets exactly one entry, a relative `images/<name>.<ext>` path on
//! success or the original URL unchanged on failure. A single failed image
//! never aborts the batch. [`rewrite_image_urls`] then substitutes mapped
//! URLs in rendered text as a one-shot textual replacement.

use std::path::Path;
use std::time::Duration;

use chrono::Local;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use crate::error::Result;

/// Delay between sequential downloads, to stay under rate limits.
const DOWNLOAD_DELAY_MS: u64 = 100;

/// Mapping from original absolute image URL to its destination.
///
/// Entries keep input order. The value is either a relative local path
/// (`images/<name>.<ext>`) or the original URL when the download failed.
#[derive(Debug, Clone, Default)]
pub struct ImageMap {
    entries: Vec<(String, String)>,
}

impl ImageMap {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, original: String, destination: String) {
        self.entries.push((original, destination));
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(url, _)| url == original)
            .map(|(_, dest)| dest.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(url, dest)| (url.as_str(), dest.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of one download batch: the mapping plus visibility counts.
#[derive(Debug)]
pub struct DownloadReport {
    pub map: ImageMap,
    pub saved: usize,
    pub failed: usize,
}

/// Per-batch download configuration.
///
/// Threaded explicitly into every call; there is no shared mutable header
/// state between articles.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    pub user_agent: String,
    /// Referer sent with every image request; should be the article URL.
    pub referer: String,
}

impl DownloadConfig {
    /// Browser-like defaults with the article URL as referer.
    pub fn for_article(article_url: &str) -> Self {
        Self {
            timeout: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            referer: article_url.to_string(),
        }
    }
}

/// Discover image URLs in a content fragment, normalized and deduplicated.
///
/// Reads `data-src` in preference to `src`, skips data URIs, expands
/// protocol-relative URLs to https, and resolves relative forms against
/// `base_url`. Same-origin image-proxy paths (`/_next/image?url=...`) are
/// reconstructed against the page origin rather than path-joined. Order is
/// first-seen; duplicates are dropped.
pub fn find_image_urls(fragment: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_fragment(fragment);
    let selector = Selector::parse("img").unwrap();
    let base = Url::parse(base_url).ok();

    let mut urls = Vec::new();
    for element in document.select(&selector) {
        let src = element
            .value()
            .attr("data-src")
            .or_else(|| element.value().attr("src"));
        let Some(src) = src else { continue };
        if src.starts_with("data:") {
            continue;
        }

        // The parser already decodes attribute entities; this covers
        // double-encoded URLs that survive it.
        let src = decode_url_entities(src);

        let resolved = if src.starts_with("//") {
            Some(format!("https:{src}"))
        } else if src.starts_with('/') {
            match &base {
                Some(base) if src.contains("/_next/image?url=") => {
                    Some(format!("{}://{}{}", base.scheme(), base.authority(), src))
                }
                Some(base) => base.join(&src).ok().map(String::from),
                None => None,
            }
        } else if src.starts_with("http") {
            Some(src.clone())
        } else {
            base.as_ref().and_then(|b| b.join(&src).ok()).map(String::from)
        };

        if let Some(url) = resolved
            && !urls.contains(&url)
        {
            urls.push(url);
        }
    }
    urls
}

fn decode_url_entities(url: &str) -> String {
    url.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
}

/// Download every URL into `images_dir`, sequentially and in input order.
///
/// Each outcome is resolved independently: on any failure (network error,
/// timeout, non-2xx) the map records the original URL unchanged and the
/// batch continues. No retries.
pub async fn download_all(urls: &[String], images_dir: &Path, config: &DownloadConfig) -> Result<DownloadReport> {
    let mut report = DownloadReport { map: ImageMap::empty(), saved: 0, failed: 0 };
    if urls.is_empty() {
        return Ok(report);
    }

    std::fs::create_dir_all(images_dir)?;

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .build()?;

    for (i, url) in urls.iter().enumerate() {
        let stem = format!("{}_{}", Local::now().format("%Y%m%d_%H%M%S%3f"), i + 1);
        match download_one(&client, url, images_dir, &stem, config).await {
            Some(relative) => {
                report.map.insert(url.clone(), relative);
                report.saved += 1;
            }
            None => {
                report.map.insert(url.clone(), url.clone());
                report.failed += 1;
            }
        }
        tokio::time::sleep(Duration::from_millis(DOWNLOAD_DELAY_MS)).await;
    }

    Ok(report)
}

/// One GET; `None` on any failure so the caller records a pass-through.
async fn download_one(
    client: &Client,
    url: &str,
    images_dir: &Path,
    stem: &str,
    config: &DownloadConfig,
) -> Option<String> {
    // Image-proxy endpoints check fetch metadata and want modern formats.
    let proxied = url.contains("notion.com") || url.contains("/_next/image");
    let accept = if proxied {
        "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8"
    } else {
        "image/webp,image/apng,image/*,*/*;q=0.8"
    };

    let mut request = client
        .get(url)
        .header("User-Agent", &config.user_agent)
        .header("Referer", &config.referer)
        .header("Accept", accept);

    if proxied {
        request = request
            .header("sec-fetch-dest", "image")
            .header("sec-fetch-mode", "no-cors")
            .header("sec-fetch-site", "same-origin");
    }

    let response = request.send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = response.bytes().await.ok()?;

    let ext = extension_for(url, content_type.as_deref());
    let name = format!("{stem}.{ext}");
    std::fs::write(images_dir.join(&name), &bytes).ok()?;

    Some(format!("images/{name}"))
}

/// File extension from the response content type, falling back to the URL
/// suffix, then `jpg`.
fn extension_for(url: &str, content_type: Option<&str>) -> &'static str {
    match content_type {
        Some("image/jpeg") | Some("image/jpg") => return "jpg",
        Some("image/png") => return "png",
        Some("image/gif") => return "gif",
        Some("image/webp") => return "webp",
        Some("image/bmp") => return "bmp",
        Some("image/svg+xml") => return "svg",
        Some("image/avif") => return "avif",
        _ => {}
    }

    let suffix = Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp|bmp|svg|avif)(\?|$)").unwrap();
    match suffix.captures(url).map(|c| c[1].to_lowercase()).as_deref() {
        Some("jpg") | Some("jpeg") => "jpg",
        Some("png") => "png",
        Some("gif") => "gif",
        Some("webp") => "webp",
        Some("bmp") => "bmp",
        Some("svg") => "svg",
        Some("avif") => "avif",
        _ => "jpg",
    }
}

/// Substitute every mapped URL in `text` with its destination.
///
/// Plain substring replacement, applied to all occurrences. Query-bearing
/// URLs (image proxies) are also replaced in their path+query form, which is
/// how they appear in same-origin markup.
pub fn rewrite_image_urls(text: &str, map: &ImageMap) -> String {
    let mut output = text.to_string();
    for (original, destination) in map.iter() {
        if original == destination {
            continue;
        }
        output = output.replace(original, destination);

        if let Ok(parsed) = Url::parse(original)
            && let Some(query) = parsed.query()
        {
            let relative = format!("{}?{}", parsed.path(), query);
            output = output.replace(&relative, destination);
        }
    }
    output
}
