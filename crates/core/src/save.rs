//! Persist an extracted article to disk in the chosen output format.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::article::Article;
use crate::epub::{self, EpubMeta};
use crate::error::{Result, WebclipError};
use crate::html::render_styled_html;
use crate::images::{self, DownloadConfig};

/// Output format for a saved article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    Markdown,
    Html,
    Epub,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Markdown => "md",
            SaveFormat::Html => "html",
            SaveFormat::Epub => "epub",
        }
    }
}

impl FromStr for SaveFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "md" | "markdown" => Ok(SaveFormat::Markdown),
            "html" => Ok(SaveFormat::Html),
            "epub" => Ok(SaveFormat::Epub),
            other => Err(format!("unknown format: {other} (expected md, html, or epub)")),
        }
    }
}

/// How to save an article.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    pub format: SaveFormat,
    pub download_images: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self { format: SaveFormat::Markdown, download_images: true }
    }
}

/// What ended up on disk.
#[derive(Debug)]
pub struct SaveReport {
    pub path: PathBuf,
    pub images_total: usize,
    pub images_saved: usize,
}

/// Save `article` under `output_dir` as `<sanitized title>.<ext>`.
///
/// Images are downloaded first (when enabled) so that every format sees the
/// same rewritten local references. Download failures never fail the save;
/// the affected references keep their remote URLs.
pub async fn save_article(article: &Article, output_dir: &Path, options: &SaveOptions) -> Result<SaveReport> {
    std::fs::create_dir_all(output_dir)?;

    let filename = article.filename();
    let images_dir = output_dir.join("images");

    let (map, total, saved) = if options.download_images && !article.image_urls.is_empty() {
        let config = DownloadConfig::for_article(&article.source_url);
        let report = images::download_all(&article.image_urls, &images_dir, &config).await?;
        (report.map, article.image_urls.len(), report.saved)
    } else {
        (images::ImageMap::empty(), 0, 0)
    };

    let path = output_dir.join(format!("{filename}.{}", options.format.extension()));

    match options.format {
        SaveFormat::Markdown => {
            let markdown = article.to_markdown();
            let markdown = images::rewrite_image_urls(&markdown, &map);
            std::fs::write(&path, markdown)?;
        }
        SaveFormat::Html => {
            let content = images::rewrite_image_urls(&article.content_html, &map);
            let page = render_styled_html(&content, &article.title, &article.author, &article.source_url);
            std::fs::write(&path, page)?;
        }
        SaveFormat::Epub => {
            let markdown = article.to_markdown();
            let markdown = images::rewrite_image_urls(&markdown, &map);
            let meta = EpubMeta {
                title: &article.title,
                author: &article.author,
                source_url: &article.source_url,
            };
            let dir = if saved > 0 { Some(images_dir.as_path()) } else { None };
            let bytes = epub::markdown_to_epub(&markdown, &meta, dir)?;
            if bytes.is_empty() {
                return Err(WebclipError::PackagingError("produced an empty archive".to_string()));
            }
            std::fs::write(&path, bytes)?;
        }
    }

    Ok(SaveReport { path, images_total: total, images_saved: saved })
}
