pub mod article;
pub mod epub;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod html;
pub mod images;
pub mod markdown;
pub mod profile;
pub mod save;

pub use article::Article;
pub use epub::{EpubMeta, markdown_to_epub};
pub use error::{Result, WebclipError};
pub use extract::extract;
pub use fetch::FetchConfig;
pub use fetch::{fetch_file, fetch_stdin, fetch_url};
pub use html::render_styled_html;
#[doc(hidden)]
pub use images::{DownloadConfig, DownloadReport, ImageMap};
pub use images::{download_all, find_image_urls, rewrite_image_urls};
pub use markdown::html_to_markdown;
pub use profile::{SourceProfile, classify};
pub use save::{SaveFormat, SaveOptions, SaveReport, save_article};

/// Fetch a page and extract its article in one step.
pub async fn fetch_article(url: &str, config: &FetchConfig) -> Result<Article> {
    let html = fetch_url(url, config).await?;
    let profile = classify(url);
    Ok(extract(profile, &html, url))
}
