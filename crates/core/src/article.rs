//! The extracted article artifact.
//!
//! [`Article`] is the central data structure: created once by
//! [`extract`](crate::extract::extract), immutable afterwards, and consumed
//! by every renderer. It carries the cleaned content fragment plus the
//! deduplicated, absolute image URL list found inside it.

use chrono::Local;
use regex::Regex;
use serde::Serialize;

use crate::markdown::html_to_markdown;
use crate::profile::SourceProfile;

/// One extracted article, ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    /// Never empty; falls back to a fixed placeholder.
    pub title: String,
    pub author: String,
    pub source_url: String,
    /// The HTML subtree judged to be the article body, chrome removed,
    /// inline styles preserved.
    pub content_html: String,
    /// Absolute image URLs in first-seen order, duplicates removed.
    pub image_urls: Vec<String>,
    pub profile: SourceProfile,
}

impl Article {
    /// Render the article as a Markdown document.
    ///
    /// Output begins with `# <title>`, a citation blockquote (author, source
    /// link, saved date), a horizontal rule, then the converted body.
    pub fn to_markdown(&self) -> String {
        let body = html_to_markdown(&self.content_html);
        let today = Local::now().format("%Y-%m-%d");
        format!(
            "# {}\n\n> **Author**: {}\n> **Source**: {}\n> **Saved**: {}\n\n---\n\n{}\n",
            self.title, self.author, self.source_url, today, body
        )
    }

    /// Serialize title/author/source/profile/image count to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "title": self.title,
            "author": self.author,
            "source_url": self.source_url,
            "profile": self.profile.name(),
            "image_count": self.image_urls.len(),
        })
    }

    /// Filesystem-safe stem derived from the title.
    ///
    /// Drops characters that are invalid on common filesystems, collapses
    /// whitespace to underscores, and caps length at 100 characters.
    pub fn filename(&self) -> String {
        let cleaned = Regex::new(r#"[<>:"/\\|?*]"#).unwrap().replace_all(&self.title, "");
        let cleaned = Regex::new(r"\s+").unwrap().replace_all(cleaned.trim(), "_").to_string();
        let cleaned: String = cleaned.chars().take(100).collect();
        if cleaned.is_empty() { "article".to_string() } else { cleaned }
    }
}
