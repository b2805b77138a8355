//! Per-profile content extraction.
//!
//! Each [`SourceProfile`] carries ordered rule chains for title, author, and
//! content region. Every rule is an independent regex matcher; the extractor
//! evaluates them in order and takes the first non-empty capture. A rule that
//! fails to match simply advances the chain, and exhausting every chain
//! degrades to whole-page-minus-chrome with a placeholder title. Extraction
//! is total: it never returns an error, for any input string.

use regex::Regex;

use crate::article::Article;
use crate::images::find_image_urls;
use crate::profile::SourceProfile;

/// Placeholder title used when every title rule comes up empty.
pub const UNTITLED: &str = "Untitled Article";

/// Placeholder author used when every author rule comes up empty.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Ordered rule chains for one extraction profile.
///
/// Title and author patterns must expose the match as capture group 1.
/// Content patterns capture the article body region as group 1.
struct ProfileRules {
    title: &'static [&'static str],
    /// Trailing platform-name suffix stripped from the cleaned title.
    title_suffix: Option<&'static str>,
    author: &'static [&'static str],
    author_fallback: &'static str,
    content: &'static [&'static str],
    /// Chrome elements removed from a matched content region.
    content_chrome: &'static [&'static str],
}

const WECHAT_RULES: ProfileRules = ProfileRules {
    title: &[
        r#"(?is)<meta[^>]*property="og:title"[^>]*content="([^"]*)""#,
        r#"(?is)<h1[^>]*class="[^"]*rich_media_title[^"]*"[^>]*>(.*?)</h1>"#,
        r"(?is)<title[^>]*>(.*?)</title>",
    ],
    title_suffix: Some(r"(?i)\s*[-_|]\s*(微信公众号|weixin).*$"),
    author: &[
        r#"(?is)<meta[^>]*name="author"[^>]*content="([^"]*)""#,
        r#"(?i)var\s+nickname\s*=\s*["']([^"']+)["']"#,
    ],
    author_fallback: UNKNOWN_AUTHOR,
    content: &[
        r#"(?is)<div[^>]*id="js_content"[^>]*>(.*?)</div>\s*(?:<div[^>]*class="[^"]*rich_media_tool|<script)"#,
        r#"(?is)<div[^>]*class="[^"]*rich_media_content[^"]*"[^>]*>(.*?)</div>"#,
    ],
    content_chrome: &["script", "style"],
};

const NOTION_RULES: ProfileRules = ProfileRules {
    title: &[
        r#"(?is)<meta[^>]*property="og:title"[^>]*content="([^"]*)""#,
        r#"(?is)<meta[^>]*name="title"[^>]*content="([^"]*)""#,
        r"(?is)<h1[^>]*>(.*?)</h1>",
        r"(?is)<title[^>]*>(.*?)</title>",
    ],
    title_suffix: Some(r"(?i)\s*[-_|]\s*Notion.*$"),
    author: &[
        r#"(?is)<meta[^>]*name="author"[^>]*content="([^"]*)""#,
        r#""authorName"\s*:\s*"([^"]*)""#,
    ],
    author_fallback: "Notion",
    content: &[
        r#"(?is)<div[^>]*class="[^"]*notion-page-content[^"]*"[^>]*>(.*?)</div>\s*(?:<footer|</main|<div[^>]*class="[^"]*footer)"#,
        r"(?is)<article[^>]*>(.*?)</article>",
        r"(?is)<main[^>]*>(.*?)</main>",
    ],
    content_chrome: &["script", "style"],
};

const GENERAL_RULES: ProfileRules = ProfileRules {
    title: &[
        r#"(?is)<meta[^>]*property="og:title"[^>]*content="([^"]*)""#,
        r#"(?is)<meta[^>]*name="title"[^>]*content="([^"]*)""#,
        r#"(?is)<meta[^>]*name="twitter:title"[^>]*content="([^"]*)""#,
        r"(?is)<h1[^>]*>(.*?)</h1>",
        r"(?is)<title[^>]*>(.*?)</title>",
    ],
    title_suffix: None,
    author: &[
        r#"(?is)<meta[^>]*name="author"[^>]*content="([^"]*)""#,
        r#"(?is)<meta[^>]*property="article:author"[^>]*content="([^"]*)""#,
        r#"(?is)<span[^>]*class="[^"]*author[^"]*"[^>]*>(.*?)</span>"#,
    ],
    author_fallback: UNKNOWN_AUTHOR,
    content: &[
        r"(?is)<article[^>]*>(.*?)</article>",
        r"(?is)<main[^>]*>(.*?)</main>",
        r#"(?is)<div[^>]*class="[^"]*post-content[^"]*"[^>]*>(.*?)</div>"#,
        r#"(?is)<div[^>]*class="[^"]*article-content[^"]*"[^>]*>(.*?)</div>"#,
        r#"(?is)<div[^>]*class="[^"]*entry-content[^"]*"[^>]*>(.*?)</div>"#,
        r#"(?is)<div[^>]*class="[^"]*content[^"]*"[^>]*>(.*?)</div>"#,
        r#"(?is)<div[^>]*id="content"[^>]*>(.*?)</div>"#,
        r#"(?is)<div[^>]*id="article"[^>]*>(.*?)</div>"#,
        r"(?is)<body[^>]*>(.*?)</body>",
    ],
    content_chrome: &["script", "style", "header", "footer", "nav", "aside"],
};

/// Chrome removed in the whole-page fallback when no content rule matches.
const FULL_CHROME: &[&str] = &["script", "style", "nav", "header", "footer", "aside"];

fn rules_for(profile: SourceProfile) -> &'static ProfileRules {
    match profile {
        SourceProfile::Wechat => &WECHAT_RULES,
        SourceProfile::Notion => &NOTION_RULES,
        // Medium and Zhihu are fingerprinted but extract with the general
        // chain; neither needs platform-specific container rules.
        SourceProfile::Medium | SourceProfile::Zhihu | SourceProfile::General => &GENERAL_RULES,
    }
}

/// Extract title, author, content region, and image URLs from raw HTML.
///
/// Never fails: malformed or empty input yields an [`Article`] with the
/// placeholder title and an empty content fragment.
pub fn extract(profile: SourceProfile, html: &str, url: &str) -> Article {
    let rules = rules_for(profile);

    let title = first_capture(html, rules.title)
        .map(|raw| clean_title(&raw, rules.title_suffix))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let author = first_capture(html, rules.author)
        .map(|raw| strip_tags(&raw).trim().to_string())
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| rules.author_fallback.to_string());

    let content_html = match first_capture(html, rules.content) {
        Some(region) => remove_elements(&region, rules.content_chrome),
        None => remove_elements(html, FULL_CHROME),
    };

    let image_urls = find_image_urls(&content_html, url);

    Article {
        title,
        author,
        source_url: url.to_string(),
        content_html,
        image_urls,
        profile,
    }
}

/// Evaluate an ordered pattern chain, returning the first non-empty capture.
fn first_capture(html: &str, patterns: &[&str]) -> Option<String> {
    for pattern in patterns {
        let re = Regex::new(pattern).unwrap();
        if let Some(captures) = re.captures(html)
            && let Some(m) = captures.get(1)
            && !m.as_str().trim().is_empty()
        {
            return Some(m.as_str().to_string());
        }
    }
    None
}

/// Strip inline markup from a captured title and drop the platform suffix.
fn clean_title(raw: &str, suffix: Option<&str>) -> String {
    let title = strip_tags(raw);
    let title = title.trim();
    match suffix {
        Some(pattern) => Regex::new(pattern).unwrap().replace(title, "").trim().to_string(),
        None => title.to_string(),
    }
}

fn strip_tags(html: &str) -> String {
    Regex::new(r"<[^>]+>").unwrap().replace_all(html, "").to_string()
}

/// Remove whole elements (open tag through close tag) for each listed name.
fn remove_elements(html: &str, elements: &[&str]) -> String {
    let mut output = html.to_string();
    for name in elements {
        let pattern = format!(r"(?is)<{name}[^>]*>.*?</{name}>");
        output = Regex::new(&pattern).unwrap().replace_all(&output, "").to_string();
    }
    output
}
