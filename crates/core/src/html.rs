//! Styled standalone HTML rendering.
//!
//! Wraps the extracted fragment, untouched, in a document shell with a
//! header block (title, author, saved date, source link) and low-priority
//! CSS. The shell supplies only non-conflicting defaults so the fragment's
//! own inline styles keep visual priority.

use chrono::Local;

const SHELL_CSS: &str = r#"
        * {
            box-sizing: border-box;
        }
        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
            line-height: 1.8;
            color: #333;
            max-width: 800px;
            margin: 0 auto;
            padding: 20px;
            background: #fff;
        }
        .article-header {
            border-bottom: 1px solid #eee;
            padding-bottom: 20px;
            margin-bottom: 20px;
        }
        .article-title {
            font-size: 24px;
            font-weight: bold;
            margin-bottom: 10px;
            color: #000;
        }
        .article-meta {
            font-size: 14px;
            color: #999;
        }
        .article-meta a {
            color: #576b95;
            text-decoration: none;
        }
        .article-content {
            font-size: 17px;
            overflow-wrap: break-word;
        }
        .article-content p {
            margin: 1em 0;
        }
        .article-content img {
            max-width: 100% !important;
            height: auto !important;
        }
        .article-content table {
            width: 100%;
            border-collapse: collapse;
            margin: 1em 0;
        }
        .article-content th, .article-content td {
            border: 1px solid #ddd;
            padding: 8px 12px;
        }
        .article-content blockquote {
            border-left: 4px solid #1aad19;
            padding: 10px 20px;
            margin: 1em 0;
            background-color: #f8f8f8;
        }
        .article-content pre {
            background: #f5f5f5;
            padding: 15px;
            border-radius: 5px;
            overflow-x: auto;
        }
        .article-content code {
            background: #f5f5f5;
            padding: 2px 6px;
            border-radius: 3px;
            font-family: Consolas, Monaco, monospace;
        }
        .article-content pre code {
            background: none;
            padding: 0;
        }
        .article-content a {
            color: #576b95;
        }
        .article-content hr {
            border: none;
            border-top: 1px solid #eee;
            margin: 2em 0;
        }
        .article-content ul, .article-content ol {
            padding-left: 2em;
        }
        .article-content section {
            display: block;
        }
"#;

/// Render the article fragment as a standalone styled HTML document.
///
/// The fragment is embedded verbatim; inline styles from the source page
/// are preserved and win over the shell defaults.
pub fn render_styled_html(fragment: &str, title: &str, author: &str, source_url: &str) -> String {
    let today = Local::now().format("%Y-%m-%d");
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{SHELL_CSS}</style>
</head>
<body>
    <div class="article-header">
        <h1 class="article-title">{title}</h1>
        <div class="article-meta">
            <strong>Author:</strong> {author} |
            <strong>Saved:</strong> {today} |
            <a href="{source_url}" target="_blank">Source</a>
        </div>
    </div>
    <div class="article-content">
{fragment}
    </div>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_embedded_verbatim() {
        let fragment = r#"<p style="color: red;">Styled text</p>"#;
        let html = render_styled_html(fragment, "T", "A", "https://example.com");
        assert!(html.contains(fragment));
    }

    #[test]
    fn test_header_metadata_present() {
        let html = render_styled_html("<p>x</p>", "My Title", "Writer", "https://example.com/p");
        assert!(html.contains(r#"<h1 class="article-title">My Title</h1>"#));
        assert!(html.contains("<strong>Author:</strong> Writer"));
        assert!(html.contains(r#"<a href="https://example.com/p" target="_blank">Source</a>"#));
    }

    #[test]
    fn test_shell_defaults_are_scoped() {
        let html = render_styled_html("<p>x</p>", "T", "A", "https://example.com");
        assert!(html.contains(".article-content img"));
        assert!(html.contains("max-width: 800px"));
    }
}
