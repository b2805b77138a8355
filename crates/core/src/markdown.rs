//! Structural HTML to Markdown conversion.
//!
//! The transform is an explicit, ordered list of pure `text -> text` stages,
//! each operating on the full buffer. Ordering is load-bearing: block rules
//! (headings, paragraphs, lists, tables, code, images) run before the final
//! strip-remaining-tags pass, and inline rules run before terminator cleanup.
//! A stage that finds nothing to match leaves the text untouched, so
//! malformed or unterminated markup degrades gracefully instead of erroring.
//!
//! The transform assumes HTML input; re-running it on its own Markdown
//! output is undefined.

use regex::{Captures, Regex};

/// Alt text used when an image carries no `alt` attribute.
const IMAGE_ALT_PLACEHOLDER: &str = "image";

type Stage = fn(&str) -> String;

/// The conversion pipeline, applied top to bottom.
const STAGES: &[(&str, Stage)] = &[
    ("strip-comments", strip_comments),
    ("images", convert_images),
    ("headings", convert_headings),
    ("sections", unwrap_sections),
    ("paragraphs", convert_paragraphs),
    ("line-breaks", convert_line_breaks),
    ("bold", convert_bold),
    ("italic", convert_italic),
    ("links", convert_links),
    ("blockquotes", convert_blockquotes),
    ("ordered-lists", convert_ordered_lists),
    ("unordered-lists", convert_unordered_lists),
    ("tables", convert_tables),
    ("code", convert_code),
    ("horizontal-rules", convert_horizontal_rules),
    ("unwrap-inline", unwrap_span_div),
    ("strip-tags", strip_remaining_tags),
    ("entities", decode_entities),
    ("cleanup", collapse_whitespace),
];

/// Convert an HTML fragment to Markdown text.
pub fn html_to_markdown(html: &str) -> String {
    let mut text = html.to_string();
    for (_, stage) in STAGES {
        text = stage(&text);
    }
    text.trim().to_string()
}

fn strip_comments(html: &str) -> String {
    Regex::new(r"(?s)<!--.*?-->").unwrap().replace_all(html, "").to_string()
}

/// `<img>` to `![alt](src)`, preferring `data-src` (lazy-loading platforms
/// keep the real URL there) and expanding protocol-relative URLs to https.
fn convert_images(html: &str) -> String {
    let img_re = Regex::new(r"(?i)<img[^>]*>").unwrap();
    let data_src_re = Regex::new(r#"(?i)data-src\s*=\s*["']([^"']+)["']"#).unwrap();
    let src_re = Regex::new(r#"(?i)\ssrc\s*=\s*["']([^"']+)["']"#).unwrap();
    let alt_re = Regex::new(r#"(?i)alt\s*=\s*["']([^"']*)["']"#).unwrap();

    img_re
        .replace_all(html, |caps: &Captures| {
            let tag = &caps[0];
            let src = data_src_re
                .captures(tag)
                .or_else(|| src_re.captures(tag))
                .map(|c| c[1].to_string());
            let Some(mut url) = src else {
                return String::new();
            };
            if url.starts_with("//") {
                url = format!("https:{url}");
            }
            let alt = alt_re
                .captures(tag)
                .map(|c| c[1].to_string())
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| IMAGE_ALT_PLACEHOLDER.to_string());
            format!("\n\n![{alt}]({url})\n\n")
        })
        .to_string()
}

/// Highest level first so nested heading-like structures never partially
/// overlap a shorter tag name.
fn convert_headings(html: &str) -> String {
    let mut output = html.to_string();
    for level in (1..=6).rev() {
        let re = Regex::new(&format!(r"(?is)<h{level}[^>]*>(.*?)</h{level}>")).unwrap();
        let hashes = "#".repeat(level);
        output = re
            .replace_all(&output, |caps: &Captures| format!("\n\n{} {}\n", hashes, caps[1].trim()))
            .to_string();
    }
    output
}

fn unwrap_sections(html: &str) -> String {
    Regex::new(r"(?is)<section[^>]*>(.*?)</section>")
        .unwrap()
        .replace_all(html, "${1}")
        .to_string()
}

fn convert_paragraphs(html: &str) -> String {
    Regex::new(r"(?is)<p[^>]*>(.*?)</p>")
        .unwrap()
        .replace_all(html, "\n\n${1}\n")
        .to_string()
}

/// Hard break convention: two trailing spaces plus newline.
fn convert_line_breaks(html: &str) -> String {
    Regex::new(r"(?i)<br\s*/?>").unwrap().replace_all(html, "  \n").to_string()
}

fn convert_bold(html: &str) -> String {
    let output = Regex::new(r"(?is)<strong[^>]*>(.*?)</strong>")
        .unwrap()
        .replace_all(html, "**${1}**")
        .to_string();
    Regex::new(r"(?is)<b(?:\s[^>]*)?>(.*?)</b>")
        .unwrap()
        .replace_all(&output, "**${1}**")
        .to_string()
}

fn convert_italic(html: &str) -> String {
    let output = Regex::new(r"(?is)<em(?:\s[^>]*)?>(.*?)</em>")
        .unwrap()
        .replace_all(html, "*${1}*")
        .to_string();
    Regex::new(r"(?is)<i(?:\s[^>]*)?>(.*?)</i>")
        .unwrap()
        .replace_all(&output, "*${1}*")
        .to_string()
}

fn convert_links(html: &str) -> String {
    Regex::new(r#"(?is)<a[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#)
        .unwrap()
        .replace_all(html, "[${2}](${1})")
        .to_string()
}

fn convert_blockquotes(html: &str) -> String {
    Regex::new(r"(?is)<blockquote[^>]*>(.*?)</blockquote>")
        .unwrap()
        .replace_all(html, |caps: &Captures| {
            let mut quoted = String::from("\n");
            for line in caps[1].trim().lines() {
                let line = line.trim();
                if !line.is_empty() {
                    quoted.push_str("> ");
                    quoted.push_str(line);
                    quoted.push('\n');
                }
            }
            quoted.push('\n');
            quoted
        })
        .to_string()
}

/// Items renumber strictly from 1 in document order, regardless of any
/// source numbering. Must run before the generic `<li>` rule.
fn convert_ordered_lists(html: &str) -> String {
    let item_re = Regex::new(r"(?is)<li[^>]*>(.*?)</li>").unwrap();
    Regex::new(r"(?is)<ol[^>]*>(.*?)</ol>")
        .unwrap()
        .replace_all(html, |caps: &Captures| {
            let mut list = String::from("\n");
            for (i, item) in item_re.captures_iter(&caps[1]).enumerate() {
                list.push_str(&format!("{}. {}\n", i + 1, item[1].trim()));
            }
            list
        })
        .to_string()
}

fn convert_unordered_lists(html: &str) -> String {
    let output = Regex::new(r"(?is)<ul[^>]*>(.*?)</ul>")
        .unwrap()
        .replace_all(html, "\n${1}\n")
        .to_string();
    Regex::new(r"(?is)<li[^>]*>(.*?)</li>")
        .unwrap()
        .replace_all(&output, |caps: &Captures| format!("- {}\n", caps[1].trim()))
        .to_string()
}

/// Rows become `|`-delimited lines; a `---` separator row follows the first
/// (header) row.
fn convert_tables(html: &str) -> String {
    let row_re = Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").unwrap();
    let cell_re = Regex::new(r"(?is)<t[dh][^>]*>(.*?)</t[dh]>").unwrap();
    let tag_re = Regex::new(r"<[^>]+>").unwrap();

    Regex::new(r"(?is)<table[^>]*>.*?</table>")
        .unwrap()
        .replace_all(html, |caps: &Captures| {
            let mut table = String::from("\n");
            for (i, row) in row_re.captures_iter(&caps[0]).enumerate() {
                let cells: Vec<String> = cell_re
                    .captures_iter(&row[1])
                    .map(|c| tag_re.replace_all(&c[1], "").trim().to_string())
                    .collect();
                if cells.is_empty() {
                    continue;
                }
                table.push_str(&format!("| {} |\n", cells.join(" | ")));
                if i == 0 {
                    table.push_str(&format!("|{}|\n", vec!["---"; cells.len()].join("|")));
                }
            }
            table.push('\n');
            table
        })
        .to_string()
}

fn convert_code(html: &str) -> String {
    let output = Regex::new(r"(?is)<pre[^>]*>\s*<code[^>]*>(.*?)</code>\s*</pre>")
        .unwrap()
        .replace_all(html, "\n\n```\n${1}\n```\n")
        .to_string();
    let output = Regex::new(r"(?is)<pre[^>]*>(.*?)</pre>")
        .unwrap()
        .replace_all(&output, "\n\n```\n${1}\n```\n")
        .to_string();
    Regex::new(r"(?is)<code[^>]*>(.*?)</code>")
        .unwrap()
        .replace_all(&output, "`${1}`")
        .to_string()
}

fn convert_horizontal_rules(html: &str) -> String {
    Regex::new(r"(?i)<hr[^>]*>")
        .unwrap()
        .replace_all(html, "\n\n---\n\n")
        .to_string()
}

fn unwrap_span_div(html: &str) -> String {
    let output = Regex::new(r"(?is)<span[^>]*>(.*?)</span>")
        .unwrap()
        .replace_all(html, "${1}")
        .to_string();
    Regex::new(r"(?is)<div[^>]*>(.*?)</div>")
        .unwrap()
        .replace_all(&output, "${1}")
        .to_string()
}

fn strip_remaining_tags(html: &str) -> String {
    Regex::new(r"(?s)<[^>]+>").unwrap().replace_all(html, "").to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace('\u{00a0}', " ")
        .replace('\u{200b}', "")
        .replace('\u{feff}', "")
}

/// Collapse runs of 3+ newlines to exactly 2 and right-trim every line.
fn collapse_whitespace(text: &str) -> String {
    let collapsed = Regex::new(r"\n{3,}").unwrap().replace_all(text, "\n\n").to_string();
    collapsed
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_and_paragraph_round_trip() {
        assert_eq!(html_to_markdown("<h2>X</h2><p>Y</p>"), "## X\n\nY");
    }

    #[test]
    fn test_all_heading_levels() {
        for level in 1..=6 {
            let html = format!("<h{level}>Title</h{level}>");
            let expected = format!("{} Title", "#".repeat(level));
            assert_eq!(html_to_markdown(&html), expected);
        }
    }

    #[test]
    fn test_image_with_alt() {
        let md = html_to_markdown(r#"<img src="https://a.com/x.png" alt="chart">"#);
        assert_eq!(md, "![chart](https://a.com/x.png)");
    }

    #[test]
    fn test_image_alt_placeholder() {
        let md = html_to_markdown(r#"<img src="https://a.com/x.png">"#);
        assert_eq!(md, "![image](https://a.com/x.png)");
    }

    #[test]
    fn test_image_prefers_data_src() {
        let md = html_to_markdown(r#"<img src="placeholder.gif" data-src="https://a.com/real.jpg">"#);
        assert_eq!(md, "![image](https://a.com/real.jpg)");
    }

    #[test]
    fn test_image_protocol_relative_expanded() {
        let md = html_to_markdown(r#"<img src="//cdn.example.com/a.png">"#);
        assert_eq!(md, "![image](https://cdn.example.com/a.png)");
    }

    #[test]
    fn test_bold_and_italic() {
        assert_eq!(html_to_markdown("<strong>hot</strong>"), "**hot**");
        assert_eq!(html_to_markdown("<b>hot</b>"), "**hot**");
        assert_eq!(html_to_markdown("<em>soft</em>"), "*soft*");
        assert_eq!(html_to_markdown("<i>soft</i>"), "*soft*");
    }

    #[test]
    fn test_bold_wrapping_italic() {
        assert_eq!(html_to_markdown("<strong><em>both</em></strong>"), "***both***");
    }

    #[test]
    fn test_b_rule_leaves_blockquote_alone() {
        let md = html_to_markdown("<blockquote>quoted\nlines</blockquote>");
        assert_eq!(md, "> quoted\n> lines");
    }

    #[test]
    fn test_links() {
        let md = html_to_markdown(r#"<a href="https://example.com">here</a>"#);
        assert_eq!(md, "[here](https://example.com)");
    }

    #[test]
    fn test_ordered_list_renumbers_from_one() {
        let html = r#"<ol><li value="5">first</li><li value="9">second</li><li value="2">third</li></ol>"#;
        assert_eq!(html_to_markdown(html), "1. first\n2. second\n3. third");
    }

    #[test]
    fn test_unordered_list() {
        let md = html_to_markdown("<ul><li>a</li><li>b</li></ul>");
        assert_eq!(md, "- a\n- b");
    }

    #[test]
    fn test_table_with_separator_row() {
        let html = "<table><tr><th>A</th><th>B</th></tr><tr><td>1</td><td>2</td></tr></table>";
        let md = html_to_markdown(html);
        assert_eq!(md, "| A | B |\n|---|---|\n| 1 | 2 |");
    }

    #[test]
    fn test_code_block_fenced() {
        let md = html_to_markdown("<pre><code>let x = 1;</code></pre>");
        assert_eq!(md, "```\nlet x = 1;\n```");
    }

    #[test]
    fn test_inline_code() {
        let md = html_to_markdown("<p>use <code>cargo</code> here</p>");
        assert_eq!(md, "use `cargo` here");
    }

    #[test]
    fn test_horizontal_rule() {
        let md = html_to_markdown("<p>a</p><hr/><p>b</p>");
        assert_eq!(md, "a\n\n---\n\nb");
    }

    #[test]
    fn test_entities_decoded() {
        let md = html_to_markdown("<p>a&nbsp;&amp;&nbsp;b &lt;tag&gt; &quot;q&quot; &#39;s&#39;</p>");
        assert_eq!(md, "a & b <tag> \"q\" 's'");
    }

    #[test]
    fn test_no_tripled_blank_lines() {
        let md = html_to_markdown("<p>a</p><p></p><p></p><p>b</p>");
        assert!(!md.contains("\n\n\n"));
    }

    #[test]
    fn test_remaining_tags_stripped() {
        let md = html_to_markdown("<figure><p>kept</p></figure>");
        assert_eq!(md, "kept");
    }

    #[test]
    fn test_malformed_input_degrades() {
        let md = html_to_markdown("<p>unterminated");
        assert!(md.contains("unterminated"));
    }

    #[test]
    fn test_nested_structures() {
        let html = "<section><h3>Head</h3><p>Body with <strong>bold</strong>.</p></section>";
        assert_eq!(html_to_markdown(html), "### Head\n\nBody with **bold**.");
    }

    #[test]
    fn test_stage_order_is_fixed() {
        let names: Vec<&str> = STAGES.iter().map(|(name, _)| *name).collect();
        let strip = names.iter().position(|n| *n == "strip-tags").unwrap();
        for block in ["headings", "paragraphs", "ordered-lists", "tables", "code", "images"] {
            assert!(names.iter().position(|n| *n == block).unwrap() < strip);
        }
        let cleanup = names.iter().position(|n| *n == "cleanup").unwrap();
        for inline in ["bold", "italic", "links"] {
            assert!(names.iter().position(|n| *n == inline).unwrap() < cleanup);
        }
    }
}
