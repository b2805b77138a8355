//! EPUB assembly with a two-tier strategy.
//!
//! Tier 1 delegates to pandoc when it is installed, for the best typographic
//! result. Tier 2 is a hand-rolled OCF/EPUB3 container that is always
//! available. Both tiers implement the same markdown-in, archive-bytes-out
//! contract, so callers never know which one ran. Delegate failure is not an
//! error; only failure of both tiers surfaces, carrying the fallback tier's
//! error detail.

mod package;
mod pandoc;

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use regex::Regex;

use crate::{Result, WebclipError};

pub use pandoc::Pandoc;

/// Package metadata threaded into both tiers.
#[derive(Debug, Clone, Copy)]
pub struct EpubMeta<'a> {
    pub title: &'a str,
    pub author: &'a str,
    pub source_url: &'a str,
}

/// Convert a rendered Markdown document to EPUB archive bytes.
///
/// `images_dir` is the `images/` directory next to the output file, holding
/// any locally downloaded images the Markdown references.
pub fn markdown_to_epub(markdown: &str, meta: &EpubMeta<'_>, images_dir: Option<&Path>) -> Result<Vec<u8>> {
    if let Some(pandoc) = Pandoc::find()
        && let Ok(bytes) = pandoc.convert(markdown, meta, images_dir)
    {
        return Ok(bytes);
    }

    package::build(markdown, meta, images_dir).map_err(WebclipError::PackagingError)
}

/// Remove the document's own metadata header: the leading `# title` line and
/// the author/source/date citation block, up to and including the first
/// horizontal rule. Body content ends the header region immediately.
fn strip_citation_header(markdown: &str) -> String {
    let mut body: Vec<&str> = Vec::new();
    let mut in_header = true;

    for line in markdown.lines() {
        if in_header {
            let trimmed = line.trim();
            if trimmed.starts_with("# ") || trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('>')
                && (trimmed.contains("**Author**") || trimmed.contains("**Source**") || trimmed.contains("**Saved**"))
            {
                continue;
            }
            if trimmed == "---" {
                in_header = false;
                continue;
            }
            in_header = false;
        }
        body.push(line);
    }

    body.join("\n").trim_start_matches('\n').to_string()
}

/// All `![..](target)` reference targets, in document order.
fn image_refs(markdown: &str) -> Vec<String> {
    Regex::new(r"!\[[^\]]*\]\(([^)]+)\)")
        .unwrap()
        .captures_iter(markdown)
        .map(|c| c[1].to_string())
        .collect()
}

/// Resolve a local image reference against the images directory.
///
/// Remote references return `None` (left for the reader to fetch). Absolute
/// paths and any path containing `..` are rejected so a crafted reference
/// cannot escape the output directory. `images/`-prefixed references are
/// relative to the output file, bare names relative to the images directory.
fn resolve_local_ref(reference: &str, images_dir: &Path) -> Option<PathBuf> {
    if reference.starts_with("http") {
        return None;
    }

    let relative = Path::new(reference);
    if relative.is_absolute() || relative.components().any(|c| matches!(c, Component::ParentDir)) {
        return None;
    }

    let candidate = if reference.starts_with("images/") {
        images_dir.parent()?.join(relative)
    } else {
        images_dir.join(relative)
    };

    candidate.is_file().then_some(candidate)
}

/// Re-encode an image file to PNG for maximum reader compatibility.
///
/// `None` when the bytes cannot be decoded; callers fall back to copying the
/// original bytes verbatim.
fn reencode_to_png(path: &Path) -> Option<Vec<u8>> {
    let bytes = std::fs::read(path).ok()?;
    let decoded = image::load_from_memory(&bytes).ok()?;
    let mut output = Cursor::new(Vec::new());
    decoded.write_to(&mut output, image::ImageFormat::Png).ok()?;
    Some(output.into_inner())
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "# T\n\n> **Author**: A\n> **Source**: http://s\n> **Saved**: 2024-01-01\n\n---\n\nBody text\n";

    #[test]
    fn test_strip_citation_header() {
        assert_eq!(strip_citation_header(DOC), "Body text");
    }

    #[test]
    fn test_strip_header_without_rule_stops_at_body() {
        let md = "# T\n\n> **Author**: A\n\nFirst paragraph\n\n---\n\nMore";
        let body = strip_citation_header(md);
        assert!(body.starts_with("First paragraph"));
        assert!(body.contains("---"));
        assert!(body.contains("More"));
    }

    #[test]
    fn test_image_refs_in_order() {
        let md = "![a](images/1.png) text ![b](https://x.com/2.jpg)";
        assert_eq!(image_refs(md), vec!["images/1.png", "https://x.com/2.jpg"]);
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        std::fs::create_dir_all(&images).unwrap();
        assert!(resolve_local_ref("../../etc/passwd", &images).is_none());
        assert!(resolve_local_ref("/etc/passwd", &images).is_none());
    }

    #[test]
    fn test_resolve_skips_remote() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_local_ref("https://x.com/a.png", dir.path()).is_none());
    }

    #[test]
    fn test_resolve_images_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::write(images.join("a.png"), b"x").unwrap();
        let resolved = resolve_local_ref("images/a.png", &images).unwrap();
        assert_eq!(resolved, images.join("a.png"));
    }

    #[test]
    fn test_reencode_invalid_bytes_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(reencode_to_png(&path).is_none());
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml(r#"a & <b> "c""#), "a &amp; &lt;b&gt; &quot;c&quot;");
    }
}
