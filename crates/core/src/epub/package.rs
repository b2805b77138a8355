//! Fallback tier: hand-rolled OCF/EPUB3 container.
//!
//! Builds the whole archive in memory: the `mimetype` entry first and
//! uncompressed (an OCF requirement), the container descriptor, the package
//! document, an EPUB3 navigation document plus a legacy NCX, a single
//! content document with inline presentation CSS, and one entry per
//! locally-resolved image, re-encoded to PNG for reader compatibility.

use std::io::{Cursor, Write};
use std::path::Path;

use chrono::{Local, Utc};
use regex::{Captures, Regex};
use uuid::Uuid;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::{EpubMeta, escape_xml, image_refs, reencode_to_png, resolve_local_ref, strip_citation_header};

/// One resource in the package manifest.
struct ManifestEntry {
    id: String,
    href: String,
    media_type: String,
}

/// An image staged into the archive.
struct PackagedImage {
    original_ref: String,
    epub_path: String,
    data: Vec<u8>,
    media_type: String,
}

/// Assemble the EPUB archive. The error string is surfaced verbatim as the
/// packaging failure detail.
pub(super) fn build(markdown: &str, meta: &EpubMeta<'_>, images_dir: Option<&Path>) -> Result<Vec<u8>, String> {
    let book_id = Uuid::new_v4().to_string();
    let date = Local::now().format("%Y-%m-%d").to_string();

    let images = collect_images(markdown, images_dir);

    let mut body_md = markdown.to_string();
    for image in &images {
        body_md = body_md.replace(&image.original_ref, &image.epub_path);
    }
    let body_md = strip_citation_header(&body_md);
    let body_html = markdown_to_html(&body_md);

    let content_xhtml = content_document(meta, &date, &body_html);
    let opf = package_document(meta, &book_id, &images);
    let nav = nav_document(meta.title);
    let ncx = toc_ncx(meta.title, &book_id);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    // mimetype must be the archive's first entry and uncompressed.
    let result: Result<(), zip::result::ZipError> = (|| {
        zip.start_file("mimetype", stored)?;
        zip.write_all(b"application/epub+zip")?;

        zip.start_file("META-INF/container.xml", deflated)?;
        zip.write_all(CONTAINER_XML.as_bytes())?;

        zip.start_file("OEBPS/content.opf", deflated)?;
        zip.write_all(opf.as_bytes())?;

        zip.start_file("OEBPS/nav.xhtml", deflated)?;
        zip.write_all(nav.as_bytes())?;

        zip.start_file("OEBPS/toc.ncx", deflated)?;
        zip.write_all(ncx.as_bytes())?;

        zip.start_file("OEBPS/content.xhtml", deflated)?;
        zip.write_all(content_xhtml.as_bytes())?;

        for image in &images {
            zip.start_file(format!("OEBPS/{}", image.epub_path), deflated)?;
            zip.write_all(&image.data)?;
        }
        Ok(())
    })();
    result.map_err(|e| e.to_string())?;

    let cursor = zip.finish().map_err(|e| e.to_string())?;
    Ok(cursor.into_inner())
}

/// Resolve and load every locally-referenced image.
///
/// Re-encoded to PNG when decodable; otherwise the original bytes are kept
/// with their own media type. Remote references are left in place for the
/// reader to fetch.
fn collect_images(markdown: &str, images_dir: Option<&Path>) -> Vec<PackagedImage> {
    let Some(images_dir) = images_dir else {
        return Vec::new();
    };

    let mut images = Vec::new();
    for (i, reference) in image_refs(markdown).into_iter().enumerate() {
        if images.iter().any(|img: &PackagedImage| img.original_ref == reference) {
            continue;
        }
        let Some(source) = resolve_local_ref(&reference, images_dir) else {
            continue;
        };

        match reencode_to_png(&source) {
            Some(png) => images.push(PackagedImage {
                original_ref: reference,
                epub_path: format!("images/img_{i}.png"),
                data: png,
                media_type: "image/png".to_string(),
            }),
            None => {
                let Ok(data) = std::fs::read(&source) else { continue };
                let ext = source.extension().and_then(|e| e.to_str()).unwrap_or("");
                images.push(PackagedImage {
                    original_ref: reference,
                    epub_path: format!("images/img_{i}.{ext}"),
                    data,
                    media_type: media_type_for(ext).to_string(),
                });
            }
        }
    }
    images
}

fn media_type_for(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Reading systems want a language tag; articles from the Chinese platforms
/// this tool targets are usually CJK, everything else defaults to English.
fn content_language(title: &str) -> &'static str {
    if title.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c)) {
        "zh-CN"
    } else {
        "en"
    }
}

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

fn package_document(meta: &EpubMeta<'_>, book_id: &str, images: &[PackagedImage]) -> String {
    let mut entries = vec![
        ManifestEntry {
            id: "content".to_string(),
            href: "content.xhtml".to_string(),
            media_type: "application/xhtml+xml".to_string(),
        },
        ManifestEntry {
            id: "nav".to_string(),
            href: "nav.xhtml".to_string(),
            media_type: "application/xhtml+xml".to_string(),
        },
        ManifestEntry {
            id: "ncx".to_string(),
            href: "toc.ncx".to_string(),
            media_type: "application/x-dtbncx+xml".to_string(),
        },
    ];
    for (i, image) in images.iter().enumerate() {
        entries.push(ManifestEntry {
            id: format!("img{i}"),
            href: image.epub_path.clone(),
            media_type: image.media_type.clone(),
        });
    }

    let mut manifest = String::new();
    for entry in &entries {
        let properties = if entry.id == "nav" { r#" properties="nav""# } else { "" };
        manifest.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{}/>\n",
            entry.id,
            escape_xml(&entry.href),
            entry.media_type,
            properties
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{title}</dc:title>
    <dc:creator>{author}</dc:creator>
    <dc:language>{language}</dc:language>
    <dc:identifier id="BookId">urn:uuid:{book_id}</dc:identifier>
    <meta property="dcterms:modified">{modified}</meta>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine toc="ncx">
    <itemref idref="content"/>
  </spine>
</package>"#,
        title = escape_xml(meta.title),
        author = escape_xml(meta.author),
        language = content_language(meta.title),
        modified = Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
    )
}

fn nav_document(title: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head>
  <title>Table of Contents</title>
</head>
<body>
  <nav epub:type="toc">
    <h1>Table of Contents</h1>
    <ol>
      <li><a href="content.xhtml">{}</a></li>
    </ol>
  </nav>
</body>
</html>"#,
        escape_xml(title)
    )
}

fn toc_ncx(title: &str, book_id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="urn:uuid:{book_id}"/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>{title}</text>
  </docTitle>
  <navMap>
    <navPoint id="navpoint-1" playOrder="1">
      <navLabel>
        <text>{title}</text>
      </navLabel>
      <content src="content.xhtml"/>
    </navPoint>
  </navMap>
</ncx>"#,
        title = escape_xml(title),
        book_id = book_id,
    )
}

fn content_document(meta: &EpubMeta<'_>, date: &str, body_html: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <title>{title}</title>
  <style type="text/css">
    body {{
      font-family: Georgia, "Times New Roman", serif;
      line-height: 1.6;
      margin: 1em;
      padding: 0;
    }}
    h1 {{
      font-size: 1.5em;
      margin-top: 0.5em;
      margin-bottom: 0.5em;
      text-align: center;
    }}
    h2 {{
      font-size: 1.3em;
      margin-top: 1em;
      border-bottom: 1px solid #ccc;
    }}
    h3 {{ font-size: 1.1em; margin-top: 0.8em; }}
    p {{ margin: 0.5em 0; text-align: justify; }}
    blockquote {{
      margin: 0.5em 2em;
      padding: 0.5em;
      border-left: 3px solid #ccc;
      background: #f9f9f9;
    }}
    img {{
      max-width: 100%;
      height: auto;
      display: block;
      margin: 1em auto;
    }}
    hr {{
      border: none;
      border-top: 1px solid #ccc;
      margin: 1em 0;
    }}
    ul, ol {{ padding-left: 1.5em; }}
    li {{ margin: 0.3em 0; }}
    a {{ color: #0066cc; }}
  </style>
</head>
<body>
  <h1>{title}</h1>
  <p style="text-align: center; color: #666; font-size: 0.9em;">
    Author: {author} | Source: <a href="{url}">{url}</a> | Date: {date}
  </p>
  <hr/>
  {body}
</body>
</html>"#,
        title = escape_xml(meta.title),
        author = escape_xml(meta.author),
        url = escape_xml(meta.source_url),
        date = date,
        body = body_html,
    )
}

/// Minimal Markdown to HTML for the content document.
///
/// Covers the constructs the Markdown renderer emits: headings, images,
/// links, emphasis, per-line blockquotes, fenced and inline code, rules,
/// dash lists, and paragraph wrapping.
fn markdown_to_html(markdown: &str) -> String {
    let mut html = markdown.to_string();

    for level in (1..=6).rev() {
        let re = Regex::new(&format!(r"(?m)^{} (.+)$", "#".repeat(level))).unwrap();
        html = re
            .replace_all(&html, |c: &Captures| format!("<h{level}>{}</h{level}>", &c[1]))
            .to_string();
    }

    html = Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)")
        .unwrap()
        .replace_all(&html, r#"<img src="${2}" alt="${1}"/>"#)
        .to_string();
    html = Regex::new(r"\[([^\]]+)\]\(([^)]+)\)")
        .unwrap()
        .replace_all(&html, r#"<a href="${2}">${1}</a>"#)
        .to_string();

    html = Regex::new(r"\*\*([^*]+)\*\*")
        .unwrap()
        .replace_all(&html, "<strong>${1}</strong>")
        .to_string();
    html = Regex::new(r"\*([^*]+)\*")
        .unwrap()
        .replace_all(&html, "<em>${1}</em>")
        .to_string();

    html = Regex::new(r"(?m)^>\s*(.+)$")
        .unwrap()
        .replace_all(&html, "<blockquote>${1}</blockquote>")
        .to_string();

    html = Regex::new(r"(?s)```\w*\n(.*?)```")
        .unwrap()
        .replace_all(&html, "<pre><code>${1}</code></pre>")
        .to_string();
    html = Regex::new(r"`([^`]+)`")
        .unwrap()
        .replace_all(&html, "<code>${1}</code>")
        .to_string();

    html = Regex::new(r"(?m)^---$").unwrap().replace_all(&html, "<hr/>").to_string();

    html = Regex::new(r"(?m)^-\s+(.+)$")
        .unwrap()
        .replace_all(&html, "<li>${1}</li>")
        .to_string();
    html = Regex::new(r"(?:<li>.*</li>\n?)+")
        .unwrap()
        .replace_all(&html, |c: &Captures| format!("<ul>{}</ul>", &c[0]))
        .to_string();

    html = wrap_paragraphs(&html);

    Regex::new(r"\n{3,}").unwrap().replace_all(&html, "\n\n").to_string()
}

/// Wrap runs of plain-text lines in `<p>` tags, leaving tag lines alone.
fn wrap_paragraphs(html: &str) -> String {
    let mut result: Vec<String> = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    for line in html.lines() {
        let stripped = line.trim();

        if stripped.starts_with('<') || stripped.is_empty() {
            if !paragraph.is_empty() {
                result.push(format!("<p>{}</p>", paragraph.join(" ")));
                paragraph.clear();
            }
            result.push(line.to_string());
        } else {
            paragraph.push(stripped);
        }
    }
    if !paragraph.is_empty() {
        result.push(format!("<p>{}</p>", paragraph.join(" ")));
    }

    result.join("\n")
}
