//! Library API integration tests
use std::io::Read;

use webclip_core::*;

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

fn run<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Runtime::new().unwrap().block_on(future)
}

#[test]
fn test_general_extraction() {
    let html = std::fs::read_to_string(get_fixture_path("general_article.html")).unwrap();
    let article = extract(SourceProfile::General, &html, "https://example.com/ownership");

    assert_eq!(article.title, "Understanding Ownership");
    assert_eq!(article.author, "Jane Dev");
    assert!(article.content_html.contains("borrow checker"));
    assert!(!article.content_html.contains("analytics"));
    assert!(!article.content_html.contains("Copyright"));
    assert_eq!(article.image_urls, vec!["https://cdn.example.com/ownership-diagram.png"]);
}

#[test]
fn test_wechat_extraction() {
    let html = std::fs::read_to_string(get_fixture_path("wechat_article.html")).unwrap();
    let url = "https://mp.weixin.qq.com/s/abcdef";
    let profile = classify(url);
    assert_eq!(profile, SourceProfile::Wechat);

    let article = extract(profile, &html, url);
    assert_eq!(article.title, "深入理解异步编程");
    assert_eq!(article.author, "技术漫谈");
    assert!(article.content_html.contains("事件循环"));
    assert!(!article.content_html.contains("scan me"));
    // Lazy-load URL from data-src wins over the placeholder src.
    assert_eq!(
        article.image_urls,
        vec!["https://mmbiz.qpic.cn/mmbiz_png/abc123/640?wx_fmt=png"]
    );
}

#[test]
fn test_markdown_output() {
    let html = std::fs::read_to_string(get_fixture_path("general_article.html")).unwrap();
    let article = extract(SourceProfile::General, &html, "https://example.com/ownership");
    let markdown = article.to_markdown();

    assert!(markdown.starts_with("# Understanding Ownership\n"));
    assert!(markdown.contains("> **Author**: Jane Dev"));
    assert!(markdown.contains("> **Source**: https://example.com/ownership"));
    assert!(markdown.contains("## Moves"));
    assert!(markdown.contains("**one**"));
    assert!(markdown.contains("> The compiler enforces this at compile time."));
    assert!(markdown.contains("- stack values copy"));
    assert!(markdown.contains("![diagram](https://cdn.example.com/ownership-diagram.png)"));
    assert!(markdown.contains("[the book](https://doc.rust-lang.org/book/)"));
}

#[test]
fn test_json_output() {
    let html = std::fs::read_to_string(get_fixture_path("general_article.html")).unwrap();
    let article = extract(SourceProfile::General, &html, "https://example.com/ownership");
    let json = article.to_json();

    assert_eq!(json["title"], "Understanding Ownership");
    assert_eq!(json["author"], "Jane Dev");
    assert_eq!(json["profile"], "general");
    assert_eq!(json["image_count"], 1);
}

#[test]
fn test_save_markdown_to_disk() {
    let html = std::fs::read_to_string(get_fixture_path("general_article.html")).unwrap();
    let article = extract(SourceProfile::General, &html, "https://example.com/ownership");
    let dir = tempfile::tempdir().unwrap();

    let options = SaveOptions { format: SaveFormat::Markdown, download_images: false };
    let report = run(save_article(&article, dir.path(), &options)).unwrap();

    assert_eq!(report.path.file_name().unwrap(), "Understanding_Ownership.md");
    let saved = std::fs::read_to_string(&report.path).unwrap();
    assert!(saved.contains("## Borrowing"));
}

#[test]
fn test_save_epub_produces_valid_container() {
    let html = std::fs::read_to_string(get_fixture_path("general_article.html")).unwrap();
    let article = extract(SourceProfile::General, &html, "https://example.com/ownership");
    let dir = tempfile::tempdir().unwrap();

    let options = SaveOptions { format: SaveFormat::Epub, download_images: false };
    let report = run(save_article(&article, dir.path(), &options)).unwrap();

    let bytes = std::fs::read(&report.path).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();

    let mut mimetype = archive.by_index(0).unwrap();
    assert_eq!(mimetype.name(), "mimetype");
    let mut content = String::new();
    mimetype.read_to_string(&mut content).unwrap();
    assert_eq!(content, "application/epub+zip");
    drop(mimetype);

    assert!(archive.by_name("META-INF/container.xml").is_ok());
}

#[test]
fn test_fetch_file_and_stdin_sources() {
    let html = fetch_file(&get_fixture_path("general_article.html")).unwrap();
    assert!(html.contains("Understanding Ownership"));

    let missing = fetch_file("../../tests/fixtures/no_such_file.html");
    assert!(missing.is_err());
}

#[test]
fn test_fetch_article_invalid_url() {
    let result = run(fetch_article("not a url", &FetchConfig::default()));
    assert!(matches!(result, Err(WebclipError::InvalidUrl(_))));
}
