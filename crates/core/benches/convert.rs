use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use webclip_core::{SourceProfile, extract, html_to_markdown};

fn article_html(paragraphs: usize) -> String {
    let mut html = String::from(
        "<html><head><title>Bench Article - Site</title></head><body>\
         <article><h1>Bench Article</h1>",
    );
    for i in 0..paragraphs {
        html.push_str(&format!(
            "<h2>Section {i}</h2>\
             <p>Some <strong>bold</strong> and <em>italic</em> text with a \
             <a href=\"https://example.com/{i}\">link</a>.</p>\
             <blockquote>A quoted line number {i}</blockquote>\
             <ul><li>first</li><li>second</li></ul>\
             <img src=\"https://cdn.example.com/img{i}.png\" alt=\"figure\"/>",
        ));
    }
    html.push_str("</article></body></html>");
    html
}

fn bench_html_to_markdown(c: &mut Criterion) {
    let small = article_html(10);
    let large = article_html(500);

    let mut group = c.benchmark_group("html_to_markdown");

    group.bench_with_input(BenchmarkId::new("small", "10 sections"), &small, |b, html| {
        b.iter(|| html_to_markdown(black_box(html)))
    });

    group.bench_with_input(BenchmarkId::new("large", "500 sections"), &large, |b, html| {
        b.iter(|| html_to_markdown(black_box(html)))
    });

    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let html = article_html(100);

    c.bench_function("extract_general", |b| {
        b.iter(|| extract(SourceProfile::General, black_box(&html), "https://example.com/post"))
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let html = article_html(100);

    c.bench_function("extract_and_convert", |b| {
        b.iter(|| {
            let article = extract(SourceProfile::General, black_box(&html), "https://example.com/post");
            html_to_markdown(&article.content_html)
        })
    });
}

criterion_group!(benches, bench_html_to_markdown, bench_extract, bench_full_pipeline);
criterion_main!(benches);
