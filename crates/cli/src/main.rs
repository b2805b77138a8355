use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use webclip_core::{
    Article, FetchConfig, SaveFormat, SaveOptions, classify, extract, fetch_file, fetch_stdin, fetch_url, save_article,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Save web articles as clean Markdown, styled HTML, or EPUB
#[derive(Parser, Debug)]
#[command(name = "webclip")]
#[command(version = VERSION)]
#[command(about = "Save web articles as Markdown, HTML, or EPUB", long_about = None)]
struct Args {
    /// URLs to fetch, local HTML files, or "-" for stdin
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<String>,

    /// Directory to save articles into
    #[arg(short, long, default_value = "saved_articles", value_name = "DIR")]
    output_dir: PathBuf,

    /// Output format (md, html, epub)
    #[arg(short, long, default_value = "md", value_name = "FORMAT")]
    format: SaveFormat,

    /// Skip downloading images; keep remote URLs in the output
    #[arg(long)]
    no_images: bool,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Print article metadata as JSON instead of a summary line
    #[arg(long)]
    json: bool,

    /// Enable progress logging
    #[arg(short, long)]
    verbose: bool,
}

/// Print a styled banner for verbose mode
fn print_banner() {
    eprintln!("\n{} {} {}", "Webclip".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Save web articles as Markdown, HTML, or EPUB".dimmed());
    eprintln!();
}

/// Print a styled step message
fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an error message
fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

async fn load_article(input: &str, args: &Args) -> anyhow::Result<Article> {
    if input == "-" {
        let html = fetch_stdin().context("Failed to read from stdin")?;
        return Ok(extract(classify("stdin"), &html, "stdin"));
    }

    if input.starts_with("http://") || input.starts_with("https://") {
        let mut config = FetchConfig { timeout: args.timeout, ..Default::default() };
        if let Some(ua) = &args.user_agent {
            config.user_agent = ua.clone();
        }
        let html = fetch_url(input, &config)
            .await
            .with_context(|| format!("Failed to fetch {}", input))?;
        return Ok(extract(classify(input), &html, input));
    }

    let html = fetch_file(input).with_context(|| format!("Failed to read file: {}", input))?;
    Ok(extract(classify(input), &html, input))
}

async fn process_one(input: &str, args: &Args, index: usize, total: usize) -> anyhow::Result<()> {
    if args.verbose {
        print_step(index + 1, total, &format!("Processing {}", input.bright_white()));
    }

    let article = load_article(input, args).await?;

    if args.verbose {
        eprintln!("  {} {}", "Title:".dimmed(), article.title.bright_white());
        eprintln!("  {} {}", "Author:".dimmed(), article.author.bright_white());
        eprintln!("  {} {}", "Profile:".dimmed(), article.profile.name().bright_white());
        eprintln!("  {} {}", "Images:".dimmed(), article.image_urls.len().to_string().bright_white());
    }

    let options = SaveOptions { format: args.format, download_images: !args.no_images };
    let report = save_article(&article, &args.output_dir, &options)
        .await
        .with_context(|| format!("Failed to save {}", input))?;

    if args.json {
        let mut value = article.to_json();
        value["path"] = serde_json::Value::String(report.path.display().to_string());
        value["images_saved"] = serde_json::Value::from(report.images_saved);
        println!("{}", serde_json::to_string(&value)?);
    } else {
        let images = if report.images_total > 0 {
            format!(" ({}/{} images)", report.images_saved, report.images_total)
        } else {
            String::new()
        };
        print_success(&format!("Saved {}{}", report.path.display().bright_white(), images));
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        print_banner();
    }

    let total = args.inputs.len();
    let mut failures = 0usize;

    for (index, input) in args.inputs.iter().enumerate() {
        if let Err(err) = process_one(input, &args, index, total).await {
            print_error(&format!("{:#}", err));
            failures += 1;
        }
    }

    if total > 1 {
        eprintln!();
        if failures == 0 {
            print_success(&format!("All {} articles saved", total));
        } else {
            print_error(&format!("{} of {} articles failed", failures, total));
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} input(s) failed");
    }
    Ok(())
}
