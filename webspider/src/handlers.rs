use anyhow::{Context, anyhow, bail};
use chrono::Utc;
use clap::ArgMatches;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::Level;
use url::Url;
use webspider_core::crawl::{CrawlOptions, FetchMode, execute_crawl, generate_crawl_report};
use webspider_core::data::Database;
use webspider_scanner::Traversal;

/// Parse the start URL, adding http:// when no scheme is given
pub fn parse_target_url(raw: &str) -> Result<Url, String> {
    let raw = raw.trim();
    let url = match Url::parse(raw) {
        Ok(url) if url.has_host() => url,
        _ => Url::parse(&format!("http://{}", raw))
            .map_err(|e| format!("invalid URL '{}': {}", raw, e))?,
    };

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{}' (expected http or https)", other)),
    }
}

/// Expand `~` in the database path
pub fn resolve_db_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

pub fn log_level(verbose: bool, quiet: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    }
}

pub fn init_logging(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Create the parent directory if needed and open the link store
pub fn open_database(path: &Path) -> anyhow::Result<Database> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Database::new(path).with_context(|| format!("Failed to open database {}", path.display()))
}

/// Translate `crawl` arguments into core crawl options
pub fn crawl_options_from_args(args: &ArgMatches) -> anyhow::Result<CrawlOptions> {
    let url = args
        .get_one::<Url>("url")
        .ok_or_else(|| anyhow!("--url is required"))?;

    let mut options = CrawlOptions::new(url.as_str());
    if let Some(depth) = args.get_one::<usize>("depth") {
        options.max_depth = *depth;
    }
    options.mode = if args.get_flag("dynamic") {
        FetchMode::Dynamic
    } else {
        FetchMode::Static
    };
    if let Some(traversal) = args.get_one::<Traversal>("mode") {
        options.traversal = *traversal;
    }
    options.include = args.get_one::<String>("include").cloned();
    options.exclude = args.get_one::<String>("exclude").cloned();
    options.cookie = args.get_one::<String>("cookie").cloned();
    options.wordlist = args.get_one::<PathBuf>("bf").cloned();
    options.same_site = !args.get_flag("allow-offsite");
    options.timeout_secs = args.get_one::<u64>("timeout").copied();
    if let Some(batch_size) = args.get_one::<usize>("batch-size") {
        if *batch_size == 0 {
            bail!("--batch-size must be at least 1");
        }
        options.batch_size = *batch_size;
    }
    options.block_resources = !args.get_flag("no-block-resources");
    options.show_progress_bars = !args.get_flag("quiet");

    Ok(options)
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

pub async fn handle_crawl(args: &ArgMatches) -> anyhow::Result<()> {
    let options = crawl_options_from_args(args)?;
    let db_path = resolve_db_path(
        args.get_one::<String>("db")
            .map(String::as_str)
            .unwrap_or(crate::commands::DEFAULT_DB_PATH),
    );
    let show_report = args.get_flag("report");

    print_divider();
    println!(
        "{} {} ({}, {}, depth {})",
        "  CRAWLING".bright_white().bold(),
        options.url.bright_white(),
        options.mode,
        options.traversal,
        options.max_depth
    );
    print_divider();

    let mut db = open_database(&db_path)?;

    let started = Utc::now();
    let timer = Instant::now();
    let outcome = execute_crawl(options, &mut db)
        .await
        .map_err(|e| anyhow!(e))?;
    let summary = &outcome.summary;

    println!();
    println!(
        "{} Crawl finished in {:.1}s",
        "✓".green().bold(),
        timer.elapsed().as_secs_f64()
    );
    println!("  {} {}", "Seeds:".blue(), outcome.seeds.len());
    println!("  {} {}", "Pages fetched:".blue(), summary.fetched);
    println!("  {} {}", "New records:".blue(), summary.persisted);
    println!("  {} {}", "Already stored:".blue(), summary.duplicates);
    if summary.failure_count() > 0 {
        println!(
            "  {} {}",
            "Failures:".yellow(),
            summary.failure_count().to_string().yellow().bold()
        );
    }
    println!(
        "  {} {}",
        "Database:".blue(),
        db_path.display().to_string().bright_white()
    );
    println!("  {} {}", "Run:".blue(), outcome.run_id);

    if show_report {
        let mut records = db.get_links().context("Failed to read stored links")?;
        records.retain(|r| r.collected_at >= started);
        println!();
        print!("{}", generate_crawl_report(summary, &records));
    }

    Ok(())
}
