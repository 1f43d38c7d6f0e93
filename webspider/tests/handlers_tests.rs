use std::path::PathBuf;
use tempfile::TempDir;
use webspider::commands::command_argument_builder;
use webspider::handlers::*;
use webspider::FetchMode;
use webspider_scanner::Traversal;

fn crawl_matches(args: &[&str]) -> clap::ArgMatches {
    let mut argv = vec!["webspider", "crawl"];
    argv.extend_from_slice(args);
    let matches = command_argument_builder().try_get_matches_from(argv).unwrap();
    matches.subcommand_matches("crawl").unwrap().clone()
}

#[test]
fn test_parse_target_url_with_scheme() {
    let url = parse_target_url("https://example.com/app").unwrap();
    assert_eq!(url.as_str(), "https://example.com/app");
}

#[test]
fn test_parse_target_url_without_scheme() {
    let url = parse_target_url("example.com").unwrap();
    assert_eq!(url.as_str(), "http://example.com/");
}

#[test]
fn test_parse_target_url_rejects_other_schemes() {
    assert!(parse_target_url("ftp://example.com").is_err());
}

#[test]
fn test_parse_target_url_invalid() {
    assert!(parse_target_url("not a valid url!!!").is_err());
}

#[test]
fn test_resolve_db_path_expands_tilde() {
    let path = resolve_db_path("~/.config/webspider/webspider.db");
    assert!(!path.to_string_lossy().starts_with('~'));
    assert!(path.ends_with(".config/webspider/webspider.db"));
}

#[test]
fn test_resolve_db_path_plain() {
    assert_eq!(resolve_db_path("/tmp/links.db"), PathBuf::from("/tmp/links.db"));
}

#[test]
fn test_log_level() {
    assert_eq!(log_level(false, false), tracing::Level::INFO);
    assert_eq!(log_level(true, false), tracing::Level::DEBUG);
    assert_eq!(log_level(false, true), tracing::Level::WARN);
}

#[test]
fn test_crawl_defaults() {
    let options = crawl_options_from_args(&crawl_matches(&["-u", "http://example.com"])).unwrap();

    assert_eq!(options.url, "http://example.com/");
    assert_eq!(options.max_depth, 1);
    assert_eq!(options.mode, FetchMode::Static);
    assert_eq!(options.traversal, Traversal::Dfs);
    assert!(options.same_site);
    assert!(options.block_resources);
    assert_eq!(options.batch_size, 20);
    assert_eq!(options.timeout_secs, None);
    assert!(options.wordlist.is_none());
    assert!(options.show_progress_bars);
}

#[test]
fn test_crawl_all_flags() {
    let options = crawl_options_from_args(&crawl_matches(&[
        "-u",
        "https://example.com/app",
        "--depth",
        "3",
        "--dynamic",
        "--mode",
        "bfs",
        "--include",
        "/app",
        "--exclude",
        "logout,\\.pdf$",
        "--cookie",
        "sid=abc; theme=dark",
        "--bf",
        "words.txt",
        "--allow-offsite",
        "--batch-size",
        "5",
        "--timeout",
        "7",
        "--no-block-resources",
        "-q",
    ]))
    .unwrap();

    assert_eq!(options.max_depth, 3);
    assert_eq!(options.mode, FetchMode::Dynamic);
    assert_eq!(options.traversal, Traversal::Bfs);
    assert_eq!(options.include.as_deref(), Some("/app"));
    assert_eq!(options.exclude.as_deref(), Some("logout,\\.pdf$"));
    assert_eq!(options.cookie.as_deref(), Some("sid=abc; theme=dark"));
    assert_eq!(options.wordlist, Some(PathBuf::from("words.txt")));
    assert!(!options.same_site);
    assert_eq!(options.batch_size, 5);
    assert_eq!(options.timeout_secs, Some(7));
    assert!(!options.block_resources);
    assert!(!options.show_progress_bars);
}

#[test]
fn test_crawl_requires_url() {
    let result = command_argument_builder().try_get_matches_from(["webspider", "crawl"]);
    assert!(result.is_err());
}

#[test]
fn test_crawl_static_and_dynamic_conflict() {
    let result = command_argument_builder().try_get_matches_from([
        "webspider",
        "crawl",
        "-u",
        "http://example.com",
        "--static",
        "--dynamic",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_crawl_rejects_unknown_mode() {
    let result = command_argument_builder().try_get_matches_from([
        "webspider",
        "crawl",
        "-u",
        "http://example.com",
        "--mode",
        "random",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_crawl_zero_batch_size_is_error() {
    let result = crawl_options_from_args(&crawl_matches(&[
        "-u",
        "http://example.com",
        "--batch-size",
        "0",
    ]));
    assert!(result.is_err());
}

#[test]
fn test_open_database_creates_parent_dirs() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("config").join("webspider.db");

    let db = open_database(&db_path).unwrap();
    assert_eq!(db.count_links().unwrap(), 0);
    assert!(db_path.exists());
}
