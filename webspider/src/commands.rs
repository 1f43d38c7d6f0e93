use crate::CLAP_STYLING;
use crate::handlers::parse_target_url;
use clap::{arg, command};
use webspider_scanner::Traversal;

pub const DEFAULT_DB_PATH: &str = "~/.config/webspider/webspider.db";

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("webspider")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("webspider")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-v --"verbose" "Log debug output")
                .global(true)
                .conflicts_with("quiet"),
        )
        .arg(arg!(-q --"quiet" "Only log warnings and errors").global(true))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl a site from a start URL, recording every page with its parent, depth, \
                query parameters and input fields.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The URL to start crawling from")
                        .value_parser(parse_target_url),
                )
                .arg(
                    arg!(-d --"depth" <DEPTH>)
                        .required(false)
                        .help("Maximum link depth below the seeds")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("1"),
                )
                .arg(
                    arg!(--"static")
                        .required(false)
                        .help("Fetch pages with plain HTTP requests (default)")
                        .action(clap::ArgAction::SetTrue)
                        .conflicts_with("dynamic"),
                )
                .arg(
                    arg!(--"dynamic")
                        .required(false)
                        .help("Render pages in a headless browser before extracting links")
                        .action(clap::ArgAction::SetTrue)
                        .conflicts_with("static"),
                )
                .arg(
                    arg!(-m --"mode" <MODE>)
                        .required(false)
                        .help("Traversal order: dfs or bfs")
                        .value_parser(clap::value_parser!(Traversal))
                        .default_value("dfs"),
                )
                .arg(
                    arg!(--"include" <PATTERNS>)
                        .required(false)
                        .help("Comma-separated regexes; only matching URLs are followed"),
                )
                .arg(
                    arg!(--"exclude" <PATTERNS>)
                        .required(false)
                        .help("Comma-separated regexes; matching URLs are never followed"),
                )
                .arg(
                    arg!(-c --"cookie" <COOKIE>)
                        .required(false)
                        .help("Cookies to send, as 'name=value; name2=value2'"),
                )
                .arg(
                    arg!(--"bf" <WORDLIST>)
                        .required(false)
                        .help("Brute-force extra seed paths from a wordlist before crawling")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"db" <PATH>)
                        .required(false)
                        .help("Location of the SQLite link store")
                        .default_value(DEFAULT_DB_PATH),
                )
                .arg(
                    arg!(--"allow-offsite")
                        .required(false)
                        .help("Follow links to other hosts (default: stay on the start site)")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"batch-size" <NUM_PAGES>)
                        .required(false)
                        .help("Pages rendered concurrently in dynamic breadth-first crawls")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("20"),
                )
                .arg(
                    arg!(-t --"timeout" <SECONDS>)
                        .required(false)
                        .help("Per-page timeout in seconds (default: 5 static, 10 dynamic)")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"no-block-resources")
                        .required(false)
                        .help("Let the browser load images, fonts and stylesheets")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"report")
                        .required(false)
                        .help("Print a host-grouped report of this run's pages")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
