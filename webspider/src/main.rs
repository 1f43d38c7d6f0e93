use colored::Colorize;
use webspider::commands::command_argument_builder;
use webspider::handlers::{handle_crawl, init_logging, log_level};

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();

    init_logging(log_level(
        chosen_command.get_flag("verbose"),
        chosen_command.get_flag("quiet"),
    ));

    let outcome = match chosen_command.subcommand() {
        Some(("crawl", primary_command)) => handle_crawl(primary_command).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
