//! callcache - look up amateur radio operators by call sign, offline.
//!
//! The first command downloads the call-sign dataset into a local database;
//! later commands answer from that database.

use std::io;

use anyhow::{Context, Result};
use callcache_core::{CallsignLookup, CallsignLookupResult, Config};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "\
Usage: callcache [--json] <command>

Commands:
  lookup <CALL>             Exact call-sign lookup
  search <TERM> [--max N]   Prefix matches, then substring matches
  status                    Show whether the local cache is populated
  refresh                   Discard the local cache and download it again
";

enum Command {
    Lookup(String),
    Search { term: String, max: Option<usize> },
    Status,
    Refresh,
}

struct Args {
    json: bool,
    command: Command,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut json = false;
    let mut positional = Vec::new();
    let mut max = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--max" => {
                let value = iter.next().context("--max needs a number")?;
                max = Some(value.parse::<usize>().context("--max needs a number")?);
            }
            _ => positional.push(arg.as_str()),
        }
    }

    let command = match positional.as_slice() {
        ["lookup", call] => Command::Lookup(call.to_string()),
        ["search", term] => Command::Search {
            term: term.to_string(),
            max,
        },
        ["status"] => Command::Status,
        ["refresh"] => Command::Refresh,
        _ => anyhow::bail!("{}", USAGE),
    };

    Ok(Args { json, command })
}

/// Initialize the tracing subscriber for logging.
/// Logs go to stderr, or to a daily file when `log_dir` is configured.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "callcache.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

fn print_result(result: &CallsignLookupResult) {
    println!("{:<10} {}", result.call_sign, result.full_name);
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&argv)?;

    let config = Config::load().context("Failed to load config")?;
    let _guard = init_tracing(&config);
    let resolved = config.resolve()?;
    info!(db = %resolved.database_path.display(), "callcache starting");

    let lookup = CallsignLookup::from_config(&resolved)?;

    match args.command {
        Command::Lookup(call) => {
            let result = lookup.lookup_exact(&call).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                match result {
                    Some(result) => print_result(&result),
                    None => eprintln!("{}: not found", call.to_uppercase()),
                }
            }
        }
        Command::Search { term, max } => {
            let results = lookup.search_partial(&term, max).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                eprintln!("No call signs match {}", term.to_uppercase());
            } else {
                results.iter().for_each(print_result);
            }
        }
        Command::Status => {
            let status = lookup.status().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("Populated: {}", if status.populated { "yes" } else { "no" });
                println!("Records:   {}", status.record_count);
                println!("Updated:   {}", status.age_display());
            }
        }
        Command::Refresh => {
            let report = lookup.force_refresh().await?;
            println!(
                "Loaded {} call signs in {} batches ({} lines skipped)",
                report.records, report.batches, report.skipped_lines
            );
        }
    }

    Ok(())
}
