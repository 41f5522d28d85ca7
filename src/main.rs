mod extract;
mod fetch;
mod opt;
mod patterns;
mod pipeline;
mod report;
mod utils;

use fetch::{PageFetcher, ProxyFetcher, RetryPolicy};
use opt::Opt;
use patterns::SinkMatcher;
use pipeline::{run_scan, ScanOptions};
use utils::{print_error, read_lines, read_stdin_lines};

use colored::*;
use std::io;
use std::sync::Arc;
use structopt::StructOpt;

#[tokio::main]
async fn main() {
    let opt = Opt::from_args();
    if opt.verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    println!("{}", "DOMSINK - Starting scan...".green().bold());

    let policy = RetryPolicy::new(opt.rate_limit, opt.retry_after);
    let fetcher: Arc<dyn PageFetcher> = Arc::new(ProxyFetcher::new(policy));
    let matcher = Arc::new(SinkMatcher::new());
    let options = ScanOptions {
        concurrency: opt.concurrency,
        verbose: opt.verbose,
        policy,
    };

    let result = if let Some(file_path) = opt.file {
        match read_lines(&file_path) {
            Ok(lines) => run_scan(lines, fetcher, matcher, options, io::stdout()).await,
            Err(e) => {
                print_error(
                    opt.verbose,
                    &format!("Error reading file: {}", file_path),
                    &e,
                );
                return;
            }
        }
    } else {
        run_scan(read_stdin_lines(), fetcher, matcher, options, io::stdout()).await
    };

    match result {
        Ok(outcome) => {
            if let Some(e) = outcome.input_error {
                eprintln!("Error reading input: {}", e);
            }
            eprintln!(
                "Scan complete: {} URLs processed, {} with findings, {} errors",
                outcome.processed, outcome.flagged, outcome.errors
            );
        }
        Err(e) => eprintln!("Error writing report: {}", e),
    }
}
