use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use log::{debug, error};
use tokio::sync::mpsc;
use tokio::sync::Mutex;

use crate::extract::extract_inline_scripts;
use crate::fetch::{PageFetcher, RetryPolicy};
use crate::patterns::{Finding, SinkMatcher};
use crate::report;

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub concurrency: usize,
    pub verbose: bool,
    pub policy: RetryPolicy,
}

/// Run totals, surfaced unconditionally after drain. Per-URL error detail is
/// verbose-gated, the counts are not.
#[derive(Debug)]
pub struct ScanOutcome {
    pub processed: usize,
    pub flagged: usize,
    pub errors: usize,
    pub input_error: Option<io::Error>,
}

#[derive(Default)]
struct ScanStats {
    processed: AtomicUsize,
    flagged: AtomicUsize,
    errors: AtomicUsize,
}

/// Drives the whole scan: feeds input lines into a work queue consumed by
/// `options.concurrency` workers, while a single collector serializes their
/// reports into `out`. Returns once every queued target has been resolved and
/// all output is flushed.
pub async fn run_scan<I, W>(
    input: I,
    fetcher: Arc<dyn PageFetcher>,
    matcher: Arc<SinkMatcher>,
    options: ScanOptions,
    out: W,
) -> io::Result<ScanOutcome>
where
    I: Iterator<Item = io::Result<String>>,
    W: Write + Send + 'static,
{
    let (work_tx, work_rx) = mpsc::unbounded_channel::<String>();
    let work_rx = Arc::new(Mutex::new(work_rx));
    let (report_tx, mut report_rx) = mpsc::unbounded_channel::<String>();

    let stats = Arc::new(ScanStats::default());

    let mut workers = Vec::with_capacity(options.concurrency);
    for _ in 0..options.concurrency {
        let work_rx = Arc::clone(&work_rx);
        let report_tx = report_tx.clone();
        let fetcher = Arc::clone(&fetcher);
        let matcher = Arc::clone(&matcher);
        let stats = Arc::clone(&stats);
        workers.push(tokio::spawn(async move {
            loop {
                let target = work_rx.lock().await.recv().await;
                let target = match target {
                    Some(target) => target,
                    None => break,
                };
                if let Some(line) =
                    process_target(&target, fetcher.as_ref(), &matcher, options, &stats).await
                {
                    // A closed results channel means output already failed.
                    let _ = report_tx.send(line);
                }
            }
        }));
    }

    let collector = tokio::spawn(async move {
        let mut out = out;
        while let Some(line) = report_rx.recv().await {
            writeln!(out, "{}", line)?;
        }
        out.flush()
    });

    // Feed every line as-is; workers skip blanks. A read failure stops the
    // feed but not work already queued.
    let mut input_error = None;
    for line in input {
        match line {
            Ok(line) => {
                let _ = work_tx.send(line);
            }
            Err(e) => {
                input_error = Some(e);
                break;
            }
        }
    }

    // Two-phase shutdown: close the work queue and join every worker, then
    // close the results channel and join the collector.
    drop(work_tx);
    for joined in join_all(workers).await {
        if let Err(e) = joined {
            error!("worker task failed: {}", e);
        }
    }
    drop(report_tx);
    match collector.await {
        Ok(write_result) => write_result?,
        Err(e) => error!("collector task failed: {}", e),
    }

    Ok(ScanOutcome {
        processed: stats.processed.load(Ordering::Relaxed),
        flagged: stats.flagged.load(Ordering::Relaxed),
        errors: stats.errors.load(Ordering::Relaxed),
        input_error,
    })
}

/// One worker iteration: fetch, extract, match. Returns the report for this
/// URL, or None when there is nothing to say in the current mode.
async fn process_target(
    target: &str,
    fetcher: &dyn PageFetcher,
    matcher: &SinkMatcher,
    options: ScanOptions,
    stats: &ScanStats,
) -> Option<String> {
    let url = target.trim();
    if url.is_empty() {
        return None;
    }
    stats.processed.fetch_add(1, Ordering::Relaxed);

    // Pace before every request, whatever the previous outcome was.
    tokio::time::sleep(options.policy.jitter_delay()).await;

    let body = match fetcher.fetch(url).await {
        Ok(body) => body,
        Err(e) => {
            stats.errors.fetch_add(1, Ordering::Relaxed);
            error!("fetch failed for {}: {}", url, e);
            return if options.verbose {
                Some(report::fetch_error(url, &e))
            } else {
                None
            };
        }
    };

    let scripts = match extract_inline_scripts(&body) {
        Ok(scripts) => scripts,
        Err(e) => {
            stats.errors.fetch_add(1, Ordering::Relaxed);
            error!("script extraction failed for {}: {}", url, e);
            return if options.verbose {
                Some(report::extract_error(url, &e))
            } else {
                None
            };
        }
    };

    let findings: Vec<Finding> = scripts
        .iter()
        .flat_map(|script| matcher.scan(script))
        .collect();

    if findings.is_empty() {
        debug!("{}: {} inline scripts, no sink patterns", url, scripts.len());
        return if options.verbose {
            Some(report::clean(url))
        } else {
            None
        };
    }

    stats.flagged.fetch_add(1, Ordering::Relaxed);
    Some(report::findings(url, &findings))
}
