//! table-scanner - Parallel Segmented Table Scanner
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::process::ExitCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use table_scanner::config::CliArgs;
use table_scanner::progress::{print_header, print_summary, ProgressReporter};
use table_scanner::storage::JsonLinesTable;
use table_scanner::Scanner;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every segment was scanned to the end
fn run() -> Result<bool> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    args.validate_table_path().context("Invalid configuration")?;

    let table = JsonLinesTable::open(&args.table)
        .with_context(|| format!("Failed to load table from {}", args.table.display()))?;
    let table_name = table.name().to_string();
    info!(table = %table_name, records = table.len(), "Table loaded");

    let config = args
        .scan_config(table_name.clone(), Arc::new(table))
        .context("Invalid configuration")?;

    let show_progress = !args.quiet && !args.json;
    if show_progress {
        print_header(&table_name, &config.segments(), config.total_segments);
    }

    let scanner = Scanner::new(config);

    // Setup signal handler for graceful shutdown
    let cancel = scanner.cancel_signal();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, stopping segments...");
        cancel.cancel();
    })
    .context("Failed to set signal handler")?;

    let bytes = Arc::new(AtomicU64::new(0));
    let bytes_seen = Arc::clone(&bytes);
    scanner
        .start(move |items: Vec<Value>| {
            let size: usize = items.iter().map(|item| item.to_string().len()).sum();
            bytes_seen.fetch_add(size as u64, Ordering::Relaxed);
        })
        .context("Failed to start scan")?;

    let progress = show_progress.then(ProgressReporter::new);

    let summary = loop {
        if let Some(summary) = scanner.wait_timeout(Duration::from_millis(200)) {
            break summary;
        }
        if let Some(ref p) = progress {
            p.update(&scanner.progress());
        }
    };

    let complete = summary.is_complete();
    if let Some(ref p) = progress {
        p.finish(if complete { "Scan completed" } else { "Scan stopped" });
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to encode summary")?
        );
    } else if !args.quiet {
        print_summary(&summary, bytes.load(Ordering::Relaxed));
    }

    if !complete {
        warn!("Scan ended before every segment was exhausted");
    }

    Ok(complete)
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("table_scanner=debug,warn")
    } else {
        EnvFilter::new("table_scanner=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(true)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
