//! Progress reporting for the scanner CLI
//!
//! Provides a live spinner using indicatif and the end-of-scan summary.

use crate::scanner::{ScanProgress, ScanSummary, SegmentOutcome};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{HumanCount, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter that displays scan status
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &ScanProgress) {
        let mut msg = format!(
            "Records: {} | Pages: {} | Rate: {:.0}/s | Segments: {}/{} running",
            format_number(progress.items),
            format_number(progress.pages),
            progress.items_per_second(),
            progress.running,
            progress.total_segments,
        );

        if progress.backing_off > 0 {
            msg.push_str(&format!(" | Backing off: {}", progress.backing_off));
        }

        self.bar.set_message(msg);
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    HumanCount(n).to_string()
}

fn outcome_label(outcome: Option<&SegmentOutcome>) -> String {
    match outcome {
        Some(SegmentOutcome::Exhausted) => style("done").green().to_string(),
        Some(SegmentOutcome::Cancelled) => style("cancelled").yellow().to_string(),
        Some(SegmentOutcome::GaveUp { error }) => {
            format!("{} ({})", style("gave up").red(), error)
        }
        Some(SegmentOutcome::Panicked) => style("handler panicked").red().to_string(),
        None => style("running").dim().to_string(),
    }
}

/// Print a summary of the scan results
pub fn print_summary(summary: &ScanSummary, bytes: u64) {
    let duration_secs = summary.duration.as_secs_f64();
    let items = summary.total_items();
    let rate = if duration_secs > 0.0 {
        items as f64 / duration_secs
    } else {
        0.0
    };

    let title = if summary.is_complete() {
        style("Scan Complete").green().bold()
    } else {
        style("Scan Incomplete").yellow().bold()
    };

    println!();
    println!("{}", title);
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Records:").bold(), format_number(items));
    println!("  {} {}", style("Pages:").bold(), format_number(summary.total_pages()));
    println!("  {} {}", style("Total Size:").bold(), format_size(bytes, BINARY));
    println!(
        "  {} {:.1}s ({:.0} records/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    let failures = summary.total_failures();
    if failures > 0 {
        println!(
            "  {} {}",
            style("Failed reads:").yellow().bold(),
            format_number(failures)
        );
    }
    println!("  {}", style("Segments:").bold());
    for report in &summary.segments {
        println!(
            "    {:>4}  {:>12} records  {}",
            report.segment,
            format_number(report.items),
            outcome_label(report.outcome.as_ref())
        );
    }
    println!();
}

/// Print a header at the start of the scan
pub fn print_header(table: &str, segments: &[u32], total_segments: u32) {
    println!();
    println!(
        "{} {}",
        style("table-scanner").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Table:").bold(), table);
    match (segments.first(), segments.last()) {
        (Some(first), Some(last)) => println!(
            "  {} {}-{} of {}",
            style("Segments:").bold(),
            first,
            last,
            total_segments
        ),
        _ => println!("  {} none", style("Segments:").bold()),
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_outcome_label_mentions_error() {
        let label = outcome_label(Some(&SegmentOutcome::GaveUp {
            error: "Table not found: 'x'".into(),
        }));
        assert!(label.contains("Table not found"));
    }
}
