//! Terminal display logic for the drop-scan CLI.
//!
//! Colored per-domain lines, headers, summaries and notices. Human output
//! goes to stdout; notices go to stderr so `--json` output stays clean.

use chrono::NaiveDate;
use console::{pad_str, style, Alignment};
use drop_scan_lib::{DomainRecord, DropEntry, PipelineOptions, ReportPaths, ScanConfig, ScanOutcome};
use std::path::Path;
use std::time::Duration;

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a scan.
pub fn print_header(target_date: NaiveDate, config: &ScanConfig, options: &PipelineOptions) {
    println!(
        "{} {} {}",
        style("drop-scan").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!("- Scanning drops for {}", target_date)).dim(),
    );

    let mut meta_parts: Vec<String> = vec![format!(
        "TLDs: {}",
        config
            .tlds
            .iter()
            .map(|t| format!(".{}", t))
            .collect::<Vec<_>>()
            .join(" ")
    )];

    if options.lookahead_days > 0 {
        meta_parts.push(format!("+{} days", options.lookahead_days));
    }
    if options.check_index {
        meta_parts.push(format!("Engines: {}", config.engines.join(", ")));
    }
    if options.only_indexed {
        meta_parts.push(format!("Min pages: {}", options.min_indexed_pages));
    }
    if options.dry_run {
        meta_parts.push("Dry run".to_string());
    }

    println!("{}", style(meta_parts.join(" | ")).dim());
    println!();
}

// ── Single record line ───────────────────────────────────────────────────────

/// Print one domain's record.
///
/// If `counter` is Some((current, total)), a progress prefix like `[3/8]` is shown.
pub fn print_record(record: &DomainRecord, counter: Option<(usize, usize)>) {
    let padded_domain = pad_str(&record.domain, 30, Alignment::Left, Some(".."));

    let prefix = match counter {
        Some((cur, total)) => format!("{} ", style(format!("[{}/{}]", cur, total)).dim()),
        None => String::new(),
    };

    let availability = match record.available {
        Some(true) => style(pad_str("AVAILABLE", 9, Alignment::Left, None).to_string())
            .green()
            .bold(),
        Some(false) => style(pad_str("TAKEN", 9, Alignment::Left, None).to_string())
            .red()
            .bold(),
        None => style(pad_str("UNKNOWN", 9, Alignment::Left, None).to_string()).yellow(),
    };

    println!(
        "  {}{}  {}  {}",
        prefix,
        style(&padded_domain).white(),
        availability,
        index_label(record),
    );
}

/// Short description of a record's index state.
pub fn index_label(record: &DomainRecord) -> String {
    match (record.indexed, record.estimated_pages) {
        (Some(true), Some(pages)) => format!(
            "{} via {}",
            style(format!("{} pages", pages)).cyan(),
            record.index_source.as_deref().unwrap_or("?")
        ),
        (Some(true), None) => style("indexed").cyan().to_string(),
        (Some(false), _) => style("not indexed").dim().to_string(),
        (None, _) => style("index unknown").yellow().dim().to_string(),
    }
}

// ── Test fetch ───────────────────────────────────────────────────────────────

/// Print how many rows each feed listed.
pub fn print_feed_sizes(feed_sizes: &[(String, usize)]) {
    for (tld, size) in feed_sizes {
        println!(
            "  {} {}",
            style(format!(".{:<4}", tld)).bold(),
            style(format!("{} domains listed", size)).dim()
        );
    }
    println!();
}

pub fn print_drop_list(target_date: NaiveDate, entries: &[DropEntry]) {
    println!(
        "{} domain{} releasing from {}:",
        style(entries.len()).bold(),
        plural(entries.len()),
        target_date
    );
    for entry in entries {
        println!(
            "  {}  {}",
            pad_str(&entry.domain, 30, Alignment::Left, Some("..")),
            style(entry.release_date).dim()
        );
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the final summary block.
pub fn print_summary(outcome: &ScanOutcome, duration: Duration) {
    let summary = outcome.summary();

    println!();
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!(
        "  {} of {} domain{} kept in {:.1}s  {}  {}  {}  {}",
        style(summary.total).bold(),
        outcome.fetched,
        plural(outcome.fetched),
        duration.as_secs_f64(),
        style("|").dim(),
        style(format!("{} available", summary.available)).green(),
        style("|").dim(),
        style(format!("{} indexed", summary.indexed)).cyan(),
    );

    if !summary.top.is_empty() {
        println!();
        println!("  {}", style("Top domains by indexed pages:").bold());
        for (domain, pages) in &summary.top {
            println!("    {} {} pages", pad_str(domain, 30, Alignment::Left, Some("..")), pages);
        }
    }
    println!();
}

pub fn print_report_paths(paths: &ReportPaths) {
    println!("  {} {}", style("CSV report: ").dim(), paths.csv.display());
    println!("  {} {}", style("JSON report:").dim(), paths.json.display());
}

pub fn print_report_list(directory: &Path, dates: &[NaiveDate]) {
    if dates.is_empty() {
        println!("No reports in {}", directory.display());
        return;
    }

    println!(
        "{} report{} in {}:",
        style(dates.len()).bold(),
        plural(dates.len()),
        directory.display()
    );
    for date in dates {
        println!("  {}", date);
    }
}

/// Print a notice to stderr.
pub fn print_notice(message: &str) {
    eprintln!("{} {}", style("note:").yellow().bold(), message);
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use drop_scan_lib::IndexResult;

    fn make_record(index: Option<IndexResult>) -> DomainRecord {
        let entry = DropEntry::new(
            "example.se",
            "se",
            NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
        )
        .unwrap();
        DomainRecord::assemble(&entry, Some(false), index, Utc::now())
    }

    #[test]
    fn test_index_label_pages() {
        console::set_colors_enabled(false);
        let record = make_record(Some(IndexResult::indexed(150, "wayback")));
        assert_eq!(index_label(&record), "150 pages via wayback");
    }

    #[test]
    fn test_index_label_states() {
        console::set_colors_enabled(false);
        assert_eq!(
            index_label(&make_record(Some(IndexResult::not_indexed()))),
            "not indexed"
        );
        assert_eq!(
            index_label(&make_record(Some(IndexResult::unknown()))),
            "index unknown"
        );
        assert_eq!(index_label(&make_record(None)), "index unknown");
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1), "");
        assert_eq!(plural(0), "s");
        assert_eq!(plural(2), "s");
    }
}
