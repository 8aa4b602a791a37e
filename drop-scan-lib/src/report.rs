//! Report generation in CSV and JSON formats.
//!
//! Every run writes one pair of files named after its target date into the
//! report directory. A second run for the same date replaces both files; runs
//! for different dates never touch each other's reports.

use crate::error::ScanError;
use crate::types::DomainRecord;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// CSV header line, in column order.
pub const CSV_HEADER: &str =
    "domain,tld,release_date,available,indexed,estimated_pages,index_source,checked_at";

/// Contents of a JSON report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub total_domains: usize,
    pub domains: Vec<DomainRecord>,
}

/// Locations of the two files written for one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub csv: PathBuf,
    pub json: PathBuf,
}

/// Writes and reads the reports in one directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    directory: PathBuf,
}

impl ReportWriter {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File names used for `date`.
    pub fn paths_for(&self, date: NaiveDate) -> ReportPaths {
        let stem = date.format("%Y-%m-%d").to_string();
        ReportPaths {
            csv: self.directory.join(format!("{}.csv", stem)),
            json: self.directory.join(format!("{}.json", stem)),
        }
    }

    /// Write the CSV and JSON reports for `date`.
    ///
    /// # Errors
    ///
    /// `ScanError::WriteError` if the directory cannot be created or either
    /// file cannot be written.
    pub fn write(&self, records: &[DomainRecord], date: NaiveDate) -> Result<ReportPaths, ScanError> {
        self.write_at(records, date, Utc::now())
    }

    /// Like [`write`](Self::write) with an explicit `generated_at`.
    pub fn write_at(
        &self,
        records: &[DomainRecord],
        date: NaiveDate,
        generated_at: DateTime<Utc>,
    ) -> Result<ReportPaths, ScanError> {
        let mut rows = records.to_vec();
        sort_for_report(&mut rows);

        let csv = render_csv(&rows);
        let report = Report {
            generated_at,
            total_domains: rows.len(),
            domains: rows,
        };
        let json = serde_json::to_string_pretty(&report)?;

        fs::create_dir_all(&self.directory).map_err(|e| {
            ScanError::write(self.directory.to_string_lossy(), format!("cannot create directory: {}", e))
        })?;

        // both files are staged before either replaces the previous pair
        let paths = self.paths_for(date);
        let staged_csv = stage(&paths.csv, &csv)?;
        let staged_json = match stage(&paths.json, &json) {
            Ok(staged) => staged,
            Err(e) => {
                let _ = fs::remove_file(&staged_csv);
                return Err(e);
            }
        };
        commit(&staged_csv, &paths.csv)?;
        commit(&staged_json, &paths.json)?;

        info!(
            csv = %paths.csv.display(),
            json = %paths.json.display(),
            domains = report.total_domains,
            "reports written"
        );
        Ok(paths)
    }

    /// Load the JSON report for `date`.
    pub fn load(&self, date: NaiveDate) -> Result<Report, ScanError> {
        read_report(self.paths_for(date).json)
    }

    /// Dates with a JSON report in the directory, newest first.
    ///
    /// A missing directory simply has no reports.
    pub fn list_reports(&self) -> Result<Vec<NaiveDate>, ScanError> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ScanError::file_error(
                    self.directory.to_string_lossy(),
                    e.to_string(),
                ))
            }
        };

        let mut dates: Vec<NaiveDate> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok())
            })
            .collect();

        dates.sort_unstable_by(|a, b| b.cmp(a));
        Ok(dates)
    }
}

/// Write the reports for `date` into `directory`.
pub fn write_report<P: AsRef<Path>>(
    records: &[DomainRecord],
    directory: P,
    date: NaiveDate,
) -> Result<ReportPaths, ScanError> {
    ReportWriter::new(directory.as_ref()).write(records, date)
}

/// Parse a JSON report from disk and check every record.
pub fn read_report<P: AsRef<Path>>(path: P) -> Result<Report, ScanError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| ScanError::file_error(path.to_string_lossy(), e.to_string()))?;

    let report: Report = serde_json::from_str(&content)?;
    for record in &report.domains {
        record.validate()?;
    }
    if report.total_domains != report.domains.len() {
        return Err(ScanError::ParseError {
            message: format!(
                "total_domains is {} but the report lists {} domains",
                report.total_domains,
                report.domains.len()
            ),
        });
    }
    Ok(report)
}

/// Order rows by page count (highest first), then by domain name.
pub fn sort_for_report(records: &mut [DomainRecord]) {
    records.sort_by(|a, b| {
        b.estimated_pages
            .unwrap_or(0)
            .cmp(&a.estimated_pages.unwrap_or(0))
            .then_with(|| a.domain.cmp(&b.domain))
    });
}

/// Render records as CSV, header first. Nulls become empty fields.
pub fn render_csv(records: &[DomainRecord]) -> String {
    let mut out = String::with_capacity(64 * (records.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');

    for record in records {
        let fields = [
            csv_field(&record.domain),
            csv_field(&record.tld),
            Cow::Owned(record.release_date.format("%Y-%m-%d").to_string()),
            Cow::Borrowed(bool_field(record.available)),
            Cow::Borrowed(bool_field(record.indexed)),
            Cow::Owned(record.estimated_pages.map(|p| p.to_string()).unwrap_or_default()),
            csv_field(record.index_source.as_deref().unwrap_or("")),
            Cow::Owned(record.checked_at.to_rfc3339()),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    out
}

fn bool_field(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "true",
        Some(false) => "false",
        None => "",
    }
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Write `contents` to a sibling temp file of `path` and return its path.
fn stage(path: &Path, contents: &str) -> Result<PathBuf, ScanError> {
    let tmp = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("out")
    ));

    fs::write(&tmp, contents)
        .map_err(|e| ScanError::write(tmp.to_string_lossy(), e.to_string()))?;
    Ok(tmp)
}

/// Move a staged file over `path`.
fn commit(tmp: &Path, path: &Path) -> Result<(), ScanError> {
    fs::rename(tmp, path).map_err(|e| {
        let _ = fs::remove_file(tmp);
        ScanError::write(path.to_string_lossy(), e.to_string())
    })
}

/// Totals printed at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub total: usize,
    pub available: usize,
    pub indexed: usize,
    pub with_pages: usize,
    pub highest_pages: Option<u64>,
    /// Up to five (domain, pages) pairs, most pages first
    pub top: Vec<(String, u64)>,
}

impl ScanSummary {
    pub fn from_records(records: &[DomainRecord]) -> Self {
        let mut with_pages: Vec<(String, u64)> = records
            .iter()
            .filter_map(|r| r.estimated_pages.map(|p| (r.domain.clone(), p)))
            .collect();
        with_pages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            total: records.len(),
            available: records.iter().filter(|r| r.available == Some(true)).count(),
            indexed: records.iter().filter(|r| r.indexed == Some(true)).count(),
            with_pages: with_pages.len(),
            highest_pages: with_pages.first().map(|(_, p)| *p),
            top: with_pages.into_iter().take(5).collect(),
        }
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Domain Scan Summary")?;
        writeln!(f, "===================")?;
        writeln!(f, "Total domains scanned: {}", self.total)?;
        writeln!(f, "Available (DNS): {}", self.available)?;
        writeln!(f, "Indexed: {}", self.indexed)?;
        write!(f, "With page count data: {}", self.with_pages)?;

        if let Some(highest) = self.highest_pages {
            write!(f, "\nHighest page count: {}", highest)?;
        }
        if !self.top.is_empty() {
            write!(f, "\n\nTop domains by indexed pages:")?;
            for (domain, pages) in &self.top {
                write!(f, "\n  - {}: {} pages", domain, pages)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DropEntry, IndexResult};
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()
    }

    fn record(domain: &str, tld: &str, pages: Option<u64>) -> DomainRecord {
        let entry = DropEntry::new(domain, tld, date()).unwrap();
        let index = match pages {
            Some(p) => IndexResult::indexed(p, "wayback"),
            None => IndexResult::not_indexed(),
        };
        DomainRecord::assemble(&entry, Some(true), Some(index), Utc::now())
    }

    #[test]
    fn test_render_csv_header_and_nulls() {
        let entry = DropEntry::new("sample.nu", "nu", date()).unwrap();
        let unchecked = DomainRecord::assemble(&entry, None, None, Utc::now());
        let csv = render_csv(&[unchecked.clone()]);
        let mut lines = csv.lines();

        assert_eq!(lines.next(), Some(CSV_HEADER));
        let row = lines.next().unwrap();
        assert!(row.starts_with("sample.nu,nu,2026-02-10,,,,,"));
        assert!(row.ends_with(&unchecked.checked_at.to_rfc3339()));
    }

    #[test]
    fn test_render_csv_booleans_are_lowercase() {
        let csv = render_csv(&[record("example.se", "se", Some(150))]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("example.se,se,2026-02-10,true,true,150,wayback,"));
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_sort_for_report() {
        let mut rows = vec![
            record("b.se", "se", Some(10)),
            record("c.se", "se", None),
            record("a.se", "se", Some(10)),
            record("d.se", "se", Some(200)),
        ];
        sort_for_report(&mut rows);
        let order: Vec<&str> = rows.iter().map(|r| r.domain.as_str()).collect();
        assert_eq!(order, vec!["d.se", "a.se", "b.se", "c.se"]);
    }

    #[test]
    fn test_write_then_read_back() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path().join("nested/reports"));
        let records = vec![record("example.se", "se", Some(150)), record("sample.nu", "nu", None)];

        let paths = writer.write(&records, date()).unwrap();
        assert!(paths.csv.ends_with("2026-02-10.csv"));
        assert!(paths.json.ends_with("2026-02-10.json"));

        let report = writer.load(date()).unwrap();
        assert_eq!(report.total_domains, 2);
        assert_eq!(report.domains, records);
    }

    #[test]
    fn test_same_date_overwrites() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path());

        writer.write(&[record("a.se", "se", Some(1))], date()).unwrap();
        writer.write(&[], date()).unwrap();

        let report = writer.load(date()).unwrap();
        assert_eq!(report.total_domains, 0);
        let csv = fs::read_to_string(writer.paths_for(date()).csv).unwrap();
        assert_eq!(csv.trim_end(), CSV_HEADER);
    }

    #[test]
    fn test_failed_json_keeps_previous_pair() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path());
        let paths = writer.write(&[record("old.se", "se", Some(5))], date()).unwrap();
        let old_csv = fs::read_to_string(&paths.csv).unwrap();

        // a directory where the JSON temp file would go makes staging it fail
        let blocker = dir.path().join("2026-02-10.json.tmp");
        fs::create_dir(&blocker).unwrap();

        let err = writer
            .write(&[record("new.se", "se", Some(9))], date())
            .unwrap_err();
        assert!(matches!(err, ScanError::WriteError { .. }));

        assert_eq!(fs::read_to_string(&paths.csv).unwrap(), old_csv);
        assert_eq!(writer.load(date()).unwrap().domains[0].domain, "old.se");
        assert!(!dir.path().join("2026-02-10.csv.tmp").exists());
    }

    #[test]
    fn test_list_reports_newest_first() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path());
        assert!(writer.list_reports().unwrap().is_empty());

        let older = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
        writer.write(&[], older).unwrap();
        writer.write(&[], date()).unwrap();
        fs::write(dir.path().join("notes.json"), "{}").unwrap();

        assert_eq!(writer.list_reports().unwrap(), vec![date(), older]);
    }

    #[test]
    fn test_missing_directory_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path().join("absent"));
        assert!(writer.list_reports().unwrap().is_empty());
    }

    #[test]
    fn test_unwritable_directory_is_write_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        let err = write_report(&[], blocker.join("reports"), date()).unwrap_err();
        assert!(matches!(err, ScanError::WriteError { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_summary() {
        let records = vec![
            record("example.se", "se", Some(150)),
            record("sample.nu", "nu", None),
            record("other.se", "se", Some(42)),
        ];
        let summary = ScanSummary::from_records(&records);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.indexed, 2);
        assert_eq!(summary.highest_pages, Some(150));
        assert_eq!(summary.top[0], ("example.se".to_string(), 150));

        let text = summary.to_string();
        assert!(text.contains("Total domains scanned: 3"));
        assert!(text.contains("  - other.se: 42 pages"));
    }
}
