//! Scan pipeline: fetch, classify, filter, report.
//!
//! The pipeline runs strictly sequentially. It fetches the drop list for the
//! target date, checks each domain one at a time, filters the records, and
//! hands them to the report writer. Only the fetch and the write can fail the
//! run; every per-domain failure degrades that domain's fields to unknown.

use crate::checker::IndexChecker;
use crate::error::ScanError;
use crate::protocols::{AvailabilityCheck, DnsAvailabilityChecker, DropListSource, IisDropList};
use crate::report::{ReportPaths, ReportWriter, ScanSummary};
use crate::types::{DomainRecord, DropEntry, ScanConfig};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

/// Which steps a run performs and how its records are filtered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Run the DNS availability check for every domain.
    /// When off, `available` stays null.
    pub check_availability: bool,

    /// Run the index check for every domain.
    /// When off, `indexed`, `estimated_pages` and `index_source` stay null.
    pub check_index: bool,

    /// Keep only records with `indexed == true` and at least
    /// `min_indexed_pages` pages.
    pub only_indexed: bool,

    /// Keep only records whose DNS check said available.
    pub only_available: bool,

    /// Perform fetch and checks but never write reports.
    pub dry_run: bool,

    /// Threshold used by `only_indexed`.
    pub min_indexed_pages: u64,

    /// Also include domains releasing up to this many days after the target.
    pub lookahead_days: u32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            check_availability: true,
            check_index: true,
            only_indexed: true,
            only_available: false,
            dry_run: false,
            min_indexed_pages: 1,
            lookahead_days: 0,
        }
    }
}

/// Lifecycle of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Done,
    Failed,
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub target_date: NaiveDate,
    /// Domains returned by the drop-list source
    pub fetched: usize,
    /// Records that survived filtering, in check order
    pub records: Vec<DomainRecord>,
    /// Written report files; `None` for dry runs
    pub report: Option<ReportPaths>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ScanOutcome {
    pub fn summary(&self) -> ScanSummary {
        ScanSummary::from_records(&self.records)
    }
}

/// Hands out `checked_at` timestamps that never go backwards within a run.
#[derive(Debug, Default)]
pub(crate) struct RunClock {
    last: Option<DateTime<Utc>>,
}

impl RunClock {
    pub(crate) fn tick(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let stamp = match self.last {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last = Some(stamp);
        stamp
    }
}

/// Sequences drop-list retrieval, checks and reporting for one date.
pub struct Pipeline {
    source: Box<dyn DropListSource>,
    availability: Box<dyn AvailabilityCheck>,
    index: IndexChecker,
    writer: ReportWriter,
    options: PipelineOptions,
    state: RunState,
}

impl Pipeline {
    /// Assemble a pipeline from explicit components.
    pub fn new(
        source: Box<dyn DropListSource>,
        availability: Box<dyn AvailabilityCheck>,
        index: IndexChecker,
        writer: ReportWriter,
        options: PipelineOptions,
    ) -> Self {
        Self {
            source,
            availability,
            index,
            writer,
            options,
            state: RunState::NotStarted,
        }
    }

    /// Build the standard components (IIS feeds, system DNS, configured
    /// engines, report directory) from `config`.
    pub fn from_config(config: &ScanConfig, options: PipelineOptions) -> Result<Self, ScanError> {
        config.validate()?;

        Ok(Self::new(
            Box::new(IisDropList::new(config)?),
            Box::new(DnsAvailabilityChecker::new(config)),
            IndexChecker::from_config(config)?,
            ReportWriter::new(config.report_dir.clone()),
            options,
        ))
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn writer(&self) -> &ReportWriter {
        &self.writer
    }

    /// Fetch only: the drop list for the target date (and lookahead days),
    /// without checks or reports.
    pub async fn test_fetch(&self, target_date: NaiveDate) -> Result<Vec<DropEntry>, ScanError> {
        self.fetch_window(target_date).await
    }

    /// Run the whole pipeline for `target_date`.
    pub async fn run(&mut self, target_date: NaiveDate) -> Result<ScanOutcome, ScanError> {
        self.run_with_progress(target_date, |_, _, _| {}).await
    }

    /// Run the pipeline, calling `progress(position, total, record)` as each
    /// domain's record is assembled (before filtering).
    pub async fn run_with_progress<F>(
        &mut self,
        target_date: NaiveDate,
        progress: F,
    ) -> Result<ScanOutcome, ScanError>
    where
        F: FnMut(usize, usize, &DomainRecord),
    {
        self.state = RunState::Running;
        let result = self.execute(target_date, progress).await;
        self.state = if result.is_ok() {
            RunState::Done
        } else {
            RunState::Failed
        };
        result
    }

    async fn execute<F>(&mut self, target_date: NaiveDate, mut progress: F) -> Result<ScanOutcome, ScanError>
    where
        F: FnMut(usize, usize, &DomainRecord),
    {
        let started_at = Utc::now();
        info!(%target_date, options = ?self.options, "scan started");

        let entries = self.fetch_window(target_date).await?;
        let fetched = entries.len();
        info!(fetched, "drop list ready");

        let mut clock = RunClock::default();
        let mut records = Vec::with_capacity(entries.len());

        for (i, entry) in entries.iter().enumerate() {
            let available = if self.options.check_availability {
                match self.availability.check(&entry.domain).await {
                    Ok(available) => Some(available),
                    Err(e) => {
                        debug!(domain = entry.domain.as_str(), error = %e, "availability unknown");
                        None
                    }
                }
            } else {
                None
            };

            let index = if self.options.check_index {
                Some(self.index.check(&entry.domain).await)
            } else {
                None
            };

            let record = DomainRecord::assemble(entry, available, index, clock.tick(Utc::now()));
            progress(i + 1, fetched, &record);
            records.push(record);
        }

        let records = self.filter(records);
        info!(kept = records.len(), fetched, "records filtered");

        let report = if self.options.dry_run {
            info!("dry run, no reports written");
            None
        } else {
            Some(self.writer.write(&records, target_date)?)
        };

        Ok(ScanOutcome {
            target_date,
            fetched,
            records,
            report,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Fetch the target date plus the lookahead days, merged by domain.
    async fn fetch_window(&self, target_date: NaiveDate) -> Result<Vec<DropEntry>, ScanError> {
        self.source
            .fetch_range(target_date, self.options.lookahead_days)
            .await
    }

    fn filter(&self, records: Vec<DomainRecord>) -> Vec<DomainRecord> {
        records
            .into_iter()
            .filter(|r| !self.options.only_available || r.available == Some(true))
            .filter(|r| {
                !self.options.only_indexed || r.meets_index_threshold(self.options.min_indexed_pages)
            })
            .collect()
    }
}
