//! Extraction driver
//!
//! Runs archive members through [`crate::notice::extract_rows`] and writes
//! the resulting rows to one shared [`RowWriter`]. Document-level failures
//! (malformed XML, schema violations) are logged and counted at the member
//! boundary; container-level and output errors propagate.
//!
//! Monthly files are independent. [`Extractor::run`] processes them in
//! order on the current thread, [`Extractor::run_parallel`] runs up to `jobs`
//! of them on tokio's blocking pool. Either way the writer lock is taken once
//! per notice, so the rows of a notice are always contiguous.

use crate::archive::{DataDir, NoticeArchive, RawEntry, StreamEnd};
use crate::error::{DocumentErrorKind, ExtractError, Result};
use crate::notice::{extract_rows, CpvFilter, ExclusionReason, NoticeOutcome};
use crate::output::{RowWriter, SCHEMA_VERSION};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use ted_common::types::{MonthRange, YearMonth};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What happened to one archive member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberOutcome {
    /// Rows written for an included notice
    Rows(usize),
    Excluded(ExclusionReason),
    /// Document error that disqualified the notice
    Skipped(DocumentErrorKind),
}

/// Counters for one monthly archive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveReport {
    pub archive: String,
    pub members: u64,
    pub notices: u64,
    pub rows: u64,
    pub excluded: BTreeMap<ExclusionReason, u64>,
    pub malformed: u64,
    pub schema_violations: u64,
    /// Stopped by cancellation before the end of the archive
    pub cancelled: bool,
    pub end: Option<StreamEnd>,
}

impl ArchiveReport {
    fn new(archive: impl Into<String>) -> Self {
        Self {
            archive: archive.into(),
            ..Self::default()
        }
    }

    fn record(&mut self, outcome: MemberOutcome) {
        self.members += 1;
        match outcome {
            MemberOutcome::Rows(rows) => {
                self.notices += 1;
                self.rows += rows as u64;
            },
            MemberOutcome::Excluded(reason) => *self.excluded.entry(reason).or_default() += 1,
            MemberOutcome::Skipped(DocumentErrorKind::Malformed) => self.malformed += 1,
            MemberOutcome::Skipped(DocumentErrorKind::SchemaViolation) => {
                self.schema_violations += 1
            },
        }
    }

    pub fn excluded_total(&self) -> u64 {
        self.excluded.values().sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthStatus {
    Processed,
    /// No package for this month in the data directory
    Missing,
    /// Not started because the run was cancelled
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthReport {
    pub month: YearMonth,
    pub status: MonthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<ArchiveReport>,
}

/// Totals over a run, serialized by `--summary`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub schema_version: u32,
    pub members: u64,
    pub notices: u64,
    pub rows: u64,
    pub excluded: BTreeMap<ExclusionReason, u64>,
    pub malformed: u64,
    pub schema_violations: u64,
    pub missing_months: u64,
    pub cancelled: bool,
    pub months: Vec<MonthReport>,
}

impl RunSummary {
    pub fn from_reports(mut months: Vec<MonthReport>) -> Self {
        months.sort_by_key(|report| report.month);
        let mut summary = Self {
            schema_version: SCHEMA_VERSION,
            ..Self::default()
        };
        for report in &months {
            match report.status {
                MonthStatus::Missing => summary.missing_months += 1,
                MonthStatus::Cancelled => summary.cancelled = true,
                MonthStatus::Processed => {},
            }
            if let Some(archive) = &report.archive {
                summary.members += archive.members;
                summary.notices += archive.notices;
                summary.rows += archive.rows;
                summary.malformed += archive.malformed;
                summary.schema_violations += archive.schema_violations;
                summary.cancelled |= archive.cancelled;
                for (reason, count) in &archive.excluded {
                    *summary.excluded.entry(*reason).or_default() += count;
                }
            }
        }
        summary.months = months;
        summary
    }
}

/// Extracts rows from monthly archives into a shared writer
pub struct Extractor<W: Write> {
    filter: Arc<CpvFilter>,
    sink: Arc<Mutex<RowWriter<W>>>,
    cancel: CancellationToken,
    progress: ProgressBar,
}

impl<W: Write> Clone for Extractor<W> {
    fn clone(&self) -> Self {
        Self {
            filter: Arc::clone(&self.filter),
            sink: Arc::clone(&self.sink),
            cancel: self.cancel.clone(),
            progress: self.progress.clone(),
        }
    }
}

impl<W: Write> Extractor<W> {
    pub fn new(filter: CpvFilter, writer: RowWriter<W>) -> Self {
        Self {
            filter: Arc::new(filter),
            sink: Arc::new(Mutex::new(writer)),
            cancel: CancellationToken::new(),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Tick `progress` once per archive member
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn writer(&self) -> Result<MutexGuard<'_, RowWriter<W>>> {
        self.sink
            .lock()
            .map_err(|_| io::Error::other("row writer lock poisoned").into())
    }

    pub fn rows_written(&self) -> Result<u64> {
        Ok(self.writer()?.rows_written())
    }

    pub fn flush(&self) -> Result<()> {
        self.writer()?.flush()
    }

    /// Extract and emit one member
    ///
    /// Document errors are logged here and become [`MemberOutcome::Skipped`].
    pub fn process_member(
        &self,
        month: YearMonth,
        archive: &str,
        entry: &RawEntry,
    ) -> Result<MemberOutcome> {
        match extract_rows(&entry.payload, month, &self.filter) {
            Ok(NoticeOutcome::Rows(rows)) => {
                self.writer()?.write_notice(&rows)?;
                Ok(MemberOutcome::Rows(rows.len()))
            },
            Ok(NoticeOutcome::Excluded(reason)) => {
                debug!(archive, member = %entry.name, %reason, "Notice excluded");
                Ok(MemberOutcome::Excluded(reason))
            },
            Err(e) => {
                let Some(kind) = e.document_kind() else {
                    return Err(e);
                };
                warn!(
                    archive,
                    member = %entry.name,
                    kind = e.kind(),
                    error = %e,
                    "Skipping notice"
                );
                Ok(MemberOutcome::Skipped(kind))
            },
        }
    }

    /// Process every member of an opened archive
    ///
    /// Stops early, with `cancelled` set, once the cancellation token fires.
    /// Rows are flushed before returning. A truncated container shows up in
    /// [`ArchiveReport::end`]; it is up to the caller to treat it as an error.
    pub fn process_archive<R: Read>(
        &self,
        archive: &mut NoticeArchive<R>,
        month: YearMonth,
    ) -> Result<ArchiveReport> {
        let label = archive.label().to_string();
        let mut report = ArchiveReport::new(&label);
        let started = Instant::now();
        self.progress.set_message(label.clone());

        let mut members = archive.members()?;
        loop {
            if self.cancel.is_cancelled() {
                info!(archive = %label, "Cancelled, not reading further members");
                report.cancelled = true;
                break;
            }
            let Some(entry) = members.next() else { break };
            report.record(self.process_member(month, &label, &entry)?);
            self.progress.inc(1);
        }
        report.end = members.end().cloned();
        self.flush()?;

        info!(
            archive = %label,
            members = report.members,
            rows = report.rows,
            excluded = report.excluded_total(),
            malformed = report.malformed,
            schema_violations = report.schema_violations,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Archive processed"
        );
        Ok(report)
    }

    /// Process the package for one month, if it exists
    pub fn process_month(&self, data_dir: &DataDir, month: YearMonth) -> Result<MonthReport> {
        if self.cancel.is_cancelled() {
            return Ok(MonthReport {
                month,
                status: MonthStatus::Cancelled,
                archive: None,
            });
        }
        if !data_dir.exists(month) {
            warn!(
                %month,
                path = %data_dir.archive_path(month).display(),
                "Monthly package doesn't exist, skipping"
            );
            return Ok(MonthReport {
                month,
                status: MonthStatus::Missing,
                archive: None,
            });
        }

        let mut archive = data_dir.open(month)?;
        let report = self.process_archive(&mut archive, month)?;
        if let Some(StreamEnd::Truncated { reason }) = &report.end {
            error!(archive = %report.archive, %reason, rows = report.rows, "Archive is truncated");
            return Err(ExtractError::archive_read(&report.archive, reason));
        }

        Ok(MonthReport {
            month,
            status: MonthStatus::Processed,
            archive: Some(report),
        })
    }

    /// Process every month of `range` in order
    pub fn run(&self, data_dir: &DataDir, range: MonthRange) -> Result<RunSummary> {
        let reports = range
            .into_iter()
            .map(|month| self.process_month(data_dir, month))
            .collect::<Result<Vec<_>>>()?;
        Ok(RunSummary::from_reports(reports))
    }

    /// Give back the sink once every clone of this extractor is gone
    pub fn finish(self) -> Result<W> {
        let sink = Arc::try_unwrap(self.sink)
            .map_err(|_| io::Error::other("row writer is still shared"))?;
        sink.into_inner()
            .map_err(|_| io::Error::other("row writer lock poisoned"))?
            .into_inner()
    }
}

impl<W: Write + Send + 'static> Extractor<W> {
    /// Process up to `jobs` monthly packages at once
    ///
    /// The first failing month cancels the others; they stop at their next
    /// member. The first error is returned once all tasks have finished.
    pub async fn run_parallel(
        &self,
        data_dir: &DataDir,
        range: MonthRange,
        jobs: usize,
    ) -> Result<RunSummary> {
        let cancel = self.cancel.child_token();
        let worker = self.clone().with_cancellation(cancel.clone());
        info!(months = range.len(), jobs, "Processing monthly packages in parallel");

        let results: Vec<Result<MonthReport>> = stream::iter(range)
            .map(|month| {
                let worker = worker.clone();
                let data_dir = data_dir.clone();
                let cancel = cancel.clone();
                async move {
                    let result =
                        tokio::task::spawn_blocking(move || worker.process_month(&data_dir, month))
                            .await
                            .map_err(|e| ExtractError::Io(io::Error::other(e)))
                            .and_then(|result| result);
                    if let Err(e) = &result {
                        error!(%month, error = %e, "Monthly package failed, cancelling the rest");
                        cancel.cancel();
                    }
                    result
                }
            })
            .buffer_unordered(jobs.max(1))
            .collect()
            .await;

        let mut reports = Vec::with_capacity(results.len());
        for result in results {
            reports.push(result?);
        }
        Ok(RunSummary::from_reports(reports))
    }
}
