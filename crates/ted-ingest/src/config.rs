//! Extraction run configuration

use crate::archive::DataDir;
use crate::error::{ExtractError, Result};
use crate::notice::CpvFilter;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use ted_common::types::{MonthRange, YearMonth};

/// Where monthly packages live unless told otherwise
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Monthly packages processed concurrently
pub const DEFAULT_JOBS: usize = 1;

/// First year TED publishes R2.0.9 monthly packages for
pub const FIRST_ARCHIVE_YEAR: i32 = 2015;

/// Configuration for one `extract` run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Directory of `YYYY-MM.tar.gz` packages (default: `./data`)
    pub data_dir: PathBuf,
    /// Concurrent monthly packages (default: 1)
    pub jobs: usize,
    /// Classification-code allow-list; empty keeps every permitted sector
    pub cpv: Vec<String>,
    pub range: MonthRange,
}

impl ExtractConfig {
    pub fn new(range: MonthRange) -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            jobs: DEFAULT_JOBS,
            cpv: Vec::new(),
            range,
        }
    }

    /// Defaults overridden by `TED_DATA_DIR` and `TED_JOBS`
    pub fn from_env(range: MonthRange) -> Result<Self> {
        let mut config = Self::new(range);
        if let Ok(dir) = std::env::var("TED_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(jobs) = std::env::var("TED_JOBS") {
            config.jobs = jobs
                .parse()
                .map_err(|_| ExtractError::Config(format!("TED_JOBS must be a number, got '{jobs}'")))?;
        }
        Ok(config)
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_cpv<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cpv = codes.into_iter().map(Into::into).collect();
        self
    }

    /// Check the run against the archive calendar as of `today`
    ///
    /// The range must start in [`FIRST_ARCHIVE_YEAR`] or later and must not
    /// end after `today`'s month.
    pub fn validate(&self, today: YearMonth) -> Result<()> {
        self.range.check_bounds(FIRST_ARCHIVE_YEAR, today)?;
        if self.jobs == 0 {
            return Err(ExtractError::Config("jobs must be at least 1".to_string()));
        }
        self.cpv_filter()?;
        Ok(())
    }

    pub fn cpv_filter(&self) -> Result<CpvFilter> {
        CpvFilter::new(&self.cpv)
    }

    pub fn data_dir(&self) -> DataDir {
        DataDir::new(&self.data_dir)
    }
}
