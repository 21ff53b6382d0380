//! TED Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Extracts procurement notices from TED monthly packages into CSV.
//!
//! # Pipeline
//!
//! - **Archive**: stream members of a `YYYY-MM.tar.gz` package ([`archive`])
//! - **Notice**: classify, filter by CPV sector, extract fields and expand
//!   lots into rows ([`notice`])
//! - **Output**: fixed column schema and CSV writer ([`output`])
//! - **Driver**: per-member error boundary, counters, cancellation and
//!   parallel months ([`pipeline`])
//! - **Corpus**: sentence corpus from an extracted CSV ([`corpus`])
//!
//! # Example
//!
//! ```no_run
//! use ted_common::types::MonthRange;
//! use ted_ingest::{output, DataDir, Extractor, CpvFilter};
//!
//! fn main() -> anyhow::Result<()> {
//!     let range = MonthRange::new("2021-01".parse()?, "2021-03".parse()?)?;
//!     let writer = output::create("notices.csv".as_ref())?;
//!     let extractor = Extractor::new(CpvFilter::new(["45"])?, writer);
//!     let summary = extractor.run(&DataDir::new("./data"), range)?;
//!     println!("{} rows", summary.rows);
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod config;
pub mod corpus;
pub mod error;
pub mod notice;
pub mod output;
pub mod pipeline;
pub mod progress;

pub use archive::{DataDir, NoticeArchive, RawEntry, StreamEnd};
pub use config::ExtractConfig;
pub use error::{DocumentErrorKind, ExtractError, Result};
pub use notice::CpvFilter;
pub use pipeline::{ArchiveReport, Extractor, RunSummary};
