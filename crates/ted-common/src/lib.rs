//! TED Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging setup, and error handling for the TED extraction
//! workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`TedError`] and the [`Result`] alias
//! - **Logging**: tracing subscriber configuration ([`logging`])
//! - **Types**: calendar months used to key monthly archives ([`types`])
//!
//! # Example
//!
//! ```no_run
//! use ted_common::types::{MonthRange, YearMonth};
//!
//! fn months() -> ted_common::Result<()> {
//!     let start: YearMonth = "2021-11".parse()?;
//!     let end: YearMonth = "2022-02".parse()?;
//!     for month in MonthRange::new(start, end)? {
//!         println!("{month}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, TedError};
