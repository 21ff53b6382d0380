//! Notice processing
//!
//! Turns one archive member payload into zero or more rows:
//!
//! 1. [`document`]: parse the payload into a [`NoticeDocument`]
//! 2. [`classifier`]: drop unsupported families and forms
//! 3. [`sector`]: drop out-of-scope and unrequested sectors
//! 4. [`fields`]: read the notice-level fields
//! 5. [`lots`]: one row per lot
//!
//! Every row of a notice is built before any is returned, so a failure on
//! the last lot produces no rows at all.

pub mod classifier;
pub mod document;
pub mod fields;
pub mod lots;
pub mod sector;

pub use classifier::{classify, Classification, ExclusionReason, FormNumber, FormSection};
pub use document::{FieldPath, NoticeDocument};
pub use fields::{CommonFields, Qualification, QualificationText};
pub use lots::{AwardCriteria, Lot, Row};
pub use sector::{ClassificationCode, CpvFilter};

use crate::error::Result;
use ted_common::types::YearMonth;

/// Result of processing one notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeOutcome {
    Excluded(ExclusionReason),
    Rows(Vec<Row>),
}

/// Run a payload through classification, filtering and extraction
pub fn extract_rows(payload: &[u8], month: YearMonth, filter: &CpvFilter) -> Result<NoticeOutcome> {
    let doc = NoticeDocument::parse(payload)?;

    let section = match classify(&doc)? {
        Classification::Included(section) => section,
        Classification::Excluded(reason) => return Ok(NoticeOutcome::Excluded(reason)),
    };

    let object = doc.required_element(section.element, &["OBJECT_CONTRACT"])?;
    let cpv = sector::primary_code(&doc, object)?;
    if let Some(reason) = filter.exclusion(&cpv) {
        return Ok(NoticeOutcome::Excluded(reason));
    }

    let lots = lots::extract_lots(&doc, object, &cpv)?;
    let common = CommonFields::extract(&doc, &section, cpv, month)?;
    Ok(NoticeOutcome::Rows(lots::expand(&common, lots)))
}
