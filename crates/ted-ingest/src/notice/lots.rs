//! Lot expansion: one row per `OBJECT_DESCR`

use super::document::{FieldPath, NodeId, NoticeDocument};
use super::fields::CommonFields;
use super::sector::ClassificationCode;
use crate::error::{ExtractError, Result};

const ADDITIONAL_CODES: FieldPath = FieldPath::attribute(&["CPV_ADDITIONAL", "CPV_CODE"], "CODE");
const CRITERION: FieldPath = FieldPath::text(&["AC_CRITERION"]);
const CRITERIA_CANDIDATE: FieldPath = FieldPath::descendant_text(&["CRITERIA_CANDIDATE"]);

/// The `AC` section of a lot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwardCriteria {
    pub procurement_doc: bool,
    pub price: bool,
    /// One `AC_CRITERION` text per `AC_QUALITY` group
    pub quality: Vec<String>,
    /// One `AC_CRITERION` text per `AC_COST` group
    pub cost: Vec<String>,
}

/// Lot-specific fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lot {
    /// Additional codes other than the primary one, duplicates kept
    pub cpv_additional: Vec<String>,
    /// `None` when the lot has no `AC` section
    pub award: Option<AwardCriteria>,
    pub criteria_candidate: Vec<String>,
}

/// One output record: the notice fields plus one lot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub common: CommonFields,
    pub lot: Lot,
}

/// Read every `OBJECT_DESCR` under `OBJECT_CONTRACT`
///
/// A notice without lots, or with a criterion group lacking its text, is a
/// schema violation.
pub fn extract_lots(
    doc: &NoticeDocument,
    object: NodeId,
    primary: &ClassificationCode,
) -> Result<Vec<Lot>> {
    let lots = doc.elements(object, &["OBJECT_DESCR"]);
    if lots.is_empty() {
        return Err(ExtractError::schema("OBJECT_CONTRACT/OBJECT_DESCR is missing"));
    }
    lots.into_iter()
        .map(|lot| read_lot(doc, lot, primary))
        .collect()
}

fn read_lot(doc: &NoticeDocument, lot: NodeId, primary: &ClassificationCode) -> Result<Lot> {
    let cpv_additional = doc
        .list(lot, &ADDITIONAL_CODES)
        .into_iter()
        .filter(|code| code != primary.as_str())
        .collect();

    let award = match doc.element(lot, &["AC"]) {
        Some(ac) => Some(AwardCriteria {
            procurement_doc: doc.exists(ac, &["AC_PROCUREMENT_DOC"]),
            price: doc.exists(ac, &["AC_PRICE"]),
            quality: criteria(doc, ac, "AC_QUALITY")?,
            cost: criteria(doc, ac, "AC_COST")?,
        }),
        None => None,
    };

    Ok(Lot {
        cpv_additional,
        award,
        criteria_candidate: doc.list(lot, &CRITERIA_CANDIDATE),
    })
}

fn criteria(doc: &NoticeDocument, ac: NodeId, group: &str) -> Result<Vec<String>> {
    doc.elements(ac, &[group])
        .into_iter()
        .map(|node| doc.required(node, &CRITERION))
        .collect()
}

/// Pair each lot with its own copy of the notice fields
pub fn expand(common: &CommonFields, lots: Vec<Lot>) -> Vec<Row> {
    lots.into_iter()
        .map(|lot| Row {
            common: common.clone(),
            lot,
        })
        .collect()
}
