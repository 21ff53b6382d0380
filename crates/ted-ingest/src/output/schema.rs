//! The output column schema
//!
//! [`COLUMNS`] is the single ordered definition of the CSV layout. The
//! emitter writes the header from it and asks [`cell`] for each value, so
//! adding or moving a column is a change to this file only. Bump
//! [`SCHEMA_VERSION`] whenever the layout changes.

use crate::notice::{QualificationText, Row};

pub const SCHEMA_VERSION: u32 = 1;

/// How a column's values are typed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// `True` / `False`
    Boolean,
    Text,
    /// List literal, see [`super::literal`]
    TextList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnId {
    Month,
    Form,
    Language,
    UriDoc,
    UrlDocumentAny,
    UrlDocument,
    Cpv2,
    Cpv3,
    Cpv4,
    Cpv5,
    CpvMain,
    SuitabilityAny,
    Suitability,
    EconomicCriteriaDoc,
    EconomicFinancialInfoAny,
    EconomicFinancialInfo,
    EconomicFinancialMinLevelAny,
    EconomicFinancialMinLevel,
    TechnicalCriteriaDoc,
    TechnicalProfessionalInfoAny,
    TechnicalProfessionalInfo,
    TechnicalProfessionalMinLevelAny,
    TechnicalProfessionalMinLevel,
    PerformanceConditionsAny,
    PerformanceConditions,
    CpvAdditional,
    AcProcurementDoc,
    AcPrice,
    AcQualityAny,
    AcQuality,
    AcCostAny,
    AcCost,
    CriteriaCandidateAny,
    CriteriaCandidate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub id: ColumnId,
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn column(id: ColumnId, name: &'static str, kind: ColumnKind) -> Column {
    Column { id, name, kind }
}

use ColumnKind::{Boolean, Text, TextList};

pub const COLUMNS: [Column; 34] = [
    column(ColumnId::Month, "MONTH", Text),
    column(ColumnId::Form, "FORM", Text),
    column(ColumnId::Language, "LG", Text),
    column(ColumnId::UriDoc, "URI_DOC", Text),
    column(ColumnId::UrlDocumentAny, "URL_DOCUMENT_ANY", Boolean),
    column(ColumnId::UrlDocument, "URL_DOCUMENT", TextList),
    column(ColumnId::Cpv2, "CPV2", Text),
    column(ColumnId::Cpv3, "CPV3", Text),
    column(ColumnId::Cpv4, "CPV4", Text),
    column(ColumnId::Cpv5, "CPV5", Text),
    column(ColumnId::CpvMain, "CPV_MAIN", Text),
    column(ColumnId::SuitabilityAny, "SUITABILITY_ANY", Boolean),
    column(ColumnId::Suitability, "SUITABILITY", TextList),
    column(ColumnId::EconomicCriteriaDoc, "ECONOMIC_CRITERIA_DOC", Boolean),
    column(ColumnId::EconomicFinancialInfoAny, "ECONOMIC_FINANCIAL_INFO_ANY", Boolean),
    column(ColumnId::EconomicFinancialInfo, "ECONOMIC_FINANCIAL_INFO", TextList),
    column(ColumnId::EconomicFinancialMinLevelAny, "ECONOMIC_FINANCIAL_MIN_LEVEL_ANY", Boolean),
    column(ColumnId::EconomicFinancialMinLevel, "ECONOMIC_FINANCIAL_MIN_LEVEL", TextList),
    column(ColumnId::TechnicalCriteriaDoc, "TECHNICAL_CRITERIA_DOC", Boolean),
    column(ColumnId::TechnicalProfessionalInfoAny, "TECHNICAL_PROFESSIONAL_INFO_ANY", Boolean),
    column(ColumnId::TechnicalProfessionalInfo, "TECHNICAL_PROFESSIONAL_INFO", TextList),
    column(
        ColumnId::TechnicalProfessionalMinLevelAny,
        "TECHNICAL_PROFESSIONAL_MIN_LEVEL_ANY",
        Boolean,
    ),
    column(ColumnId::TechnicalProfessionalMinLevel, "TECHNICAL_PROFESSIONAL_MIN_LEVEL", TextList),
    column(ColumnId::PerformanceConditionsAny, "PERFORMANCE_CONDITIONS_ANY", Boolean),
    column(ColumnId::PerformanceConditions, "PERFORMANCE_CONDITIONS", TextList),
    column(ColumnId::CpvAdditional, "CPV_ADDITIONAL", Text),
    column(ColumnId::AcProcurementDoc, "AC_PROCUREMENT_DOC", Boolean),
    column(ColumnId::AcPrice, "AC_PRICE", Boolean),
    column(ColumnId::AcQualityAny, "AC_QUALITY_ANY", Boolean),
    column(ColumnId::AcQuality, "AC_QUALITY", TextList),
    column(ColumnId::AcCostAny, "AC_COST_ANY", Boolean),
    column(ColumnId::AcCost, "AC_COST", TextList),
    column(ColumnId::CriteriaCandidateAny, "CRITERIA_CANDIDATE_ANY", Boolean),
    column(ColumnId::CriteriaCandidate, "CRITERIA_CANDIDATE", TextList),
];

/// Column names in output order
pub fn header() -> impl Iterator<Item = &'static str> {
    COLUMNS.iter().map(|column| column.name)
}

/// Position of a named column
pub fn position(name: &str) -> Option<usize> {
    COLUMNS.iter().position(|column| column.name == name)
}

/// One value of one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell<'a> {
    /// Field not present in the notice; written as an empty cell
    Absent,
    Bool(bool),
    Text(&'a str),
    Owned(String),
    List(&'a [String]),
}

fn list(values: &[String]) -> Cell<'_> {
    if values.is_empty() {
        Cell::Absent
    } else {
        Cell::List(values)
    }
}

fn optional<'a, T>(value: Option<T>, f: impl FnOnce(T) -> Cell<'a>) -> Cell<'a> {
    value.map_or(Cell::Absent, f)
}

/// The value of column `id` for `row`
///
/// Text lists are absent when empty, so a `*_ANY` column is `True` exactly
/// when its list column is non-empty. Qualification columns are all absent
/// for notices without a `LEFTI` section; award columns likewise without `AC`.
pub fn cell(row: &Row, id: ColumnId) -> Cell<'_> {
    let common = &row.common;
    let lefti = common.qualification.as_ref();
    let ac = row.lot.award.as_ref();
    let qualification = |field: QualificationText, any: bool| {
        optional(lefti, move |q| {
            let texts = q.text(field);
            if any {
                Cell::Bool(!texts.is_empty())
            } else {
                list(texts)
            }
        })
    };
    let prefix = |n: usize| optional(common.cpv.prefix(n), Cell::Text);

    match id {
        ColumnId::Month => Cell::Owned(common.month.to_string()),
        ColumnId::Form => Cell::Text(common.form.as_str()),
        ColumnId::Language => Cell::Text(&common.language),
        ColumnId::UriDoc => Cell::Text(&common.uri_doc),
        ColumnId::UrlDocumentAny => Cell::Bool(!common.url_document.is_empty()),
        ColumnId::UrlDocument => list(&common.url_document),
        ColumnId::Cpv2 => prefix(2),
        ColumnId::Cpv3 => prefix(3),
        ColumnId::Cpv4 => prefix(4),
        ColumnId::Cpv5 => prefix(5),
        ColumnId::CpvMain => Cell::Text(common.cpv.as_str()),
        ColumnId::SuitabilityAny => qualification(QualificationText::Suitability, true),
        ColumnId::Suitability => qualification(QualificationText::Suitability, false),
        ColumnId::EconomicCriteriaDoc => optional(lefti, |q| Cell::Bool(q.economic_criteria_doc)),
        ColumnId::EconomicFinancialInfoAny => {
            qualification(QualificationText::EconomicFinancialInfo, true)
        },
        ColumnId::EconomicFinancialInfo => {
            qualification(QualificationText::EconomicFinancialInfo, false)
        },
        ColumnId::EconomicFinancialMinLevelAny => {
            qualification(QualificationText::EconomicFinancialMinLevel, true)
        },
        ColumnId::EconomicFinancialMinLevel => {
            qualification(QualificationText::EconomicFinancialMinLevel, false)
        },
        ColumnId::TechnicalCriteriaDoc => {
            optional(lefti, |q| Cell::Bool(q.technical_criteria_doc))
        },
        ColumnId::TechnicalProfessionalInfoAny => {
            qualification(QualificationText::TechnicalProfessionalInfo, true)
        },
        ColumnId::TechnicalProfessionalInfo => {
            qualification(QualificationText::TechnicalProfessionalInfo, false)
        },
        ColumnId::TechnicalProfessionalMinLevelAny => {
            qualification(QualificationText::TechnicalProfessionalMinLevel, true)
        },
        ColumnId::TechnicalProfessionalMinLevel => {
            qualification(QualificationText::TechnicalProfessionalMinLevel, false)
        },
        ColumnId::PerformanceConditionsAny => {
            qualification(QualificationText::PerformanceConditions, true)
        },
        ColumnId::PerformanceConditions => {
            qualification(QualificationText::PerformanceConditions, false)
        },
        ColumnId::CpvAdditional => Cell::Owned(row.lot.cpv_additional.join(";")),
        ColumnId::AcProcurementDoc => optional(ac, |ac| Cell::Bool(ac.procurement_doc)),
        ColumnId::AcPrice => optional(ac, |ac| Cell::Bool(ac.price)),
        ColumnId::AcQualityAny => optional(ac, |ac| Cell::Bool(!ac.quality.is_empty())),
        ColumnId::AcQuality => optional(ac, |ac| list(&ac.quality)),
        ColumnId::AcCostAny => optional(ac, |ac| Cell::Bool(!ac.cost.is_empty())),
        ColumnId::AcCost => optional(ac, |ac| list(&ac.cost)),
        ColumnId::CriteriaCandidateAny => Cell::Bool(!row.lot.criteria_candidate.is_empty()),
        ColumnId::CriteriaCandidate => list(&row.lot.criteria_candidate),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::notice::{
        AwardCriteria, ClassificationCode, CommonFields, FormNumber, Lot, Qualification,
    };
    use std::collections::HashSet;

    fn row(cpv: &str) -> Row {
        Row {
            common: CommonFields {
                month: "2021-03".parse().unwrap(),
                form: FormNumber::F02,
                language: "EN".to_string(),
                uri_doc: "uri".to_string(),
                url_document: Vec::new(),
                cpv: ClassificationCode::parse(cpv).unwrap(),
                qualification: None,
            },
            lot: Lot::default(),
        }
    }

    #[test]
    fn test_column_names_are_unique() {
        let names: HashSet<_> = header().collect();
        assert_eq!(names.len(), COLUMNS.len());
        assert_eq!(position("MONTH"), Some(0));
        assert_eq!(position("CRITERIA_CANDIDATE"), Some(33));
        assert_eq!(position("NOPE"), None);
    }

    #[test]
    fn test_any_columns_pair_with_list_columns() {
        for (i, column) in COLUMNS.iter().enumerate() {
            if let Some(base) = column.name.strip_suffix("_ANY") {
                assert_eq!(column.kind, ColumnKind::Boolean);
                assert_eq!(COLUMNS[i + 1].name, base);
                assert_eq!(COLUMNS[i + 1].kind, ColumnKind::TextList);
            }
        }
    }

    #[test]
    fn test_short_code_prefixes_are_absent() {
        let row = row("452");
        assert_eq!(cell(&row, ColumnId::Cpv2), Cell::Text("45"));
        assert_eq!(cell(&row, ColumnId::Cpv3), Cell::Text("452"));
        assert_eq!(cell(&row, ColumnId::Cpv4), Cell::Absent);
        assert_eq!(cell(&row, ColumnId::CpvMain), Cell::Text("452"));
    }

    #[test]
    fn test_missing_sections_leave_cells_absent() {
        let row = row("45000000");
        for id in [
            ColumnId::SuitabilityAny,
            ColumnId::EconomicCriteriaDoc,
            ColumnId::PerformanceConditions,
            ColumnId::AcPrice,
            ColumnId::AcQualityAny,
            ColumnId::UrlDocument,
            ColumnId::CriteriaCandidate,
        ] {
            assert_eq!(cell(&row, id), Cell::Absent, "{id:?}");
        }
        assert_eq!(cell(&row, ColumnId::UrlDocumentAny), Cell::Bool(false));
        assert_eq!(cell(&row, ColumnId::CriteriaCandidateAny), Cell::Bool(false));
        assert_eq!(cell(&row, ColumnId::CpvAdditional), Cell::Owned(String::new()));
    }

    #[test]
    fn test_present_sections() {
        let mut row = row("45000000");
        let mut lefti = Qualification::default();
        lefti.economic_criteria_doc = true;
        lefti.set_text(QualificationText::Suitability, vec!["Registered.".to_string()]);
        row.common.qualification = Some(lefti);
        row.lot.award = Some(AwardCriteria {
            price: true,
            cost: vec!["Running cost".to_string()],
            ..AwardCriteria::default()
        });
        row.lot.cpv_additional = vec!["45100000".to_string(), "45200000".to_string()];

        assert_eq!(cell(&row, ColumnId::SuitabilityAny), Cell::Bool(true));
        assert_eq!(
            cell(&row, ColumnId::Suitability),
            Cell::List(&["Registered.".to_string()])
        );
        assert_eq!(cell(&row, ColumnId::EconomicCriteriaDoc), Cell::Bool(true));
        assert_eq!(cell(&row, ColumnId::TechnicalCriteriaDoc), Cell::Bool(false));
        assert_eq!(cell(&row, ColumnId::PerformanceConditionsAny), Cell::Bool(false));
        assert_eq!(cell(&row, ColumnId::PerformanceConditions), Cell::Absent);
        assert_eq!(cell(&row, ColumnId::AcQualityAny), Cell::Bool(false));
        assert_eq!(cell(&row, ColumnId::AcQuality), Cell::Absent);
        assert_eq!(cell(&row, ColumnId::AcCostAny), Cell::Bool(true));
        assert_eq!(
            cell(&row, ColumnId::CpvAdditional),
            Cell::Owned("45100000;45200000".to_string())
        );
    }
}
