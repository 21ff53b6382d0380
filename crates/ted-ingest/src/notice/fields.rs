//! Notice-level fields shared by every lot of a notice

use super::classifier::{FormNumber, FormSection};
use super::document::{FieldPath, NodeId, NoticeDocument};
use super::sector::ClassificationCode;
use crate::error::Result;
use ted_common::types::YearMonth;

const URI_DOC: FieldPath =
    FieldPath::text(&["CODED_DATA_SECTION", "NOTICE_DATA", "URI_LIST", "URI_DOC"]);
const URL_DOCUMENT: FieldPath = FieldPath::text(&["CONTRACTING_BODY", "URL_DOCUMENT"]);

/// Free-text qualification fields of the `LEFTI` section, in column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualificationText {
    Suitability,
    EconomicFinancialInfo,
    EconomicFinancialMinLevel,
    TechnicalProfessionalInfo,
    TechnicalProfessionalMinLevel,
    PerformanceConditions,
}

impl QualificationText {
    pub const ALL: [QualificationText; 6] = [
        QualificationText::Suitability,
        QualificationText::EconomicFinancialInfo,
        QualificationText::EconomicFinancialMinLevel,
        QualificationText::TechnicalProfessionalInfo,
        QualificationText::TechnicalProfessionalMinLevel,
        QualificationText::PerformanceConditions,
    ];

    /// Element name under `LEFTI`, which is also the text column name
    pub fn element(self) -> &'static str {
        match self {
            QualificationText::Suitability => "SUITABILITY",
            QualificationText::EconomicFinancialInfo => "ECONOMIC_FINANCIAL_INFO",
            QualificationText::EconomicFinancialMinLevel => "ECONOMIC_FINANCIAL_MIN_LEVEL",
            QualificationText::TechnicalProfessionalInfo => "TECHNICAL_PROFESSIONAL_INFO",
            QualificationText::TechnicalProfessionalMinLevel => {
                "TECHNICAL_PROFESSIONAL_MIN_LEVEL"
            },
            QualificationText::PerformanceConditions => "PERFORMANCE_CONDITIONS",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Contents of a present `LEFTI` section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Qualification {
    /// `ECONOMIC_CRITERIA_DOC` marker present
    pub economic_criteria_doc: bool,
    /// `TECHNICAL_CRITERIA_DOC` marker present
    pub technical_criteria_doc: bool,
    texts: [Vec<String>; 6],
}

impl Qualification {
    /// Descendant text nodes of one field, document order; empty when absent
    pub fn text(&self, field: QualificationText) -> &[String] {
        &self.texts[field.index()]
    }

    pub fn set_text(&mut self, field: QualificationText, texts: Vec<String>) {
        self.texts[field.index()] = texts;
    }
}

/// Fields read once per notice and copied into each of its rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonFields {
    pub month: YearMonth,
    pub form: FormNumber,
    pub language: String,
    pub uri_doc: String,
    /// `CONTRACTING_BODY/URL_DOCUMENT` texts; empty when none
    pub url_document: Vec<String>,
    pub cpv: ClassificationCode,
    /// `None` when the notice has no `LEFTI` section
    pub qualification: Option<Qualification>,
}

impl CommonFields {
    /// Read the notice-level fields of an included notice
    ///
    /// Only the document URI is mandatory here; the form language and primary
    /// code have already been checked by the classifier and sector filter.
    pub fn extract(
        doc: &NoticeDocument,
        section: &FormSection,
        cpv: ClassificationCode,
        month: YearMonth,
    ) -> Result<Self> {
        let uri_doc = doc.required(doc.root(), &URI_DOC)?;
        let url_document = doc.list(section.element, &URL_DOCUMENT);
        let qualification = doc
            .element(section.element, &["LEFTI"])
            .map(|lefti| read_qualification(doc, lefti));

        Ok(Self {
            month,
            form: section.form,
            language: section.language.clone(),
            uri_doc,
            url_document,
            cpv,
            qualification,
        })
    }
}

fn read_qualification(doc: &NoticeDocument, lefti: NodeId) -> Qualification {
    let mut qualification = Qualification {
        economic_criteria_doc: doc.exists(lefti, &["ECONOMIC_CRITERIA_DOC"]),
        technical_criteria_doc: doc.exists(lefti, &["TECHNICAL_CRITERIA_DOC"]),
        ..Qualification::default()
    };
    for field in QualificationText::ALL {
        let texts = doc
            .elements(lefti, &[field.element()])
            .into_iter()
            .flat_map(|node| doc.list(node, &FieldPath::descendant_text(&[])))
            .collect();
        qualification.set_text(field, texts);
    }
    qualification
}
