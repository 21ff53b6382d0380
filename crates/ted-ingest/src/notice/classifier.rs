//! Notice classification
//!
//! Decides, before any field is read, whether a parsed document belongs to
//! the supported notice family. Exclusions are expected outcomes, not errors.

use super::document::{NodeId, NoticeDocument};
use crate::error::{ExtractError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Namespace prefix declared by eForms documents
pub const EXTENSION_PREFIX: &str = "efext";

/// Superseded schema still used by old defence notices
pub const LEGACY_NAMESPACE: &str =
    "http://publications.europa.eu/resource/schema/ted/R2.0.8/publication";

/// TED publication schema R2.0.9 (the supported one)
pub const PUBLICATION_NAMESPACE: &str =
    "http://publications.europa.eu/resource/schema/ted/R2.0.9/publication";

/// Standard form numbers of the R2.0.9 schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FormNumber {
    F01,
    F02,
    F03,
    F04,
    F05,
    F06,
    F07,
    F08,
    F12,
    F13,
    F14,
    F15,
    F20,
    F21,
    F22,
    F23,
    F24,
    F25,
    T01,
    T02,
}

impl FormNumber {
    pub const ALL: [FormNumber; 20] = [
        FormNumber::F01,
        FormNumber::F02,
        FormNumber::F03,
        FormNumber::F04,
        FormNumber::F05,
        FormNumber::F06,
        FormNumber::F07,
        FormNumber::F08,
        FormNumber::F12,
        FormNumber::F13,
        FormNumber::F14,
        FormNumber::F15,
        FormNumber::F20,
        FormNumber::F21,
        FormNumber::F22,
        FormNumber::F23,
        FormNumber::F24,
        FormNumber::F25,
        FormNumber::T01,
        FormNumber::T02,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FormNumber::F01 => "F01",
            FormNumber::F02 => "F02",
            FormNumber::F03 => "F03",
            FormNumber::F04 => "F04",
            FormNumber::F05 => "F05",
            FormNumber::F06 => "F06",
            FormNumber::F07 => "F07",
            FormNumber::F08 => "F08",
            FormNumber::F12 => "F12",
            FormNumber::F13 => "F13",
            FormNumber::F14 => "F14",
            FormNumber::F15 => "F15",
            FormNumber::F20 => "F20",
            FormNumber::F21 => "F21",
            FormNumber::F22 => "F22",
            FormNumber::F23 => "F23",
            FormNumber::F24 => "F24",
            FormNumber::F25 => "F25",
            FormNumber::T01 => "T01",
            FormNumber::T02 => "T02",
        }
    }

    /// Award notices (F03, F06), corrigenda (F14) and modification notices
    /// (F20) carry no object description to extract.
    pub fn lacks_object_section(self) -> bool {
        matches!(
            self,
            FormNumber::F03 | FormNumber::F06 | FormNumber::F14 | FormNumber::F20
        )
    }
}

impl fmt::Display for FormNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormNumber {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        FormNumber::ALL
            .into_iter()
            .find(|form| form.as_str() == s)
            .ok_or_else(|| ExtractError::schema(format!("unknown form number '{s}'")))
    }
}

/// The identified form variant of an accepted notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSection {
    pub form: FormNumber,
    /// `LG` attribute of the form, e.g. "EN"
    pub language: String,
    /// The `FORM_SECTION/*[@FORM]` element
    pub element: NodeId,
}

/// Why a notice produced no rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// eForms document
    ExtensionNamespace,
    /// R2.0.8 defence schema
    LegacySchema,
    /// Form without an object description
    ExcludedForm,
    /// Primary code in an out-of-scope sector
    DisallowedSector,
    /// Primary code matches none of the requested codes
    NotInAllowList,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExclusionReason::ExtensionNamespace => "extension_namespace",
            ExclusionReason::LegacySchema => "legacy_schema",
            ExclusionReason::ExcludedForm => "excluded_form",
            ExclusionReason::DisallowedSector => "disallowed_sector",
            ExclusionReason::NotInAllowList => "not_in_allow_list",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Included(FormSection),
    Excluded(ExclusionReason),
}

/// Apply the family and form rules to a parsed document
pub fn classify(doc: &NoticeDocument) -> Result<Classification> {
    let namespaces = doc.namespaces();
    if namespaces.has_prefix(EXTENSION_PREFIX) {
        return Ok(Classification::Excluded(ExclusionReason::ExtensionNamespace));
    }
    if namespaces.default_namespace() == Some(LEGACY_NAMESPACE) {
        return Ok(Classification::Excluded(ExclusionReason::LegacySchema));
    }

    let root = doc.root();
    if doc.name(root) != "TED_EXPORT" {
        return Err(ExtractError::schema(format!(
            "unexpected root element <{}>",
            doc.name(root)
        )));
    }

    let element = doc
        .elements(root, &["FORM_SECTION", "*"])
        .into_iter()
        .find(|&node| doc.attribute(node, "FORM").is_some())
        .ok_or_else(|| ExtractError::schema("TED_EXPORT/FORM_SECTION/*[@FORM] is missing"))?;

    let form: FormNumber = doc.attribute(element, "FORM").unwrap_or_default().parse()?;
    if form.lacks_object_section() {
        return Ok(Classification::Excluded(ExclusionReason::ExcludedForm));
    }

    let language = doc
        .attribute(element, "LG")
        .ok_or_else(|| {
            ExtractError::schema(format!("{}/@LG is missing", doc.name(element)))
        })?
        .to_string();

    Ok(Classification::Included(FormSection {
        form,
        language,
        element,
    }))
}
