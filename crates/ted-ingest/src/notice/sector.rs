//! Sector filtering on the primary classification (CPV) code

use super::classifier::ExclusionReason;
use super::document::{FieldPath, NodeId, NoticeDocument};
use crate::error::{ExtractError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Two-digit divisions that are out of scope (services, defence, utilities)
pub const DISALLOWED_SECTORS: [&str; 11] =
    ["09", "24", "33", "35", "38", "66", "71", "72", "77", "80", "85"];

/// Prefix lengths that get their own output column
pub const PREFIX_LENGTHS: std::ops::RangeInclusive<usize> = 2..=5;

const CPV_MAIN: FieldPath = FieldPath::attribute(&["CPV_MAIN", "CPV_CODE"], "CODE");

/// A numeric classification code, at least two digits long
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClassificationCode(String);

impl ClassificationCode {
    pub fn parse(code: &str) -> Option<Self> {
        (code.len() >= 2 && code.bytes().all(|b| b.is_ascii_digit()))
            .then(|| Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; codes have at least two digits
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Leading `n` digits, defined for `n` in 2..=5 when the code is long enough
    pub fn prefix(&self, n: usize) -> Option<&str> {
        if PREFIX_LENGTHS.contains(&n) && self.0.len() >= n {
            Some(&self.0[..n])
        } else {
            None
        }
    }

    /// The two-digit division
    pub fn division(&self) -> &str {
        &self.0[..2]
    }

    /// Whether an allow-list entry selects this code
    ///
    /// Entries up to five digits compare against the prefix of the same
    /// length; longer entries must equal the whole code.
    pub fn matches(&self, entry: &ClassificationCode) -> bool {
        if entry.len() <= *PREFIX_LENGTHS.end() {
            self.prefix(entry.len()) == Some(entry.as_str())
        } else {
            self == entry
        }
    }
}

impl fmt::Display for ClassificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ClassificationCode {
    type Error = ExtractError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value).ok_or_else(|| {
            ExtractError::Config(format!(
                "classification code '{value}' must be at least two ASCII digits"
            ))
        })
    }
}

impl From<ClassificationCode> for String {
    fn from(code: ClassificationCode) -> Self {
        code.0
    }
}

/// Disallowed divisions plus an optional allow-list of requested codes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpvFilter {
    allow: Vec<ClassificationCode>,
}

impl CpvFilter {
    /// Build a filter; an empty list allows every permitted sector
    pub fn new<I, S>(codes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allow = codes
            .into_iter()
            .map(|code| ClassificationCode::try_from(code.as_ref().to_string()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { allow })
    }

    pub fn allow_list(&self) -> &[ClassificationCode] {
        &self.allow
    }

    /// Allow-list check only; an empty list matches everything
    pub fn matches(&self, code: &ClassificationCode) -> bool {
        self.allow.is_empty() || self.allow.iter().any(|entry| code.matches(entry))
    }

    /// Why `code` is filtered out, or `None` when the notice is kept
    pub fn exclusion(&self, code: &ClassificationCode) -> Option<ExclusionReason> {
        if DISALLOWED_SECTORS.contains(&code.division()) {
            Some(ExclusionReason::DisallowedSector)
        } else if !self.matches(code) {
            Some(ExclusionReason::NotInAllowList)
        } else {
            None
        }
    }
}

/// Read `CPV_MAIN/CPV_CODE/@CODE` under the `OBJECT_CONTRACT` element
pub fn primary_code(doc: &NoticeDocument, object: NodeId) -> Result<ClassificationCode> {
    let raw = doc.required(object, &CPV_MAIN)?;
    ClassificationCode::parse(&raw)
        .ok_or_else(|| ExtractError::schema(format!("invalid primary classification code '{raw}'")))
}
