//! Error types for notice extraction

use thiserror::Error;

/// Result type alias for extraction operations
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Per-member error kinds absorbed by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentErrorKind {
    Malformed,
    SchemaViolation,
}

/// Main error type for the extraction pipeline
///
/// `MalformedDocument` and `SchemaViolation` are scoped to a single archive
/// member and are absorbed at the member boundary; everything else aborts the
/// archive (or the run) that raised it.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The archive container is unreadable, not gzip, or ended early
    #[error("Archive read error in {archive}: {reason}")]
    ArchiveRead { archive: String, reason: String },

    /// A member payload is not well-formed XML
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// A well-formed notice lacks a structurally mandatory part
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A list cell could not be decoded
    #[error("Invalid list literal at byte {position}: {message}")]
    Literal { position: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Common(#[from] ted_common::TedError),
}

impl ExtractError {
    pub fn archive_read(archive: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ArchiveRead {
            archive: archive.into(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(reason: impl std::fmt::Display) -> Self {
        Self::MalformedDocument(reason.to_string())
    }

    pub fn schema(reason: impl Into<String>) -> Self {
        Self::SchemaViolation(reason.into())
    }

    /// Errors that only disqualify the current archive member
    pub fn is_document_error(&self) -> bool {
        self.document_kind().is_some()
    }

    /// Which document error this is, `None` for run-level errors
    pub fn document_kind(&self) -> Option<DocumentErrorKind> {
        match self {
            Self::MalformedDocument(_) => Some(DocumentErrorKind::Malformed),
            Self::SchemaViolation(_) => Some(DocumentErrorKind::SchemaViolation),
            _ => None,
        }
    }

    /// Short machine-friendly label used in log fields and summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ArchiveRead { .. } => "archive_read",
            Self::MalformedDocument(_) => "malformed_document",
            Self::SchemaViolation(_) => "schema_violation",
            Self::Io(_) => "io",
            Self::Csv(_) => "csv",
            Self::Literal { .. } => "literal",
            Self::Config(_) => "config",
            Self::Common(_) => "common",
        }
    }
}
