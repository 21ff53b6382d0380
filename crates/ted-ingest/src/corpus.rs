//! Sentence corpus from extracted rows
//!
//! Reads a CSV written by [`crate::output::RowWriter`], keeps the rows whose
//! classification columns match the requested codes, and splits every
//! qualification and criteria text into sentences. The output holds each
//! distinct sentence once, one per line, in first-seen order.
//!
//! Segmentation is delegated to a [`SentenceSegmenter`]. The bundled
//! [`UnicodeSegmenter`] splits on Unicode (UAX #29) sentence boundaries,
//! which is language independent; trained per-language models are plugged
//! in by the caller.

use crate::error::{ExtractError, Result};
use crate::notice::ClassificationCode;
use crate::output::parse_list;
use indicatif::ProgressBar;
use serde::Serialize;
use std::collections::HashSet;
use std::io::{Read, Write};
use tracing::{debug, info};
use unicode_segmentation::UnicodeSegmentation;

/// Sentences this short or shorter are dropped
pub const MIN_SENTENCE_LENGTH: usize = 10;

/// Text-list columns that feed the corpus, each paired with a `_ANY` flag
pub const TEXT_COLUMNS: [&str; 9] = [
    "SUITABILITY",
    "ECONOMIC_FINANCIAL_INFO",
    "ECONOMIC_FINANCIAL_MIN_LEVEL",
    "TECHNICAL_PROFESSIONAL_INFO",
    "TECHNICAL_PROFESSIONAL_MIN_LEVEL",
    "PERFORMANCE_CONDITIONS",
    "CRITERIA_CANDIDATE",
    "AC_QUALITY",
    "AC_COST",
];

/// Splits text into sentences
pub trait SentenceSegmenter: Send + Sync {
    /// `language` is a name from [`segmenter_language`], e.g. "german"
    fn segment(&self, text: &str, language: &str) -> Vec<String>;
}

/// Splits on UAX #29 sentence boundaries; line breaks also end a sentence
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeSegmenter;

impl SentenceSegmenter for UnicodeSegmenter {
    fn segment(&self, text: &str, _language: &str) -> Vec<String> {
        text.unicode_sentences()
            .map(str::trim)
            .filter(|sentence| !sentence.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Segmenter language for a notice language code
///
/// Languages without a trained model borrow a related one.
pub fn segmenter_language(lg: &str) -> Option<&'static str> {
    let language = match lg {
        "DA" => "danish",
        "NL" => "dutch",
        "EN" => "english",
        "DE" => "german",
        "NO" => "norwegian",
        "SV" => "swedish",
        "EL" => "greek",
        "FR" => "french",
        "IT" => "italian",
        "PT" => "portuguese",
        "ES" => "spanish",
        "CS" => "czech",
        "PL" => "polish",
        "RU" => "russian",
        "SL" => "slovene",
        "ET" => "estonian",
        "FI" => "finnish",
        "TR" => "turkish",
        // Borrowed models
        "LV" | "LT" | "BG" | "HR" => "slovene",
        "GA" | "RO" => "italian",
        "MT" | "ML" => "spanish",
        "SK" => "czech",
        "HU" => "finnish",
        _ => return None,
    };
    Some(language)
}

/// Collapse whitespace runs and drop short sentences
fn normalize(sentence: &str) -> Option<String> {
    let normalized = sentence.split_whitespace().collect::<Vec<_>>().join(" ");
    (normalized.chars().count() > MIN_SENTENCE_LENGTH).then_some(normalized)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnCount {
    pub column: &'static str,
    pub sentences: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorpusReport {
    pub unique_sentences: usize,
    pub total_sentences: u64,
    /// Rows read from the input
    pub rows: u64,
    /// Rows matching the classification codes
    pub matching_rows: u64,
    /// Matching rows with at least one text column
    pub non_empty_rows: u64,
    pub columns: Vec<ColumnCount>,
}

struct Layout {
    language: usize,
    cpv_main: usize,
    prefixes: [usize; 4],
    texts: Vec<(usize, usize)>,
}

impl Layout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                ExtractError::Config(format!("input has no {name} column"))
            })
        };
        let texts = TEXT_COLUMNS
            .iter()
            .map(|&column| -> Result<(usize, usize)> {
                Ok((find(&format!("{column}_ANY"))?, find(column)?))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            language: find("LG")?,
            cpv_main: find("CPV_MAIN")?,
            prefixes: [find("CPV2")?, find("CPV3")?, find("CPV4")?, find("CPV5")?],
            texts,
        })
    }

    /// Same rule as the extraction allow-list, applied to the written columns
    fn matches(&self, record: &csv::StringRecord, entry: &ClassificationCode) -> bool {
        let column = match entry.len() {
            n @ 2..=5 => self.prefixes[n - 2],
            _ => self.cpv_main,
        };
        record.get(column) == Some(entry.as_str())
    }
}

/// Builds a sentence corpus from an extraction CSV
pub struct CorpusBuilder {
    segmenter: Box<dyn SentenceSegmenter>,
    codes: Vec<ClassificationCode>,
    progress: ProgressBar,
}

impl CorpusBuilder {
    /// An empty `codes` list keeps every row
    pub fn new(segmenter: Box<dyn SentenceSegmenter>, codes: Vec<ClassificationCode>) -> Self {
        Self {
            segmenter,
            codes,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn build<R: Read, W: Write>(&self, input: R, mut output: W) -> Result<CorpusReport> {
        let mut reader = csv::Reader::from_reader(input);
        let layout = Layout::from_headers(reader.headers()?)?;

        let mut seen = HashSet::new();
        let mut sentences = Vec::new();
        let mut counts = [0u64; TEXT_COLUMNS.len()];
        let mut rows = 0;
        let mut matching_rows = 0;
        let mut non_empty_rows = 0;

        for record in reader.records() {
            let record = record?;
            rows += 1;
            self.progress.inc(1);

            if !self.codes.is_empty() && !self.codes.iter().any(|c| layout.matches(&record, c)) {
                continue;
            }
            matching_rows += 1;

            if !layout.texts.iter().any(|&(any, _)| record.get(any) == Some("True")) {
                continue;
            }
            non_empty_rows += 1;

            let lg = record.get(layout.language).unwrap_or_default();
            let language = segmenter_language(lg).ok_or_else(|| {
                ExtractError::Config(format!("no segmenter language for LG '{lg}'"))
            })?;

            for (i, &(_, column)) in layout.texts.iter().enumerate() {
                let cell = record.get(column).unwrap_or_default();
                if cell.is_empty() {
                    continue;
                }
                for text in parse_list(cell)? {
                    for sentence in self.segmenter.segment(&text, language) {
                        let Some(sentence) = normalize(&sentence) else { continue };
                        counts[i] += 1;
                        if seen.insert(sentence.clone()) {
                            sentences.push(sentence);
                        }
                    }
                }
            }
        }

        for sentence in &sentences {
            writeln!(output, "{sentence}")?;
        }
        output.flush()?;

        let report = CorpusReport {
            unique_sentences: sentences.len(),
            total_sentences: counts.iter().sum(),
            rows,
            matching_rows,
            non_empty_rows,
            columns: TEXT_COLUMNS
                .iter()
                .zip(counts)
                .map(|(&column, sentences)| ColumnCount { column, sentences })
                .collect(),
        };
        debug!(columns = ?report.columns, "Sentences per column");
        info!(
            unique = report.unique_sentences,
            total = report.total_sentences,
            non_empty_rows,
            matching_rows,
            "Corpus written"
        );
        Ok(report)
    }
}
