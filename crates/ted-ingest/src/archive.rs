//! Monthly archive access
//!
//! TED publishes one `YYYY-MM.tar.gz` package per month, holding one XML
//! document per notice. [`NoticeArchive`] streams the members of such a
//! package lazily and in storage order; nothing beyond the current member is
//! held in memory.
//!
//! A package that is cut short (interrupted download, disk full) does not
//! raise mid-iteration. The stream simply stops, and [`MemberStream::end`]
//! tells the caller whether the end-of-archive marker was actually reached.
//!
//! # Examples
//!
//! ```rust,ignore
//! let mut archive = NoticeArchive::open("data/2021-03.tar.gz")?;
//! let mut members = archive.members()?;
//! for entry in &mut members {
//!     println!("{} ({} bytes)", entry.name, entry.payload.len());
//! }
//! assert_eq!(members.end(), Some(&StreamEnd::Complete));
//! ```

use crate::error::{ExtractError, Result};
use flate2::read::MultiGzDecoder;
use serde::Serialize;
use std::cell::Cell;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use ted_common::types::YearMonth;
use tracing::debug;

/// Upper bound for the payload buffer reserved from a member header
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// One archive member: its path inside the archive and raw bytes
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub name: String,
    pub payload: Vec<u8>,
}

/// How a member stream finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StreamEnd {
    /// The end-of-archive marker was reached
    Complete,
    /// The container ended or failed before the marker
    Truncated { reason: String },
}

/// Records whether the wrapped reader was ever asked for bytes past its end.
///
/// `tar` treats a clean EOF on a header boundary the same as the
/// end-of-archive marker, so this is the only way to tell them apart.
struct EofProbe<R> {
    inner: R,
    hit_eof: Rc<Cell<bool>>,
}

impl<R: Read> Read for EofProbe<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.hit_eof.set(true);
        }
        Ok(n)
    }
}

/// A gzip-compressed tar package of notice documents
pub struct NoticeArchive<R: Read> {
    label: String,
    archive: tar::Archive<EofProbe<MultiGzDecoder<R>>>,
    hit_eof: Rc<Cell<bool>>,
}

impl NoticeArchive<BufReader<File>> {
    /// Open a `.tar.gz` file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let file = File::open(path).map_err(|e| ExtractError::archive_read(&label, e))?;
        Self::from_reader(label, BufReader::new(file))
    }
}

impl<R: Read> NoticeArchive<R> {
    /// Wrap any reader producing gzip-compressed tar bytes.
    ///
    /// `label` identifies the archive in errors and logs. The gzip header is
    /// validated here, so a file that is not gzip at all fails up front.
    pub fn from_reader(label: impl Into<String>, reader: R) -> Result<Self> {
        let label = label.into();
        let decoder = MultiGzDecoder::new(reader);
        if decoder.header().is_none() {
            return Err(ExtractError::archive_read(&label, "not a gzip container"));
        }

        let hit_eof = Rc::new(Cell::new(false));
        let probe = EofProbe {
            inner: decoder,
            hit_eof: Rc::clone(&hit_eof),
        };

        Ok(Self {
            label,
            archive: tar::Archive::new(probe),
            hit_eof,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Start the single pass over the archive's members
    pub fn members(&mut self) -> Result<MemberStream<'_, R>> {
        let entries = self
            .archive
            .entries()
            .map_err(|e| ExtractError::archive_read(&self.label, e))?;

        Ok(MemberStream {
            entries,
            hit_eof: Rc::clone(&self.hit_eof),
            end: None,
        })
    }
}

/// Lazy iterator over the non-directory members of a [`NoticeArchive`]
pub struct MemberStream<'a, R: 'a + Read> {
    entries: tar::Entries<'a, EofProbe<MultiGzDecoder<R>>>,
    hit_eof: Rc<Cell<bool>>,
    end: Option<StreamEnd>,
}

impl<'a, R: 'a + Read> MemberStream<'a, R> {
    /// `None` while members remain, then how the stream ended
    pub fn end(&self) -> Option<&StreamEnd> {
        self.end.as_ref()
    }

    fn stop(&mut self, end: StreamEnd) -> Option<RawEntry> {
        debug!(end = ?end, "Archive stream finished");
        self.end = Some(end);
        None
    }
}

impl<'a, R: 'a + Read> Iterator for MemberStream<'a, R> {
    type Item = RawEntry;

    fn next(&mut self) -> Option<RawEntry> {
        if self.end.is_some() {
            return None;
        }

        loop {
            let mut entry = match self.entries.next() {
                None if self.hit_eof.get() => {
                    return self.stop(StreamEnd::Truncated {
                        reason: "archive ended without an end-of-archive marker".to_string(),
                    })
                },
                None => return self.stop(StreamEnd::Complete),
                Some(Err(e)) => {
                    return self.stop(StreamEnd::Truncated {
                        reason: e.to_string(),
                    })
                },
                Some(Ok(entry)) => entry,
            };

            if entry.header().entry_type().is_dir() {
                continue;
            }

            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let expected = entry.size();
            let mut payload = Vec::with_capacity(expected.min(MAX_PREALLOC) as usize);

            if let Err(e) = entry.read_to_end(&mut payload) {
                return self.stop(StreamEnd::Truncated {
                    reason: format!("failed to read member {name}: {e}"),
                });
            }
            if (payload.len() as u64) < expected {
                return self.stop(StreamEnd::Truncated {
                    reason: format!(
                        "member {name} is cut short ({} of {expected} bytes)",
                        payload.len()
                    ),
                });
            }

            return Some(RawEntry { name, payload });
        }
    }
}

/// Directory of monthly packages named `YYYY-MM.tar.gz`
///
/// Fetching the packages is someone else's job; this only locates them.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the package for `month`
    pub fn archive_path(&self, month: YearMonth) -> PathBuf {
        self.root.join(format!("{month}.tar.gz"))
    }

    pub fn exists(&self, month: YearMonth) -> bool {
        self.archive_path(month).is_file()
    }

    pub fn open(&self, month: YearMonth) -> Result<NoticeArchive<BufReader<File>>> {
        NoticeArchive::open(self.archive_path(month))
    }
}
