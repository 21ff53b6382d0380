//! CSV row emitter

use super::literal::format_list;
use super::schema::{cell, header, Cell, COLUMNS};
use crate::error::Result;
use crate::notice::Row;
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Serialize one cell value
pub fn render(cell: Cell<'_>) -> Cow<'_, str> {
    match cell {
        Cell::Absent => Cow::Borrowed(""),
        Cell::Bool(true) => Cow::Borrowed("True"),
        Cell::Bool(false) => Cow::Borrowed("False"),
        Cell::Text(text) => Cow::Borrowed(text),
        Cell::Owned(text) => Cow::Owned(text),
        Cell::List(items) => Cow::Owned(format_list(items)),
    }
}

/// Writes rows under the fixed column schema, header first
pub struct RowWriter<W: Write> {
    writer: csv::Writer<W>,
    rows_written: u64,
}

impl<W: Write> RowWriter<W> {
    /// Wrap a sink and write the header row
    pub fn new(sink: W) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(sink);
        writer.write_record(header())?;
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        let record: Vec<Cow<'_, str>> =
            COLUMNS.iter().map(|column| render(cell(row, column.id))).collect();
        self.writer.write_record(record.iter().map(|value| value.as_bytes()))?;
        self.rows_written += 1;
        Ok(())
    }

    /// Write every row of one notice
    pub fn write_notice(&mut self, rows: &[Row]) -> Result<()> {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush and hand back the sink
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| io::Error::new(e.error().kind(), e.error().to_string()).into())
    }
}

/// Output sink: a file, or stdout for `-`
pub type Sink = Box<dyn Write + Send>;

pub fn create(path: &Path) -> Result<RowWriter<Sink>> {
    let sink: Sink = if path.as_os_str() == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        Box::new(BufWriter::new(File::create(path)?))
    };
    RowWriter::new(sink)
}
