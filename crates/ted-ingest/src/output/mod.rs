//! Tabular output: column schema, list literals and the CSV writer

pub mod emitter;
pub mod literal;
pub mod schema;

pub use emitter::{create, RowWriter, Sink};
pub use literal::{format_list, parse_list};
pub use schema::{Cell, Column, ColumnId, ColumnKind, COLUMNS, SCHEMA_VERSION};
