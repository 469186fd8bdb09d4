//! XLSX report output.
//!
//! Writes slide records as a single-sheet workbook built directly from its
//! package parts.

pub mod writer;

pub use writer::{ReportWriter, COLUMN_HEADERS, COLUMN_WIDTHS, SHEET_NAME};
