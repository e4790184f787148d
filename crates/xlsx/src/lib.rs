//! XLSX (Office Open XML) spreadsheet backend.
//!
//! Translation workbooks keep one sheet per slide (`Slide…`), with the
//! text of each step in column B below a header row.

pub mod shared_strings;
pub mod sheet;
pub mod workbook;

pub use workbook::{SheetEntry, Workbook};
