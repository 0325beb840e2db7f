//! `spendgrid-report` — report grid model and layout synthesis.
//!
//! Turns the engine's reconciled row sets into a workbook-like structure:
//! one formatted sheet per division plus monthly breakdown sheets, with
//! merge ranges and role-based cell styles. The external sink serializes
//! the result; nothing here touches the filesystem.

pub mod layout;
pub mod monthly;
pub mod sheet;
pub mod style;

pub use layout::synthesize;
pub use sheet::{CellValue, MergeRange, ReportBook, ReportSheet};
pub use style::{CellStyle, ColumnRole};
