//! `spendgrid-io` — the pipeline's file boundary.
//!
//! CSV extracts in, flat ledger CSV and formatted XLSX report out. The
//! engine itself never sees a path; everything here converts between files
//! and the in-memory shapes the engine and report crates work with.

pub mod csv;
pub mod xlsx;

pub use csv::{read_table, write_ledger_csv};
pub use xlsx::{write_report, WriteResult};
