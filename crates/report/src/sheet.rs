use std::collections::BTreeMap;

use serde::Serialize;

use crate::style::{CellStyle, ColumnRole};

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value)
        }
    }

    /// Currency minor units render as decimal numbers.
    pub fn money(minor: i64) -> Self {
        Self::Number(minor as f64 / 100.0)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => {
                if n.fract() == 0.0 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n:.2}")
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Merge ranges
// ---------------------------------------------------------------------------

/// A vertical run of data rows in one column collapsed into a single
/// visual cell. Row indices are into `ReportSheet::rows`, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeRange {
    pub col: usize,
    pub start_row: usize,
    pub end_row: usize,
}

/// A horizontal merge in a header row (month super-headers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderMerge {
    pub row: usize,
    pub start_col: usize,
    pub end_col: usize,
}

// ---------------------------------------------------------------------------
// Sheets
// ---------------------------------------------------------------------------

/// One named grid of the rendered report. Built fresh each run; the
/// formatting pass only assigns visual attributes and never changes values.
#[derive(Debug, Clone)]
pub struct ReportSheet {
    pub name: String,
    pub header_rows: Vec<Vec<CellValue>>,
    pub rows: Vec<Vec<CellValue>>,
    pub roles: Vec<ColumnRole>,
    pub merges: Vec<MergeRange>,
    pub header_merges: Vec<HeaderMerge>,
    /// Data-area style assignments keyed by (row, col), filled in by the
    /// formatting pass.
    pub cell_styles: BTreeMap<(usize, usize), CellStyle>,
    pub col_widths: Vec<f64>,
}

impl ReportSheet {
    pub fn new(name: impl Into<String>, headers: Vec<Vec<CellValue>>, roles: Vec<ColumnRole>) -> Self {
        Self {
            name: name.into(),
            header_rows: headers,
            rows: Vec::new(),
            roles,
            merges: Vec::new(),
            header_merges: Vec::new(),
            cell_styles: BTreeMap::new(),
            col_widths: Vec::new(),
        }
    }

    pub fn column_count(&self) -> usize {
        self.header_rows
            .iter()
            .map(Vec::len)
            .chain(self.rows.iter().map(Vec::len))
            .max()
            .unwrap_or(0)
    }

    /// A row is a total row when any cell carries the literal token
    /// "total", case-insensitively.
    pub fn is_total_row(&self, row: usize) -> bool {
        self.rows
            .get(row)
            .map(|cells| {
                cells
                    .iter()
                    .any(|c| c.display().to_lowercase().contains("total"))
            })
            .unwrap_or(false)
    }

    /// Content-driven column widths: longest rendered value plus padding,
    /// with a floor for dense sheets.
    pub fn compute_col_widths(&mut self, min_width: f64) {
        let cols = self.column_count();
        let mut widths = vec![min_width; cols];
        for row in self.header_rows.iter().chain(self.rows.iter()) {
            for (col, cell) in row.iter().enumerate() {
                let len = cell.display().len() as f64 + 2.0;
                if len > widths[col] {
                    widths[col] = len;
                }
            }
        }
        self.col_widths = widths;
    }
}

/// The rendered output artifact handed to the external sink.
#[derive(Debug, Clone, Default)]
pub struct ReportBook {
    pub sheets: Vec<ReportSheet>,
}

// ---------------------------------------------------------------------------
// Sheet names
// ---------------------------------------------------------------------------

/// Strip characters that are illegal in spreadsheet sheet names and clamp
/// to the 31-character limit. A name that sanitizes away entirely becomes
/// "Other".
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, ':' | '\\' | '/' | '?' | '*'))
        .collect();
    let truncated: String = cleaned.chars().take(31).collect();
    if truncated.trim().is_empty() {
        "Other".into()
    } else {
        truncated
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_cells_render_as_decimal() {
        assert_eq!(CellValue::money(123456), CellValue::Number(1234.56));
        assert_eq!(CellValue::money(123456).display(), "1234.56");
        assert_eq!(CellValue::money(300000).display(), "3000");
    }

    #[test]
    fn empty_text_collapses_to_empty() {
        assert_eq!(CellValue::text(""), CellValue::Empty);
        assert!(CellValue::text("").is_empty());
    }

    #[test]
    fn total_row_detection_is_case_insensitive() {
        let mut sheet = ReportSheet::new("S", vec![], vec![]);
        sheet.rows.push(vec![CellValue::text("PO-1"), CellValue::text("ToTaL")]);
        sheet.rows.push(vec![CellValue::text("PO-1"), CellValue::text("Social")]);
        assert!(sheet.is_total_row(0));
        assert!(!sheet.is_total_row(1));
    }

    #[test]
    fn sanitize_strips_illegal_chars_and_truncates() {
        assert_eq!(sanitize_sheet_name("W&FJ"), "W&FJ");
        assert_eq!(sanitize_sheet_name("a/b:c?d*e\\f"), "abcdef");
        assert_eq!(sanitize_sheet_name("::"), "Other");
        let long = "X".repeat(40);
        assert_eq!(sanitize_sheet_name(&long).len(), 31);
    }

    #[test]
    fn col_widths_track_longest_cell() {
        let mut sheet = ReportSheet::new(
            "S",
            vec![vec![CellValue::text("PO_Number")]],
            vec![],
        );
        sheet.rows.push(vec![CellValue::text("PO-1234567890")]);
        sheet.compute_col_widths(8.0);
        assert_eq!(sheet.col_widths.len(), 1);
        assert_eq!(sheet.col_widths[0], "PO-1234567890".len() as f64 + 2.0);
    }
}
