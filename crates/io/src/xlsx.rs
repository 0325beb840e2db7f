use std::collections::HashSet;
use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook as XlsxWorkbook, Worksheet};
use spendgrid_report::sheet::{CellValue, ReportSheet};
use spendgrid_report::style::{CellStyle, HEADER_FILL};
use spendgrid_report::ReportBook;

/// Write statistics returned to the caller for the run summary line.
#[derive(Debug, Default)]
pub struct WriteResult {
    pub sheets_written: usize,
    pub cells_written: usize,
    pub merges_written: usize,
}

/// Serialize the rendered report to an .xlsx file.
///
/// Merged regions go in first — `merge_range()` writes blanks to every cell
/// in the range, then the cell pass overwrites each origin cell with its
/// typed value and skips the merge-hidden rest.
pub fn write_report(book: &ReportBook, path: &Path) -> Result<WriteResult, String> {
    let mut result = WriteResult::default();
    let mut xlsx = XlsxWorkbook::new();

    for sheet in &book.sheets {
        let worksheet = xlsx
            .add_worksheet()
            .set_name(&sheet.name)
            .map_err(|e| format!("cannot create sheet '{}': {e}", sheet.name))?;

        result.merges_written += write_merges(worksheet, sheet)?;
        result.cells_written += write_cells(worksheet, sheet)?;

        for (col, width) in sheet.col_widths.iter().enumerate() {
            worksheet
                .set_column_width(col as u16, *width)
                .map_err(|e| format!("cannot size column {col}: {e}"))?;
        }

        result.sheets_written += 1;
    }

    xlsx.save(path)
        .map_err(|e| format!("cannot save '{}': {e}", path.display()))?;
    Ok(result)
}

fn write_merges(worksheet: &mut Worksheet, sheet: &ReportSheet) -> Result<usize, String> {
    let header_offset = sheet.header_rows.len() as u32;
    let blank = Format::new().set_align(FormatAlign::Center).set_align(FormatAlign::VerticalCenter);
    let mut written = 0usize;

    for merge in &sheet.header_merges {
        worksheet
            .merge_range(
                merge.row as u32,
                merge.start_col as u16,
                merge.row as u32,
                merge.end_col as u16,
                "",
                &blank,
            )
            .map_err(|e| format!("cannot write header merge: {e}"))?;
        written += 1;
    }

    for merge in &sheet.merges {
        worksheet
            .merge_range(
                header_offset + merge.start_row as u32,
                merge.col as u16,
                header_offset + merge.end_row as u32,
                merge.col as u16,
                "",
                &blank,
            )
            .map_err(|e| format!("cannot write merge: {e}"))?;
        written += 1;
    }

    Ok(written)
}

fn write_cells(worksheet: &mut Worksheet, sheet: &ReportSheet) -> Result<usize, String> {
    let hidden = merge_hidden_cells(sheet);
    let header_offset = sheet.header_rows.len();
    let header_format = header_style_format();
    let mut written = 0usize;

    for (row, cells) in sheet.header_rows.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            if hidden.contains(&(row, col)) && cell.is_empty() {
                continue;
            }
            write_cell(worksheet, row as u32, col as u16, cell, &header_format)?;
            written += 1;
        }
    }

    for (row, cells) in sheet.rows.iter().enumerate() {
        let sheet_row = header_offset + row;
        for (col, cell) in cells.iter().enumerate() {
            if hidden.contains(&(sheet_row, col)) {
                continue;
            }
            let format = match sheet.cell_styles.get(&(row, col)) {
                Some(style) => style_format(style),
                None => default_format(),
            };
            write_cell(worksheet, sheet_row as u32, col as u16, cell, &format)?;
            written += 1;
        }
    }

    Ok(written)
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &CellValue,
    format: &Format,
) -> Result<(), String> {
    match cell {
        CellValue::Empty => {
            // Styled blanks keep fills visible on empty cells.
            worksheet
                .write_blank(row, col, format)
                .map_err(|e| format!("cannot write blank at ({row},{col}): {e}"))?;
        }
        CellValue::Text(s) => {
            worksheet
                .write_string_with_format(row, col, s, format)
                .map_err(|e| format!("cannot write text at ({row},{col}): {e}"))?;
        }
        CellValue::Number(n) => {
            worksheet
                .write_number_with_format(row, col, *n, format)
                .map_err(|e| format!("cannot write number at ({row},{col}): {e}"))?;
        }
    }
    Ok(())
}

/// Cells covered by a merge apart from its origin, in sheet coordinates.
fn merge_hidden_cells(sheet: &ReportSheet) -> HashSet<(usize, usize)> {
    let header_offset = sheet.header_rows.len();
    let mut hidden = HashSet::new();
    for merge in &sheet.header_merges {
        for col in merge.start_col + 1..=merge.end_col {
            hidden.insert((merge.row, col));
        }
    }
    for merge in &sheet.merges {
        for row in merge.start_row + 1..=merge.end_row {
            hidden.insert((header_offset + row, merge.col));
        }
    }
    hidden
}

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

fn parse_fill(hex: &str) -> Option<Color> {
    u32::from_str_radix(hex, 16).ok().map(Color::RGB)
}

fn default_format() -> Format {
    Format::new()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
}

fn header_style_format() -> Format {
    let mut format = default_format().set_bold();
    if let Some(color) = parse_fill(HEADER_FILL) {
        format = format.set_background_color(color);
    }
    format
}

fn style_format(style: &CellStyle) -> Format {
    let mut format = default_format();
    if style.bold {
        format = format.set_bold();
    }
    if let Some(color) = style.fill.and_then(parse_fill) {
        format = format.set_background_color(color);
    }
    format
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
