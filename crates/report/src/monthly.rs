use spendgrid_recon::model::{AggregateRow, MONTHS};
use tracing::debug;

use crate::layout::apply_standard_merges;
use crate::sheet::{sanitize_sheet_name, CellValue, HeaderMerge, ReportSheet};
use crate::style::{apply_formatting, role_for_column, ColumnRole};

pub const MONTHLY_BASE_COLUMNS: [&str; 7] = [
    "PO_Number",
    "StartDate",
    "EndDate",
    "POCloseDownDate",
    "Market",
    "Campaign",
    "Channel",
];

/// Metric block repeated once per month under its merged super-header.
pub const MONTHLY_METRIC_COLUMNS: [&str; 5] = [
    "NetBillable",
    "AgencyCommission",
    "LevyASBOF",
    "TotalInvoiceVal",
    "InvoiceNo",
];

const BASE_WIDTH: usize = MONTHLY_BASE_COLUMNS.len();
const BLOCK_WIDTH: usize = MONTHLY_METRIC_COLUMNS.len();

/// One "<Division> Monthly" sheet: two header rows (merged month
/// super-headers over per-month metric subheaders) and one line per
/// engine row, its measures written into its month's column block.
pub fn monthly_sheet(division: &str, rows: &[&AggregateRow]) -> ReportSheet {
    let total_cols = BASE_WIDTH + MONTHS.len() * BLOCK_WIDTH;

    let mut super_header = vec![CellValue::Empty; total_cols];
    let mut sub_header: Vec<CellValue> = MONTHLY_BASE_COLUMNS
        .iter()
        .map(|h| CellValue::text(*h))
        .collect();
    let mut roles: Vec<ColumnRole> = MONTHLY_BASE_COLUMNS
        .iter()
        .map(|h| role_for_column(h))
        .collect();
    let mut header_merges = Vec::new();

    for (i, month) in MONTHS.iter().enumerate() {
        let start = BASE_WIDTH + i * BLOCK_WIDTH;
        super_header[start] = CellValue::text(month.label());
        header_merges.push(HeaderMerge {
            row: 0,
            start_col: start,
            end_col: start + BLOCK_WIDTH - 1,
        });
        for metric in MONTHLY_METRIC_COLUMNS {
            sub_header.push(CellValue::text(metric));
            roles.push(role_for_column(metric));
        }
    }

    let mut sheet = ReportSheet::new(
        sanitize_sheet_name(&format!("{division} Monthly")),
        vec![super_header, sub_header],
        roles,
    );
    sheet.header_merges = header_merges;

    for row in rows {
        sheet.rows.push(render_monthly_row(row, total_cols));
    }

    apply_standard_merges(&mut sheet);
    apply_formatting(&mut sheet);
    sheet.compute_col_widths(12.0);
    sheet
}

fn render_monthly_row(row: &AggregateRow, total_cols: usize) -> Vec<CellValue> {
    let mut cells = vec![CellValue::Empty; total_cols];
    cells[0] = CellValue::text(row.po_number.clone().unwrap_or_default());
    cells[4] = CellValue::text(row.market.map(|m| m.label()).unwrap_or(""));
    cells[5] = if row.is_total {
        CellValue::Empty
    } else {
        CellValue::text(row.campaign.clone().unwrap_or_default())
    };
    cells[6] = CellValue::text(row.channel_label());

    match row.month {
        Some(month) => {
            let start = BASE_WIDTH + (month.index() as usize - 1) * BLOCK_WIDTH;
            cells[start] = CellValue::money(row.measures.net_billable);
            cells[start + 1] = CellValue::money(row.measures.agency_commission);
            cells[start + 2] = CellValue::money(row.measures.levy);
            cells[start + 3] = CellValue::money(row.measures.invoiced_value);
            cells[start + 4] = CellValue::text(row.invoice_no.clone().unwrap_or_default());
        }
        None => {
            debug!(
                po = row.po_number.as_deref().unwrap_or(""),
                "monthly row without a month; measures not placed"
            );
        }
    }

    cells
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
