use spendgrid_recon::model::{AggregateRow, RunResult};

use crate::monthly::monthly_sheet;
use crate::sheet::{sanitize_sheet_name, CellValue, MergeRange, ReportBook, ReportSheet};
use crate::style::{apply_formatting, role_for_column};

/// Column layout of the per-division sheets. The Division column itself is
/// dropped: the sheet name carries it.
pub const CHANNEL_SHEET_COLUMNS: [&str; 16] = [
    "PO_Number",
    "StartDate",
    "EndDate",
    "POCloseDownDate",
    "Market",
    "Campaign",
    "Channel",
    "PlannedSpend",
    "ReservedBudget",
    "TotalBudget",
    "NetBillable",
    "AgencyCommission",
    "LevyASBOF",
    "TotalPOValue",
    "TotalInvoicedToDate",
    "POValueRemaining",
];

const PO_COL: usize = 0;
const CAMPAIGN_COL: usize = 5;
const CHANNEL_COL: usize = 6;
const DATE_COLS: [usize; 3] = [1, 2, 3];
const TOTAL_BUDGET_COL: usize = 9;

// ---------------------------------------------------------------------------
// Book synthesis
// ---------------------------------------------------------------------------

/// Lay the reconciled row sets out as one sheet per division plus the
/// monthly breakdown sheets. Row order is taken from the engine as-is;
/// each sheet's merge computation is independent.
pub fn synthesize(result: &RunResult) -> ReportBook {
    let mut book = ReportBook::default();

    for division in divisions_in_order(&result.channel_rows) {
        let rows: Vec<&AggregateRow> = result
            .channel_rows
            .iter()
            .filter(|r| r.division.label() == division)
            .collect();
        let forecast = (division == "F&B").then_some(result.annual_forecast).flatten();
        book.sheets.push(division_sheet(&division, &rows, forecast));
    }

    for division in divisions_in_order(&result.monthly_rows) {
        let rows: Vec<&AggregateRow> = result
            .monthly_rows
            .iter()
            .filter(|r| r.division.label() == division)
            .collect();
        book.sheets.push(monthly_sheet(&division, &rows));
    }

    book
}

fn divisions_in_order(rows: &[AggregateRow]) -> Vec<String> {
    let mut seen = Vec::new();
    for row in rows {
        let label = row.division.label().to_string();
        if !seen.contains(&label) {
            seen.push(label);
        }
    }
    seen
}

// ---------------------------------------------------------------------------
// Division sheets
// ---------------------------------------------------------------------------

fn division_sheet(division: &str, rows: &[&AggregateRow], forecast: Option<i64>) -> ReportSheet {
    let headers: Vec<CellValue> = CHANNEL_SHEET_COLUMNS
        .iter()
        .map(|h| CellValue::text(*h))
        .collect();
    let roles = CHANNEL_SHEET_COLUMNS.iter().map(|h| role_for_column(h)).collect();
    let mut sheet = ReportSheet::new(sanitize_sheet_name(division), vec![headers], roles);

    for row in rows {
        sheet.rows.push(render_channel_row(row));
    }

    if let Some(forecast) = forecast {
        let mut cells = vec![CellValue::Empty; CHANNEL_SHEET_COLUMNS.len()];
        cells[CAMPAIGN_COL] = CellValue::text("Annual Forecast");
        cells[TOTAL_BUDGET_COL] = CellValue::money(forecast);
        sheet.rows.push(cells);
    }

    apply_standard_merges(&mut sheet);
    apply_formatting(&mut sheet);
    sheet.compute_col_widths(0.0);
    sheet
}

fn render_channel_row(row: &AggregateRow) -> Vec<CellValue> {
    let budget = row.budget.unwrap_or_default();
    let money_opt = |v: Option<i64>| v.map(CellValue::money).unwrap_or(CellValue::Empty);
    vec![
        CellValue::text(row.po_number.clone().unwrap_or_default()),
        CellValue::Empty, // StartDate
        CellValue::Empty, // EndDate
        CellValue::Empty, // POCloseDownDate
        CellValue::text(row.market.map(|m| m.label()).unwrap_or("")),
        // Total rows leave the campaign to the merged detail block above.
        if row.is_total {
            CellValue::Empty
        } else {
            CellValue::text(row.campaign.clone().unwrap_or_default())
        },
        CellValue::text(row.channel_label()),
        money_opt(budget.planned_spend),
        money_opt(budget.reserved_budget),
        money_opt(budget.total_budget),
        CellValue::money(row.measures.net_billable),
        CellValue::money(row.measures.agency_commission),
        CellValue::money(row.measures.levy),
        money_opt(budget.total_po_value),
        CellValue::money(row.measures.invoiced_value),
        money_opt(budget.po_value_remaining),
    ]
}

// ---------------------------------------------------------------------------
// Merge computation
// ---------------------------------------------------------------------------

/// Run-length scan: consecutive equal non-empty values collapse, provided
/// the run is longer than one row.
pub fn merge_runs(values: &[CellValue]) -> Vec<(usize, usize)> {
    merge_runs_keyed(values, values)
}

/// As `merge_runs`, but a run also resets whenever the grouping column
/// (PO number) starts a new run, so value runs never straddle PO blocks.
pub fn merge_runs_keyed(values: &[CellValue], keys: &[CellValue]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = 0usize;
    for i in 1..=values.len() {
        let boundary = i == values.len()
            || values[i] != values[start]
            || keys[i] != keys[start];
        if boundary {
            if i - start > 1 && !values[start].is_empty() {
                runs.push((start, i - 1));
            }
            start = i;
        }
    }
    runs
}

/// The standard merge structure shared by every sheet: PO number, campaign
/// and channel merge on their values; the empty date-span columns take the
/// PO-number run structure.
pub fn apply_standard_merges(sheet: &mut ReportSheet) {
    let column = |col: usize| -> Vec<CellValue> {
        sheet
            .rows
            .iter()
            .map(|r| r.get(col).cloned().unwrap_or(CellValue::Empty))
            .collect()
    };

    let po_values = column(PO_COL);
    let po_runs = merge_runs(&po_values);

    for (start, end) in &po_runs {
        sheet.merges.push(MergeRange { col: PO_COL, start_row: *start, end_row: *end });
        for col in DATE_COLS {
            sheet.merges.push(MergeRange { col, start_row: *start, end_row: *end });
        }
    }

    for col in [CAMPAIGN_COL, CHANNEL_COL] {
        for (start, end) in merge_runs_keyed(&column(col), &po_values) {
            sheet.merges.push(MergeRange { col, start_row: start, end_row: end });
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use spendgrid_recon::model::{
        AggregateRow, BudgetFields, Channel, Division, Market, Measures, RunMeta, RunSummary,
    };

    fn row(
        po: &str,
        campaign: &str,
        channel: Option<Channel>,
        division: Division,
        is_total: bool,
    ) -> AggregateRow {
        AggregateRow {
            po_number: Some(po.into()),
            campaign: Some(campaign.into()),
            campaign_key: Some(campaign.into()),
            channel,
            division,
            market: Some(Market::Uk),
            month: None,
            product_code: None,
            invoice_no: is_total.then(|| "Total".to_string()),
            measures: Measures {
                net_billable: 10000,
                agency_commission: 1000,
                levy: 100,
                invoiced_value: 11100,
            },
            is_total,
            budget: is_total.then(|| BudgetFields {
                planned_spend: Some(50000),
                reserved_budget: None,
                total_budget: Some(100000),
                total_po_value: Some(101100),
                po_value_remaining: Some(90000),
            }),
        }
    }

    fn result_with(channel_rows: Vec<AggregateRow>, forecast: Option<i64>) -> RunResult {
        RunResult {
            meta: RunMeta {
                config_name: "test".into(),
                engine_version: "0".into(),
                run_at: "now".into(),
            },
            summary: RunSummary::default(),
            ledger: Vec::new(),
            channel_rows,
            monthly_rows: Vec::new(),
            annual_forecast: forecast,
        }
    }

    #[test]
    fn merge_runs_match_spec_example() {
        let vals: Vec<CellValue> = ["A", "A", "A", "B", "B", "C"]
            .iter()
            .map(|s| CellValue::text(*s))
            .collect();
        assert_eq!(merge_runs(&vals), vec![(0, 2), (3, 4)]);
    }

    #[test]
    fn merge_runs_skip_empty_cells() {
        let vals = vec![CellValue::Empty, CellValue::Empty, CellValue::text("A")];
        assert!(merge_runs(&vals).is_empty());
    }

    #[test]
    fn value_runs_reset_at_po_boundaries() {
        let campaigns: Vec<CellValue> =
            ["Bleu", "Bleu", "Bleu", "Bleu"].iter().map(|s| CellValue::text(*s)).collect();
        let pos: Vec<CellValue> =
            ["PO-1", "PO-1", "PO-2", "PO-2"].iter().map(|s| CellValue::text(*s)).collect();
        assert_eq!(merge_runs_keyed(&campaigns, &pos), vec![(0, 1), (2, 3)]);
    }

    #[test]
    fn division_sheets_partition_rows() {
        let rows = vec![
            row("PO-1", "Bleu", Some(Channel::Social), Division::FAndB, false),
            row("PO-1", "Bleu", None, Division::FAndB, true),
            row("PO-2", "Eyewear", Some(Channel::Print), Division::FashionEyewear, false),
        ];
        let book = synthesize(&result_with(rows, None));
        let names: Vec<&str> = book.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["F&B", "FSH&EW"]);
        assert_eq!(book.sheets[0].rows.len(), 2);
        assert_eq!(book.sheets[1].rows.len(), 1);
    }

    #[test]
    fn date_columns_follow_po_run_structure() {
        let rows = vec![
            row("PO-1", "Bleu", Some(Channel::Social), Division::FAndB, false),
            row("PO-1", "Bleu", Some(Channel::Display), Division::FAndB, false),
            row("PO-1", "Bleu", None, Division::FAndB, true),
        ];
        let book = synthesize(&result_with(rows, None));
        let sheet = &book.sheets[0];
        // PO col plus the three empty date columns all span the PO block.
        for col in [0, 1, 2, 3] {
            assert!(
                sheet.merges.contains(&MergeRange { col, start_row: 0, end_row: 2 }),
                "missing merge for col {col}"
            );
        }
    }

    #[test]
    fn total_row_renders_blank_campaign_and_budget_values() {
        let rows = vec![
            row("PO-1", "Bleu", Some(Channel::Social), Division::FAndB, false),
            row("PO-1", "Bleu", None, Division::FAndB, true),
        ];
        let book = synthesize(&result_with(rows, None));
        let sheet = &book.sheets[0];
        let detail = &sheet.rows[0];
        let total = &sheet.rows[1];
        assert_eq!(detail[5], CellValue::text("Bleu"));
        assert_eq!(detail[9], CellValue::Empty, "detail rows carry no budget figures");
        assert_eq!(total[5], CellValue::Empty);
        assert_eq!(total[6], CellValue::text("Total"));
        assert_eq!(total[9], CellValue::money(100000));
        assert_eq!(total[15], CellValue::money(90000));
        assert!(sheet.is_total_row(1));
    }

    #[test]
    fn forecast_row_lands_on_fnb_sheet_only() {
        let rows = vec![
            row("PO-1", "Bleu", Some(Channel::Social), Division::FAndB, false),
            row("PO-2", "Eyewear", Some(Channel::Print), Division::FashionEyewear, false),
        ];
        let book = synthesize(&result_with(rows, Some(123_00)));
        let fnb = &book.sheets[0];
        let last = fnb.rows.last().unwrap();
        assert_eq!(last[5], CellValue::text("Annual Forecast"));
        assert_eq!(last[9], CellValue::money(123_00));
        assert_eq!(book.sheets[1].rows.len(), 1, "no forecast row outside F&B");
    }
}
