use std::path::Path;

use spendgrid_recon::model::{AggregateRow, Table};

/// Ledger column order for the downstream query store, one row per
/// `AggregateRow`.
pub const LEDGER_COLUMNS: [&str; 17] = [
    "PO_Number",
    "Campaign",
    "Channel",
    "ProductCode",
    "TotalBudget",
    "NetBillable",
    "AgencyCommission",
    "LevyASBOF",
    "TotalPOValue",
    "TotalInvoiceVal",
    "POValueRemaining",
    "PlannedSpend",
    "ReservedBudget",
    "Market",
    "Division",
    "InvoiceNo",
    "Month",
];

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read a CSV extract into the engine's table shape. The first record is
/// the header row; everything stays textual, typing happens at ingestion.
pub fn read_table(path: &Path, name: &str) -> Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| format!("cannot open '{}': {e}", path.display()))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| format!("cannot read headers of '{}': {e}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| format!("cannot read '{}': {e}", path.display()))?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }

    Ok(Table::new(name, columns, rows))
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write the reconciled ledger as a flat CSV stream.
pub fn write_ledger_csv(rows: &[AggregateRow], path: &Path) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| format!("cannot create '{}': {e}", path.display()))?;

    writer
        .write_record(LEDGER_COLUMNS)
        .map_err(|e| format!("cannot write headers: {e}"))?;

    for row in rows {
        let budget = row.budget.unwrap_or_default();
        let record = [
            row.po_number.clone().unwrap_or_default(),
            row.campaign.clone().unwrap_or_default(),
            row.channel_label().to_string(),
            row.product_code.clone().unwrap_or_default(),
            money_opt(budget.total_budget),
            money(row.measures.net_billable),
            money(row.measures.agency_commission),
            money(row.measures.levy),
            money_opt(budget.total_po_value),
            money(row.measures.invoiced_value),
            money_opt(budget.po_value_remaining),
            money_opt(budget.planned_spend),
            money_opt(budget.reserved_budget),
            row.market.map(|m| m.label().to_string()).unwrap_or_default(),
            row.division.label().to_string(),
            row.invoice_no.clone().unwrap_or_default(),
            row.month_label().to_string(),
        ];
        writer
            .write_record(&record)
            .map_err(|e| format!("cannot write row: {e}"))?;
    }

    writer.flush().map_err(|e| format!("cannot flush '{}': {e}", path.display()))
}

/// Minor units to decimal text ("-1234.56").
fn money(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

fn money_opt(minor: Option<i64>) -> String {
    minor.map(money).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
