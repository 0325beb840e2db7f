use serde::Serialize;

use crate::sheet::ReportSheet;

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

// Fill colours carried over from the report this replaces; tweak here, not
// at the call sites.
pub const HEADER_FILL: &str = "8095BF";
pub const CHANNEL_FILL: &str = "71AD47";
pub const PRODUCT_FILL: &str = "FCE4D6";
pub const INVOICE_FILL: &str = "C8E4B4";
pub const REMAINING_FILL: &str = "E0ECF4";
pub const CLOSEDOWN_FILL: &str = "E0DCDC";
pub const DATE_FILL: &str = "F8F4F4";
pub const TOTAL_ROW_FILL: &str = "BFBFBF";

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Visual role of a column; the closed vocabulary the formatting rules are
/// written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnRole {
    Identifier,
    DateSpan,
    CloseDownDate,
    Channel,
    ProductMeasure,
    InvoiceMeasure,
    RemainingValue,
    Default,
}

/// Map a header to its role by name.
pub fn role_for_column(header: &str) -> ColumnRole {
    match header {
        "Channel" => ColumnRole::Channel,
        "ProductCode" | "PlannedSpend" | "ReservedBudget" | "TotalBudget" | "NetBillable"
        | "AgencyCommission" | "LevyASBOF" | "TotalPOValue" | "InvoiceNo" => {
            ColumnRole::ProductMeasure
        }
        "TotalInvoicedToDate" | "TotalInvoiceVal" => ColumnRole::InvoiceMeasure,
        "POValueRemaining" => ColumnRole::RemainingValue,
        "POCloseDownDate" => ColumnRole::CloseDownDate,
        "StartDate" | "EndDate" => ColumnRole::DateSpan,
        "PO_Number" | "Campaign" | "Market" | "Month" => ColumnRole::Identifier,
        _ => ColumnRole::Default,
    }
}

pub fn fill_for_role(role: ColumnRole) -> Option<&'static str> {
    match role {
        ColumnRole::Channel => Some(CHANNEL_FILL),
        ColumnRole::ProductMeasure => Some(PRODUCT_FILL),
        ColumnRole::InvoiceMeasure => Some(INVOICE_FILL),
        ColumnRole::RemainingValue => Some(REMAINING_FILL),
        ColumnRole::CloseDownDate => Some(CLOSEDOWN_FILL),
        ColumnRole::DateSpan => Some(DATE_FILL),
        ColumnRole::Identifier | ColumnRole::Default => None,
    }
}

// ---------------------------------------------------------------------------
// Styles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CellStyle {
    /// RRGGBB background fill.
    pub fill: Option<&'static str>,
    pub bold: bool,
}

/// The (columnRole, isTotalRow) formatting contract in one place.
pub fn style_for(role: ColumnRole, is_total_row: bool) -> CellStyle {
    if is_total_row {
        // Total rows win over any column role.
        return CellStyle { fill: Some(TOTAL_ROW_FILL), bold: false };
    }
    CellStyle { fill: fill_for_role(role), bold: false }
}

/// Formatting pass: role fills per column first, then the full-row total
/// style on rows carrying the "total" token, so the total style takes
/// precedence on conflicting cells. Values are never touched.
pub fn apply_formatting(sheet: &mut ReportSheet) {
    let cols = sheet.column_count();
    for row in 0..sheet.rows.len() {
        for col in 0..cols {
            let role = sheet.roles.get(col).copied().unwrap_or(ColumnRole::Default);
            if let Some(fill) = fill_for_role(role) {
                sheet.cell_styles.insert((row, col), CellStyle { fill: Some(fill), bold: false });
            }
        }
    }
    for row in 0..sheet.rows.len() {
        if sheet.is_total_row(row) {
            for col in 0..cols {
                sheet
                    .cell_styles
                    .insert((row, col), CellStyle { fill: Some(TOTAL_ROW_FILL), bold: false });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::CellValue;

    #[test]
    fn roles_by_header_name() {
        assert_eq!(role_for_column("Channel"), ColumnRole::Channel);
        assert_eq!(role_for_column("NetBillable"), ColumnRole::ProductMeasure);
        assert_eq!(role_for_column("TotalInvoicedToDate"), ColumnRole::InvoiceMeasure);
        assert_eq!(role_for_column("POValueRemaining"), ColumnRole::RemainingValue);
        assert_eq!(role_for_column("StartDate"), ColumnRole::DateSpan);
        assert_eq!(role_for_column("PO_Number"), ColumnRole::Identifier);
        assert_eq!(role_for_column("Whatever"), ColumnRole::Default);
    }

    #[test]
    fn total_row_style_wins_over_role() {
        assert_eq!(style_for(ColumnRole::Channel, false).fill, Some(CHANNEL_FILL));
        assert_eq!(style_for(ColumnRole::Channel, true).fill, Some(TOTAL_ROW_FILL));
    }

    #[test]
    fn formatting_pass_overrides_role_fill_on_total_rows() {
        let headers = vec![vec![CellValue::text("Campaign"), CellValue::text("Channel")]];
        let roles = vec![role_for_column("Campaign"), role_for_column("Channel")];
        let mut sheet = ReportSheet::new("F&B", headers, roles);
        sheet.rows.push(vec![CellValue::text("Bleu"), CellValue::text("Social")]);
        sheet.rows.push(vec![CellValue::Empty, CellValue::text("Total")]);
        apply_formatting(&mut sheet);

        assert_eq!(sheet.cell_styles[&(0, 1)].fill, Some(CHANNEL_FILL));
        assert!(!sheet.cell_styles.contains_key(&(0, 0)), "identifier has no fill");
        assert_eq!(sheet.cell_styles[&(1, 0)].fill, Some(TOTAL_ROW_FILL));
        assert_eq!(sheet.cell_styles[&(1, 1)].fill, Some(TOTAL_ROW_FILL));
    }
}
