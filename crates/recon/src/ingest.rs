use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::classify::classify_division;
use crate::config::RuleConfig;
use crate::error::SpendError;
use crate::model::{BudgetRecord, Market, Measures, Month, RawSpendRecord, Table};
use crate::normalize::KeyNormalizer;

// ---------------------------------------------------------------------------
// Spend extracts
// ---------------------------------------------------------------------------

/// Read a billed/unbilled extract table into raw spend records, validating
/// the schema up front. Fully blank rows are skipped; anything else that
/// does not parse fails the run with the offending table/row named.
pub fn spend_records(table: &Table, config: &RuleConfig) -> Result<Vec<RawSpendRecord>, SpendError> {
    let cols = &config.spend_columns;
    if table.rows.is_empty() {
        return Err(SpendError::EmptyTable { table: table.name.clone() });
    }

    let po_idx = table.column_index(&cols.po_number)?;
    let campaign_idx = table.column_index(&cols.campaign)?;
    let media_idx = table.column_index(&cols.media)?;
    let product_idx = table.column_index(&cols.product)?;
    let client_idx = table.column_index(&cols.client)?;
    let month_idx = table.column_index(&cols.month)?;
    let net_idx = table.column_index(&cols.net_billable)?;
    let commission_idx = table.column_index(&cols.agency_commission)?;
    let levy_idx = table.column_index(&cols.levy)?;
    let invoiced_idx = table.column_index(&cols.invoiced_value)?;
    // Not every upstream variant carries these.
    let product_code_idx = table.optional_column_index(&cols.product_code);
    let invoice_no_idx = table.optional_column_index(&cols.invoice_no);
    let tag_idx = table.optional_column_index(&cols.division_tag);

    let mut records = Vec::with_capacity(table.rows.len());
    for (row_no, row) in table.rows.iter().enumerate() {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let amount = |idx: usize| -> Result<i64, SpendError> {
            let raw = table.cell(row, idx);
            if raw.trim().is_empty() {
                return Ok(0);
            }
            parse_minor(raw).ok_or_else(|| SpendError::AmountParse {
                table: table.name.clone(),
                row: row_no,
                value: raw.into(),
            })
        };

        let month = parse_month(table.cell(row, month_idx)).map_err(|value| {
            SpendError::MonthParse { table: table.name.clone(), row: row_no, value }
        })?;

        let optional = |idx: Option<usize>| -> Option<String> {
            let value = table.cell(row, idx?).trim();
            (!value.is_empty()).then(|| value.to_string())
        };

        records.push(RawSpendRecord {
            po_number: table.cell(row, po_idx).trim().to_string(),
            campaign_raw: table.cell(row, campaign_idx).trim().to_string(),
            media_code: table.cell(row, media_idx).trim().to_string(),
            product_raw: table.cell(row, product_idx).trim().to_string(),
            product_code: optional(product_code_idx),
            client_code: table.cell(row, client_idx).trim().to_string(),
            source_division: optional(tag_idx),
            month,
            measures: Measures {
                net_billable: amount(net_idx)?,
                agency_commission: amount(commission_idx)?,
                levy: amount(levy_idx)?,
                invoiced_value: amount(invoiced_idx)?,
            },
            invoice_no: optional(invoice_no_idx),
        });
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// Budget tracker
// ---------------------------------------------------------------------------

/// Read the budget tracker into budget records, normalizing campaign keys
/// with the same pipeline the spend side uses. Rows whose campaign text
/// matches no division rule are tracker section headers and other junk;
/// they are dropped, mirroring the upstream cleanup.
pub fn budget_records(
    table: &Table,
    config: &RuleConfig,
    normalizer: &KeyNormalizer,
) -> Result<Vec<BudgetRecord>, SpendError> {
    let cols = &config.budget_columns;
    if table.rows.is_empty() {
        return Err(SpendError::EmptyTable { table: table.name.clone() });
    }

    let campaign_idx = table.column_index(&cols.campaign)?;
    let market_idx = table.optional_column_index(&cols.market);
    let planned_idx = table.optional_column_index(&cols.planned_spend);
    let reserved_idx = table.optional_column_index(&cols.reserved_budget);
    let total_idx = table.optional_column_index(&cols.total_budget);

    let mut records = Vec::new();
    for (row_no, row) in table.rows.iter().enumerate() {
        let campaign = table.cell(row, campaign_idx).trim();
        if campaign.is_empty() {
            continue;
        }
        if classify_division(&config.division_rules, campaign) == crate::model::Division::Other {
            debug!(row = row_no, campaign, "dropping non-campaign budget row");
            continue;
        }

        let amount = |idx: Option<usize>| -> Result<Option<i64>, SpendError> {
            let Some(idx) = idx else { return Ok(None) };
            let raw = table.cell(row, idx);
            if raw.trim().is_empty() {
                return Ok(None);
            }
            parse_minor(raw)
                .map(Some)
                .ok_or_else(|| SpendError::AmountParse {
                    table: table.name.clone(),
                    row: row_no,
                    value: raw.into(),
                })
        };

        let market = market_idx
            .map(|idx| Market::parse_label(table.cell(row, idx)))
            .unwrap_or(Market::Unknown);

        records.push(BudgetRecord {
            campaign_key: normalizer.normalize(campaign),
            campaign_raw: campaign.to_string(),
            market,
            planned_spend: amount(planned_idx)?,
            reserved_budget: amount(reserved_idx)?,
            total_budget: amount(total_idx)?,
        });
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// Cell parsers
// ---------------------------------------------------------------------------

/// Decimal currency text to integer minor units. Tolerates thousands
/// separators and a currency sign; rejects more than two decimal places.
pub fn parse_minor(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '£' | '$' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let (negative, body) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };

    let (whole, fraction) = match body.split_once('.') {
        Some((w, f)) => (w, f),
        None => (body, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let fraction_minor: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };

    let minor = whole.checked_mul(100)?.checked_add(fraction_minor)?;
    Some(if negative { -minor } else { minor })
}

/// Month from a numeric index, a month name, or a date/datetime value.
/// Blank cells are an unknown month; anything else unparseable is an error
/// carrying the raw value.
pub fn parse_month(raw: &str) -> Result<Option<Month>, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if let Ok(index) = value.parse::<u32>() {
        return Month::from_index(index).map(Some).ok_or_else(|| value.to_string());
    }
    if let Some(month) = Month::from_name(value) {
        return Ok(Some(month));
    }
    for format in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Ok(Month::from_index(date.month()));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Month::from_index(dt.month()));
        }
    }
    Err(value.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Division;

    fn spend_table(rows: Vec<Vec<&str>>) -> Table {
        Table::new(
            "billed",
            [
                "PO", "CampaignName", "MediaName", "ProductName", "ClientCode", "BuyMonth",
                "Payable", "AgencyCommission", "LevyBillable", "UnbilledClientCost", "InvoiceNo",
                "Division",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            rows.into_iter()
                .map(|r| r.into_iter().map(String::from).collect())
                .collect(),
        )
    }

    #[test]
    fn parse_minor_amounts() {
        assert_eq!(parse_minor("1234.56"), Some(123456));
        assert_eq!(parse_minor("1,234.5"), Some(123450));
        assert_eq!(parse_minor("-£12"), Some(-1200));
        assert_eq!(parse_minor("0"), Some(0));
        assert_eq!(parse_minor(".5"), Some(50));
        assert_eq!(parse_minor("12.345"), None);
        assert_eq!(parse_minor("abc"), None);
        assert_eq!(parse_minor(""), None);
    }

    #[test]
    fn parse_month_variants() {
        assert_eq!(parse_month("1").unwrap(), Some(Month::January));
        assert_eq!(parse_month("September").unwrap(), Some(Month::September));
        assert_eq!(parse_month("2024-03-15").unwrap(), Some(Month::March));
        assert_eq!(parse_month("2024-11-01T00:00:00").unwrap(), Some(Month::November));
        assert_eq!(parse_month("").unwrap(), None);
        assert!(parse_month("13").is_err());
        assert!(parse_month("soon").is_err());
    }

    #[test]
    fn spend_records_read_and_skip_blanks() {
        let table = spend_table(vec![
            vec![
                "PO-100", "CHANEL_UK_BLEUH1_SOCIAL_2024", "SEARCH&SOC", "BLEU", "C50",
                "2024-01-05", "100.00", "10.00", "1.00", "111.00", "INV-1", "F&B",
            ],
            vec!["", "", "", "", "", "", "", "", "", "", "", ""],
        ]);
        let config = RuleConfig::default();
        let records = spend_records(&table, &config).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.po_number, "PO-100");
        assert_eq!(r.measures.net_billable, 10000);
        assert_eq!(r.month, Some(Month::January));
        assert_eq!(r.invoice_no.as_deref(), Some("INV-1"));
        assert_eq!(r.source_division.as_deref(), Some("F&B"));
    }

    #[test]
    fn spend_records_missing_column_is_fatal() {
        let table = Table::new(
            "unbilled",
            vec!["PO".into(), "Payable".into()],
            vec![vec!["PO-1".into(), "1.00".into()]],
        );
        let err = spend_records(&table, &RuleConfig::default()).unwrap_err();
        match err {
            SpendError::MissingColumn { table, column } => {
                assert_eq!(table, "unbilled");
                assert_eq!(column, "CampaignName");
            }
            other => panic!("expected MissingColumn, got {other}"),
        }
    }

    #[test]
    fn spend_records_bad_amount_names_row() {
        let table = spend_table(vec![vec![
            "PO-1", "X", "PRESS", "BLEU", "C50", "1", "not-money", "0", "0", "0", "", "F&B",
        ]]);
        let err = spend_records(&table, &RuleConfig::default()).unwrap_err();
        assert!(err.to_string().contains("not-money"));
    }

    #[test]
    fn budget_records_drop_tracker_junk() {
        let table = Table::new(
            "budget",
            vec![
                "Campaign".into(),
                "Market".into(),
                "Planned Spend latest plan".into(),
                "Reserve".into(),
                "GRAND TOTAL inc reserve".into(),
            ],
            vec![
                vec!["Bleu".into(), "UK".into(), "100.00".into(), "10.00".into(), "110.00".into()],
                vec!["Campaign (UK)".into(), "".into(), "".into(), "".into(), "".into()],
                vec!["".into(), "".into(), "".into(), "".into(), "".into()],
            ],
        );
        let config = RuleConfig::default();
        let normalizer = KeyNormalizer::new(&config).unwrap();
        let records = budget_records(&table, &config, &normalizer).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].campaign_key, "Bleu");
        assert_eq!(records[0].market, Market::Uk);
        assert_eq!(records[0].total_budget, Some(11000));
        assert_eq!(
            classify_division(&config.division_rules, "Campaign (UK)"),
            Division::Other
        );
    }

    #[test]
    fn empty_table_is_fatal() {
        let table = Table::new("billed", vec!["PO".into()], vec![]);
        let err = spend_records(&table, &RuleConfig::default()).unwrap_err();
        assert!(matches!(err, SpendError::EmptyTable { .. }));
    }
}
