use std::collections::BTreeMap;

use crate::model::{AggregateRow, Channel, Division, Market, Measures, Month, NormalizedRecord};

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

/// Grouping dimensions for the aggregation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    PoNumber,
    Campaign,
    Channel,
    Division,
    Market,
    Month,
}

fn dim_key(record: &NormalizedRecord, dim: Dimension) -> String {
    match dim {
        Dimension::PoNumber => record.po_number.clone(),
        Dimension::Campaign => record.campaign_display.clone(),
        Dimension::Channel => record.channel.label().to_string(),
        Dimension::Division => record.division.label().to_string(),
        Dimension::Market => record.market.label().to_string(),
        // Zero-padded so map order is chronological.
        Dimension::Month => match record.month {
            Some(m) => format!("{:02}", m.index()),
            None => "??".into(),
        },
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

struct GroupAcc {
    measures: Measures,
    po_number: String,
    campaign: String,
    campaign_key: String,
    channel: Channel,
    division: Division,
    market: Market,
    month: Option<Month>,
    product_code: Option<String>,
    invoice_no: Option<String>,
}

fn group_records(
    records: &[NormalizedRecord],
    dims: &[Dimension],
) -> BTreeMap<Vec<String>, GroupAcc> {
    let mut groups: BTreeMap<Vec<String>, GroupAcc> = BTreeMap::new();
    for record in records {
        let key: Vec<String> = dims.iter().map(|d| dim_key(record, *d)).collect();
        let entry = groups.entry(key).or_insert_with(|| GroupAcc {
            measures: Measures::default(),
            po_number: record.po_number.clone(),
            campaign: record.campaign_display.clone(),
            campaign_key: record.campaign_key.clone(),
            channel: record.channel.clone(),
            division: record.division,
            market: record.market,
            month: record.month,
            product_code: record.product_code.clone(),
            invoice_no: record.invoice_no.clone(),
        });
        entry.measures.accumulate(&record.measures);
        if entry.product_code.is_none() {
            entry.product_code = record.product_code.clone();
        }
        if entry.invoice_no.is_none() {
            entry.invoice_no = record.invoice_no.clone();
        }
    }
    groups
}

// ---------------------------------------------------------------------------
// Detail aggregation + total synthesis
// ---------------------------------------------------------------------------

/// Sum measures per distinct `dims` combination and emit one detail row per
/// group. Columns outside the grouping keep the first member's value, the
/// upstream convention for representative fields.
pub fn aggregate(records: &[NormalizedRecord], dims: &[Dimension]) -> Vec<AggregateRow> {
    let has = |d| dims.contains(&d);
    let mut rows: Vec<AggregateRow> = group_records(records, dims)
        .into_values()
        .map(|acc| AggregateRow {
            po_number: Some(acc.po_number),
            campaign: Some(acc.campaign),
            campaign_key: Some(acc.campaign_key),
            channel: Some(acc.channel),
            division: acc.division,
            market: Some(acc.market),
            month: if has(Dimension::Month) { acc.month } else { None },
            product_code: acc.product_code,
            invoice_no: acc.invoice_no,
            measures: acc.measures,
            is_total: false,
            budget: None,
        })
        .collect();
    sort_engine_order(&mut rows);
    rows
}

/// Synthesize one total row per distinct `parent_dims` combination, summed
/// from the source records directly (never from other synthesized totals,
/// so totals cannot double-count). Synthesis is unconditional: a parent
/// with a single detail child still gets its total row.
pub fn synthesize_totals(
    records: &[NormalizedRecord],
    parent_dims: &[Dimension],
) -> Vec<AggregateRow> {
    let has = |d| parent_dims.contains(&d);
    let mut rows: Vec<AggregateRow> = group_records(records, parent_dims)
        .into_values()
        .map(|acc| AggregateRow {
            po_number: Some(acc.po_number),
            campaign: Some(acc.campaign),
            campaign_key: Some(acc.campaign_key),
            channel: None,
            division: acc.division,
            market: Some(acc.market),
            month: if has(Dimension::Month) { acc.month } else { None },
            product_code: acc.product_code,
            invoice_no: Some("Total".into()),
            measures: acc.measures,
            is_total: true,
            budget: None,
        })
        .collect();
    sort_engine_order(&mut rows);
    rows
}

/// Engine emission order: (division, campaign, channel, month) ascending
/// with a lexical tie-break on campaign text.
pub fn sort_engine_order(rows: &mut [AggregateRow]) {
    rows.sort_by(|a, b| {
        (a.division.label(), &a.campaign, a.channel_label(), a.month.map(|m| m.index()))
            .cmp(&(b.division.label(), &b.campaign, b.channel_label(), b.month.map(|m| m.index())))
    });
}

/// Check the group-sum invariant: every total row equals the sum of the
/// source records sharing its parent key. Returns the offending parent keys.
pub fn verify_totals(
    records: &[NormalizedRecord],
    totals: &[AggregateRow],
    parent_dims: &[Dimension],
) -> Vec<Vec<String>> {
    let groups = group_records(records, parent_dims);
    let mut bad = Vec::new();
    for total in totals {
        let key: Vec<String> = parent_dims
            .iter()
            .map(|d| match d {
                Dimension::PoNumber => total.po_number.clone().unwrap_or_default(),
                Dimension::Campaign => total.campaign.clone().unwrap_or_default(),
                Dimension::Channel => total.channel_label().to_string(),
                Dimension::Division => total.division.label().to_string(),
                Dimension::Market => total.market.map(|m| m.label().to_string()).unwrap_or_default(),
                Dimension::Month => match total.month {
                    Some(m) => format!("{:02}", m.index()),
                    None => "??".into(),
                },
            })
            .collect();
        match groups.get(&key) {
            Some(acc) if acc.measures == total.measures => {}
            _ => bad.push(key),
        }
    }
    bad
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
