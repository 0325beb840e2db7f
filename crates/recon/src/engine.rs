use std::collections::BTreeSet;

use tracing::debug;

use crate::aggregate::{aggregate, synthesize_totals, verify_totals, Dimension};
use crate::classify::{
    apply_division_override, classify_channel, classify_market, classify_product,
    division_for_record,
};
use crate::config::RuleConfig;
use crate::error::SpendError;
use crate::ingest;
use crate::model::{
    AggregateRow, Channel, Division, NormalizedRecord, RawSpendRecord, RunInput, RunMeta,
    RunResult, RunSummary,
};
use crate::normalize::KeyNormalizer;
use crate::reconcile::reconcile;

const DETAIL_DIMS: [Dimension; 6] = [
    Dimension::PoNumber,
    Dimension::Campaign,
    Dimension::Channel,
    Dimension::Division,
    Dimension::Market,
    Dimension::Month,
];

const OVERALL_DIMS: [Dimension; 3] =
    [Dimension::PoNumber, Dimension::Market, Dimension::Division];

const MONTHLY_TOTAL_DIMS: [Dimension; 4] = [
    Dimension::PoNumber,
    Dimension::Month,
    Dimension::Market,
    Dimension::Division,
];

const CHANNEL_DIMS: [Dimension; 4] = [
    Dimension::Campaign,
    Dimension::Channel,
    Dimension::Market,
    Dimension::Division,
];

/// Run the full batch pipeline over one input snapshot. Pure computation:
/// fetch-everything happened before this call, emit-once happens after.
pub fn run(config: &RuleConfig, input: &RunInput) -> Result<RunResult, SpendError> {
    config.validate()?;
    let normalizer = KeyNormalizer::new(config)?;

    let mut raw = ingest::spend_records(&input.billed, config)?;
    raw.extend(ingest::spend_records(&input.unbilled, config)?);
    let records: Vec<NormalizedRecord> = raw
        .iter()
        .map(|record| normalize_record(config, &normalizer, record))
        .collect();
    let budget = ingest::budget_records(&input.budget, config, &normalizer)?;

    let classification_gaps = records.iter().filter(|r| r.division == Division::Other).count();
    if classification_gaps > 0 {
        debug!(count = classification_gaps, "records fell through to the Other division");
    }

    // Three grouping levels, all summed from the source records.
    let detail = aggregate(&records, &DETAIL_DIMS);
    let channel_detail = aggregate(&records, &CHANNEL_DIMS);
    let mut overall_totals = synthesize_totals(&records, &OVERALL_DIMS);
    let monthly_totals = synthesize_totals(&records, &MONTHLY_TOTAL_DIMS);

    debug_assert!(
        verify_totals(&records, &overall_totals, &OVERALL_DIMS).is_empty(),
        "overall totals drifted from their detail rows"
    );
    debug_assert!(
        verify_totals(&records, &monthly_totals, &MONTHLY_TOTAL_DIMS).is_empty(),
        "monthly totals drifted from their detail rows"
    );

    let join = reconcile(&mut overall_totals, &budget);

    let fee_pos = fee_po_numbers(&records);

    let mut ledger = Vec::with_capacity(detail.len() + overall_totals.len());
    ledger.extend(detail.iter().cloned());
    ledger.extend(overall_totals.iter().cloned());
    sort_report_order(&mut ledger, &fee_pos);

    let mut channel_rows =
        Vec::with_capacity(channel_detail.len() + overall_totals.len());
    channel_rows.extend(channel_detail);
    channel_rows.extend(overall_totals.iter().cloned());
    sort_report_order(&mut channel_rows, &fee_pos);

    let total_rows = overall_totals.len() + monthly_totals.len();
    let mut monthly_rows = Vec::with_capacity(detail.len() + monthly_totals.len());
    monthly_rows.extend(detail.iter().cloned());
    monthly_rows.extend(monthly_totals);
    sort_report_order(&mut monthly_rows, &fee_pos);

    Ok(RunResult {
        meta: RunMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary: RunSummary {
            spend_rows: raw.len(),
            budget_rows: budget.len(),
            detail_rows: detail.len(),
            total_rows,
            budget_matched: join.matched,
            budget_unmatched: join.unmatched,
            classification_gaps,
        },
        ledger,
        channel_rows,
        monthly_rows,
        annual_forecast: input.annual_forecast,
    })
}

/// Classifier + normalizer applied to one raw record; 1:1, no merging.
pub fn normalize_record(
    config: &RuleConfig,
    normalizer: &KeyNormalizer,
    record: &RawSpendRecord,
) -> NormalizedRecord {
    let product = classify_product(&config.product_rules, &record.product_raw);
    let campaign = normalizer.normalize_full(&record.campaign_raw);
    let channel = classify_channel(
        config,
        &record.media_code,
        &record.campaign_raw,
        &record.client_code,
    );
    let market = classify_market(config, &record.client_code);
    let base_division = division_for_record(
        config,
        &product,
        &record.campaign_raw,
        record.source_division.as_deref(),
    );
    let division = apply_division_override(config, base_division, &channel, &campaign.display);

    NormalizedRecord {
        po_number: record.po_number.clone(),
        campaign_key: campaign.key,
        campaign_display: campaign.display,
        year: campaign.year,
        division,
        channel,
        market,
        month: record.month,
        product,
        product_code: record.product_code.clone(),
        measures: record.measures,
        invoice_no: record.invoice_no.clone(),
    }
}

/// PO numbers carrying any retainer-fee line; their blocks sink to the
/// bottom of each division in the rendered report.
pub fn fee_po_numbers(records: &[NormalizedRecord]) -> BTreeSet<String> {
    records
        .iter()
        .filter(|r| r.channel == Channel::RetainerFee)
        .map(|r| r.po_number.clone())
        .collect()
}

/// Report ordering: division, fee POs last, PO number, totals after their
/// detail block, then campaign / channel / month.
pub fn sort_report_order(rows: &mut [AggregateRow], fee_pos: &BTreeSet<String>) {
    rows.sort_by_key(|row| {
        let po = row.po_number.clone().unwrap_or_default();
        (
            row.division.label(),
            fee_pos.contains(&po),
            po,
            row.is_total,
            row.campaign.clone().unwrap_or_default(),
            row.channel_label().to_string(),
            row.month.map(|m| m.index()).unwrap_or(99),
        )
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
