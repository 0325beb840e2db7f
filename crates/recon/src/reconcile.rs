use tracing::debug;

use crate::model::{AggregateRow, BudgetFields, BudgetRecord, Market};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub matched: usize,
    pub unmatched: usize,
}

/// Left-outer join of aggregate rows against the budget tracker on the
/// normalized campaign key, plus market where both sides carry one.
///
/// Budget comparison is meaningful only at the total level, so the join is
/// attempted on total rows exclusively and budget fields are cleared on
/// every detail row, enforced here rather than left to join semantics.
/// Unmatched total rows keep `Some` budget fields with `None` figures.
/// Key collisions (normalization is lossy) resolve to the first budget row
/// in source order.
pub fn reconcile(rows: &mut [AggregateRow], budget: &[BudgetRecord]) -> JoinStats {
    let mut stats = JoinStats::default();

    for row in rows.iter_mut() {
        if !row.is_total {
            row.budget = None;
            continue;
        }

        let found = budget.iter().find(|b| {
            let key_match = row.campaign_key.as_deref() == Some(b.campaign_key.as_str());
            key_match && markets_compatible(row.market, b.market)
        });

        match found {
            Some(b) => {
                stats.matched += 1;
                let mut fields = BudgetFields {
                    planned_spend: b.planned_spend,
                    reserved_budget: b.reserved_budget,
                    total_budget: b.total_budget,
                    total_po_value: None,
                    po_value_remaining: None,
                };
                if let Some(total_budget) = b.total_budget {
                    let total_po_value =
                        row.measures.agency_commission + row.measures.levy + total_budget;
                    fields.total_po_value = Some(total_po_value);
                    fields.po_value_remaining =
                        Some(total_po_value - row.measures.invoiced_value);
                }
                row.budget = Some(fields);
            }
            None => {
                stats.unmatched += 1;
                debug!(
                    campaign = row.campaign_key.as_deref().unwrap_or(""),
                    "no budget row for total; leaving budget fields empty"
                );
                row.budget = Some(BudgetFields::default());
            }
        }
    }

    stats
}

/// Market restricts the join only when both sides know theirs.
fn markets_compatible(row: Option<Market>, budget: Market) -> bool {
    match (row, budget) {
        (Some(Market::Unknown), _) | (None, _) | (_, Market::Unknown) => true,
        (Some(m), b) => m == b,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
