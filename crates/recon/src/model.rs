use serde::{Deserialize, Serialize};

use crate::error::SpendError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// An already-parsed grid of named columns. This is the engine's only input
/// shape; file formats are the IO layer's problem.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { name: name.into(), columns, rows }
    }

    /// Index of a required column, or the fatal schema error naming table
    /// and column.
    pub fn column_index(&self, column: &str) -> Result<usize, SpendError> {
        self.columns.iter().position(|c| c == column).ok_or_else(|| {
            SpendError::MissingColumn {
                table: self.name.clone(),
                column: column.into(),
            }
        })
    }

    /// Index of an optional column (absent columns read as empty cells).
    pub fn optional_column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn cell<'a>(&'a self, row: &'a [String], idx: usize) -> &'a str {
        row.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// One transaction-level row from a spend extract, as read. Immutable once
/// ingested.
#[derive(Debug, Clone)]
pub struct RawSpendRecord {
    pub po_number: String,
    pub campaign_raw: String,
    pub media_code: String,
    pub product_raw: String,
    pub product_code: Option<String>,
    pub client_code: String,
    /// Division tag carried by the upstream workbook tab, when present
    /// (e.g. "Paid Search"). Only the override pass looks at it.
    pub source_division: Option<String>,
    pub month: Option<Month>,
    pub measures: Measures,
    pub invoice_no: Option<String>,
}

/// RawSpendRecord after classification + key normalization. 1:1 with the
/// raw record; nothing is merged at this stage.
#[derive(Debug, Clone)]
pub struct NormalizedRecord {
    pub po_number: String,
    pub campaign_key: String,
    pub campaign_display: String,
    pub year: Option<String>,
    pub division: Division,
    pub channel: Channel,
    pub market: Market,
    pub month: Option<Month>,
    pub product: String,
    pub product_code: Option<String>,
    pub measures: Measures,
    pub invoice_no: Option<String>,
}

/// One row from the budget tracker extract. Loaded once per run, read-only
/// during reconciliation.
#[derive(Debug, Clone)]
pub struct BudgetRecord {
    pub campaign_key: String,
    pub campaign_raw: String,
    pub market: Market,
    pub planned_spend: Option<i64>,
    pub reserved_budget: Option<i64>,
    pub total_budget: Option<i64>,
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Division {
    #[serde(rename = "F&B")]
    FAndB,
    #[serde(rename = "FSH&EW")]
    FashionEyewear,
    #[serde(rename = "W&FJ")]
    WatchesFineJewellery,
    #[serde(rename = "Travel Retail")]
    TravelRetail,
    #[serde(rename = "PPC")]
    Ppc,
    /// Transient tag from paid-search extract tabs; the override pass maps
    /// it to F&B before anything reaches the output.
    #[serde(rename = "Paid Search")]
    PaidSearch,
    Other,
}

impl Division {
    pub fn label(&self) -> &'static str {
        match self {
            Self::FAndB => "F&B",
            Self::FashionEyewear => "FSH&EW",
            Self::WatchesFineJewellery => "W&FJ",
            Self::TravelRetail => "Travel Retail",
            Self::Ppc => "PPC",
            Self::PaidSearch => "Paid Search",
            Self::Other => "Other",
        }
    }

    /// Parse an upstream division tag ("F&B", "W&FJ", "Paid Search", ...).
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim() {
            "F&B" => Some(Self::FAndB),
            "FSH&EW" => Some(Self::FashionEyewear),
            "W&FJ" | "Watches & Fine Jewellery" => Some(Self::WatchesFineJewellery),
            "Travel Retail" => Some(Self::TravelRetail),
            "PPC" => Some(Self::Ppc),
            "Paid Search" => Some(Self::PaidSearch),
            "Other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for Division {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    Social,
    Search,
    Display,
    Video,
    Print,
    Cinema,
    Tv,
    RetainerFee,
    Ooh,
    /// Unmapped media codes pass through as their own channel name.
    Other(String),
}

impl Channel {
    pub fn label(&self) -> &str {
        match self {
            Self::Social => "Social",
            Self::Search => "Search",
            Self::Display => "Display",
            Self::Video => "Video",
            Self::Print => "Print",
            Self::Cinema => "Cinema",
            Self::Tv => "TV",
            Self::RetainerFee => "Retainer Fee",
            Self::Ooh => "OOH",
            Self::Other(name) => name,
        }
    }

    /// Canonical name -> variant; anything unrecognized is a passthrough
    /// channel of its own.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Social" => Self::Social,
            "Search" => Self::Search,
            "Display" => Self::Display,
            "Video" => Self::Video,
            "Print" => Self::Print,
            "Cinema" => Self::Cinema,
            "TV" => Self::Tv,
            "Retainer Fee" => Self::RetainerFee,
            "OOH" => Self::Ooh,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Channel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Market {
    #[serde(rename = "UK")]
    Uk,
    #[serde(rename = "IRE")]
    Ire,
    Unknown,
}

impl Market {
    /// Report label; unknown markets render as an empty cell.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Uk => "UK",
            Self::Ire => "IRE",
            Self::Unknown => "",
        }
    }

    pub fn parse_label(label: &str) -> Self {
        match label.trim() {
            "UK" => Self::Uk,
            "IRE" | "ROI" => Self::Ire,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

pub const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

impl Month {
    pub fn from_index(index: u32) -> Option<Self> {
        MONTHS.get(index.checked_sub(1)? as usize).copied()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        MONTHS.iter().copied().find(|m| m.label().eq_ignore_ascii_case(name.trim()))
    }

    pub fn index(&self) -> u32 {
        MONTHS.iter().position(|m| m == self).unwrap_or(0) as u32 + 1
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::January => "January",
            Self::February => "February",
            Self::March => "March",
            Self::April => "April",
            Self::May => "May",
            Self::June => "June",
            Self::July => "July",
            Self::August => "August",
            Self::September => "September",
            Self::October => "October",
            Self::November => "November",
            Self::December => "December",
        }
    }
}

impl std::fmt::Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Measures
// ---------------------------------------------------------------------------

/// Summed currency measures in integer minor units (pence), so group-sum
/// invariants hold exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Measures {
    pub net_billable: i64,
    pub agency_commission: i64,
    pub levy: i64,
    pub invoiced_value: i64,
}

impl Measures {
    pub fn accumulate(&mut self, other: &Measures) {
        self.net_billable += other.net_billable;
        self.agency_commission += other.agency_commission;
        self.levy += other.levy;
        self.invoiced_value += other.invoiced_value;
    }
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Budget figures joined onto a total row, plus the measures derived from
/// them. `Some` means the join was attempted (total rows only); the inner
/// fields stay `None` when the budget source had no match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BudgetFields {
    pub planned_spend: Option<i64>,
    pub reserved_budget: Option<i64>,
    pub total_budget: Option<i64>,
    pub total_po_value: Option<i64>,
    pub po_value_remaining: Option<i64>,
}

/// The unit of output: one detail or synthesized-total row at some grouping
/// granularity.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateRow {
    pub po_number: Option<String>,
    pub campaign: Option<String>,
    pub campaign_key: Option<String>,
    pub channel: Option<Channel>,
    pub division: Division,
    pub market: Option<Market>,
    pub month: Option<Month>,
    pub product_code: Option<String>,
    pub invoice_no: Option<String>,
    pub measures: Measures,
    pub is_total: bool,
    pub budget: Option<BudgetFields>,
}

impl AggregateRow {
    /// Rendered channel cell: synthesized totals read "Total".
    pub fn channel_label(&self) -> &str {
        if self.is_total {
            "Total"
        } else {
            self.channel.as_ref().map(Channel::label).unwrap_or("")
        }
    }

    /// Rendered month cell: totals without a month read "Total", unknown
    /// months read "Unknown".
    pub fn month_label(&self) -> &str {
        match (&self.month, self.is_total) {
            (Some(m), _) => m.label(),
            (None, true) => "Total",
            (None, false) => "Unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Run input / output
// ---------------------------------------------------------------------------

/// The fixed snapshot of inputs for one batch run.
#[derive(Debug, Clone)]
pub struct RunInput {
    pub billed: Table,
    pub unbilled: Table,
    pub budget: Table,
    /// Annual-forecast scalar (one named cell upstream), minor units.
    pub annual_forecast: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub spend_rows: usize,
    pub budget_rows: usize,
    pub detail_rows: usize,
    pub total_rows: usize,
    pub budget_matched: usize,
    pub budget_unmatched: usize,
    pub classification_gaps: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub meta: RunMeta,
    pub summary: RunSummary,
    /// Flat record stream for the downstream query store: transaction-level
    /// detail plus per-PO totals carrying the joined budget figures.
    pub ledger: Vec<AggregateRow>,
    /// Per-channel aggregates plus per-PO totals, report-ordered. Source of
    /// the per-division sheets.
    pub channel_rows: Vec<AggregateRow>,
    /// Detail rows plus per-PO monthly totals, report-ordered. Source of
    /// the monthly breakdown sheets.
    pub monthly_rows: Vec<AggregateRow>,
    pub annual_forecast: Option<i64>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
