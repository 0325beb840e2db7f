use std::fmt;

#[derive(Debug)]
pub enum SpendError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Rule-table validation error (empty rule list, bad regex, etc.).
    ConfigValidation(String),
    /// Missing required column in an input table.
    MissingColumn { table: String, column: String },
    /// Input table has a header but no data rows.
    EmptyTable { table: String },
    /// Currency amount could not be parsed to minor units.
    AmountParse { table: String, row: usize, value: String },
    /// Month could not be derived from a numeric, named, or date value.
    MonthParse { table: String, row: usize, value: String },
}

impl fmt::Display for SpendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { table, column } => {
                write!(f, "table '{table}': missing column '{column}'")
            }
            Self::EmptyTable { table } => write!(f, "table '{table}': no data rows"),
            Self::AmountParse { table, row, value } => {
                write!(f, "table '{table}', row {row}: cannot parse amount '{value}'")
            }
            Self::MonthParse { table, row, value } => {
                write!(f, "table '{table}', row {row}: cannot parse month '{value}'")
            }
        }
    }
}

impl std::error::Error for SpendError {}
