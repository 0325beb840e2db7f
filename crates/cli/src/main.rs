// spendgrid CLI - headless batch reconciliation runs

mod exit_codes;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_INVALID_CONFIG, EXIT_RUNTIME, EXIT_SCHEMA, EXIT_SUCCESS, EXIT_USAGE};
use spendgrid_recon::{RuleConfig, RunInput, SpendError};

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    fn new(code: u8, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), hint: None }
    }

    fn with_hint(code: u8, message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self { code, message: message.into(), hint: Some(hint.into()) }
    }
}

#[derive(Parser)]
#[command(name = "spendgrid")]
#[command(about = "Media-spend reconciliation and report synthesis")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile one snapshot of spend extracts and render the report
    #[command(after_help = "\
Examples:
  spendgrid run --billed billed.csv --unbilled unbilled.csv \\
      --budget budget_tracker.csv --out report.xlsx
  spendgrid run --billed billed.csv --unbilled unbilled.csv \\
      --budget budget_tracker.csv --out report.xlsx \\
      --ledger ledger.csv --forecast 5000000.00 --json")]
    Run {
        /// Billed spend extract (CSV)
        #[arg(long)]
        billed: PathBuf,

        /// Unbilled spend extract (CSV)
        #[arg(long)]
        unbilled: PathBuf,

        /// Budget tracker extract (CSV)
        #[arg(long)]
        budget: PathBuf,

        /// Rule config TOML; the built-in tables apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Annual budget forecast figure, e.g. 5000000.00
        #[arg(long)]
        forecast: Option<String>,

        /// Output workbook path (.xlsx)
        #[arg(long)]
        out: PathBuf,

        /// Also write the flat ledger CSV for the downstream store
        #[arg(long)]
        ledger: Option<PathBuf>,

        /// Print the run result as JSON instead of a human summary
        #[arg(long)]
        json: bool,

        /// Write the JSON run result to a file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a rule config without running
    #[command(after_help = "\
Examples:
  spendgrid validate rules.toml")]
    Validate {
        /// Path to the rule config TOML file
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            billed,
            unbilled,
            budget,
            config,
            forecast,
            out,
            ledger,
            json,
            output,
        } => cmd_run(RunArgs {
            billed,
            unbilled,
            budget,
            config,
            forecast,
            out,
            ledger,
            json,
            output,
        }),
        Commands::Validate { config } => cmd_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(err.code)
        }
    }
}

struct RunArgs {
    billed: PathBuf,
    unbilled: PathBuf,
    budget: PathBuf,
    config: Option<PathBuf>,
    forecast: Option<String>,
    out: PathBuf,
    ledger: Option<PathBuf>,
    json: bool,
    output: Option<PathBuf>,
}

fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;

    let forecast = match &args.forecast {
        Some(raw) => Some(spendgrid_recon::ingest::parse_minor(raw).ok_or_else(|| {
            CliError::with_hint(
                EXIT_USAGE,
                format!("cannot parse forecast '{raw}'"),
                "expected a decimal amount like 5000000.00",
            )
        })?),
        None => None,
    };

    let input = RunInput {
        billed: read_extract(&args.billed, "billed")?,
        unbilled: read_extract(&args.unbilled, "unbilled")?,
        budget: read_extract(&args.budget, "budget_tracker")?,
        annual_forecast: forecast,
    };

    let result = spendgrid_recon::run(&config, &input).map_err(map_engine_error)?;
    let book = spendgrid_report::synthesize(&result);
    let stats = spendgrid_io::write_report(&book, &args.out)
        .map_err(|e| CliError::new(EXIT_RUNTIME, e))?;

    if let Some(ledger_path) = &args.ledger {
        spendgrid_io::write_ledger_csv(&result.ledger, ledger_path)
            .map_err(|e| CliError::new(EXIT_RUNTIME, e))?;
    }

    if let Some(output) = &args.output {
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::new(EXIT_RUNTIME, e.to_string()))?;
        std::fs::write(output, json)
            .map_err(|e| CliError::new(EXIT_RUNTIME, e.to_string()))?;
    }

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::new(EXIT_RUNTIME, e.to_string()))?;
        println!("{json}");
    } else {
        let s = &result.summary;
        println!(
            "{}: {} spend rows -> {} detail rows, {} totals",
            result.meta.config_name, s.spend_rows, s.detail_rows, s.total_rows
        );
        println!(
            "budget: {} matched, {} unmatched ({} tracker rows)",
            s.budget_matched, s.budget_unmatched, s.budget_rows
        );
        if s.classification_gaps > 0 {
            println!("classification gaps: {} rows in Other", s.classification_gaps);
        }
        println!(
            "report: {} sheets, {} merges -> {}",
            stats.sheets_written,
            stats.merges_written,
            args.out.display()
        );
    }

    Ok(())
}

fn cmd_validate(path: &Path) -> Result<(), CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::new(EXIT_RUNTIME, format!("cannot read config: {e}")))?;
    let config = RuleConfig::from_toml(&text).map_err(map_engine_error)?;
    println!(
        "{}: {} division rules, {} channel rules, {} canonical names",
        config.name,
        config.division_rules.len(),
        config.channel_rules.len(),
        config.canonical_names.len()
    );
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<RuleConfig, CliError> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| CliError::new(EXIT_RUNTIME, format!("cannot read config: {e}")))?;
            RuleConfig::from_toml(&text).map_err(map_engine_error)
        }
        None => Ok(RuleConfig::default()),
    }
}

fn read_extract(path: &Path, name: &str) -> Result<spendgrid_recon::Table, CliError> {
    spendgrid_io::read_table(path, name).map_err(|e| CliError::new(EXIT_RUNTIME, e))
}

/// Engine errors split into config problems and schema violations; the
/// distinction is part of the shell contract.
fn map_engine_error(err: SpendError) -> CliError {
    let code = match &err {
        SpendError::ConfigParse(_) | SpendError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        SpendError::MissingColumn { .. }
        | SpendError::EmptyTable { .. }
        | SpendError::AmountParse { .. }
        | SpendError::MonthParse { .. } => EXIT_SCHEMA,
    };
    CliError::new(code, err.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
