// gridcalc CLI - headless spreadsheet cell evaluation

mod exit_codes;
mod settings;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use gridcalc_engine::cell_ref::{CellRef, Limits};
use gridcalc_engine::recalc::RecalcReport;
use gridcalc_store::persistent::{PersistentSheet, SheetError};

use exit_codes::{sheet_exit_code, EXIT_SUCCESS};
use settings::Settings;

#[derive(Parser)]
#[command(name = "gcalc")]
#[command(about = "Headless spreadsheet formula evaluation over durable .sheet files")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to ~/.config/gridcalc/settings.toml)
    #[arg(long, env = "GCALC_SETTINGS", global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Commit a formula to a cell and recalculate its dependents
    #[command(after_help = "\
Examples:
  gcalc eval book.sheet a1 42
  gcalc eval book.sheet a2 '=a1*2'
  gcalc eval book.sheet b1 '=sum(a1:a9)'")]
    Eval {
        /// Sheet file (created if absent)
        file: PathBuf,

        /// Target cell, e.g. a1 or c12
        cell: String,

        /// Formula text; the leading = is optional
        formula: String,
    },

    /// Print a cell's current value
    Get {
        /// Sheet file
        file: PathBuf,

        /// Cell to read
        cell: String,

        /// Print the committed formula text instead of the value
        #[arg(long)]
        expr: bool,
    },

    /// Clear a cell's formula; cells that reference it read 0
    Remove {
        /// Sheet file
        file: PathBuf,

        /// Cell to clear
        cell: String,
    },

    /// Remove every cell in the sheet
    Clear {
        /// Sheet file
        file: PathBuf,
    },

    /// List committed formulas as tab-separated lines, row-major
    List {
        /// Sheet file
        file: PathBuf,
    },

    /// Evaluate a formula against the sheet without committing it
    #[command(after_help = "\
Examples:
  gcalc calc book.sheet '=a1+b2'
  gcalc calc book.sheet '=average(a1:a9)'")]
    Calc {
        /// Sheet file
        file: PathBuf,

        /// Formula to evaluate
        formula: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let limits = Settings::load(cli.settings.as_deref()).limits();

    let result = match cli.command {
        Commands::Eval { file, cell, formula } => cmd_eval(&file, &cell, &formula, limits),
        Commands::Get { file, cell, expr } => cmd_get(&file, &cell, expr, limits),
        Commands::Remove { file, cell } => cmd_remove(&file, &cell, limits),
        Commands::Clear { file } => cmd_clear(&file, limits),
        Commands::List { file } => cmd_list(&file, limits),
        Commands::Calc { file, formula } => cmd_calc(&file, &formula, limits),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
struct CliError {
    code: u8,
    message: String,
    hint: Option<String>,
}

impl From<SheetError> for CliError {
    fn from(err: SheetError) -> Self {
        let code = sheet_exit_code(&err);
        let hint = match &err {
            SheetError::Eval(_) => None,
            SheetError::Store(_) => Some("is the sheet file writable?".to_string()),
            SheetError::Replay { .. } => Some(
                "the file may have been edited outside gcalc; fix or remove the named cell"
                    .to_string(),
            ),
        };
        Self {
            code,
            message: err.to_string(),
            hint,
        }
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

fn open_sheet(file: &Path, limits: Limits) -> Result<PersistentSheet, CliError> {
    Ok(PersistentSheet::open_with_limits(file, limits)?)
}

/// Format a value without a trailing `.0` when integral.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn json_number(value: f64) -> serde_json::Value {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        serde_json::Value::from(value as i64)
    } else {
        serde_json::Value::from(value)
    }
}

/// Print the recomputed cells as one JSON object with keys in
/// row-major order, then any dependents that failed to recompute as
/// warnings on stderr.
fn print_report(report: &RecalcReport) {
    let updates: BTreeMap<CellRef, serde_json::Value> = report
        .updates
        .iter()
        .map(|(cell, value)| (*cell, json_number(*value)))
        .collect();
    if let Ok(json) = serde_json::to_string(&updates) {
        println!("{}", json);
    }
    for failure in &report.failed {
        eprintln!(
            "warning: {} failed to recompute: {}",
            failure.cell, failure.error
        );
    }
}

// ============================================================================
// eval
// ============================================================================

fn cmd_eval(file: &Path, cell: &str, formula: &str, limits: Limits) -> Result<(), CliError> {
    let mut sheet = open_sheet(file, limits)?;
    let report = sheet.eval(cell, formula)?;
    print_report(&report);
    sheet.close()?;
    Ok(())
}

// ============================================================================
// get
// ============================================================================

fn cmd_get(file: &Path, cell: &str, expr: bool, limits: Limits) -> Result<(), CliError> {
    let sheet = open_sheet(file, limits)?;
    let cell_ref = sheet.sheet().cell_ref(cell).map_err(SheetError::Eval)?;
    if expr {
        println!("{}", sheet.sheet().expr_at(cell_ref));
    } else {
        println!("{}", format_value(sheet.sheet().value(cell_ref)));
    }
    sheet.close()?;
    Ok(())
}

// ============================================================================
// remove / clear
// ============================================================================

fn cmd_remove(file: &Path, cell: &str, limits: Limits) -> Result<(), CliError> {
    let mut sheet = open_sheet(file, limits)?;
    sheet.remove(cell)?;
    sheet.close()?;
    Ok(())
}

fn cmd_clear(file: &Path, limits: Limits) -> Result<(), CliError> {
    let mut sheet = open_sheet(file, limits)?;
    sheet.clear()?;
    sheet.close()?;
    Ok(())
}

// ============================================================================
// list
// ============================================================================

fn cmd_list(file: &Path, limits: Limits) -> Result<(), CliError> {
    let sheet = open_sheet(file, limits)?;
    for (cell, expr) in sheet.sheet().all_exprs() {
        println!("{}\t{}", cell, expr);
    }
    sheet.close()?;
    Ok(())
}

// ============================================================================
// calc
// ============================================================================

fn cmd_calc(file: &Path, formula: &str, limits: Limits) -> Result<(), CliError> {
    let sheet = open_sheet(file, limits)?;
    let value = sheet.preview(formula)?;
    println!("{}", format_value(value));
    sheet.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(42.0), "42");
        assert_eq!(format_value(-3.0), "-3");
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(2.5), "2.5");
        assert_eq!(format_value(-0.25), "-0.25");
    }

    #[test]
    fn test_json_number_drops_trailing_zero() {
        assert_eq!(serde_json::to_string(&json_number(10.0)).unwrap(), "10");
        assert_eq!(serde_json::to_string(&json_number(0.5)).unwrap(), "0.5");
    }
}
