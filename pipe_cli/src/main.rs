//! # Pipecheck CLI Application
//!
//! Runs JSON calculation items through `pipe_core` and prints the results
//! as JSON.
//!
//! ```text
//! pipe_cli run items.json [--compact | --report]
//! pipe_cli example > items.json
//! ```
//!
//! The input file holds one calculation item or an array of them. Log
//! output goes to stderr and is controlled with `RUST_LOG`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use pipe_core::calculations::containment::ContainmentInput;
use pipe_core::calculations::{CalculationItem, CalculationOutput};
use pipe_core::factors::{FactorSpec, SafetyClass};
use pipe_core::{CalcError, CalcResult, PipeMaterial, Quantity};

#[derive(Parser)]
#[command(
    name = "pipe_cli",
    about = "Subsea pipeline DNV-ST-F101 code checks from JSON calculation items",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every calculation item in a JSON file
    Run {
        /// Path to a JSON file with one item or an array of items
        file: PathBuf,

        /// Print compact JSON instead of pretty-printed
        #[arg(long, conflicts_with = "report")]
        compact: bool,

        /// Print a text report with code clause references instead of JSON
        #[arg(long)]
        report: bool,
    },

    /// Print the reference containment item as JSON
    Example,
}

/// Outcome of one item, as printed
#[derive(Serialize)]
struct ItemReport {
    label: String,
    calc_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    passes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<CalculationOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorReport>,
}

#[derive(Serialize)]
struct ErrorReport {
    code: &'static str,
    message: String,
    details: CalcError,
}

impl From<CalcError> for ErrorReport {
    fn from(err: CalcError) -> Self {
        Self {
            code: err.error_code(),
            message: err.to_string(),
            details: err,
        }
    }
}

fn status_icon(passes: Option<bool>) -> &'static str {
    match passes {
        Some(true) => "PASS",
        Some(false) => "FAIL",
        None => "-",
    }
}

fn load_items(path: &Path) -> CalcResult<Vec<CalculationItem>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CalcError::file_error("read", path.display().to_string(), e.to_string()))?;
    let value: Value = serde_json::from_str(&text)?;
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(CalcError::from))
            .collect(),
        other => Ok(vec![serde_json::from_value(other)?]),
    }
}

fn run_item(item: &CalculationItem) -> ItemReport {
    let mut report = ItemReport {
        label: item.label().to_string(),
        calc_type: item.calc_type().to_string(),
        passes: None,
        result: None,
        error: None,
    };
    match item.calculate() {
        Ok(output) => {
            report.passes = Some(output.passes());
            report.result = Some(output);
        }
        Err(err) => {
            log::error!("{} '{}' failed: {}", report.calc_type, report.label, err);
            report.error = Some(err.into());
        }
    }
    log::info!("{} '{}': {}", report.calc_type, report.label, status_icon(report.passes));
    report
}

/// Containment check at a riser base: 24" X65 pipe, 240 bar design pressure
fn example_item() -> CalculationItem {
    CalculationItem::Containment(ContainmentInput {
        label: "Riser base".to_string(),
        t_fab: Quantity::from(0.001),
        t_corr: Quantity::from(0.0005),
        h_ref: Quantity::from(30.0),
        rho_cont: Quantity::from(275.0),
        rho_t: Quantity::from(1027.0),
        rho_seawater: Quantity::from(1027.0),
        g: 9.81,
        alpha_u: FactorSpec::Value(1.0),
        alpha_mpt: Some(FactorSpec::Category(SafetyClass::Medium)),
        ..ContainmentInput::new(
            0.6176,
            0.0212,
            PipeMaterial {
                smts: Some(Quantity::from(535.0e6)),
                temperature: Some(Quantity::from(60.0)),
                family: Some("CMn".to_string()),
                ..PipeMaterial::new(450.0e6)
            },
            240.0e5,
            -340.0,
        )
    })
}

fn format_text_report(report: &ItemReport) -> String {
    let heading = format!("[{}] {} '{}'", status_icon(report.passes), report.calc_type, report.label);
    match (&report.result, &report.error) {
        (Some(output), _) => format!("{}\n{}\n", heading, output.format_report()),
        (None, Some(error)) => format!("{}\n{}: {}\n", heading, error.code, error.message),
        (None, None) => format!("{}\n", heading),
    }
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> CalcResult<()> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", json);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Run { file, compact, report } => load_items(&file).and_then(|items| {
            log::info!("running {} item(s) from {}", items.len(), file.display());
            let reports: Vec<ItemReport> = items.iter().map(run_item).collect();
            if report {
                for item in &reports {
                    println!("{}", format_text_report(item));
                }
            } else {
                print_json(&reports, compact)?;
            }
            Ok(reports.iter().all(|r| r.error.is_none()))
        }),
        Commands::Example => print_json(&example_item(), false).map(|_| true),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {}", err);
            if let Ok(json) = serde_json::to_string_pretty(&ErrorReport::from(err)) {
                eprintln!("{}", json);
            }
            ExitCode::from(2)
        }
    }
}
