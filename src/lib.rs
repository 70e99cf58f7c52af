pub mod analyzer;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod model;
pub mod state;

use chrono::Utc;

use cli::{Args, Command};
use error::AppError;
use state::Session;

/// Runs one invocation and returns what should be printed.
pub fn run(args: Args) -> Result<String, AppError> {
    let mut session = Session::open(&args.db_path, &args.username, &args.password)?;

    match &args.command {
        Some(Command::Config { set }) if set.is_empty() => {
            let config = commands::config::get_config(&session)?;
            Ok(serde_json::to_string_pretty(&config)?)
        }
        Some(Command::Config { set }) => {
            let config = commands::config::update_config(&mut session, set)?;
            Ok(serde_json::to_string_pretty(&config)?)
        }
        None => {
            let report = commands::report::run_report_logic(&session, &args.report, Utc::now())?;
            let mut output = commands::report::render_report(&report, args.report.format)?;
            if let Some(path) = &args.report.xlsx {
                let exported = commands::export::export_excel_report(&report, path)?;
                if args.report.format == cli::OutputFormat::Text {
                    output.push_str(&format!(
                        "\nWorkbook written to {} ({} bytes)\n",
                        exported.path, exported.size_bytes
                    ));
                }
            }
            Ok(output)
        }
    }
}

// ─── E2E Integration Tests ──────────────────────────────────────────────────
