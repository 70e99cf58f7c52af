//! Command-line arguments, with environment fallbacks for the store path and
//! credentials.
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

use crate::analyzer::period::{PeriodFilter, ReportScope};
use crate::error::PeriodError;

/// Leads, walk-ins and PS performance dashboard
#[derive(Parser, Debug, Clone)]
#[command(name = "leads-dashboard")]
#[command(about = "Lead, walk-in and PS analytics over a SQLite store")]
pub struct Args {
    /// SQLite database file (created and migrated when missing)
    #[arg(long = "db", env = "LEADS_DB_PATH", default_value = "leads.db")]
    pub db_path: PathBuf,

    #[arg(long, env = "DASHBOARD_USERNAME", default_value = "")]
    pub username: String,

    #[arg(long, env = "DASHBOARD_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    #[command(flatten)]
    pub report: ReportArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show the reporting configuration, or update it (admin only)
    Config {
        /// Setting to store, as key=value. Repeatable.
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ReportArgs {
    /// Today, MTD, Custom Range or All time
    #[arg(long, default_value = "MTD")]
    pub period: String,

    /// Custom range start (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Custom range end (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,

    /// Narrow branch-keyed sections to one branch
    #[arg(long)]
    pub branch: Option<String>,

    /// Narrow CRE and PS tables to one owner
    #[arg(long)]
    pub owner: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also write the report as an XLSX workbook
    #[arg(long)]
    pub xlsx: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl ReportArgs {
    pub fn filter(&self) -> Result<PeriodFilter, PeriodError> {
        PeriodFilter::parse(&self.period, self.from.as_deref(), self.to.as_deref())
    }

    pub fn scope(&self) -> ReportScope {
        let clean = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        ReportScope {
            branch: clean(&self.branch),
            owner: clean(&self.owner),
        }
    }
}

/// Splits `key=value`. The value may itself contain `=`.
pub fn parse_setting(raw: &str) -> Option<(&str, &str)> {
    let (key, value) = raw.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        None
    } else {
        Some((key, value))
    }
}
