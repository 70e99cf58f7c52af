use chrono::{DateTime, Utc};

use crate::analyzer::dashboard::{build_dashboard, DashboardReport};
use crate::analyzer::period::ReportRequest;
use crate::cli::{OutputFormat, ReportArgs};
use crate::error::AppError;
use crate::export::text::render_text;
use crate::state::Session;

/// Resolves the requested period, then builds every dashboard section.
/// Malformed period input fails here, before any query runs.
pub fn run_report_logic(
    session: &Session,
    args: &ReportArgs,
    now: DateTime<Utc>,
) -> Result<DashboardReport, AppError> {
    let request = ReportRequest::new(args.filter()?, args.scope(), now)?;
    Ok(build_dashboard(&session.store, &session.config, &request))
}

pub fn render_report(report: &DashboardReport, format: OutputFormat) -> Result<String, AppError> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use crate::db::queries::fixtures::*;
    use crate::error::PeriodError;
    use chrono::TimeZone;
    use clap::Parser;

    fn session() -> Session {
        let store = empty_store();
        insert_user(store.connection(), "viewer", "pw", "user", true);
        Session::sign_in(store, "viewer", "pw").unwrap()
    }

    fn report_args(extra: &[&str]) -> ReportArgs {
        Args::try_parse_from(std::iter::once("leads-dashboard").chain(extra.iter().copied()))
            .unwrap()
            .report
    }

    #[test]
    fn test_bad_period_fails_before_queries() {
        let s = session();
        let err = run_report_logic(&s, &report_args(&["--period", "yesterday"]), Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::Period(PeriodError::UnknownFilter(_))));

        let err = run_report_logic(&s, &report_args(&["--period", "Custom Range"]), Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::Period(PeriodError::MissingBounds)));
    }

    #[test]
    fn test_json_output_carries_sections() {
        let s = session();
        insert_lead(s.store.connection(), Some("Google"), "2024-03-02", None, None, None, Some("Won"), None);
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();

        let report = run_report_logic(&s, &report_args(&["--period", "MTD"]), now).unwrap();
        let json = render_report(&report, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["meta"]["filter"], "MTD");
        assert!(value["sources"]["Ok"]["rows"].is_array());
        assert_eq!(value["kpis"][0]["Ok"]["value"], 1);
    }
}
