//! Plain-text rendering of a dashboard report for terminals.
use std::fmt::Write as _;

use crate::analyzer::dashboard::DashboardReport;
use crate::analyzer::summary::{Cell, SummaryRow, SummaryTable};
use crate::error::ReportError;

pub fn render_text(report: &DashboardReport) -> String {
    let mut out = String::new();
    let meta = &report.meta;

    let _ = writeln!(out, "Dashboard: {}", meta.filter);
    if let Some(w) = meta.period.current {
        let _ = writeln!(
            out,
            "Window:    {} .. {}",
            w.start.format("%Y-%m-%d %H:%M:%S"),
            w.end.format("%Y-%m-%d %H:%M:%S")
        );
    }
    if let Some(branch) = &meta.scope.branch {
        let _ = writeln!(out, "Branch:    {branch}");
    }
    if let Some(owner) = &meta.scope.owner {
        let _ = writeln!(out, "Owner:     {owner}");
    }
    let _ = writeln!(out, "Computed in {} ms", meta.calc_duration_ms);

    section(&mut out, "KPIs");
    for kpi in &report.kpis {
        match kpi {
            Ok(card) => {
                let share = card
                    .share
                    .as_deref()
                    .map(|s| format!("  ({s})"))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "{:<18} {:>8}  {:>8}{share}",
                    card.label,
                    card.value,
                    card.delta.to_string()
                );
            }
            Err(e) => {
                let _ = writeln!(out, "! {e}");
            }
        }
    }

    render_table(&mut out, "Source-wise", report.sources.as_ref());
    render_table(&mut out, "Branch-wise", report.branches.as_ref());
    render_table(&mut out, "CRE-wise", report.cre.as_ref());
    render_table(&mut out, "PS-wise", report.ps.as_ref().map(|p| &p.table));

    if let Ok(tat) = &report.tat {
        section(&mut out, "TAT");
        let _ = writeln!(
            out,
            "samples {}  mean {:.1}  median {:.1}  p90 {:.1}",
            tat.samples, tat.mean, tat.median, tat.p90
        );
    }

    let degraded = report.degraded();
    if !degraded.is_empty() {
        section(&mut out, "Warnings");
        for message in degraded {
            let _ = writeln!(out, "- {message}");
        }
    }
    out
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n── {title} ──");
}

fn render_table<R: SummaryRow>(
    out: &mut String,
    title: &str,
    table: Result<&SummaryTable<R>, &ReportError>,
) {
    section(out, title);
    let table = match table {
        Ok(t) => t,
        Err(e) => {
            let _ = writeln!(out, "! {e}");
            return;
        }
    };

    let headers = R::headers();
    let grid: Vec<Vec<String>> = table
        .grid()
        .iter()
        .map(|cells| cells.iter().map(Cell::to_string).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &grid {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let _ = writeln!(out, "{}", format_line(headers.iter().copied(), &widths));
    for row in &grid {
        let _ = writeln!(out, "{}", format_line(row.iter().map(String::as_str), &widths));
    }
    for w in &table.warnings {
        let _ = writeln!(out, "! {w}");
    }
}

/// First column left-aligned, the rest right-aligned.
fn format_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .enumerate()
        .map(|(i, (c, &w))| {
            if i == 0 {
                format!("{c:<w$}")
            } else {
                format!("{c:>w$}")
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::dashboard::build_dashboard;
    use crate::analyzer::period::{PeriodFilter, ReportRequest, ReportScope};
    use crate::config::ReportConfig;
    use crate::db::queries::fixtures::*;
    use chrono::Utc;

    #[test]
    fn test_render_contains_sections_and_total() {
        let store = empty_store();
        let conn = store.connection();
        insert_lead(conn, Some("Google"), "2024-01-01", Some("Asha"), None, None, Some("Won"), None);
        insert_lead(conn, Some("google "), "2024-01-01", Some("Asha"), None, None, None, None);
        let request =
            ReportRequest::new(PeriodFilter::AllTime, ReportScope::default(), Utc::now()).unwrap();

        let text = render_text(&build_dashboard(&store, &ReportConfig::default(), &request));
        assert!(text.starts_with("Dashboard: All time"));
        assert!(text.contains("── Source-wise ──"));
        assert!(text.contains("TOTAL"));
        assert!(text.contains("Google"));
        assert!(!text.contains("── Warnings ──"));
    }

    #[test]
    fn test_render_failed_section() {
        let store = empty_store();
        store.connection().execute_batch("DROP TABLE lead_master;").unwrap();
        let request =
            ReportRequest::new(PeriodFilter::AllTime, ReportScope::default(), Utc::now()).unwrap();

        let text = render_text(&build_dashboard(&store, &ReportConfig::default(), &request));
        assert!(text.contains("── Warnings ──"));
        assert!(text.contains("! Could not load"));
        assert!(text.contains("── Branch-wise ──"));
    }
}
