//! Lead dashboard: KPI cards with period-over-period deltas and every
//! summary section, each loaded independently.
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::branches::{build_branch_table, BranchRow};
use super::charts::{lead_trend, source_mix, walkin_status_mix, ChartSlice, TrendSeries};
use super::cre::{build_cre_table, CreRow};
use super::delta::{Delta, Direction};
use super::period::{ReportRequest, ReportScope, ResolvedPeriod};
use super::ps::{build_ps_table, PsTable};
use super::sources::{build_source_table, SourceRow};
use super::stats::{mean, percentile_sorted, sorted};
use super::summary::{round1, SummaryTable};
use crate::config::ReportConfig;
use crate::db::predicate::{Field, Predicate};
use crate::db::store::DataStore;
use crate::error::ReportError;
use crate::model::columns::*;
use crate::model::{from_rows, Lead};

// ─── Data Structures ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub meta: DashboardMeta,
    pub kpis: Vec<Result<KpiCard, ReportError>>,
    pub sources: Result<SummaryTable<SourceRow>, ReportError>,
    pub branches: Result<SummaryTable<BranchRow>, ReportError>,
    pub cre: Result<SummaryTable<CreRow>, ReportError>,
    pub ps: Result<PsTable, ReportError>,
    pub charts: ChartsReport,
    pub tat: Result<TatSummary, ReportError>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMeta {
    pub filter: String,
    pub period: ResolvedPeriod,
    pub scope: ReportScope,
    pub generated_at: DateTime<Utc>,
    pub calc_duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiCard {
    pub label: String,
    pub value: i64,
    pub previous: Option<i64>,
    pub delta: Delta,
    pub direction: Direction,
    /// Share of the parent total, e.g. won out of all leads.
    pub share: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartsReport {
    pub source_mix: Result<Vec<ChartSlice>, ReportError>,
    pub walkin_status: Result<Vec<ChartSlice>, ReportError>,
    pub lead_trend: Result<TrendSeries, ReportError>,
}

/// Turnaround (seconds) over leads in the window that carry one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TatSummary {
    pub samples: usize,
    pub mean: f64,
    pub median: f64,
    pub p90: f64,
}

impl DashboardReport {
    /// Messages of every section that failed to load.
    pub fn degraded(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .kpis
            .iter()
            .filter_map(|k| k.as_ref().err().map(ToString::to_string))
            .collect();
        let sections: [Option<&ReportError>; 8] = [
            self.sources.as_ref().err(),
            self.branches.as_ref().err(),
            self.cre.as_ref().err(),
            self.ps.as_ref().err(),
            self.charts.source_mix.as_ref().err(),
            self.charts.walkin_status.as_ref().err(),
            self.charts.lead_trend.as_ref().err(),
            self.tat.as_ref().err(),
        ];
        out.extend(sections.into_iter().flatten().map(ToString::to_string));
        out
    }
}

// ─── KPI cards ───────────────────────────────────────────────────────────────

pub const KPI_LEADS: &str = "Leads";
pub const KPI_ASSIGNED_CRE: &str = "Assigned to CRE";
pub const KPI_ASSIGNED_PS: &str = "Assigned to PS";
pub const KPI_PENDING: &str = "Pending Leads";
pub const KPI_LOST: &str = "Lost Leads";
pub const KPI_WON: &str = "Won Leads";
pub const KPI_WALKINS: &str = "Walkin Leads";
pub const KPI_WALKIN_WON: &str = "Walkin Won";

fn format_share(part: i64, whole: i64) -> String {
    let share = if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    };
    format!("{share:.2}%")
}

/// Counts `filters` in the current and previous windows of `basis`.
fn count_card(
    store: &dyn DataStore,
    period: &ResolvedPeriod,
    label: &str,
    table: &str,
    basis: Field,
    filters: &[Predicate],
) -> Result<KpiCard, ReportError> {
    let count_in = |window: Option<Predicate>| {
        let mut predicates = filters.to_vec();
        predicates.extend(window);
        store
            .count(table, &predicates)
            .map_err(|e| ReportError::query(&format!("KPI ({label})"), e))
    };

    let value = count_in(period.current.map(|w| w.predicate(basis.clone())))?;
    let previous = match period.previous {
        Some(w) => Some(count_in(Some(w.predicate(basis.clone())))?),
        None => None,
    };
    let delta = Delta::compute(value, previous);
    Ok(KpiCard {
        label: label.to_string(),
        value,
        previous,
        delta,
        direction: delta.direction(),
        share: None,
    })
}

/// Date basis for won walk-ins: the existing columns among
/// `won_timestamp`, `updated_at`, `created_at`, coalesced per record in that order.
pub fn walkin_won_basis(store: &dyn DataStore) -> Result<Field, ReportError> {
    let columns = store
        .columns(WALKINS)
        .map_err(|e| ReportError::query(&format!("KPI ({KPI_WALKIN_WON})"), e))?;
    let present: Vec<&str> = WALKIN_WON_BASIS
        .iter()
        .copied()
        .filter(|c| columns.iter().any(|have| have == c))
        .collect();
    match present.as_slice() {
        [] => Err(ReportError::MissingColumn {
            table: WALKINS.into(),
            column: WALKIN_WON_BASIS.join(" / "),
        }),
        [only] => Ok(Field::col(only)),
        many => Ok(Field::coalesce(many)),
    }
}

fn pending_filter() -> Predicate {
    Predicate::Any(vec![
        Predicate::eq_ignore_case(FINAL_STATUS, "pending"),
        Predicate::blank(FINAL_STATUS),
    ])
}

pub fn build_kpis(store: &dyn DataStore, period: &ResolvedPeriod) -> Vec<Result<KpiCard, ReportError>> {
    let created = || Field::col(CREATED_AT);
    let lead_card = |label: &str, filters: &[Predicate]| {
        count_card(store, period, label, LEADS, created(), filters)
    };

    let leads = lead_card(KPI_LEADS, &[]);
    let assigned_cre = lead_card(KPI_ASSIGNED_CRE, &[Predicate::not_null(CRE_NAME)]);
    let assigned_ps = lead_card(KPI_ASSIGNED_PS, &[Predicate::not_null(PS_NAME)]);
    let pending = lead_card(KPI_PENDING, &[pending_filter()]);
    let lost = lead_card(KPI_LOST, &[Predicate::eq_ignore_case(FINAL_STATUS, "lost")]);
    let mut won = lead_card(KPI_WON, &[Predicate::eq_ignore_case(FINAL_STATUS, "won")]);

    let walkins = count_card(store, period, KPI_WALKINS, WALKINS, created(), &[]);
    let walkin_won = walkin_won_basis(store).and_then(|basis| {
        let mut card = count_card(
            store,
            period,
            KPI_WALKIN_WON,
            WALKINS,
            basis.clone(),
            &[Predicate::eq_ignore_case(STATUS, "won")],
        )?;
        // Share is taken over walk-ins dated on the same basis.
        let window: Vec<Predicate> = period.current.map(|w| w.predicate(basis)).into_iter().collect();
        let whole = store
            .count(WALKINS, &window)
            .map_err(|e| ReportError::query(&format!("KPI ({KPI_WALKIN_WON})"), e))?;
        card.share = Some(format_share(card.value, whole));
        Ok(card)
    });

    if let (Ok(card), Ok(total)) = (won.as_mut(), leads.as_ref()) {
        card.share = Some(format_share(card.value, total.value));
    }

    vec![
        leads,
        assigned_cre,
        assigned_ps,
        pending,
        lost,
        won,
        walkins,
        walkin_won,
    ]
}

// ─── Turnaround ──────────────────────────────────────────────────────────────

pub fn build_tat_summary(
    store: &dyn DataStore,
    request: &ReportRequest,
) -> Result<TatSummary, ReportError> {
    const SECTION: &str = "TAT summary";
    let mut predicates = request.period.current_filter(Field::col(CREATED_AT));
    predicates.push(Predicate::not_null(TAT));
    let rows = store
        .fetch(LEADS, &[TAT], &predicates)
        .map_err(|e| ReportError::query(SECTION, e))?;
    let leads: Vec<Lead> = from_rows(rows).map_err(|e| ReportError::decode(SECTION, e))?;
    let values: Vec<f64> = leads.iter().filter_map(|l| l.tat).collect();
    let ordered = sorted(&values);

    Ok(TatSummary {
        samples: values.len(),
        mean: round1(mean(&values)),
        median: round1(percentile_sorted(&ordered, 50.0)),
        p90: round1(percentile_sorted(&ordered, 90.0)),
    })
}

// ─── Report ──────────────────────────────────────────────────────────────────

pub fn build_dashboard(
    store: &dyn DataStore,
    config: &ReportConfig,
    request: &ReportRequest,
) -> DashboardReport {
    let started = Instant::now();

    let kpis = build_kpis(store, &request.period);
    let sources = build_source_table(store, config, request);
    let branches = build_branch_table(store, config, request);
    let cre = build_cre_table(store, config, request);
    let ps = build_ps_table(store, config, request);
    let charts = ChartsReport {
        source_mix: source_mix(store, config, request),
        walkin_status: walkin_status_mix(store, request),
        lead_trend: lead_trend(store, request),
    };
    let tat = build_tat_summary(store, request);

    let mut report = DashboardReport {
        meta: DashboardMeta {
            filter: request.filter.to_string(),
            period: request.period,
            scope: request.scope.clone(),
            generated_at: request.generated_at,
            calc_duration_ms: 0,
        },
        kpis,
        sources,
        branches,
        cre,
        ps,
        charts,
        tat,
    };
    report.meta.calc_duration_ms = started.elapsed().as_millis() as u64;

    for message in report.degraded() {
        log::warn!("{message}");
    }
    log::info!(
        "Dashboard for {} built in {} ms",
        report.meta.filter,
        report.meta.calc_duration_ms
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::period::PeriodFilter;
    use crate::db::queries::fixtures::*;
    use crate::db::queries::SqliteStore;
    use chrono::TimeZone;
    use rusqlite::{params, Connection};

    fn card<'a>(kpis: &'a [Result<KpiCard, ReportError>], label: &str) -> &'a KpiCard {
        kpis.iter()
            .filter_map(|k| k.as_ref().ok())
            .find(|k| k.label == label)
            .unwrap()
    }

    fn mtd_march() -> ReportRequest {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        ReportRequest::new(PeriodFilter::Mtd, ReportScope::default(), now).unwrap()
    }

    #[test]
    fn test_hundred_leads_ten_won_all_time() {
        let store = empty_store();
        let conn = store.connection();
        for i in 0..100 {
            let status = if i < 10 { Some("Won") } else { Some("Pending") };
            insert_lead(conn, Some("Google"), "2024-01-01", None, None, None, status, None);
        }
        let request =
            ReportRequest::new(PeriodFilter::AllTime, ReportScope::default(), Utc::now()).unwrap();
        let report = build_dashboard(&store, &ReportConfig::default(), &request);

        let leads = card(&report.kpis, KPI_LEADS);
        assert_eq!(leads.value, 100);
        assert_eq!(leads.delta.to_string(), "—");
        let won = card(&report.kpis, KPI_WON);
        assert_eq!(won.value, 10);
        assert_eq!(won.share.as_deref(), Some("10.00%"));
        assert_eq!(won.delta, Delta::Unavailable);
        assert!(report.degraded().is_empty());
    }

    #[test]
    fn test_mtd_won_delta() {
        let store = empty_store();
        let conn = store.connection();
        for _ in 0..3 {
            insert_lead(conn, None, "2024-03-10", None, None, None, Some("Won"), None);
        }
        for _ in 0..2 {
            insert_lead(conn, None, "2024-02-20", None, None, None, Some("Won"), None);
        }
        insert_lead(conn, None, "2024-01-20", None, None, None, Some("Won"), None);

        let kpis = build_kpis(&store, &mtd_march().period);
        let won = card(&kpis, KPI_WON);
        assert_eq!(won.value, 3);
        assert_eq!(won.previous, Some(2));
        assert_eq!(won.delta.to_string(), "+50.0%");
        assert_eq!(won.direction, Direction::Up);
    }

    #[test]
    fn test_pending_includes_missing_status() {
        let store = empty_store();
        let conn = store.connection();
        insert_lead(conn, None, "2024-03-02", Some("Asha"), None, None, None, None);
        insert_lead(conn, None, "2024-03-02", None, Some("Ravi"), None, Some("Pending"), None);
        insert_lead(conn, None, "2024-03-02", None, None, None, Some("Lost"), None);

        let kpis = build_kpis(&store, &mtd_march().period);
        assert_eq!(card(&kpis, KPI_PENDING).value, 2);
        assert_eq!(card(&kpis, KPI_LOST).value, 1);
        assert_eq!(card(&kpis, KPI_ASSIGNED_CRE).value, 1);
        assert_eq!(card(&kpis, KPI_ASSIGNED_PS).value, 1);
        assert_eq!(card(&kpis, KPI_LEADS).delta, Delta::Infinite);
    }

    #[test]
    fn test_walkin_won_falls_back_per_record() {
        let store = empty_store();
        let conn = store.connection();
        // Won in February by updated_at, created in January.
        conn.execute(
            "INSERT INTO walkin_table (branch, status, created_at, updated_at, won_timestamp)
             VALUES ('North', 'Won', '2024-01-20', '2024-02-01 10:00:00', NULL)",
            params![],
        )
        .unwrap();
        // Only created_at is known.
        conn.execute(
            "INSERT INTO walkin_table (branch, status, created_at) VALUES ('North', 'Won', '2024-03-03')",
            params![],
        )
        .unwrap();
        // won_timestamp wins over the other two.
        conn.execute(
            "INSERT INTO walkin_table (branch, status, created_at, updated_at, won_timestamp)
             VALUES ('North', 'Won', '2024-01-01', '2024-03-05', '2024-03-04')",
            params![],
        )
        .unwrap();

        // Still open, dated by created_at alone.
        insert_walkin(conn, Some("North"), Some("Pending"), "2024-03-10", None, None, None);

        let kpis = build_kpis(&store, &mtd_march().period);
        let walkin_won = card(&kpis, KPI_WALKIN_WON);
        assert_eq!(walkin_won.value, 2);
        assert_eq!(walkin_won.previous, Some(1));
        assert_eq!(card(&kpis, KPI_WALKINS).value, 2);
        // Two won out of the three walk-ins whose won basis falls in March.
        assert_eq!(walkin_won.share.as_deref(), Some("66.67%"));
    }

    #[test]
    fn test_walkin_won_share_without_walkins_in_window() {
        let store = empty_store();
        insert_walkin(store.connection(), Some("North"), Some("Won"), "2024-01-05", None, None, None);

        let kpis = build_kpis(&store, &mtd_march().period);
        let walkin_won = card(&kpis, KPI_WALKIN_WON);
        assert_eq!(walkin_won.value, 0);
        assert_eq!(walkin_won.share.as_deref(), Some("0.00%"));
    }

    #[test]
    fn test_assigned_cre_is_zero_without_cre_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE lead_master (id INTEGER PRIMARY KEY, source TEXT, created_at TEXT,
                 ps_name TEXT, final_status TEXT);
             INSERT INTO lead_master (source, created_at, ps_name) VALUES
                 ('Google', '2024-03-02', 'Ravi'), ('Meta', '2024-03-03', NULL);",
        )
        .unwrap();
        let store = SqliteStore::new(conn).unwrap();

        let kpis = build_kpis(&store, &mtd_march().period);
        assert_eq!(card(&kpis, KPI_LEADS).value, 2);
        assert_eq!(card(&kpis, KPI_ASSIGNED_CRE).value, 0);
        assert_eq!(card(&kpis, KPI_ASSIGNED_PS).value, 1);
    }

    #[test]
    fn test_mtd_counts_every_offset_form() {
        let store = empty_store();
        let conn = store.connection();
        for created in [
            "2024-03-05T09:00:00+0530",
            "2024-03-06T09:00:00.123456+00:00",
            "2024-03-07 09:00:00+05",
        ] {
            insert_lead(conn, Some("Google"), created, None, None, None, None, None);
        }

        let kpis = build_kpis(&store, &mtd_march().period);
        assert_eq!(card(&kpis, KPI_LEADS).value, 3);
        assert_eq!(card(&kpis, KPI_LEADS).previous, Some(0));
    }

    #[test]
    fn test_walkin_won_basis_uses_existing_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE walkin_table (id INTEGER PRIMARY KEY, status TEXT, created_at TEXT);")
            .unwrap();
        let store = SqliteStore::new(conn).unwrap();
        assert_eq!(walkin_won_basis(&store).unwrap(), Field::col("created_at"));

        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE walkin_table (id INTEGER PRIMARY KEY, status TEXT);")
            .unwrap();
        let store = SqliteStore::new(conn).unwrap();
        assert!(matches!(
            walkin_won_basis(&store).unwrap_err(),
            ReportError::MissingColumn { .. }
        ));
    }

    #[test]
    fn test_missing_tables_degrade_sections_independently() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE lead_master (id INTEGER PRIMARY KEY, source TEXT, created_at TEXT,
                 cre_name TEXT, ps_name TEXT, ps_assigned_at TEXT, lead_status TEXT,
                 final_status TEXT, first_call_date TEXT, test_drive_status TEXT, tat REAL);
             INSERT INTO lead_master (source, created_at, final_status) VALUES ('Google', '2024-03-02', 'Won');",
        )
        .unwrap();
        let store = SqliteStore::new(conn).unwrap();
        let report = build_dashboard(&store, &ReportConfig::default(), &mtd_march());

        assert_eq!(card(&report.kpis, KPI_LEADS).value, 1);
        assert_eq!(card(&report.kpis, KPI_WON).share.as_deref(), Some("100.00%"));
        assert!(report.kpis.iter().any(|k| k.is_err()));
        assert!(report.branches.is_err());
        assert!(report.cre.is_ok());
        // Walk-in row becomes a warning, leads still tabulated.
        let sources = report.sources.as_ref().unwrap();
        assert_eq!(sources.rows.len(), 1);
        assert_eq!(sources.warnings.len(), 1);
        // Every stage table is missing, each entity is flagged.
        let ps = report.ps.as_ref().unwrap();
        assert_eq!(ps.entities.len(), 3);
        assert_eq!(ps.table.warnings.len(), 3);
        assert!(!report.degraded().is_empty());
    }

    #[test]
    fn test_tat_summary() {
        let store = empty_store();
        store
            .connection()
            .execute_batch(
                "INSERT INTO lead_master (created_at, tat) VALUES ('2024-03-01', 10), ('2024-03-02', 20),
                     ('2024-03-03', 30), ('2024-03-04', NULL), ('2024-02-01', 1000);",
            )
            .unwrap();
        let tat = build_tat_summary(&store, &mtd_march()).unwrap();
        assert_eq!(tat.samples, 3);
        assert_eq!(tat.mean, 20.0);
        assert_eq!(tat.median, 20.0);
        assert_eq!(tat.p90, 28.0);
    }
}
