//! Walk-in funnel per branch.
use std::collections::BTreeMap;

use serde::Serialize;

use super::classifier::walkin_touch;
use super::period::ReportRequest;
use super::summary::{conversion_ratio, Cell, SummaryRow, SummaryTable, TOTAL_LABEL};
use crate::config::ReportConfig;
use crate::db::predicate::{Field, Predicate};
use crate::db::store::DataStore;
use crate::error::ReportError;
use crate::model::columns::*;
use crate::model::{from_rows, FinalStatus, WalkIn};

const SECTION: &str = "Walkin (branch-wise)";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRow {
    pub branch: String,
    pub punched: i64,
    pub pending: i64,
    pub touched: i64,
    pub untouched: i64,
    pub won: i64,
    pub lost: i64,
    pub test_drives: i64,
    pub ratio: f64,
}

impl SummaryRow for BranchRow {
    fn total_row(rows: &[Self]) -> Self {
        let mut total = BranchRow {
            branch: TOTAL_LABEL.into(),
            ..BranchRow::default()
        };
        for r in rows {
            total.punched += r.punched;
            total.pending += r.pending;
            total.touched += r.touched;
            total.untouched += r.untouched;
            total.won += r.won;
            total.lost += r.lost;
            total.test_drives += r.test_drives;
        }
        total.ratio = conversion_ratio(total.won, total.punched);
        total
    }

    fn headers() -> &'static [&'static str] {
        &["Branch", "Punched", "Pending", "Touched", "Untouched", "Won", "Lost", "TD", "%"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.branch.clone()),
            Cell::Int(self.punched),
            Cell::Int(self.pending),
            Cell::Int(self.touched),
            Cell::Int(self.untouched),
            Cell::Int(self.won),
            Cell::Int(self.lost),
            Cell::Int(self.test_drives),
            Cell::Percent(self.ratio),
        ]
    }
}

/// Folds walk-ins into per-branch rows, alphabetical. Walk-ins without a
/// branch are left out.
pub fn tally_branches(walkins: &[WalkIn], config: &ReportConfig) -> Vec<BranchRow> {
    let mut by_branch: BTreeMap<String, BranchRow> = BTreeMap::new();

    for w in walkins {
        let Some(branch) = w.branch.as_deref() else {
            continue;
        };
        let row = by_branch
            .entry(branch.to_string())
            .or_insert_with(|| BranchRow {
                branch: branch.to_string(),
                ..BranchRow::default()
            });
        row.punched += 1;
        match walkin_touch(w) {
            Some(true) => {
                row.pending += 1;
                row.touched += 1;
            }
            Some(false) => {
                row.pending += 1;
                row.untouched += 1;
            }
            None => {}
        }
        match w.status() {
            FinalStatus::Won => row.won += 1,
            FinalStatus::Lost => row.lost += 1,
            _ => {}
        }
        if config.is_truthy(w.test_drive_done.as_deref()) {
            row.test_drives += 1;
        }
    }

    by_branch
        .into_values()
        .map(|mut row| {
            row.ratio = conversion_ratio(row.won, row.punched);
            row
        })
        .collect()
}

pub fn build_branch_table(
    store: &dyn DataStore,
    config: &ReportConfig,
    request: &ReportRequest,
) -> Result<SummaryTable<BranchRow>, ReportError> {
    let mut predicates = request.period.current_filter(Field::col(CREATED_AT));
    if let Some(branch) = &request.scope.branch {
        predicates.push(Predicate::eq_ignore_case(BRANCH, branch));
    }
    let rows = store
        .fetch(WALKINS, WALKIN_COLUMNS, &predicates)
        .map_err(|e| ReportError::query(SECTION, e))?;
    let walkins: Vec<WalkIn> = from_rows(rows).map_err(|e| ReportError::decode(SECTION, e))?;

    Ok(SummaryTable::new(tally_branches(&walkins, config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::period::{PeriodFilter, ReportScope};
    use crate::db::queries::fixtures::*;
    use chrono::Utc;

    fn request(scope: ReportScope) -> ReportRequest {
        ReportRequest::new(PeriodFilter::AllTime, scope, Utc::now()).unwrap()
    }

    fn seed() -> crate::db::queries::SqliteStore {
        let store = empty_store();
        let conn = store.connection();
        insert_walkin(conn, Some("South"), Some("Pending"), "2024-01-01", None, None, None);
        insert_walkin(conn, Some("South"), Some("pending"), "2024-01-01", Some("2024-01-02"), Some("1"), None);
        insert_walkin(conn, Some("South"), Some("Won"), "2024-01-01", Some("2024-01-02"), Some("Yes"), None);
        insert_walkin(conn, Some("North"), Some("Lost"), "2024-01-01", None, Some("no"), None);
        insert_walkin(conn, Some("North"), Some("Won"), "2024-01-01", None, Some("true"), None);
        insert_walkin(conn, None, Some("Won"), "2024-01-01", None, None, None);
        store
    }

    #[test]
    fn test_branch_rows_sorted_and_counted() {
        let store = seed();
        let table =
            build_branch_table(&store, &ReportConfig::default(), &request(ReportScope::default()))
                .unwrap();

        assert_eq!(table.rows.len(), 2);
        let north = &table.rows[0];
        assert_eq!(north.branch, "North");
        assert_eq!((north.punched, north.won, north.lost, north.test_drives), (2, 1, 1, 1));
        assert_eq!(north.ratio, 50.0);

        let south = &table.rows[1];
        assert_eq!(south.branch, "South");
        assert_eq!(
            (south.punched, south.pending, south.touched, south.untouched, south.won, south.test_drives),
            (3, 2, 1, 1, 1, 2)
        );
        assert_eq!(south.ratio, 33.33);
    }

    #[test]
    fn test_branch_total_sums_columns() {
        let store = seed();
        let table =
            build_branch_table(&store, &ReportConfig::default(), &request(ReportScope::default()))
                .unwrap();
        assert_eq!(table.total.punched, 5);
        assert_eq!(table.total.won, 2);
        assert_eq!(table.total.pending, 2);
        assert_eq!(table.total.test_drives, 3);
        assert_eq!(table.total.ratio, 40.0);
    }

    #[test]
    fn test_branch_scope() {
        let store = seed();
        let scope = ReportScope {
            branch: Some("north".into()),
            owner: None,
        };
        let table =
            build_branch_table(&store, &ReportConfig::default(), &request(scope)).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].branch, "North");
    }

    #[test]
    fn test_empty_walkins_give_empty_table() {
        let table = build_branch_table(
            &empty_store(),
            &ReportConfig::default(),
            &request(ReportScope::default()),
        )
        .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.total.punched, 0);
    }
}
