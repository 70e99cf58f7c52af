//! CRE workload table.
use std::collections::HashMap;

use serde::Serialize;

use super::classifier::{classify_cre, CreBucket};
use super::period::ReportRequest;
use super::stats::mean;
use super::summary::{round1, Cell, SummaryRow, SummaryTable, TOTAL_LABEL};
use crate::config::ReportConfig;
use crate::db::predicate::{Field, Predicate};
use crate::db::store::DataStore;
use crate::error::ReportError;
use crate::model::columns::*;
use crate::model::{from_rows, Lead};

const SECTION: &str = "CRE table";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreRow {
    pub cre: String,
    pub assigned: i64,
    pub open: i64,
    pub untouched: i64,
    pub touched: i64,
    pub followup: i64,
    /// Mean turnaround in seconds over leads that have one.
    pub avg_tat: Option<f64>,
    #[serde(skip)]
    tat_values: Vec<f64>,
}

impl CreRow {
    fn finish(mut self) -> Self {
        self.avg_tat = (!self.tat_values.is_empty()).then(|| round1(mean(&self.tat_values)));
        self
    }
}

impl SummaryRow for CreRow {
    fn total_row(rows: &[Self]) -> Self {
        let mut total = CreRow {
            cre: TOTAL_LABEL.into(),
            ..CreRow::default()
        };
        for r in rows {
            total.assigned += r.assigned;
            total.open += r.open;
            total.untouched += r.untouched;
            total.touched += r.touched;
            total.followup += r.followup;
            total.tat_values.extend_from_slice(&r.tat_values);
        }
        total.finish()
    }

    fn headers() -> &'static [&'static str] {
        &["CRE", "Assigned", "Open leads", "UT", "Touched", "Followup", "Avg TAT (s)"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.cre.clone()),
            Cell::Int(self.assigned),
            Cell::Int(self.open),
            Cell::Int(self.untouched),
            Cell::Int(self.touched),
            Cell::Int(self.followup),
            Cell::Decimal(self.avg_tat),
        ]
    }
}

/// Groups leads by CRE. Leads without a CRE, or carrying the unassigned
/// label, are not part of the table.
pub fn tally_cres(leads: &[Lead], config: &ReportConfig) -> Vec<CreRow> {
    let mut rows: Vec<CreRow> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for lead in leads {
        let Some(cre) = lead.cre_name.as_deref() else {
            continue;
        };
        if cre.eq_ignore_ascii_case(&config.unassigned_label) {
            continue;
        }
        let slot = *index.entry(cre.to_string()).or_insert_with(|| {
            rows.push(CreRow {
                cre: cre.to_string(),
                ..CreRow::default()
            });
            rows.len() - 1
        });
        let row = &mut rows[slot];
        row.assigned += 1;
        match classify_cre(lead, config) {
            Some(CreBucket::Touched) => row.touched += 1,
            Some(CreBucket::Untouched) => row.untouched += 1,
            Some(CreBucket::Followup) => row.followup += 1,
            Some(CreBucket::Open) => row.open += 1,
            None => {}
        }
        if let Some(tat) = lead.tat {
            row.tat_values.push(tat);
        }
    }

    let mut rows: Vec<CreRow> = rows.into_iter().map(CreRow::finish).collect();
    rows.sort_by(|a, b| b.assigned.cmp(&a.assigned).then(a.cre.cmp(&b.cre)));
    rows
}

pub fn build_cre_table(
    store: &dyn DataStore,
    config: &ReportConfig,
    request: &ReportRequest,
) -> Result<SummaryTable<CreRow>, ReportError> {
    let mut predicates = request.period.current_filter(Field::col(CREATED_AT));
    if let Some(owner) = &request.scope.owner {
        predicates.push(Predicate::eq_ignore_case(CRE_NAME, owner));
    }
    let rows = store
        .fetch(
            LEADS,
            &[CRE_NAME, LEAD_STATUS, FINAL_STATUS, FIRST_CALL, TAT],
            &predicates,
        )
        .map_err(|e| ReportError::query(SECTION, e))?;
    let leads: Vec<Lead> = from_rows(rows).map_err(|e| ReportError::decode(SECTION, e))?;

    Ok(SummaryTable::new(tally_cres(&leads, config)))
}
