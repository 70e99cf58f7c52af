//! PS performance table: assignments from the lead master, outcomes summed
//! over walk-ins, PS followups and activity leads.
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::classifier::is_untouched;
use super::period::ReportRequest;
use super::summary::{conversion_ratio, Cell, SummaryRow, SummaryTable, TOTAL_LABEL};
use super::union::{sum_over, Entity, EntityOutcome, FetchStatus, OwnerTallies, StageTally};
use crate::config::ReportConfig;
use crate::db::predicate::{Field, Predicate};
use crate::db::store::{DataStore, Row};
use crate::error::{ReportError, StoreError};
use crate::model::columns::*;
use crate::model::{from_rows, FinalStatus, StageLead, WalkIn};

const SECTION: &str = "PS table";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PsRow {
    pub ps: String,
    pub assigned: i64,
    pub handled: i64,
    pub open: i64,
    pub won: i64,
    pub lost: i64,
    pub untouched: i64,
    pub ratio: f64,
}

impl PsRow {
    fn new(ps: &str, assigned: i64, tally: StageTally) -> Self {
        PsRow {
            ps: ps.to_string(),
            assigned,
            handled: tally.handled,
            open: tally.open,
            won: tally.won,
            lost: tally.lost,
            untouched: tally.untouched,
            ratio: conversion_ratio(tally.won, tally.handled),
        }
    }
}

impl SummaryRow for PsRow {
    fn total_row(rows: &[Self]) -> Self {
        let mut tally = StageTally::default();
        let mut assigned = 0;
        for r in rows {
            assigned += r.assigned;
            tally += StageTally {
                handled: r.handled,
                open: r.open,
                won: r.won,
                lost: r.lost,
                untouched: r.untouched,
            };
        }
        PsRow::new(TOTAL_LABEL, assigned, tally)
    }

    fn headers() -> &'static [&'static str] {
        &["PS", "Assigned", "Handled", "Open", "Won", "Lost", "Untouched", "%"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.ps.clone()),
            Cell::Int(self.assigned),
            Cell::Int(self.handled),
            Cell::Int(self.open),
            Cell::Int(self.won),
            Cell::Int(self.lost),
            Cell::Int(self.untouched),
            Cell::Percent(self.ratio),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PsTable {
    #[serde(flatten)]
    pub table: SummaryTable<PsRow>,
    pub entities: Vec<EntityOutcome>,
}

/// Common view over the stage records.
trait Staged {
    fn owner(&self) -> Option<&str>;
    fn final_status(&self) -> FinalStatus;
    fn first_call(&self) -> Option<&str>;
    fn lead_status(&self) -> Option<&str>;
}

impl Staged for WalkIn {
    fn owner(&self) -> Option<&str> {
        self.ps_assigned.as_deref()
    }
    fn final_status(&self) -> FinalStatus {
        self.status()
    }
    fn first_call(&self) -> Option<&str> {
        self.first_call_date.as_deref()
    }
    fn lead_status(&self) -> Option<&str> {
        None
    }
}

impl Staged for StageLead {
    fn owner(&self) -> Option<&str> {
        self.ps_name.as_deref()
    }
    fn final_status(&self) -> FinalStatus {
        self.status()
    }
    fn first_call(&self) -> Option<&str> {
        self.first_call_date.as_deref()
    }
    fn lead_status(&self) -> Option<&str> {
        self.lead_status.as_deref()
    }
}

fn tally_records<S: Staged>(records: &[S], config: &ReportConfig) -> OwnerTallies {
    let mut tallies = OwnerTallies::default();
    for record in records {
        let Some(owner) = record.owner() else {
            continue;
        };
        let status = record.final_status();
        let t = tallies.entry(owner);
        t.handled += 1;
        match status {
            FinalStatus::Pending => t.open += 1,
            FinalStatus::Won => t.won += 1,
            FinalStatus::Lost => t.lost += 1,
            FinalStatus::Other(_) => {}
        }
        if is_untouched(&status, record.first_call(), record.lead_status(), config) {
            t.untouched += 1;
        }
    }
    tallies
}

fn tally_rows(entity: Entity, rows: Vec<Row>, config: &ReportConfig) -> Result<OwnerTallies, StoreError> {
    let decode_err = |e: serde_json::Error| {
        StoreError::Backend(format!("could not decode {} rows: {e}", entity.label()))
    };
    Ok(match entity {
        Entity::WalkIn => tally_records(&from_rows::<WalkIn>(rows).map_err(decode_err)?, config),
        Entity::PsFollowup | Entity::ActivityLead => {
            tally_records(&from_rows::<StageLead>(rows).map_err(decode_err)?, config)
        }
    })
}

/// Fetches one entity in a single query, falling back to one query per
/// known owner plus one for every other owner. Queries that also fail are
/// skipped and reported.
fn query_entity(
    store: &dyn DataStore,
    config: &ReportConfig,
    request: &ReportRequest,
    owners: &BTreeSet<String>,
    entity: Entity,
) -> Result<(OwnerTallies, FetchStatus), StoreError> {
    let mut base = request.period.current_filter(Field::col(CREATED_AT));
    if let Some(owner) = &request.scope.owner {
        base.push(Predicate::eq_ignore_case(entity.owner_column(), owner));
    }

    let batch_err = match store.fetch(entity.table(), entity.columns(), &base) {
        Ok(rows) => return Ok((tally_rows(entity, rows, config)?, FetchStatus::Batch)),
        Err(e) => e,
    };
    if owners.is_empty() {
        return Err(batch_err);
    }
    log::warn!(
        "{} batch query failed, retrying per owner: {batch_err}",
        entity.label()
    );

    let mut tallies = OwnerTallies::default();
    let mut failures = Vec::new();
    for owner in owners {
        let mut predicates = base.clone();
        predicates.push(Predicate::eq_ignore_case(entity.owner_column(), owner));
        match store.fetch(entity.table(), entity.columns(), &predicates) {
            Ok(rows) => tallies += tally_rows(entity, rows, config)?,
            Err(e) => failures.push(format!("{owner}: {e}")),
        }
    }

    // Owners with no assignment in the window.
    let mut rest = base;
    rest.push(Predicate::NotInIgnoreCase(
        Field::col(entity.owner_column()),
        owners.iter().cloned().collect(),
    ));
    match store.fetch(entity.table(), entity.columns(), &rest) {
        Ok(rows) => tallies += tally_rows(entity, rows, config)?,
        Err(e) => failures.push(format!(
            "owners other than {}: {e}",
            owners.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
        )),
    }

    if failures.is_empty() {
        Ok((tallies, FetchStatus::Retried))
    } else {
        log::warn!(
            "{} per-owner retry failed for {} of {} queries",
            entity.label(),
            failures.len(),
            owners.len() + 1
        );
        Ok((
            tallies,
            FetchStatus::Failed {
                reason: failures.join("; "),
            },
        ))
    }
}

/// Leads handed to each PS within the window on `ps_assigned_at`.
fn assigned_counts(
    store: &dyn DataStore,
    request: &ReportRequest,
) -> Result<BTreeMap<String, i64>, StoreError> {
    let mut predicates = request.period.current_filter(Field::col(PS_ASSIGNED_AT));
    predicates.push(Predicate::not_blank(PS_NAME));
    if let Some(owner) = &request.scope.owner {
        predicates.push(Predicate::eq_ignore_case(PS_NAME, owner));
    }
    let mut counts = BTreeMap::new();
    for row in store.fetch(LEADS, &[PS_NAME], &predicates)? {
        if let Some(ps) = row.get(PS_NAME).and_then(|v| v.as_str()) {
            *counts.entry(ps.trim().to_string()).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

fn sort_rows(rows: &mut [PsRow]) {
    rows.sort_by(|a, b| {
        b.assigned
            .cmp(&a.assigned)
            .then(b.handled.cmp(&a.handled))
            .then_with(|| a.ps.cmp(&b.ps))
    });
}

pub fn build_ps_table(
    store: &dyn DataStore,
    config: &ReportConfig,
    request: &ReportRequest,
) -> Result<PsTable, ReportError> {
    let assigned = assigned_counts(store, request).map_err(|e| ReportError::query(SECTION, e))?;
    let known_owners: BTreeSet<String> = assigned.keys().cloned().collect();

    let union = sum_over(&Entity::ALL, |entity| {
        query_entity(store, config, request, &known_owners, entity)
    });

    let owners: BTreeSet<&String> = assigned.keys().chain(union.tally.0.keys()).collect();
    let mut rows: Vec<PsRow> = owners
        .into_iter()
        .map(|ps| {
            PsRow::new(
                ps,
                assigned.get(ps).copied().unwrap_or(0),
                union.tally.get(ps),
            )
        })
        .collect();
    sort_rows(&mut rows);

    let warnings = union
        .failed()
        .filter_map(|o| match &o.status {
            FetchStatus::Failed { reason } => {
                Some(format!("{} data unavailable: {reason}", o.entity.label()))
            }
            _ => None,
        })
        .collect();

    Ok(PsTable {
        table: SummaryTable::new(rows).with_warnings(warnings),
        entities: union.entities,
    })
}
