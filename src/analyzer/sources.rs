//! Per-source funnel table (E / QL / TD / BR) with the synthetic Walkin row.
use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use super::period::{ReportRequest, ResolvedPeriod};
use super::summary::{conversion_ratio, Cell, SummaryRow, SummaryTable, TOTAL_LABEL};
use crate::config::ReportConfig;
use crate::db::predicate::{Field, Predicate};
use crate::db::store::{DataStore, Row};
use crate::error::{ReportError, StoreError};
use crate::model::columns::*;
use crate::model::{raw_text, FinalStatus};

const SECTION: &str = "Source table";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRow {
    pub source: String,
    /// Leads (E).
    pub count: i64,
    /// Leads handed to a PS (QL).
    pub enquiry: i64,
    pub test_drives: i64,
    /// Won (BR).
    pub won: i64,
    pub ratio: f64,
}

impl SummaryRow for SourceRow {
    fn total_row(rows: &[Self]) -> Self {
        let count = rows.iter().map(|r| r.count).sum();
        let won = rows.iter().map(|r| r.won).sum();
        SourceRow {
            source: TOTAL_LABEL.into(),
            count,
            enquiry: rows.iter().map(|r| r.enquiry).sum(),
            test_drives: rows.iter().map(|r| r.test_drives).sum(),
            won,
            ratio: conversion_ratio(won, count),
        }
    }

    fn headers() -> &'static [&'static str] {
        &["Source", "E", "QL", "TD", "BR", "%"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.source.clone()),
            Cell::Int(self.count),
            Cell::Int(self.enquiry),
            Cell::Int(self.test_drives),
            Cell::Int(self.won),
            Cell::Percent(self.ratio),
        ]
    }
}

/// Trims, collapses inner whitespace, and maps empty to the unknown label.
pub fn normalize_source(raw: Option<&str>, unknown_label: &str) -> String {
    let collapsed = raw
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    if collapsed.is_empty() {
        unknown_label.to_string()
    } else {
        collapsed
    }
}

/// Leads sharing one canonical source label.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceGroup {
    /// First spelling encountered.
    pub label: String,
    pub count: i64,
    pub won: i64,
    /// Stored values that normalize to this label.
    pub spellings: Vec<String>,
    /// Some members have a null or blank source.
    pub has_blank: bool,
}

impl SourceGroup {
    /// Matches every stored spelling of this source.
    pub fn membership(&self) -> Predicate {
        let mut alternatives = vec![Predicate::In(Field::col(SOURCE), self.spellings.clone())];
        if self.has_blank {
            alternatives.push(Predicate::blank(SOURCE));
        }
        Predicate::Any(alternatives)
    }
}

/// Groups `source` / `final_status` rows, keyed case-insensitively, in
/// first-seen order.
pub fn group_sources(rows: &[Row], config: &ReportConfig) -> Vec<SourceGroup> {
    let mut groups: Vec<SourceGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let raw = raw_text(row, SOURCE);
        let label = normalize_source(raw.as_deref(), &config.unknown_source_label);
        let slot = *index.entry(label.to_lowercase()).or_insert_with(|| {
            groups.push(SourceGroup {
                label: label.clone(),
                count: 0,
                won: 0,
                spellings: Vec::new(),
                has_blank: false,
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.count += 1;
        if FinalStatus::from_raw(raw_text(row, FINAL_STATUS).as_deref()) == FinalStatus::Won {
            group.won += 1;
        }
        match raw {
            Some(s) if !s.trim().is_empty() => {
                if !group.spellings.contains(&s) {
                    group.spellings.push(s);
                }
            }
            _ => group.has_blank = true,
        }
    }

    groups
}

/// Walk-in figures feeding the synthetic Walkin row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkinTotals {
    pub count: i64,
    pub won: i64,
    pub test_drives: i64,
}

pub fn walkin_totals(
    store: &dyn DataStore,
    config: &ReportConfig,
    period: &ResolvedPeriod,
) -> Result<WalkinTotals, StoreError> {
    let window = period.current_filter(Field::col(CREATED_AT));
    let with = |extra: Predicate| {
        let mut p = window.clone();
        p.push(extra);
        p
    };
    Ok(WalkinTotals {
        count: store.count(WALKINS, &window)?,
        won: store.count(WALKINS, &with(Predicate::eq_ignore_case(STATUS, "won")))?,
        test_drives: store.count(
            WALKINS,
            &with(Predicate::truthy(TEST_DRIVE_DONE, &config.truthy_values)),
        )?,
    })
}

fn sort_rows(rows: &mut [SourceRow]) {
    rows.sort_by(|a, b| {
        b.ratio
            .partial_cmp(&a.ratio)
            .unwrap_or(Ordering::Equal)
            .then(b.count.cmp(&a.count))
            .then(a.source.cmp(&b.source))
    });
}

pub fn build_source_table(
    store: &dyn DataStore,
    config: &ReportConfig,
    request: &ReportRequest,
) -> Result<SummaryTable<SourceRow>, ReportError> {
    let window = request.period.current_filter(Field::col(CREATED_AT));
    let rows = store
        .fetch(LEADS, &[SOURCE, FINAL_STATUS], &window)
        .map_err(|e| ReportError::query(SECTION, e))?;
    let groups = group_sources(&rows, config);
    let mut warnings = Vec::new();

    let mut table: Vec<SourceRow> = Vec::with_capacity(groups.len() + 1);
    for group in &groups {
        let scoped = |extra: Predicate| {
            let mut p = window.clone();
            p.push(group.membership());
            p.push(extra);
            p
        };
        let enquiry = store
            .count(LEADS, &scoped(Predicate::not_null(PS_NAME)))
            .unwrap_or_else(|e| {
                warnings.push(format!("Could not compute Enquiry for {}: {e}", group.label));
                0
            });
        let test_drives = store
            .count(
                LEADS,
                &scoped(Predicate::truthy(TEST_DRIVE_STATUS, &config.truthy_values)),
            )
            .unwrap_or_else(|e| {
                warnings.push(format!("Could not compute TD for {}: {e}", group.label));
                0
            });
        table.push(SourceRow {
            source: group.label.clone(),
            count: group.count,
            enquiry,
            test_drives,
            won: group.won,
            ratio: 0.0,
        });
    }

    match walkin_totals(store, config, &request.period) {
        Ok(walkins) if walkins.count > 0 || !table.is_empty() => {
            let key = config.walkin_label.to_lowercase();
            match table.iter_mut().find(|r| r.source.to_lowercase() == key) {
                Some(row) => {
                    row.count += walkins.count;
                    row.won += walkins.won;
                    row.enquiry += walkins.count;
                    row.test_drives += walkins.test_drives;
                }
                None => table.push(SourceRow {
                    source: config.walkin_label.clone(),
                    count: walkins.count,
                    enquiry: walkins.count,
                    test_drives: walkins.test_drives,
                    won: walkins.won,
                    ratio: 0.0,
                }),
            }
        }
        Ok(_) => {}
        Err(e) => warnings.push(format!("Could not append {} row: {e}", config.walkin_label)),
    }

    for row in &mut table {
        row.ratio = conversion_ratio(row.won, row.count);
    }
    sort_rows(&mut table);

    for w in &warnings {
        log::warn!("{SECTION}: {w}");
    }
    Ok(SummaryTable::new(table).with_warnings(warnings))
}
