//! Chart-ready aggregates: category slices and a lead creation trend.
use serde::Serialize;

use super::period::ReportRequest;
use super::sources::group_sources;
use super::summary::pct;
use super::temporal::{generate_buckets, Granularity, PeriodBucket};
use crate::config::ReportConfig;
use crate::db::predicate::{Field, Predicate};
use crate::db::store::DataStore;
use crate::error::ReportError;
use crate::model::columns::*;
use crate::model::{from_rows, FinalStatus, Lead, WalkIn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSlice {
    pub category: String,
    pub count: i64,
    pub percent: f64,
}

fn slices(mut counts: Vec<(String, i64)>) -> Vec<ChartSlice> {
    let total: i64 = counts.iter().map(|(_, c)| c).sum();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    counts
        .into_iter()
        .map(|(category, count)| ChartSlice {
            category,
            count,
            percent: pct(count, total),
        })
        .collect()
}

/// Lead count per canonical source.
pub fn source_mix(
    store: &dyn DataStore,
    config: &ReportConfig,
    request: &ReportRequest,
) -> Result<Vec<ChartSlice>, ReportError> {
    let window = request.period.current_filter(Field::col(CREATED_AT));
    let rows = store
        .fetch(LEADS, &[SOURCE, FINAL_STATUS], &window)
        .map_err(|e| ReportError::query("Source-wise lead count", e))?;
    Ok(slices(
        group_sources(&rows, config)
            .into_iter()
            .map(|g| (g.label, g.count))
            .collect(),
    ))
}

/// Walk-ins per status. Empty categories are left out.
pub fn walkin_status_mix(
    store: &dyn DataStore,
    request: &ReportRequest,
) -> Result<Vec<ChartSlice>, ReportError> {
    const SECTION: &str = "Walkin status mix";
    let mut predicates = request.period.current_filter(Field::col(CREATED_AT));
    if let Some(branch) = &request.scope.branch {
        predicates.push(Predicate::eq_ignore_case(BRANCH, branch));
    }
    let rows = store
        .fetch(WALKINS, &[STATUS], &predicates)
        .map_err(|e| ReportError::query(SECTION, e))?;
    let walkins: Vec<WalkIn> = from_rows(rows).map_err(|e| ReportError::decode(SECTION, e))?;

    let mut counts: Vec<(String, i64)> = ["Pending", "Won", "Lost", "Other"]
        .iter()
        .map(|l| (l.to_string(), 0))
        .collect();
    for w in &walkins {
        let label = w.status().label().to_string();
        if let Some(slot) = counts.iter_mut().find(|(l, _)| *l == label) {
            slot.1 += 1;
        }
    }
    counts.retain(|(_, c)| *c > 0);
    Ok(slices(counts))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    #[serde(flatten)]
    pub bucket: PeriodBucket,
    pub created: i64,
    pub won: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSeries {
    pub granularity: Granularity,
    pub points: Vec<TrendPoint>,
}

/// Leads created (and eventually won) per sub-period. All-time spans the
/// first to the last creation date on record.
pub fn lead_trend(
    store: &dyn DataStore,
    request: &ReportRequest,
) -> Result<TrendSeries, ReportError> {
    const SECTION: &str = "Lead trend";
    let window = request.period.current_filter(Field::col(CREATED_AT));
    let rows = store
        .fetch(LEADS, &[CREATED_AT, FINAL_STATUS], &window)
        .map_err(|e| ReportError::query(SECTION, e))?;
    let leads: Vec<Lead> = from_rows(rows).map_err(|e| ReportError::decode(SECTION, e))?;

    let stamps = leads.iter().filter_map(|l| l.created_at);
    let bounds = match request.period.current {
        Some(w) => Some((w.start, w.end)),
        None => stamps.clone().min().zip(stamps.max()),
    };
    let Some((from, to)) = bounds else {
        return Ok(TrendSeries {
            granularity: Granularity::Day,
            points: Vec::new(),
        });
    };

    let granularity = Granularity::auto((to - from).num_days() + 1);
    let mut points: Vec<TrendPoint> = generate_buckets(from, to, granularity)
        .into_iter()
        .map(|bucket| TrendPoint {
            bucket,
            created: 0,
            won: 0,
        })
        .collect();

    for lead in &leads {
        let Some(at) = lead.created_at else {
            continue;
        };
        if let Some(point) = points.iter_mut().find(|p| p.bucket.contains(at)) {
            point.created += 1;
            if lead.status() == FinalStatus::Won {
                point.won += 1;
            }
        }
    }

    Ok(TrendSeries {
        granularity,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::period::{PeriodFilter, ReportScope};
    use crate::db::queries::fixtures::*;
    use chrono::{TimeZone, Utc};

    fn all_time() -> ReportRequest {
        ReportRequest::new(PeriodFilter::AllTime, ReportScope::default(), Utc::now()).unwrap()
    }

    #[test]
    fn test_source_mix_percentages() {
        let store = empty_store();
        let conn = store.connection();
        for _ in 0..3 {
            insert_lead(conn, Some("Google"), "2024-01-01", None, None, None, None, None);
        }
        insert_lead(conn, Some(""), "2024-01-01", None, None, None, None, None);

        let mix = source_mix(&store, &ReportConfig::default(), &all_time()).unwrap();
        assert_eq!(mix.len(), 2);
        assert_eq!(mix[0].category, "Google");
        assert_eq!(mix[0].percent, 75.0);
        assert_eq!(mix[1].category, "Unknown");
        assert_eq!(mix[1].percent, 25.0);
    }

    #[test]
    fn test_walkin_status_mix_counts_missing_as_pending() {
        let store = empty_store();
        let conn = store.connection();
        insert_walkin(conn, Some("N"), None, "2024-01-01", None, None, None);
        insert_walkin(conn, Some("N"), Some("Won"), "2024-01-01", None, None, None);
        insert_walkin(conn, Some("N"), Some("won"), "2024-01-01", None, None, None);

        let mix = walkin_status_mix(&store, &all_time()).unwrap();
        assert_eq!(mix.len(), 2);
        assert_eq!((mix[0].category.as_str(), mix[0].count), ("Won", 2));
        assert_eq!((mix[1].category.as_str(), mix[1].count), ("Pending", 1));
        assert_eq!(mix[1].percent, 33.3);
    }

    #[test]
    fn test_lead_trend_mtd_is_daily() {
        let store = empty_store();
        let conn = store.connection();
        insert_lead(conn, None, "2024-03-02 09:00:00", None, None, None, Some("Won"), None);
        insert_lead(conn, None, "2024-03-02 18:00:00", None, None, None, None, None);
        insert_lead(conn, None, "2024-03-05 10:00:00", None, None, None, None, None);
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let request = ReportRequest::new(PeriodFilter::Mtd, ReportScope::default(), now).unwrap();

        let trend = lead_trend(&store, &request).unwrap();
        assert_eq!(trend.granularity, Granularity::Day);
        assert_eq!(trend.points.len(), 10);
        assert_eq!((trend.points[1].created, trend.points[1].won), (2, 1));
        assert_eq!(trend.points[4].created, 1);
    }

    #[test]
    fn test_lead_trend_all_time_spans_data() {
        let store = empty_store();
        let conn = store.connection();
        insert_lead(conn, None, "2024-01-15", None, None, None, None, None);
        insert_lead(conn, None, "2024-04-15", None, None, None, None, None);

        let trend = lead_trend(&store, &all_time()).unwrap();
        assert_eq!(trend.granularity, Granularity::Month);
        assert_eq!(trend.points.len(), 4);
        assert_eq!(trend.points[0].created, 1);
        assert_eq!(trend.points[3].created, 1);
    }

    #[test]
    fn test_lead_trend_empty() {
        let trend = lead_trend(&empty_store(), &all_time()).unwrap();
        assert!(trend.points.is_empty());
    }
}
