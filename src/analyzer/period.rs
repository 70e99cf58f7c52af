//! Period filters and their current / previous comparison windows.
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::db::predicate::{Field, Predicate};
use crate::error::PeriodError;
use crate::model::deserializers::parse_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodFilter {
    Today,
    Mtd,
    CustomRange { start: NaiveDate, end: NaiveDate },
    AllTime,
}

impl PeriodFilter {
    /// Parses a filter keyword, taking the dates for `Custom Range`.
    pub fn parse(
        keyword: &str,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Self, PeriodError> {
        match keyword.trim().to_lowercase().as_str() {
            "today" => Ok(PeriodFilter::Today),
            "mtd" => Ok(PeriodFilter::Mtd),
            "all time" | "all-time" | "alltime" => Ok(PeriodFilter::AllTime),
            "custom range" | "custom" => {
                let (Some(from), Some(to)) = (from, to) else {
                    return Err(PeriodError::MissingBounds);
                };
                let start =
                    parse_date(from).ok_or_else(|| PeriodError::InvalidDate(from.to_string()))?;
                let end = parse_date(to).ok_or_else(|| PeriodError::InvalidDate(to.to_string()))?;
                if end < start {
                    return Err(PeriodError::InvertedRange {
                        start: start.to_string(),
                        end: end.to_string(),
                    });
                }
                Ok(PeriodFilter::CustomRange { start, end })
            }
            other => Err(PeriodError::UnknownFilter(other.to_string())),
        }
    }
}

impl FromStr for PeriodFilter {
    type Err = PeriodError;

    /// Keyword only. `Custom Range` needs dates, see [`PeriodFilter::parse`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PeriodFilter::parse(s, None, None)
    }
}

impl fmt::Display for PeriodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodFilter::Today => f.write_str("Today"),
            PeriodFilter::Mtd => f.write_str("MTD"),
            PeriodFilter::CustomRange { start, end } => write!(f, "Custom Range ({start} to {end})"),
            PeriodFilter::AllTime => f.write_str("All time"),
        }
    }
}

/// Inclusive `[start, end]` interval, millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportWindow {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    pub fn predicate(&self, field: Field) -> Predicate {
        Predicate::between(field, self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPeriod {
    pub current: Option<ReportWindow>,
    pub previous: Option<ReportWindow>,
}

impl ResolvedPeriod {
    pub const ALL_TIME: ResolvedPeriod = ResolvedPeriod {
        current: None,
        previous: None,
    };

    /// Window predicate on `field` for the current period, none for all-time.
    pub fn current_filter(&self, field: Field) -> Vec<Predicate> {
        self.current.map(|w| w.predicate(field)).into_iter().collect()
    }
}

fn one_ms() -> Duration {
    Duration::milliseconds(1)
}

fn midnight(date: NaiveDate) -> Result<DateTime<Utc>, PeriodError> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| PeriodError::InvalidDate(date.to_string()))
}

fn first_of_month(date: NaiveDate) -> Result<NaiveDate, PeriodError> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .ok_or_else(|| PeriodError::InvalidDate(date.to_string()))
}

fn first_of_previous_month(date: NaiveDate) -> Result<NaiveDate, PeriodError> {
    let (y, m) = if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1).ok_or_else(|| PeriodError::InvalidDate(date.to_string()))
}

/// Resolves a filter against `now` into current and previous windows.
pub fn resolve(filter: PeriodFilter, now: DateTime<Utc>) -> Result<ResolvedPeriod, PeriodError> {
    let today = now.date_naive();
    let (current, previous) = match filter {
        PeriodFilter::AllTime => return Ok(ResolvedPeriod::ALL_TIME),
        PeriodFilter::Today => {
            let start = midnight(today)?;
            let end = start + Duration::days(1) - one_ms();
            let shift = Duration::days(1);
            (
                ReportWindow { start, end },
                ReportWindow {
                    start: start - shift,
                    end: end - shift,
                },
            )
        }
        PeriodFilter::Mtd => {
            let start = midnight(first_of_month(today)?)?;
            let prev_start = midnight(first_of_previous_month(today)?)?;
            (
                ReportWindow { start, end: now },
                ReportWindow {
                    start: prev_start,
                    end: start - one_ms(),
                },
            )
        }
        PeriodFilter::CustomRange { start, end } => {
            if end < start {
                return Err(PeriodError::InvertedRange {
                    start: start.to_string(),
                    end: end.to_string(),
                });
            }
            let start = midnight(start)?;
            let end = midnight(end)? + Duration::days(1) - one_ms();
            let prev_end = start - one_ms();
            let prev_start = prev_end - (end - start);
            (
                ReportWindow { start, end },
                ReportWindow {
                    start: prev_start,
                    end: prev_end,
                },
            )
        }
    };
    Ok(ResolvedPeriod {
        current: Some(current),
        previous: Some(previous),
    })
}

/// Optional narrowing of owner- and branch-keyed sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportScope {
    pub branch: Option<String>,
    pub owner: Option<String>,
}

/// Everything an aggregation needs to know about what is being asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub filter: PeriodFilter,
    pub period: ResolvedPeriod,
    pub scope: ReportScope,
    pub generated_at: DateTime<Utc>,
}

impl ReportRequest {
    pub fn new(
        filter: PeriodFilter,
        scope: ReportScope,
        now: DateTime<Utc>,
    ) -> Result<Self, PeriodError> {
        Ok(ReportRequest {
            filter,
            period: resolve(filter, now)?,
            scope,
            generated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_today_window_and_previous_day() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 14, 20, 0).unwrap();
        let p = resolve(PeriodFilter::Today, now).unwrap();
        let cur = p.current.unwrap();
        let prev = p.previous.unwrap();
        assert_eq!(cur.start, ts("2024-03-15T00:00:00Z"));
        assert_eq!(cur.end, ts("2024-03-15T23:59:59.999Z"));
        assert_eq!(prev.start, ts("2024-03-14T00:00:00Z"));
        assert_eq!(prev.end, ts("2024-03-14T23:59:59.999Z"));
    }

    #[test]
    fn test_mtd_mid_march() {
        let now = ts("2024-03-15T10:00:00Z");
        let p = resolve(PeriodFilter::Mtd, now).unwrap();
        let cur = p.current.unwrap();
        let prev = p.previous.unwrap();
        assert_eq!(cur.start, ts("2024-03-01T00:00:00Z"));
        assert_eq!(cur.end, now);
        assert_eq!(prev.start, ts("2024-02-01T00:00:00Z"));
        assert_eq!(prev.end, ts("2024-02-29T23:59:59.999Z"));
    }

    #[test]
    fn test_mtd_in_january_compares_to_december() {
        let p = resolve(PeriodFilter::Mtd, ts("2024-01-03T08:00:00Z")).unwrap();
        let prev = p.previous.unwrap();
        assert_eq!(prev.start, ts("2023-12-01T00:00:00Z"));
        assert_eq!(prev.end, ts("2023-12-31T23:59:59.999Z"));
    }

    #[test]
    fn test_custom_range_previous_has_equal_length() {
        let filter = PeriodFilter::parse("Custom Range", Some("2024-01-10"), Some("2024-01-20")).unwrap();
        let p = resolve(filter, Utc::now()).unwrap();
        let cur = p.current.unwrap();
        let prev = p.previous.unwrap();
        assert_eq!(cur.start, ts("2024-01-10T00:00:00Z"));
        assert_eq!(cur.end, ts("2024-01-20T23:59:59.999Z"));
        assert_eq!(prev.end, ts("2024-01-09T23:59:59.999Z"));
        assert_eq!(prev.start, ts("2023-12-30T00:00:00Z"));
        assert_eq!(prev.duration(), cur.duration());
        assert_eq!(cur.start - prev.end, Duration::milliseconds(1));
    }

    #[test]
    fn test_single_day_custom_range() {
        let filter = PeriodFilter::parse("custom", Some("2024-05-01"), Some("2024-05-01")).unwrap();
        let p = resolve(filter, Utc::now()).unwrap();
        let prev = p.previous.unwrap();
        assert_eq!(prev.start, ts("2024-04-30T00:00:00Z"));
        assert_eq!(prev.end, ts("2024-04-30T23:59:59.999Z"));
    }

    #[test]
    fn test_all_time_has_no_windows() {
        let p = resolve(PeriodFilter::AllTime, Utc::now()).unwrap();
        assert_eq!(p, ResolvedPeriod::ALL_TIME);
        assert!(p.current_filter(Field::col("created_at")).is_empty());
    }

    #[test]
    fn test_parse_keywords_and_errors() {
        assert_eq!("MTD".parse::<PeriodFilter>().unwrap(), PeriodFilter::Mtd);
        assert_eq!("today".parse::<PeriodFilter>().unwrap(), PeriodFilter::Today);
        assert_eq!("All time".parse::<PeriodFilter>().unwrap(), PeriodFilter::AllTime);
        assert_eq!(
            "Custom Range".parse::<PeriodFilter>().unwrap_err(),
            PeriodError::MissingBounds
        );
        assert!(matches!(
            "Yesterday".parse::<PeriodFilter>().unwrap_err(),
            PeriodError::UnknownFilter(_)
        ));
        assert!(matches!(
            PeriodFilter::parse("Custom Range", Some("2024-02-10"), Some("2024-02-01")).unwrap_err(),
            PeriodError::InvertedRange { .. }
        ));
        assert!(matches!(
            PeriodFilter::parse("Custom Range", Some("10/02/2024"), Some("2024-02-11")).unwrap_err(),
            PeriodError::InvalidDate(_)
        ));
    }

    #[test]
    fn test_window_contains_is_inclusive() {
        let w = ReportWindow {
            start: ts("2024-01-01T00:00:00Z"),
            end: ts("2024-01-01T23:59:59.999Z"),
        };
        assert!(w.contains(w.start));
        assert!(w.contains(w.end));
        assert!(!w.contains(w.end + Duration::milliseconds(1)));
    }
}
