use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Quarter,
}

impl Granularity {
    /// <= 14 days → day, < 30 → week, < 365 → month, else quarter.
    pub fn auto(days: i64) -> Self {
        if days <= 14 {
            Granularity::Day
        } else if days < 30 {
            Granularity::Week
        } else if days < 365 {
            Granularity::Month
        } else {
            Granularity::Quarter
        }
    }
}

/// One sub-period of a trend series, inclusive bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodBucket {
    pub key: String,
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PeriodBucket {
    fn new(key: String, label: String, first: NaiveDate, next: NaiveDate) -> Option<Self> {
        let start = first.and_hms_opt(0, 0, 0)?.and_utc();
        let end = next.and_hms_opt(0, 0, 0)?.and_utc() - Duration::milliseconds(1);
        Some(PeriodBucket {
            key,
            label,
            start,
            end,
        })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Buckets covering `from..=to` at the given granularity. The first and last
/// buckets are aligned to calendar boundaries and may extend past the range.
pub fn generate_buckets(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    granularity: Granularity,
) -> Vec<PeriodBucket> {
    let (from, to) = (from.date_naive(), to.date_naive());
    match granularity {
        Granularity::Day => day_buckets(from, to),
        Granularity::Week => week_buckets(from, to),
        Granularity::Month => month_buckets(from, to, 1),
        Granularity::Quarter => month_buckets(from, to, 3),
    }
}

fn day_buckets(from: NaiveDate, to: NaiveDate) -> Vec<PeriodBucket> {
    from.iter_days()
        .take_while(|d| *d <= to)
        .filter_map(|d| {
            PeriodBucket::new(
                d.format("%Y-%m-%d").to_string(),
                d.format("%b %d").to_string(),
                d,
                d + Duration::days(1),
            )
        })
        .collect()
}

fn week_buckets(from: NaiveDate, to: NaiveDate) -> Vec<PeriodBucket> {
    let mut monday = from - Duration::days(from.weekday().num_days_from_monday() as i64);
    let mut result = Vec::new();
    while monday <= to {
        let iw = monday.iso_week();
        let next = monday + Duration::days(7);
        if let Some(b) = PeriodBucket::new(
            format!("{:04}-W{:02}", iw.year(), iw.week()),
            format!("Week {}", iw.week()),
            monday,
            next,
        ) {
            result.push(b);
        }
        monday = next;
    }
    result
}

fn month_buckets(from: NaiveDate, to: NaiveDate, span: u32) -> Vec<PeriodBucket> {
    let align = |m: u32| (m - 1) / span * span + 1;
    let mut year = from.year();
    let mut month = align(from.month());
    let mut result = Vec::new();

    while (year, month) <= (to.year(), to.month()) {
        let (next_year, next_month) = if month + span > 12 {
            (year + 1, month + span - 12)
        } else {
            (year, month + span)
        };
        let (Some(first), Some(next)) = (
            NaiveDate::from_ymd_opt(year, month, 1),
            NaiveDate::from_ymd_opt(next_year, next_month, 1),
        ) else {
            break;
        };
        let (key, label) = if span == 3 {
            let q = (month - 1) / 3 + 1;
            (format!("{year:04}-Q{q}"), format!("Q{q} {year}"))
        } else {
            (format!("{year:04}-{month:02}"), first.format("%B %Y").to_string())
        };
        if let Some(b) = PeriodBucket::new(key, label, first, next) {
            result.push(b);
        }
        year = next_year;
        month = next_month;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_auto_granularity() {
        assert_eq!(Granularity::auto(1), Granularity::Day);
        assert_eq!(Granularity::auto(14), Granularity::Day);
        assert_eq!(Granularity::auto(15), Granularity::Week);
        assert_eq!(Granularity::auto(30), Granularity::Month);
        assert_eq!(Granularity::auto(364), Granularity::Month);
        assert_eq!(Granularity::auto(365), Granularity::Quarter);
    }

    #[test]
    fn test_day_buckets() {
        let b = generate_buckets(at(2024, 2, 28), at(2024, 3, 1), Granularity::Day);
        assert_eq!(b.len(), 3);
        assert_eq!(b[1].key, "2024-02-29");
        assert_eq!(b[1].label, "Feb 29");
        assert!(b[1].contains(Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap()));
    }

    #[test]
    fn test_week_buckets_start_on_monday() {
        // 2024-01-03 is a Wednesday
        let b = generate_buckets(at(2024, 1, 3), at(2024, 1, 16), Granularity::Week);
        assert_eq!(b.len(), 3);
        assert_eq!(b[0].key, "2024-W01");
        assert_eq!(b[0].start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(b[0].label, "Week 1");
    }

    #[test]
    fn test_month_buckets_cross_year() {
        let b = generate_buckets(at(2025, 11, 15), at(2026, 2, 1), Granularity::Month);
        let keys: Vec<&str> = b.iter().map(|x| x.key.as_str()).collect();
        assert_eq!(keys, vec!["2025-11", "2025-12", "2026-01", "2026-02"]);
        assert_eq!(b[0].label, "November 2025");
        assert_eq!(
            b[1].end,
            Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );
    }

    #[test]
    fn test_quarter_buckets() {
        let b = generate_buckets(at(2026, 2, 10), at(2026, 12, 31), Granularity::Quarter);
        let keys: Vec<&str> = b.iter().map(|x| x.key.as_str()).collect();
        assert_eq!(keys, vec!["2026-Q1", "2026-Q2", "2026-Q3", "2026-Q4"]);
        assert_eq!(b[0].label, "Q1 2026");
        assert_eq!(b[0].start, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }
}
