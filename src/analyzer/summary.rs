//! Generic pivoted table with a pinned TOTAL row.
use serde::Serialize;

pub const TOTAL_LABEL: &str = "TOTAL";

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// `numerator / denominator * 100` rounded to two decimals, 0 on empty denominator.
pub fn conversion_ratio(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        round2(numerator as f64 / denominator as f64 * 100.0)
    }
}

/// Same as [`conversion_ratio`] at one decimal, used for chart shares.
pub fn pct(count: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        round1(count as f64 / total as f64 * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Int(i64),
    Percent(f64),
    Decimal(Option<f64>),
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Int(n) => write!(f, "{n}"),
            Cell::Percent(p) => write!(f, "{p:.2}"),
            Cell::Decimal(Some(d)) => write!(f, "{d:.1}"),
            Cell::Decimal(None) => f.write_str("-"),
        }
    }
}

/// A row of a summary table that knows how to fold itself into a total.
pub trait SummaryRow: Clone {
    /// Column-wise sum of `rows` labelled TOTAL, ratios recomputed from the sums.
    fn total_row(rows: &[Self]) -> Self;

    fn headers() -> &'static [&'static str];

    fn cells(&self) -> Vec<Cell>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTable<R> {
    pub rows: Vec<R>,
    pub total: R,
    /// Partial failures that zeroed a contribution without failing the table.
    pub warnings: Vec<String>,
}

impl<R: SummaryRow> SummaryTable<R> {
    pub fn new(rows: Vec<R>) -> Self {
        let total = R::total_row(&rows);
        SummaryTable {
            rows,
            total,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Body rows followed by the TOTAL row.
    pub fn grid(&self) -> Vec<Vec<Cell>> {
        self.rows
            .iter()
            .chain(std::iter::once(&self.total))
            .map(SummaryRow::cells)
            .collect()
    }
}
