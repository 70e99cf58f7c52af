//! Filter combinators understood by every [`super::store::DataStore`].
//!
//! A slice of predicates is ANDed together. SQL backends compile them with
//! [`compile_where`], which pushes bound values into `params` and references
//! them as `?N` (1-indexed, taken from `params.len()` after the push).
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rusqlite::types::Value;

use crate::error::StoreError;

static IDENTIFIER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static identifier regex"));

/// Canonical text form timestamps are compared in.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// SQL function normalizing a stored timestamp to [`TIMESTAMP_FORMAT`] in UTC.
/// Registered on every connection by [`super::setup::register_functions`].
pub const UTC_TIMESTAMP_FN: &str = "utc_ts";

/// Columns a table actually has. Columns outside the set compile to `NULL`,
/// so predicates over them behave as on an absent value. An empty set
/// disables the check.
#[derive(Debug, Clone, Copy, Default)]
pub struct KnownColumns<'a>(pub &'a [String]);

impl KnownColumns<'_> {
    pub fn contains(&self, name: &str) -> bool {
        self.0.is_empty() || self.0.iter().any(|c| c.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Column(String),
    /// First non-blank value among the columns, per record.
    Coalesce(Vec<String>),
}

impl Field {
    pub fn col(name: &str) -> Self {
        Field::Column(name.to_string())
    }

    pub fn coalesce<S: AsRef<str>>(names: &[S]) -> Self {
        Field::Coalesce(names.iter().map(|n| n.as_ref().to_string()).collect())
    }

    fn to_sql(&self, known: KnownColumns<'_>) -> Result<String, StoreError> {
        match self {
            Field::Column(name) => {
                let quoted = quote_identifier(name)?;
                Ok(if known.contains(name) { quoted } else { "NULL".into() })
            }
            Field::Coalesce(names) => {
                if names.is_empty() {
                    return Err(StoreError::InvalidIdentifier("COALESCE()".into()));
                }
                let mut parts = Vec::new();
                for name in names {
                    let quoted = quote_identifier(name)?;
                    if known.contains(name) {
                        parts.push(format!("NULLIF(TRIM({quoted}), '')"));
                    }
                }
                Ok(match parts.as_slice() {
                    [] => "NULL".into(),
                    [one] => one.clone(),
                    _ => format!("COALESCE({})", parts.join(", ")),
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Exact equality.
    Eq(Field, String),
    /// Equality after trimming and lowercasing both sides.
    EqIgnoreCase(Field, String),
    IsNull(Field),
    NotNull(Field),
    /// Null or whitespace only.
    Blank(Field),
    /// Present and not whitespace only.
    NotBlank(Field),
    /// Inclusive timestamp range, compared in UTC.
    Between {
        field: Field,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Exact membership. An empty set matches nothing.
    In(Field, Vec<String>),
    /// Case-folded non-membership. Nulls count as outside the set.
    NotInIgnoreCase(Field, Vec<String>),
    /// Value, trimmed and lowercased, is one of the given tokens.
    Truthy(Field, Vec<String>),
    /// Disjunction. An empty list matches nothing.
    Any(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(column: &str, value: &str) -> Self {
        Predicate::Eq(Field::col(column), value.to_string())
    }

    pub fn eq_ignore_case(column: &str, value: &str) -> Self {
        Predicate::EqIgnoreCase(Field::col(column), value.to_string())
    }

    pub fn is_null(column: &str) -> Self {
        Predicate::IsNull(Field::col(column))
    }

    pub fn not_null(column: &str) -> Self {
        Predicate::NotNull(Field::col(column))
    }

    pub fn blank(column: &str) -> Self {
        Predicate::Blank(Field::col(column))
    }

    pub fn not_blank(column: &str) -> Self {
        Predicate::NotBlank(Field::col(column))
    }

    pub fn between(field: Field, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Predicate::Between { field, start, end }
    }

    pub fn truthy(column: &str, tokens: &[String]) -> Self {
        Predicate::Truthy(Field::col(column), tokens.to_vec())
    }

    fn compile(&self, known: KnownColumns<'_>, params: &mut Vec<Value>) -> Result<String, StoreError> {
        let sql = match self {
            Predicate::Eq(field, value) => {
                let expr = field.to_sql(known)?;
                params.push(Value::Text(value.clone()));
                format!("{expr} = ?{}", params.len())
            }
            Predicate::EqIgnoreCase(field, value) => {
                let expr = folded(field, known)?;
                params.push(Value::Text(value.trim().to_lowercase()));
                format!("{expr} = ?{}", params.len())
            }
            Predicate::IsNull(field) => format!("{} IS NULL", field.to_sql(known)?),
            Predicate::NotNull(field) => format!("{} IS NOT NULL", field.to_sql(known)?),
            Predicate::Blank(field) => {
                let expr = field.to_sql(known)?;
                format!("({expr} IS NULL OR TRIM(CAST({expr} AS TEXT)) = '')")
            }
            Predicate::NotBlank(field) => {
                let expr = field.to_sql(known)?;
                format!("({expr} IS NOT NULL AND TRIM(CAST({expr} AS TEXT)) <> '')")
            }
            Predicate::Between { field, start, end } => {
                let expr = field.to_sql(known)?;
                params.push(Value::Text(start.format(TIMESTAMP_FORMAT).to_string()));
                let lo = params.len();
                params.push(Value::Text(end.format(TIMESTAMP_FORMAT).to_string()));
                let hi = params.len();
                format!("{UTC_TIMESTAMP_FN}({expr}) BETWEEN ?{lo} AND ?{hi}")
            }
            Predicate::In(field, values) => {
                if values.is_empty() {
                    return Ok("0".into());
                }
                let expr = field.to_sql(known)?;
                let slots = push_all(params, values.iter().cloned());
                format!("{expr} IN ({slots})")
            }
            Predicate::NotInIgnoreCase(field, values) => {
                let expr = field.to_sql(known)?;
                if values.is_empty() {
                    return Ok("1".into());
                }
                let folded_expr = folded(field, known)?;
                let slots = push_all(params, values.iter().map(|v| v.trim().to_lowercase()));
                format!("({expr} IS NULL OR {folded_expr} NOT IN ({slots}))")
            }
            Predicate::Truthy(field, tokens) => {
                if tokens.is_empty() {
                    return Ok("0".into());
                }
                let expr = folded(field, known)?;
                let slots = push_all(params, tokens.iter().map(|t| t.trim().to_lowercase()));
                format!("{expr} IN ({slots})")
            }
            Predicate::Any(alternatives) => {
                if alternatives.is_empty() {
                    return Ok("0".into());
                }
                let parts = alternatives
                    .iter()
                    .map(|p| p.compile(known, params))
                    .collect::<Result<Vec<_>, _>>()?;
                format!("({})", parts.join(" OR "))
            }
        };
        Ok(sql)
    }
}

fn folded(field: &Field, known: KnownColumns<'_>) -> Result<String, StoreError> {
    Ok(format!("LOWER(TRIM(CAST({} AS TEXT)))", field.to_sql(known)?))
}

fn push_all(params: &mut Vec<Value>, values: impl Iterator<Item = String>) -> String {
    let mut slots = Vec::new();
    for v in values {
        params.push(Value::Text(v));
        slots.push(format!("?{}", params.len()));
    }
    slots.join(", ")
}

pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_REGEX.is_match(name)
}

pub fn quote_identifier(name: &str) -> Result<String, StoreError> {
    if is_valid_identifier(name) {
        Ok(format!("\"{name}\""))
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Builds ` WHERE a AND b ...` (leading space) or an empty string.
pub fn compile_where(
    predicates: &[Predicate],
    known: KnownColumns<'_>,
    params: &mut Vec<Value>,
) -> Result<String, StoreError> {
    if predicates.is_empty() {
        return Ok(String::new());
    }
    let parts = predicates
        .iter()
        .map(|p| p.compile(known, params))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!(" WHERE {}", parts.join(" AND ")))
}
