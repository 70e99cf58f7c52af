use rusqlite::{params_from_iter, types::ValueRef, Connection};
use serde_json::Value;

use super::predicate::{compile_where, quote_identifier, KnownColumns};
use super::store::{DataStore, Row};
use crate::error::StoreError;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Wraps `conn`, registering the SQL functions predicates compile to.
    pub fn new(conn: Connection) -> Result<Self, rusqlite::Error> {
        super::setup::register_functions(&conn)?;
        Ok(Self { conn })
    }

    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        Self::new(super::setup::init_db(path)?)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn query_err(table: &str) -> impl FnOnce(rusqlite::Error) -> StoreError + '_ {
    move |source| StoreError::Query {
        table: table.to_string(),
        source,
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(hex::encode(b)),
    }
}

impl DataStore for SqliteStore {
    fn count(&self, table: &str, predicates: &[super::predicate::Predicate]) -> Result<i64, StoreError> {
        let known = self.columns(table)?;
        let mut params = Vec::new();
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            quote_identifier(table)?,
            compile_where(predicates, KnownColumns(&known), &mut params)?
        );
        log::debug!("count: {sql}");

        let mut stmt = self.conn.prepare_cached(&sql).map_err(query_err(table))?;
        stmt.query_row(params_from_iter(params), |row| row.get(0))
            .map_err(query_err(table))
    }

    fn fetch(
        &self,
        table: &str,
        columns: &[&str],
        predicates: &[super::predicate::Predicate],
    ) -> Result<Vec<Row>, StoreError> {
        let known = self.columns(table)?;
        let selected = if columns.is_empty() {
            "*".to_string()
        } else {
            let present = KnownColumns(&known);
            columns
                .iter()
                .map(|c| {
                    let quoted = quote_identifier(c)?;
                    Ok(if present.contains(c) {
                        quoted
                    } else {
                        format!("NULL AS {quoted}")
                    })
                })
                .collect::<Result<Vec<_>, StoreError>>()?
                .join(", ")
        };
        let mut params = Vec::new();
        let sql = format!(
            "SELECT {selected} FROM {}{} ORDER BY rowid",
            quote_identifier(table)?,
            compile_where(predicates, KnownColumns(&known), &mut params)?
        );
        log::debug!("fetch: {sql}");

        let mut stmt = self.conn.prepare_cached(&sql).map_err(query_err(table))?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let rows = stmt
            .query_map(params_from_iter(params), |row| {
                let mut record = Row::new();
                for (i, name) in names.iter().enumerate() {
                    record.insert(name.clone(), to_json(row.get_ref(i)?));
                }
                Ok(record)
            })
            .map_err(query_err(table))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err(table))?;

        Ok(rows)
    }

    fn columns(&self, table: &str) -> Result<Vec<String>, StoreError> {
        let sql = format!("PRAGMA table_info({})", quote_identifier(table)?);
        let mut stmt = self.conn.prepare(&sql).map_err(query_err(table))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(query_err(table))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err(table))?;
        Ok(names)
    }
}

// ─── Test fixtures ───────────────────────────────────────────────────────────
