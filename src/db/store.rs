use serde_json::{Map, Value};

use super::predicate::Predicate;
use crate::error::StoreError;

/// One fetched record, keyed by column name.
pub type Row = Map<String, Value>;

/// Read access to the reporting tables.
///
/// Every aggregation goes through this trait so the pipeline can run
/// against SQLite, a test double, or any other backend with the same tables.
pub trait DataStore {
    /// Number of rows in `table` matching every predicate.
    fn count(&self, table: &str, predicates: &[Predicate]) -> Result<i64, StoreError>;

    /// Selected columns of every matching row, in storage order.
    fn fetch(
        &self,
        table: &str,
        columns: &[&str],
        predicates: &[Predicate],
    ) -> Result<Vec<Row>, StoreError>;

    /// Column names of `table`. Empty when the table does not exist.
    fn columns(&self, table: &str) -> Result<Vec<String>, StoreError>;

    fn has_column(&self, table: &str, column: &str) -> Result<bool, StoreError> {
        Ok(self.columns(table)?.iter().any(|c| c == column))
    }
}
