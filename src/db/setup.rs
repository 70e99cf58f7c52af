use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::Connection;

use super::migrations::run_migrations;
use super::predicate::{TIMESTAMP_FORMAT, UTC_TIMESTAMP_FN};
use crate::model::deserializers::parse_timestamp;

pub fn init_db(path: &str) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA cache_size = -16000;
        PRAGMA busy_timeout = 5000;
        PRAGMA temp_store = MEMORY;
    ",
    )?;

    run_migrations(&conn)?;

    Ok(conn)
}

/// Migrated in-memory database, used by tests and dry runs.
pub fn open_in_memory() -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open_in_memory()?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Registers `utc_ts(value)`: the value read with the same lenient parser as
/// fetched rows, as UTC text in [`TIMESTAMP_FORMAT`], or NULL.
pub fn register_functions(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.create_scalar_function(
        UTC_TIMESTAMP_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let parsed = match ctx.get_raw(0) {
                ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok().and_then(parse_timestamp),
                _ => None,
            };
            Ok(parsed.map(|ts| ts.format(TIMESTAMP_FORMAT).to_string()))
        },
    )
}
