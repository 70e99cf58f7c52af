use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Period(#[from] PeriodError),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("{0}")]
    Custom(String),
}

impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        AppError::Export(e.to_string())
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Failures raised by a [`crate::db::store::DataStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Query on {table} failed: {source}")]
    Query {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{0}")]
    Backend(String),
}

/// Section-level failure. Carried inside the report so that one broken
/// section does not take the others down.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    #[error("Could not load {section}: {reason}")]
    Query { section: String, reason: String },

    #[error("Could not decode {section}: {reason}")]
    Decode { section: String, reason: String },

    #[error("Column {column} is missing from {table}")]
    MissingColumn { table: String, column: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ReportError {
    pub fn query(section: &str, err: impl std::fmt::Display) -> Self {
        ReportError::Query {
            section: section.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn decode(section: &str, err: impl std::fmt::Display) -> Self {
        ReportError::Decode {
            section: section.to_string(),
            reason: err.to_string(),
        }
    }
}

impl serde::Serialize for ReportError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Please enter both username and password.")]
    MissingCredentials,

    // No detail on which field was wrong.
    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error("User {0} is not an administrator")]
    NotAdmin(String),

    #[error("Authentication backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PeriodError {
    #[error("Unknown period filter: {0}")]
    UnknownFilter(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Custom Range requires both a start and an end date")]
    MissingBounds,

    #[error("Range end {end} is before start {start}")]
    InvertedRange { start: String, end: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_error_message() {
        let err = ReportError::query("Source table", "no such table: lead_master");
        assert_eq!(
            err.to_string(),
            "Could not load Source table: no such table: lead_master"
        );
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(
            json,
            "\"Could not load Source table: no such table: lead_master\""
        );
    }

    #[test]
    fn test_auth_error_has_no_field_detail() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid username or password."
        );
    }

    #[test]
    fn test_app_error_wraps_period_error() {
        let err: AppError = PeriodError::MissingBounds.into();
        assert_eq!(
            err.to_string(),
            "Custom Range requires both a start and an end date"
        );
    }
}
