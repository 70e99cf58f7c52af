use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::deserializers::de;
use crate::db::store::Row;

/// Outcome of a lead. An absent status reads as `Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum FinalStatus {
    Pending,
    Won,
    Lost,
    Other(String),
}

impl FinalStatus {
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()) {
            None => FinalStatus::Pending,
            Some(s) if s.is_empty() || s == "pending" => FinalStatus::Pending,
            Some(s) if s == "won" => FinalStatus::Won,
            Some(s) if s == "lost" => FinalStatus::Lost,
            Some(s) => FinalStatus::Other(s),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            FinalStatus::Pending => "Pending",
            FinalStatus::Won => "Won",
            FinalStatus::Lost => "Lost",
            FinalStatus::Other(_) => "Other",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Lead {
    #[serde(default, deserialize_with = "de::opt_text")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "de::opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub cre_name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub ps_name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_timestamp")]
    pub ps_assigned_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub lead_status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub final_status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub first_call_date: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub test_drive_status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub tat: Option<f64>,
}

impl Lead {
    pub fn status(&self) -> FinalStatus {
        FinalStatus::from_raw(self.final_status.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalkIn {
    #[serde(default, deserialize_with = "de::opt_text")]
    pub branch: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub first_call_date: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub test_drive_done: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub ps_assigned: Option<String>,
}

impl WalkIn {
    pub fn status(&self) -> FinalStatus {
        FinalStatus::from_raw(self.status.as_deref())
    }
}

/// A PS followup or an activity lead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StageLead {
    #[serde(default, deserialize_with = "de::opt_text")]
    pub ps_name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub lead_status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub final_status: Option<String>,
    #[serde(default, alias = "ps_first_call_date", deserialize_with = "de::opt_text")]
    pub first_call_date: Option<String>,
    #[serde(default, deserialize_with = "de::opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl StageLead {
    pub fn status(&self) -> FinalStatus {
        FinalStatus::from_raw(self.final_status.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    #[serde(deserialize_with = "de::opt_text")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub password_hash: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "de::flag")]
    pub is_active: bool,
}

/// Column value as stored, untrimmed. Null and missing columns read as None.
pub fn raw_text(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Decodes fetched rows into typed records.
pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, serde_json::Error> {
    rows.into_iter()
        .map(|row| serde_json::from_value(serde_json::Value::Object(row)))
        .collect()
}
