use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::store::DataStore;
use crate::error::StoreError;
use crate::model::columns::CONFIG;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportConfig {
    /// Lead statuses meaning a call was already attempted.
    pub attempted_lead_statuses: Vec<String>,
    /// Encodings read as true in boolean-like columns.
    pub truthy_values: Vec<String>,
    pub unknown_source_label: String,
    pub walkin_label: String,
    pub unassigned_label: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            attempted_lead_statuses: vec![
                "rnr".into(),
                "busy on another call".into(),
                "call disconnected".into(),
                "call not connected".into(),
            ],
            truthy_values: vec!["true".into(), "yes".into(), "1".into()],
            unknown_source_label: "Unknown".into(),
            walkin_label: "Walkin".into(),
            unassigned_label: "Unassigned Leads".into(),
        }
    }
}

impl ReportConfig {
    /// Applies one stored key/value. Unknown keys and unparsable values
    /// leave the current setting untouched. Returns whether the key is known.
    pub fn apply(&mut self, key: &str, value: &str) -> bool {
        match key {
            "attempted_lead_statuses" => {
                if let Ok(v) = serde_json::from_str::<Vec<String>>(value) {
                    self.attempted_lead_statuses = v;
                }
            }
            "truthy_values" => {
                if let Ok(v) = serde_json::from_str::<Vec<String>>(value) {
                    self.truthy_values = v;
                }
            }
            "unknown_source_label" if !value.trim().is_empty() => {
                self.unknown_source_label = value.trim().to_string()
            }
            "walkin_label" if !value.trim().is_empty() => {
                self.walkin_label = value.trim().to_string()
            }
            "unassigned_label" if !value.trim().is_empty() => {
                self.unassigned_label = value.trim().to_string()
            }
            "unknown_source_label" | "walkin_label" | "unassigned_label" => {}
            _ => return false,
        }
        true
    }

    pub fn is_attempted(&self, lead_status: Option<&str>) -> bool {
        lead_status.is_some_and(|s| {
            let s = s.trim().to_lowercase();
            self.attempted_lead_statuses
                .iter()
                .any(|a| a.trim().to_lowercase() == s)
        })
    }

    pub fn is_truthy(&self, value: Option<&str>) -> bool {
        value.is_some_and(|v| {
            let v = v.trim().to_lowercase();
            self.truthy_values.iter().any(|t| t.trim().to_lowercase() == v)
        })
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "attempted_lead_statuses",
                serde_json::to_string(&self.attempted_lead_statuses).unwrap_or_default(),
            ),
            (
                "truthy_values",
                serde_json::to_string(&self.truthy_values).unwrap_or_default(),
            ),
            ("unknown_source_label", self.unknown_source_label.clone()),
            ("walkin_label", self.walkin_label.clone()),
            ("unassigned_label", self.unassigned_label.clone()),
        ]
    }
}

/// Reads the `config` table through any store, falling back to defaults.
pub fn load_config(store: &dyn DataStore) -> Result<ReportConfig, StoreError> {
    let mut config = ReportConfig::default();
    for row in store.fetch(CONFIG, &["key", "value"], &[])? {
        let key = row.get("key").and_then(|v| v.as_str());
        let value = row.get("value").and_then(|v| v.as_str());
        if let (Some(key), Some(value)) = (key, value) {
            if !config.apply(key, value) {
                log::debug!("Ignoring unknown config key {key}");
            }
        }
    }
    Ok(config)
}

pub fn update_config_in_db(conn: &Connection, config: &ReportConfig) -> Result<(), rusqlite::Error> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR REPLACE INTO config (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
    )?;

    for (key, value) in config.pairs() {
        stmt.execute(rusqlite::params![key, value])?;
    }

    Ok(())
}
