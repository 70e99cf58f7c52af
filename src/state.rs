use std::path::Path;

use crate::auth::{authenticate, AuthenticatedUser};
use crate::config::{load_config, ReportConfig};
use crate::db::queries::SqliteStore;
use crate::error::AppError;

/// Everything a command needs once the user is signed in: the store handle,
/// who is asking and the reporting configuration in force.
pub struct Session {
    pub store: SqliteStore,
    pub user: AuthenticatedUser,
    pub config: ReportConfig,
}

impl Session {
    /// Opens (and migrates) the database, then authenticates before anything
    /// else is read.
    pub fn open(db_path: &Path, username: &str, password: &str) -> Result<Self, AppError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let path = db_path
            .to_str()
            .ok_or_else(|| AppError::Custom(format!("Invalid database path: {}", db_path.display())))?;
        let store = SqliteStore::open(path)?;
        Self::sign_in(store, username, password)
    }

    pub fn sign_in(store: SqliteStore, username: &str, password: &str) -> Result<Self, AppError> {
        let user = authenticate(&store, username, password)?;
        let config = load_config(&store)?;
        Ok(Session {
            store,
            user,
            config,
        })
    }

    pub fn reload_config(&mut self) -> Result<(), AppError> {
        self.config = load_config(&self.store)?;
        Ok(())
    }
}
