use crate::cli::parse_setting;
use crate::config::{update_config_in_db, ReportConfig};
use crate::error::AppError;
use crate::state::Session;

pub fn get_config(session: &Session) -> Result<ReportConfig, AppError> {
    session.user.require_admin()?;
    Ok(session.config.clone())
}

/// Applies `key=value` settings and persists the result. Nothing is written
/// when any setting is malformed or names an unknown key.
pub fn update_config(session: &mut Session, settings: &[String]) -> Result<ReportConfig, AppError> {
    session.user.require_admin()?;

    let mut config = session.config.clone();
    for raw in settings {
        let (key, value) = parse_setting(raw)
            .ok_or_else(|| AppError::Custom(format!("Expected key=value, got '{raw}'")))?;
        if !config.apply(key, value) {
            return Err(AppError::Custom(format!("Unknown config key: {key}")));
        }
    }

    update_config_in_db(session.store.connection(), &config)?;
    log::info!("Configuration updated by {}", session.user.username);
    session.reload_config()?;
    Ok(session.config.clone())
}
