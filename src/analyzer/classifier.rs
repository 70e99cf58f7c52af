//! Per-record bucket predicates shared by the summary tables.
use serde::Serialize;

use crate::config::ReportConfig;
use crate::model::{FinalStatus, Lead, StageLead, WalkIn};

fn folded(value: Option<&str>) -> String {
    value.map(|s| s.trim().to_lowercase()).unwrap_or_default()
}

/// A first call has been logged.
pub fn is_touched(first_call: Option<&str>) -> bool {
    first_call.is_some_and(|s| !s.trim().is_empty())
}

/// Explicitly "pending", an absent status does not count.
fn is_literally_pending(final_status: Option<&str>) -> bool {
    folded(final_status) == "pending"
}

fn is_pending_or_null(final_status: Option<&str>) -> bool {
    final_status.is_none() || is_literally_pending(final_status)
}

/// CRE work bucket of a lead. At most one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CreBucket {
    /// Call attempted without reaching the customer.
    Touched,
    /// Never attempted.
    Untouched,
    /// Customer asked to be called back.
    Followup,
    /// Reached, outcome still pending.
    Open,
}

pub fn classify_cre(lead: &Lead, config: &ReportConfig) -> Option<CreBucket> {
    let first_call = is_touched(lead.first_call_date.as_deref());
    let lead_status = folded(lead.lead_status.as_deref());
    let final_status = lead.final_status.as_deref();

    if first_call {
        return is_literally_pending(final_status).then_some(CreBucket::Open);
    }
    if config.is_attempted(lead.lead_status.as_deref()) && is_literally_pending(final_status) {
        Some(CreBucket::Touched)
    } else if lead_status == "pending" && is_pending_or_null(final_status) {
        Some(CreBucket::Untouched)
    } else if lead_status == "call me back" && is_pending_or_null(final_status) {
        Some(CreBucket::Followup)
    } else {
        None
    }
}

/// Walk-in pending split: `Some(true)` touched, `Some(false)` untouched,
/// `None` when the walk-in is not explicitly pending.
pub fn walkin_touch(walkin: &WalkIn) -> Option<bool> {
    is_literally_pending(walkin.status.as_deref())
        .then(|| is_touched(walkin.first_call_date.as_deref()))
}

/// Generic untouched rule for owner stages: pending or absent status, no
/// first call, and no attempt recorded in the lead status.
pub fn is_untouched(
    status: &FinalStatus,
    first_call: Option<&str>,
    lead_status: Option<&str>,
    config: &ReportConfig,
) -> bool {
    *status == FinalStatus::Pending && !is_touched(first_call) && !config.is_attempted(lead_status)
}

pub fn stage_untouched(stage: &StageLead, config: &ReportConfig) -> bool {
    is_untouched(
        &stage.status(),
        stage.first_call_date.as_deref(),
        stage.lead_status.as_deref(),
        config,
    )
}
