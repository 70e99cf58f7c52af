//! Table and column names of the reporting store.

pub const LEADS: &str = "lead_master";
pub const WALKINS: &str = "walkin_table";
pub const PS_FOLLOWUPS: &str = "ps_followup_master";
pub const ACTIVITY_LEADS: &str = "activity_leads";
pub const USERS: &str = "users";
pub const CONFIG: &str = "config";

pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";
pub const SOURCE: &str = "source";
pub const CRE_NAME: &str = "cre_name";
pub const PS_NAME: &str = "ps_name";
pub const PS_ASSIGNED_AT: &str = "ps_assigned_at";
pub const LEAD_STATUS: &str = "lead_status";
pub const FINAL_STATUS: &str = "final_status";
pub const FIRST_CALL: &str = "first_call_date";
pub const PS_FIRST_CALL: &str = "ps_first_call_date";
pub const TEST_DRIVE_STATUS: &str = "test_drive_status";
pub const TAT: &str = "tat";

pub const BRANCH: &str = "branch";
pub const STATUS: &str = "status";
pub const WON_TIMESTAMP: &str = "won_timestamp";
pub const TEST_DRIVE_DONE: &str = "test_drive_done";
pub const PS_ASSIGNED: &str = "ps_assigned";

/// Walk-in Won date basis, highest priority first.
pub const WALKIN_WON_BASIS: &[&str] = &[WON_TIMESTAMP, UPDATED_AT, CREATED_AT];

pub const LEAD_COLUMNS: &[&str] = &[
    SOURCE,
    CREATED_AT,
    CRE_NAME,
    PS_NAME,
    PS_ASSIGNED_AT,
    LEAD_STATUS,
    FINAL_STATUS,
    FIRST_CALL,
    TEST_DRIVE_STATUS,
    TAT,
];

pub const WALKIN_COLUMNS: &[&str] = &[
    BRANCH,
    STATUS,
    CREATED_AT,
    FIRST_CALL,
    TEST_DRIVE_DONE,
    PS_ASSIGNED,
];

pub const STAGE_COLUMNS: &[&str] = &[PS_NAME, LEAD_STATUS, FINAL_STATUS, PS_FIRST_CALL, CREATED_AT];
