pub mod columns;
pub mod deserializers;
pub mod types;

pub use types::{from_rows, raw_text, FinalStatus, Lead, StageLead, UserRecord, WalkIn};
