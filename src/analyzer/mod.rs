pub mod branches;
pub mod charts;
pub mod classifier;
pub mod cre;
pub mod dashboard;
pub mod delta;
pub mod period;
pub mod ps;
pub mod sources;
pub mod stats;
pub mod summary;
pub mod temporal;
pub mod union;

pub use dashboard::{build_dashboard, DashboardReport, KpiCard};
pub use delta::Delta;
pub use period::{PeriodFilter, ReportRequest, ReportScope};
