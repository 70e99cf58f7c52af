use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use crate::analyzer::dashboard::DashboardReport;
use crate::error::AppError;
use crate::export::report_workbook;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub path: String,
    pub size_bytes: u64,
    pub duration_ms: u64,
}

pub fn export_excel_report(report: &DashboardReport, path: &Path) -> Result<ExportResult, AppError> {
    let start = Instant::now();

    let bytes = report_workbook::generate_report_workbook(report)?;
    std::fs::write(path, &bytes)?;

    let result = ExportResult {
        path: path.display().to_string(),
        size_bytes: bytes.len() as u64,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    log::info!("Wrote {} ({} bytes)", result.path, result.size_bytes);
    Ok(result)
}
