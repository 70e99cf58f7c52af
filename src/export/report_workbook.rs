use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::analyzer::dashboard::DashboardReport;
use crate::analyzer::period::ReportWindow;
use crate::analyzer::summary::{Cell, SummaryRow, SummaryTable};
use crate::error::{AppError, ReportError};
use crate::export::{
    create_delta_format, create_error_format, create_header_format, create_integer_format,
    create_number_format, create_total_format, xlsx_err,
};

/// Builds the dashboard workbook: one KPI sheet plus one sheet per summary
/// table. Returns the XLSX bytes.
pub fn generate_report_workbook(report: &DashboardReport) -> Result<Vec<u8>, AppError> {
    let mut wb = Workbook::new();
    write_kpis(&mut wb, report).map_err(xlsx_err)?;
    write_table(&mut wb, "Sources", report.sources.as_ref()).map_err(xlsx_err)?;
    write_table(&mut wb, "Branches", report.branches.as_ref()).map_err(xlsx_err)?;
    write_table(&mut wb, "CRE", report.cre.as_ref()).map_err(xlsx_err)?;
    write_table(&mut wb, "PS", report.ps.as_ref().map(|p| &p.table)).map_err(xlsx_err)?;
    wb.save_to_buffer().map_err(xlsx_err)
}

fn window_label(window: Option<&ReportWindow>) -> String {
    match window {
        Some(w) => format!(
            "{} to {}",
            w.start.format("%Y-%m-%d %H:%M"),
            w.end.format("%Y-%m-%d %H:%M")
        ),
        None => "-".to_string(),
    }
}

// ── Sheet 1: KPI ─────────────────────────────────────────────────────────────

fn write_kpis(wb: &mut Workbook, report: &DashboardReport) -> Result<(), XlsxError> {
    let ws = wb.add_worksheet();
    ws.set_name("KPI")?;

    let hdr = create_header_format();
    let int = create_integer_format();
    let err = create_error_format();

    let meta = &report.meta;
    let header_rows: [(&str, String); 4] = [
        ("Period", meta.filter.clone()),
        ("Current window", window_label(meta.period.current.as_ref())),
        ("Previous window", window_label(meta.period.previous.as_ref())),
        (
            "Generated at",
            meta.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ),
    ];
    for (i, (label, value)) in header_rows.iter().enumerate() {
        ws.write_with_format(i as u32, 0, *label, &hdr)?;
        ws.write(i as u32, 1, value.as_str())?;
    }

    let first = (header_rows.len() + 1) as u32;
    let headers = ["Indicator", "Value", "Previous", "Change", "Share"];
    for (col, h) in headers.iter().enumerate() {
        ws.write_with_format(first, col as u16, *h, &hdr)?;
    }

    let mut row = first + 1;
    for kpi in &report.kpis {
        match kpi {
            Ok(card) => {
                ws.write(row, 0, card.label.as_str())?;
                ws.write_with_format(row, 1, card.value as f64, &int)?;
                match card.previous {
                    Some(prev) => ws.write_with_format(row, 2, prev as f64, &int)?,
                    None => ws.write(row, 2, "-")?,
                };
                ws.write_with_format(
                    row,
                    3,
                    card.delta.to_string(),
                    &create_delta_format(card.direction),
                )?;
                if let Some(share) = &card.share {
                    ws.write(row, 4, share.as_str())?;
                }
            }
            Err(e) => {
                ws.write_with_format(row, 0, e.to_string(), &err)?;
            }
        }
        row += 1;
    }

    let degraded = report.degraded();
    if !degraded.is_empty() {
        row += 1;
        ws.write_with_format(row, 0, "Warnings", &hdr)?;
        for message in degraded {
            row += 1;
            ws.write_with_format(row, 0, message, &err)?;
        }
    }

    ws.set_column_width(0, 24)?;
    ws.set_column_width(1, 36)?;
    ws.set_column_width(2, 12)?;
    ws.set_column_width(3, 12)?;
    ws.set_column_width(4, 12)?;

    Ok(())
}

// ── Summary table sheets ─────────────────────────────────────────────────────

fn write_table<R: SummaryRow>(
    wb: &mut Workbook,
    name: &str,
    table: Result<&SummaryTable<R>, &ReportError>,
) -> Result<(), XlsxError> {
    let ws = wb.add_worksheet();
    ws.set_name(name)?;

    let hdr = create_header_format();
    let headers = R::headers();
    for (col, h) in headers.iter().enumerate() {
        ws.write_with_format(0, col as u16, *h, &hdr)?;
    }
    ws.set_column_width(0, 28)?;
    for col in 1..headers.len() {
        ws.set_column_width(col as u16, 12)?;
    }
    ws.set_freeze_panes(1, 0)?;

    let table = match table {
        Ok(t) => t,
        Err(e) => {
            ws.write_with_format(1, 0, e.to_string(), &create_error_format())?;
            return Ok(());
        }
    };

    let body = (create_integer_format(), create_number_format(), Format::new());
    let total = (
        create_total_format(Some("#,##0")),
        create_total_format(Some("#,##0.00")),
        create_total_format(None),
    );

    let grid = table.grid();
    let last = grid.len() - 1;
    for (i, cells) in grid.iter().enumerate() {
        let row = (i + 1) as u32;
        let (int, num, text) = if i == last { &total } else { &body };
        for (col, cell) in cells.iter().enumerate() {
            write_cell(ws, row, col as u16, cell, int, num, text)?;
        }
    }

    let last_row = (grid.len()) as u32;
    if last_row > 1 {
        ws.autofilter(0, 0, last_row - 1, (headers.len() - 1) as u16)?;
    }

    if !table.warnings.is_empty() {
        let err = create_error_format();
        for (i, w) in table.warnings.iter().enumerate() {
            ws.write_with_format(last_row + 2 + i as u32, 0, w.as_str(), &err)?;
        }
    }

    Ok(())
}

fn write_cell(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    int: &Format,
    num: &Format,
    text: &Format,
) -> Result<(), XlsxError> {
    match cell {
        Cell::Text(s) => ws.write_with_format(row, col, s.as_str(), text)?,
        Cell::Int(n) => ws.write_with_format(row, col, *n as f64, int)?,
        Cell::Percent(p) => ws.write_with_format(row, col, *p, num)?,
        Cell::Decimal(Some(d)) => ws.write_with_format(row, col, *d, num)?,
        Cell::Decimal(None) => ws.write_with_format(row, col, "-", text)?,
    };
    Ok(())
}
