pub mod report_workbook;
pub mod text;

use rust_xlsxwriter::{Format, FormatBorder, XlsxError};

use crate::analyzer::delta::Direction;
use crate::error::AppError;

/// Header row: blue #2C5F8A, white bold text, thin border.
pub fn create_header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color("2C5F8A")
        .set_font_color("FFFFFF")
        .set_font_size(11)
        .set_border(FormatBorder::Thin)
        .set_text_wrap()
}

/// #,##0.00, used for ratios already expressed in percent points.
pub fn create_number_format() -> Format {
    Format::new().set_num_format("#,##0.00")
}

pub fn create_integer_format() -> Format {
    Format::new().set_num_format("#,##0")
}

/// TOTAL row: bold with a top border, `num_format` applied when given.
pub fn create_total_format(num_format: Option<&str>) -> Format {
    let format = Format::new()
        .set_bold()
        .set_background_color("E7EEF5")
        .set_border_top(FormatBorder::Thin);
    match num_format {
        Some(nf) => format.set_num_format(nf),
        None => format,
    }
}

/// Delta cell colour: green up, red down, grey otherwise.
pub fn create_delta_format(direction: Direction) -> Format {
    let format = Format::new().set_bold();
    match direction {
        Direction::Up => format.set_font_color("006100"),
        Direction::Down => format.set_font_color("9C0006"),
        Direction::Neutral => format.set_font_color("7F7F7F"),
    }
}

/// Message row standing in for a section that failed to load.
pub fn create_error_format() -> Format {
    Format::new().set_italic().set_font_color("9C0006")
}

pub fn xlsx_err(e: XlsxError) -> AppError {
    AppError::Export(e.to_string())
}
