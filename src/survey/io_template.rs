// Writing of the bulk-edit workbook.

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use school_survey::sheet::{cell_text, SheetTemplate};

use crate::survey::*;

/// The largest number of columns of a worksheet.
const MAX_COLUMNS: usize = 16_384;

fn worksheet_name(config: &CategoryConfig) -> String {
    if config.is_fallback() {
        "Data".to_string()
    } else {
        format!("Data {}", config.code)
    }
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &JSValue,
) -> Result<(), XlsxError> {
    match value {
        JSValue::Number(n) => match n.as_f64() {
            Some(x) => sheet.write_number(row, col, x).map(|_| ()),
            None => sheet.write_string(row, col, &n.to_string()).map(|_| ()),
        },
        JSValue::Bool(b) => sheet.write_boolean(row, col, *b).map(|_| ()),
        JSValue::Null => Ok(()),
        // Identifiers such as registration numbers stay text cells.
        other => {
            let text = cell_text(other);
            if text.is_empty() {
                Ok(())
            } else {
                sheet.write_string(row, col, &text).map(|_| ())
            }
        }
    }
}

fn fill_worksheet(
    sheet: &mut Worksheet,
    config: &CategoryConfig,
    template: &SheetTemplate,
) -> Result<(), XlsxError> {
    let header_format = Format::new().set_bold();
    sheet.set_name(&worksheet_name(config))?;
    for (col, header) in template.headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, header, &header_format)?;
        let width = (header.len() as f64).clamp(10.0, 48.0);
        sheet.set_column_width(col as u16, width)?;
    }
    for (idx, row) in template.rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            write_cell(sheet, (idx + 1) as u32, col as u16, value)?;
        }
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

/// Writes a template as an Excel workbook with a single worksheet.
pub fn write_excel_template(
    path: &str,
    config: &CategoryConfig,
    template: &SheetTemplate,
) -> SurveyResult<()> {
    if template.headers.len() > MAX_COLUMNS {
        whatever!(
            "The template has {} columns, more than a worksheet can hold",
            template.headers.len()
        );
    }
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    fill_worksheet(sheet, config, template).context(XlsxWriteSnafu { path })?;
    workbook.save(path).context(XlsxWriteSnafu { path })?;
    debug!(
        "write_excel_template: {}: {} columns, {} rows",
        simplify_file_name(path),
        template.headers.len(),
        template.rows.len()
    );
    Ok(())
}
