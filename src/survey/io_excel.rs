// Reading of Excel and OpenDocument workbooks.

use calamine::{open_workbook_auto, DataType, Reader};
use serde_json::json;

use crate::survey::*;

/// The value of a cell. Empty cells and cells in error read as empty strings.
pub fn cell_value(cell: &DataType) -> JSValue {
    match cell {
        DataType::String(s) => JSValue::String(s.clone()),
        DataType::Int(i) => json!(*i),
        DataType::Float(f) | DataType::DateTime(f) => json!(*f),
        DataType::Bool(b) => JSValue::Bool(*b),
        DataType::Empty => JSValue::String(String::new()),
        other => {
            warn!("cell_value: unreadable cell {:?}", other);
            JSValue::String(String::new())
        }
    }
}

/// Reads a worksheet as a grid of cell values: the named one, or the first one.
pub fn read_excel_grid(path: &str, worksheet: Option<&str>) -> SurveyResult<Vec<Vec<JSValue>>> {
    let mut workbook = open_workbook_auto(path).context(OpeningExcelSnafu { path })?;
    let wrange = match worksheet {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { path, name })?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?,
    };
    let (height, width) = wrange.get_size();
    debug!(
        "read_excel_grid: {}: {} rows, {} columns",
        simplify_file_name(path),
        height,
        width
    );
    let grid: Vec<Vec<JSValue>> = wrange
        .rows()
        .map(|row| row.iter().map(cell_value).collect())
        .collect();
    Ok(grid)
}
