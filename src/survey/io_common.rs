use crate::survey::*;

use std::path::Path;

pub fn is_stdout(path: &str) -> bool {
    path.is_empty() || path == "stdout"
}

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

pub fn read_json(path: &str) -> SurveyResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let js: JSValue =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_json: read {}", simplify_file_name(path));
    Ok(js)
}

/// The kinds of files documents are read from.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum InputType {
    Excel,
    Csv,
    Json,
}

impl InputType {
    /// The explicit type if given, otherwise the one matching the extension of the file.
    /// Unknown extensions are read as Excel workbooks.
    pub fn of(explicit: Option<&str>, path: &str) -> SurveyResult<InputType> {
        match explicit.map(|s| s.trim().to_lowercase()) {
            Some(t) => match t.as_str() {
                "excel" | "xlsx" | "xls" | "ods" => Ok(InputType::Excel),
                "csv" => Ok(InputType::Csv),
                "json" => Ok(InputType::Json),
                _ => UnknownInputTypeSnafu { input_type: t }.fail(),
            },
            None => {
                let ext = Path::new(path)
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_lowercase())
                    .unwrap_or_default();
                Ok(match ext.as_str() {
                    "csv" => InputType::Csv,
                    "json" => InputType::Json,
                    _ => InputType::Excel,
                })
            }
        }
    }
}
