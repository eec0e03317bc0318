// Primitives for reading and writing CSV files.

use school_survey::sheet::{cell_text, SheetTemplate};

use crate::survey::*;

/// Reads all the lines of a CSV file as text cells. Lines may have different lengths.
pub fn read_csv_grid(path: &str) -> SurveyResult<Vec<Vec<JSValue>>> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    // Excel prepends a byte order mark to UTF-8 files.
    let text = contents.trim_start_matches('\u{FEFF}');
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut grid: Vec<Vec<JSValue>> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        let line = line_r.context(CsvLineParseSnafu { lineno: idx + 1 })?;
        grid.push(line.iter().map(|s| JSValue::String(s.to_string())).collect());
    }
    debug!(
        "read_csv_grid: {}: {} lines",
        simplify_file_name(path),
        grid.len()
    );
    Ok(grid)
}

/// Writes a template as CSV, with a byte order mark so that Excel reads it as UTF-8.
pub fn write_csv_template(path: &str, template: &SheetTemplate) -> SurveyResult<()> {
    let mut buffer: Vec<u8> = "\u{FEFF}".as_bytes().to_vec();
    {
        let mut wtr = csv::Writer::from_writer(&mut buffer);
        wtr.write_record(&template.headers)
            .context(CsvWriteSnafu { path })?;
        for row in template.rows.iter() {
            wtr.write_record(row.iter().map(cell_text))
                .context(CsvWriteSnafu { path })?;
        }
        wtr.flush().context(WritingFileSnafu { path })?;
    }
    fs::write(path, buffer).context(WritingFileSnafu { path })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn template_round_trip() {
        let p = std::env::temp_dir().join(format!("sekolah-io-csv-{}.csv", std::process::id()));
        let path = p.display().to_string();
        let template = SheetTemplate {
            headers: vec!["npsn".to_string(), "guru.pns".to_string(), "tags".to_string()],
            rows: vec![vec![json!("0123"), json!(3), json!(["a", "b,c"])]],
        };
        write_csv_template(&path, &template).unwrap();
        let grid = read_csv_grid(&path).unwrap();
        assert_eq!(grid[0], vec![json!("npsn"), json!("guru.pns"), json!("tags")]);
        assert_eq!(grid[1], vec![json!("0123"), json!("3"), json!("[\"a\",\"b,c\"]")]);
        fs::remove_file(&p).unwrap();
    }
}
