use log::{debug, info, warn};

use school_survey::batch::*;
use school_survey::payload::*;
use school_survey::record::{document_from_record, previous_meta, record_npsn};
use school_survey::sheet::{conform, flatten, generate_template, parse_rows_for, SheetError};
use school_survey::*;
use snafu::{prelude::*, Snafu};

use std::collections::HashMap;
use std::fs;

use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::{Command, JobArgs};
use crate::survey::config_reader::*;
use crate::survey::io_common::*;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;
pub mod io_template;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SurveyError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON content of {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the output"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::Error,
        path: String,
    },
    #[snafu(display("The workbook {path} has no worksheet {name:?}"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display("The workbook {path} has no worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error writing file {path}"))]
    CsvWrite { source: csv::Error, path: String },
    #[snafu(display("Error writing workbook {path}"))]
    XlsxWrite {
        source: rust_xlsxwriter::XlsxError,
        path: String,
    },
    #[snafu(display("Could not read the sheet of {path}"))]
    ReadingSheet { source: SheetError, path: String },
    #[snafu(display("Could not build the payload"))]
    BuildingPayload { source: PayloadError },
    #[snafu(display("No category code: pass --category or set categoryCode in the job file"))]
    MissingCategory {},
    #[snafu(display("No input file: pass --input or set input in the job file"))]
    MissingInput {},
    #[snafu(display("Unknown input type {input_type:?} (expected excel, csv or json)"))]
    UnknownInputType { input_type: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SurveyResult<T> = Result<T, SurveyError>;

fn category_of(job: &SurveyJob) -> SurveyResult<(&'static CategoryConfig, String)> {
    let code = job
        .category_code
        .clone()
        .filter(|c| !c.trim().is_empty())
        .context(MissingCategorySnafu {})?;
    let config = lookup(&code);
    if config.is_fallback() {
        warn!(
            "category_of: {:?} is not a known category, the output will have no class sections",
            code
        );
    }
    Ok((config, code.trim().to_uppercase()))
}

/// The survey documents of the input of a job, in the canonical shape of the category.
fn read_documents(job: &SurveyJob, config: &CategoryConfig) -> SurveyResult<Vec<Node>> {
    let input = job.input.clone().context(MissingInputSnafu {})?;
    let input_type = InputType::of(job.input_type.as_deref(), &input)?;
    info!("read_documents: reading {:?} as {:?}", input, input_type);
    match input_type {
        InputType::Json => {
            let values = match read_json(&input)? {
                JSValue::Array(l) => l,
                other => vec![other],
            };
            Ok(values
                .into_iter()
                .map(|v| conform(config, &flatten(&Node::from(v))))
                .collect())
        }
        InputType::Excel | InputType::Csv => {
            let grid = if input_type == InputType::Excel {
                io_excel::read_excel_grid(&input, job.excel_worksheet_name.as_deref())?
            } else {
                io_csv::read_csv_grid(&input)?
            };
            parse_rows_for(config, &grid).context(ReadingSheetSnafu { path: input })
        }
    }
}

fn run_template(job: &SurveyJob) -> SurveyResult<JSValue> {
    let (config, _) = category_of(job)?;
    let records = match &job.records_file {
        Some(p) => read_records(p)?,
        None => vec![],
    };
    let documents: Vec<Node> = records
        .iter()
        .map(|r| document_from_record(r, config))
        .collect();
    let template = generate_template(config, &documents);
    match job.output.as_deref() {
        Some(out) if !is_stdout(out) => {
            if out.to_lowercase().ends_with(".csv") {
                io_csv::write_csv_template(out, &template)?;
            } else {
                io_template::write_excel_template(out, config, &template)?;
            }
            info!("run_template: wrote {} rows to {}", template.rows.len(), out);
        }
        _ => {}
    }
    serde_json::to_value(&template).context(SerializingJsonSnafu {})
}

fn run_import(job: &SurveyJob) -> SurveyResult<JSValue> {
    let (config, _) = category_of(job)?;
    let documents = read_documents(job, config)?;
    Ok(JSValue::Array(documents.iter().map(|d| d.to_json()).collect()))
}

fn stored_metas(job: &SurveyJob) -> SurveyResult<HashMap<String, JSMap<String, JSValue>>> {
    let records = match &job.records_file {
        Some(p) => read_records(p)?,
        None => {
            warn!("stored_metas: no records file, every row is treated as a new record");
            vec![]
        }
    };
    let mut res: HashMap<String, JSMap<String, JSValue>> = HashMap::new();
    for record in records.iter() {
        match record_npsn(record) {
            Some(npsn) => {
                res.insert(npsn, previous_meta(record));
            }
            None => debug!("stored_metas: skipping record without npsn"),
        }
    }
    Ok(res)
}

fn run_payload(job: &SurveyJob, update: bool) -> SurveyResult<JSValue> {
    let (config, code) = category_of(job)?;
    let documents = read_documents(job, config)?;
    let labels = job.region_labels.clone().unwrap_or_default();
    if update {
        let metas = stored_metas(job)?;
        let batch = build_batch_update(&documents, config, &code, &labels, |npsn| {
            metas.get(npsn).cloned()
        });
        for e in batch.report.errors.iter() {
            eprintln!("row {} ({}): {}", e.row_index, e.identifier, e.message);
        }
        serde_json::to_value(&batch).context(SerializingJsonSnafu {})
    } else {
        let mut payloads: Vec<Payload> = Vec::new();
        for doc in documents.iter() {
            let input = PayloadInput::new(doc, config, &code).with_region_labels(labels.clone());
            payloads.push(build_create_payload(&input).context(BuildingPayloadSnafu {})?);
        }
        serde_json::to_value(&payloads).context(SerializingJsonSnafu {})
    }
}

/// Compares the output with the reference file of the job, if any.
fn check_reference(job: &SurveyJob, pretty_output: &str) -> SurveyResult<()> {
    if let Some(reference_p) = &job.reference {
        let reference = read_json(reference_p)?;
        let pretty_reference =
            serde_json::to_string_pretty(&reference).context(SerializingJsonSnafu {})?;
        if pretty_reference != pretty_output {
            warn!("Found differences with the reference file {}", reference_p);
            print_diff(pretty_reference.as_str(), pretty_output, "\n");
            whatever!("Difference detected between the output and the reference file")
        }
        info!("check_reference: output matches {}", reference_p);
    }
    Ok(())
}

pub fn run(command: &Command) -> SurveyResult<()> {
    let (job_args, update): (&JobArgs, bool) = match command {
        Command::Template(a) | Command::Import(a) => (a, false),
        Command::Payload { job, update } => (job, *update),
    };
    let job = resolve_job(job_args)?;
    debug!("run: job: {:?}", job);

    let output = match command {
        Command::Template(_) => run_template(&job)?,
        Command::Import(_) => run_import(&job)?,
        Command::Payload { .. } => run_payload(&job, update)?,
    };
    let pretty = serde_json::to_string_pretty(&output).context(SerializingJsonSnafu {})?;

    match (command, job.output.as_deref()) {
        // Templates are written as spreadsheets.
        (Command::Template(_), Some(out)) if !is_stdout(out) => {}
        (_, Some(out)) if !is_stdout(out) => {
            fs::write(out, &pretty).context(WritingFileSnafu { path: out })?;
            info!("run: wrote {}", out);
        }
        _ => println!("{}", pretty),
    }

    check_reference(&job, &pretty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!("sekolah-{}-{}", name, std::process::id()));
        fs::create_dir_all(&p).unwrap();
        p
    }

    fn path_str(p: &PathBuf) -> String {
        p.display().to_string()
    }

    #[test]
    fn template_import_payload_through_csv() {
        let dir = scratch_dir("csv");
        let records = dir.join("records.json");
        fs::write(
            &records,
            json!([{
                "school": {
                    "npsn": "20212345",
                    "name": "SD Negeri 1",
                    "meta": {"siswa": {"kelas1": {"l": 10, "p": 8}}, "kegiatanFisik": {"rehabToilet": 1}}
                },
                "guru": {"pns": 3}
            }])
            .to_string(),
        )
        .unwrap();
        let sheet = dir.join("template.csv");
        let base = SurveyJob {
            category_code: Some("SD".to_string()),
            records_file: Some(path_str(&records)),
            ..Default::default()
        };

        let template_job = SurveyJob {
            output: Some(path_str(&sheet)),
            ..base.clone()
        };
        run_template(&template_job).unwrap();

        let import_job = SurveyJob {
            input: Some(path_str(&sheet)),
            ..base.clone()
        };
        let documents = run_import(&import_job).unwrap();
        assert_eq!(documents[0]["npsn"], json!("20212345"));
        assert_eq!(documents[0]["siswa"]["kelas1"]["l"], json!(10));
        assert_eq!(documents[0]["guru"]["pns"], json!(3));
        assert_eq!(documents[0]["namaOperator"], json!(""));
        assert!(documents[0]["siswa"].get("kelas7").is_none());

        let batch = run_payload(&import_job, true).unwrap();
        assert_eq!(batch["report"]["successCount"], json!(1));
        let school = &batch["request"]["rows"][0]["school"];
        assert_eq!(school["student_count"], json!(18));
        assert_eq!(school["meta"]["kegiatanFisik"]["rehabToilet"], json!(1));
        assert_eq!(school["meta"]["kegiatanFisik"]["rehabRuangKelas"], json!(0));

        let created = run_payload(&import_job, false).unwrap();
        assert_eq!(created[0]["staffSummary"][0], json!({"role": "PNS", "count": 3, "details": null}));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn json_input_takes_the_category_shape() {
        let dir = scratch_dir("json");
        let input = dir.join("documents.json");
        fs::write(
            &input,
            json!({"npsn": 20212345, "siswa": {"kelas1": {"l": "4"}, "kelas9": {"l": 1}}}).to_string(),
        )
        .unwrap();
        let job = SurveyJob {
            category_code: Some("SD".to_string()),
            input: Some(path_str(&input)),
            ..Default::default()
        };
        let documents = run_import(&job).unwrap();
        assert_eq!(documents.as_array().map(|l| l.len()), Some(1));
        assert_eq!(documents[0]["npsn"], json!("20212345"));
        assert_eq!(documents[0]["siswa"]["kelas1"]["l"], json!(4));
        assert_eq!(documents[0]["status"], json!("NEGERI"));
        assert!(documents[0]["siswa"].get("kelas9").is_none());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn reference_mismatch_fails() {
        let dir = scratch_dir("reference");
        let reference = dir.join("expected.json");
        fs::write(&reference, "[1, 2]").unwrap();
        let job = SurveyJob {
            reference: Some(path_str(&reference)),
            ..Default::default()
        };
        let same = serde_json::to_string_pretty(&json!([1, 2])).unwrap();
        assert!(check_reference(&job, &same).is_ok());
        let different = serde_json::to_string_pretty(&json!([1, 3])).unwrap();
        assert!(check_reference(&job, &different).is_err());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_category_is_reported() {
        let job = SurveyJob::default();
        assert!(matches!(
            run_template(&job),
            Err(SurveyError::MissingCategory {})
        ));
        let job = SurveyJob {
            category_code: Some("SD".to_string()),
            ..Default::default()
        };
        assert!(matches!(run_import(&job), Err(SurveyError::MissingInput {})));
    }
}
