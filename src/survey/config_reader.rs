use crate::survey::*;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The settings of one run, as read from a JSON job file.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyJob {
    #[serde(rename = "categoryCode")]
    pub category_code: Option<String>,
    pub input: Option<String>,
    #[serde(rename = "inputType")]
    pub input_type: Option<String>,
    pub output: Option<String>,
    #[serde(rename = "recordsFile")]
    pub records_file: Option<String>,
    pub reference: Option<String>,
    #[serde(rename = "regionLabels")]
    pub region_labels: Option<RegionLabels>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

pub fn read_job(path: &str) -> SurveyResult<SurveyJob> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let job: SurveyJob = serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    Ok(job)
}

/// Resolves a path of the job file against the directory of that file.
fn resolve_path(root: &Path, p: &str) -> String {
    if is_stdout(p) || Path::new(p).is_absolute() {
        return p.to_string();
    }
    let full: PathBuf = root.join(p);
    full.display().to_string()
}

fn resolve_paths(job: SurveyJob, root: &Path) -> SurveyJob {
    let resolve = |o: Option<String>| o.map(|p| resolve_path(root, &p));
    SurveyJob {
        input: resolve(job.input),
        output: resolve(job.output),
        records_file: resolve(job.records_file),
        reference: resolve(job.reference),
        ..job
    }
}

/// Lays the command-line options over the job. Paths given on the command line are taken
/// as they are.
pub fn merge_args(job: SurveyJob, args: &JobArgs) -> SurveyJob {
    let labels = job.region_labels.clone().unwrap_or_default();
    let region_labels = RegionLabels {
        subdistrict: args.subdistrict.clone().or(labels.subdistrict),
        village: args.village.clone().or(labels.village),
    };
    SurveyJob {
        category_code: args.category.clone().or(job.category_code),
        input: args.input.clone().or(job.input),
        input_type: args.input_type.clone().or(job.input_type),
        output: args.out.clone().or(job.output),
        records_file: args.records.clone().or(job.records_file),
        reference: args.reference.clone().or(job.reference),
        region_labels: if region_labels == RegionLabels::default() {
            None
        } else {
            Some(region_labels)
        },
        excel_worksheet_name: args
            .excel_worksheet_name
            .clone()
            .or(job.excel_worksheet_name),
    }
}

/// The settings of a run: the job file if there is one, overridden by the command line.
pub fn resolve_job(args: &JobArgs) -> SurveyResult<SurveyJob> {
    let job = match &args.config {
        Some(config_p) => {
            info!("resolve_job: reading job file {}", config_p);
            let job = read_job(config_p)?;
            let root = Path::new(config_p)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default();
            resolve_paths(job, &root)
        }
        None => SurveyJob::default(),
    };
    Ok(merge_args(job, args))
}

/// Reads the records stored by the backend: a JSON array, or an object holding the array
/// under `records` or `data`.
pub fn read_records(path: &str) -> SurveyResult<Vec<JSValue>> {
    let js = read_json(path)?;
    let records = match js {
        JSValue::Array(l) => l,
        JSValue::Object(mut m) => match m.remove("records").or_else(|| m.remove("data")) {
            Some(JSValue::Array(l)) => l,
            _ => whatever!("{} does not contain a list of records", path),
        },
        _ => whatever!("{} does not contain a list of records", path),
    };
    info!("read_records: {} records in {}", records.len(), path);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn job_file_keys() {
        let job: SurveyJob = serde_json::from_value(json!({
            "categoryCode": "PKBM",
            "input": "filled.xlsx",
            "recordsFile": "records.json",
            "regionLabels": {"subdistrict": "Coblong"}
        }))
        .unwrap();
        assert_eq!(job.category_code.as_deref(), Some("PKBM"));
        assert_eq!(job.records_file.as_deref(), Some("records.json"));
        assert_eq!(
            job.region_labels,
            Some(RegionLabels {
                subdistrict: Some("Coblong".to_string()),
                village: None
            })
        );
        assert_eq!(job.output, None);
    }

    #[test]
    fn command_line_wins() {
        let job = SurveyJob {
            category_code: Some("SD".to_string()),
            input: Some("/data/a.xlsx".to_string()),
            region_labels: Some(RegionLabels {
                subdistrict: Some("Coblong".to_string()),
                village: Some("Dago".to_string()),
            }),
            ..Default::default()
        };
        let args = JobArgs {
            category: Some("SMP".to_string()),
            village: Some("Lebakgede".to_string()),
            out: Some("stdout".to_string()),
            ..Default::default()
        };
        let merged = merge_args(job, &args);
        assert_eq!(merged.category_code.as_deref(), Some("SMP"));
        assert_eq!(merged.input.as_deref(), Some("/data/a.xlsx"));
        assert_eq!(merged.output.as_deref(), Some("stdout"));
        let labels = merged.region_labels.unwrap();
        assert_eq!(labels.subdistrict.as_deref(), Some("Coblong"));
        assert_eq!(labels.village.as_deref(), Some("Lebakgede"));
        assert_eq!(merge_args(SurveyJob::default(), &JobArgs::default()), SurveyJob::default());
    }

    #[test]
    fn job_paths_are_relative_to_the_job_file() {
        let job = SurveyJob {
            input: Some("filled.xlsx".to_string()),
            output: Some("stdout".to_string()),
            reference: Some("/abs/expected.json".to_string()),
            ..Default::default()
        };
        let resolved = resolve_paths(job, Path::new("/jobs/sd"));
        assert_eq!(resolved.input.as_deref(), Some("/jobs/sd/filled.xlsx"));
        assert_eq!(resolved.output.as_deref(), Some("stdout"));
        assert_eq!(resolved.reference.as_deref(), Some("/abs/expected.json"));
    }
}
