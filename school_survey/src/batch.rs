//! Preparation of the batch-update call from imported spreadsheet rows.
//!
//! One malformed row never stops the batch: every row either yields an update payload or
//! an entry in the error list.

use std::collections::HashMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

use crate::config::CategoryConfig;
use crate::document::Node;
use crate::path::get;
use crate::payload::{build_update_payload, Payload, PayloadInput, RegionLabels};

/// The argument of the batch-update procedure.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BatchUpdateRequest {
    #[serde(rename = "categoryCode")]
    pub category_code: String,
    pub rows: Vec<Payload>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BatchRowError {
    #[serde(rename = "rowIndex")]
    pub row_index: usize,
    pub identifier: String,
    pub message: String,
}

/// The outcome of a batch, as reported by the batch-update procedure.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    #[serde(rename = "successCount")]
    pub success_count: usize,
    #[serde(rename = "failCount")]
    pub fail_count: usize,
    pub errors: Vec<BatchRowError>,
}

impl BatchReport {
    fn fail(&mut self, row_index: usize, identifier: String, message: String) {
        warn!("batch row {} ({}): {}", row_index, identifier, message);
        self.fail_count += 1;
        self.errors.push(BatchRowError {
            row_index,
            identifier,
            message,
        });
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BatchUpdate {
    pub request: BatchUpdateRequest,
    pub report: BatchReport,
}

fn row_text(doc: &Node, key: &str) -> String {
    get(doc, key)
        .map(|n| n.text().trim().to_string())
        .unwrap_or_default()
}

/// How a row is named in error reports: its registration number, else its name, else its
/// position.
pub fn row_identifier(doc: &Node, row_index: usize) -> String {
    let npsn = row_text(doc, "npsn");
    if !npsn.is_empty() {
        return npsn;
    }
    let name = row_text(doc, "namaSekolah");
    if !name.is_empty() {
        return name;
    }
    format!("row {}", row_index)
}

/// Builds one update payload per row.
///
/// `previous` returns the stored meta tree of a registration number, if the record exists.
/// Rows without a registration number, or repeating one already seen in the batch, are
/// reported as errors, as are the rows the payload builder rejects.
pub fn build_batch_update<F>(
    rows: &[Node],
    config: &CategoryConfig,
    category_code: &str,
    region_labels: &RegionLabels,
    previous: F,
) -> BatchUpdate
where
    F: Fn(&str) -> Option<JSMap<String, JSValue>>,
{
    let mut report = BatchReport::default();
    let mut payloads: Vec<Payload> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (idx, doc) in rows.iter().enumerate() {
        let identifier = row_identifier(doc, idx);
        let npsn = row_text(doc, "npsn");
        if npsn.is_empty() {
            report.fail(idx, identifier, "missing npsn".to_string());
            continue;
        }
        if let Some(first) = seen.get(&npsn) {
            let message = format!("duplicate npsn, first seen in row {}", first);
            report.fail(idx, identifier, message);
            continue;
        }
        seen.insert(npsn.clone(), idx);
        let previous_meta = previous(&npsn).unwrap_or_default();
        let input = PayloadInput::new(doc, config, category_code)
            .with_region_labels(region_labels.clone());
        match build_update_payload(&input, &previous_meta) {
            Ok(payload) => {
                report.success_count += 1;
                payloads.push(payload);
            }
            Err(e) => report.fail(idx, identifier, e.to_string()),
        }
    }
    info!(
        "build_batch_update: {}: {} rows ready, {} failed",
        category_code, report.success_count, report.fail_count
    );
    BatchUpdate {
        request: BatchUpdateRequest {
            category_code: category_code.trim().to_string(),
            rows: payloads,
        },
        report,
    }
}
