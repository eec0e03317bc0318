//! The spreadsheet boundary: flat records, the bulk-edit template and row parsing.
//!
//! A document is exported as one row whose headers are the dot-joined paths of its leaves.
//! On import, the cells are read back into a document. Values under identifier-like keys
//! (registration numbers, codes, phone numbers, names and addresses) always stay text;
//! other numeric-looking text is read as a number.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value as JSValue};

use crate::config::CategoryConfig;
use crate::document::{Branch, Node};
use crate::form::{build, OPERATOR_FIELDS};
use crate::path::set;

pub const SEPARATOR: &str = ".";

/// A document flattened to one level.
pub type FlatRecord = BTreeMap<String, JSValue>;

/// Substrings of a key (compared in lower case) marking a text identifier.
const IDENTIFIER_MARKERS: &[&str] = &[
    "npsn",
    "nip",
    "kode",
    "telepon",
    "phone",
    "email",
    "alamat",
    "address",
    "nama",
    "name",
    "kecamatan",
    "desa",
    "village",
    "subdistrict",
    "latitude",
    "longitude",
    "status",
    "akreditasi",
    "kurikulum",
];

/// The columns placed first in a template, in this order. Everything else follows
/// alphabetically.
pub const PRIORITY_COLUMNS: &[&str] = &[
    "namaSekolah",
    "npsn",
    "status",
    "kecamatan",
    "kodeKecamatan",
    "desa",
    "kodeDesa",
    "alamat",
    "telepon",
    "latitude",
    "longitude",
];

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SheetError {
    /// The sheet has a header but no data row.
    EmptySheet,
    /// The sheet has no usable header row.
    MissingHeader,
}

impl Error for SheetError {}

impl Display for SheetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetError::EmptySheet => write!(f, "the sheet contains no data row"),
            SheetError::MissingHeader => write!(f, "the sheet has no header row"),
        }
    }
}

// ********* Flat records ***********

pub fn flatten(doc: &Node) -> FlatRecord {
    flatten_with(doc, SEPARATOR)
}

/// Joins the keys of nested branches. Leaves, arrays included, are passed through.
/// Empty branches are kept as empty objects so that they survive `unflatten`.
pub fn flatten_with(doc: &Node, separator: &str) -> FlatRecord {
    let mut res = FlatRecord::new();
    match doc {
        Node::Branch(b) => flatten_into(b, "", separator, &mut res),
        Node::Leaf(v) => {
            res.insert(String::new(), v.clone());
        }
    }
    res
}

fn flatten_into(branch: &Branch, prefix: &str, separator: &str, res: &mut FlatRecord) {
    for (k, child) in branch.iter() {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{}{}{}", prefix, separator, k)
        };
        match child {
            Node::Branch(b) if b.is_empty() => {
                res.insert(key, JSValue::Object(Default::default()));
            }
            Node::Branch(b) => flatten_into(b, &key, separator, res),
            Node::Leaf(v) => {
                res.insert(key, v.clone());
            }
        }
    }
}

/// Whether the values under this key are kept as text.
pub fn is_identifier_key(key: &str) -> bool {
    let k = key.to_lowercase();
    IDENTIFIER_MARKERS.iter().any(|m| k.contains(m))
}

/// Reads a number typed as text. Integers stay integers.
pub fn parse_number(text: &str) -> Option<Number> {
    let s = text.trim();
    let starts_like_a_number = s
        .chars()
        .next()
        .map(|c| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
        .unwrap_or(false);
    if !starts_like_a_number {
        return None;
    }
    if let Ok(x) = s.parse::<u64>() {
        return Some(Number::from(x));
    }
    if let Ok(x) = s.parse::<i64>() {
        return Some(Number::from(x));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}

/// The text shown in a cell for this value.
pub fn cell_text(value: &JSValue) -> String {
    match value {
        JSValue::Null => String::new(),
        JSValue::String(s) => s.clone(),
        JSValue::Number(n) => number_text(n),
        JSValue::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn number_text(n: &Number) -> String {
    match n.as_f64() {
        // Spreadsheets store every number as a float.
        Some(x) if n.is_f64() && x.fract() == 0.0 && x.abs() < 1e15 => format!("{}", x as i64),
        _ => n.to_string(),
    }
}

/// Restores the value of a cell read from a file. Arrays and objects were written as JSON
/// text.
pub fn cell_from_text(value: JSValue) -> JSValue {
    if let JSValue::String(s) = &value {
        let t = s.trim();
        if t.starts_with('[') || t.starts_with('{') {
            if let Ok(parsed) = serde_json::from_str::<JSValue>(t) {
                if parsed.is_array() || parsed.is_object() {
                    return parsed;
                }
            }
        }
    }
    value
}

// Whole floats, as read from spreadsheet cells, become integers.
fn integral(n: Number) -> Number {
    match n.as_f64() {
        Some(x) if n.is_f64() && x.fract() == 0.0 && x.abs() < 1e15 => {
            if x >= 0.0 {
                Number::from(x as u64)
            } else {
                Number::from(x as i64)
            }
        }
        _ => n,
    }
}

fn coerce(key: &str, value: JSValue) -> JSValue {
    let identifier = is_identifier_key(key);
    match value {
        JSValue::Number(n) if identifier => JSValue::String(number_text(&n)),
        JSValue::String(s) if !identifier => match parse_number(&s) {
            Some(n) => JSValue::Number(n),
            None => JSValue::String(s),
        },
        other => other,
    }
}

pub fn unflatten(record: &FlatRecord) -> Node {
    unflatten_with(record, SEPARATOR)
}

/// Rebuilds the nested document of a flat record, creating branches as needed.
pub fn unflatten_with(record: &FlatRecord, separator: &str) -> Node {
    let mut root = Branch::new();
    for (key, value) in record.iter() {
        if key.trim().is_empty() {
            debug!("unflatten_with: skipping value without key");
            continue;
        }
        let segs: Vec<&str> = key.split(separator).collect();
        insert_path(&mut root, &segs, coerce(key, value.clone()));
    }
    Node::from(root)
}

fn insert_path(branch: &mut Branch, segs: &[&str], value: JSValue) {
    let (head, rest) = match segs.split_first() {
        Some(x) => x,
        None => return,
    };
    if rest.is_empty() {
        let keeps_branch = value.is_object()
            && branch.get(*head).map(|n| n.is_branch()).unwrap_or(false);
        if !keeps_branch {
            branch.insert(head.to_string(), Node::from(value));
        }
        return;
    }
    let child = branch.entry(head.to_string()).or_insert_with(Node::empty);
    if !child.is_branch() {
        *child = Node::empty();
    }
    if let Node::Branch(b) = child {
        insert_path(Arc::make_mut(b), rest, value);
    }
}

// ********* Template ***********

/// The header and rows of a bulk-edit spreadsheet.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SheetTemplate {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<JSValue>>,
}

/// Whether a flattened key belongs in the template of a category.
///
/// Operator contact fields are never exported, and neither are the rooms the category's
/// infrastructure variant does not report.
pub fn is_relevant_field(config: &CategoryConfig, key: &str) -> bool {
    if OPERATOR_FIELDS.contains(&key) {
        return false;
    }
    let segs: Vec<&str> = key.split(SEPARATOR).collect();
    match segs.as_slice() {
        ["prasarana", "ruangan", room, ..] => config.infrastructure.uses_room(room),
        _ => true,
    }
}

fn column_rank(key: &str) -> usize {
    PRIORITY_COLUMNS
        .iter()
        .position(|c| *c == key)
        .unwrap_or(PRIORITY_COLUMNS.len())
}

/// The ordered columns of the template of a category.
pub fn template_columns(config: &CategoryConfig) -> Vec<String> {
    let mut columns: Vec<String> = flatten(&build(config))
        .into_keys()
        .filter(|k| is_relevant_field(config, k))
        .collect();
    columns.sort_by(|a, b| column_rank(a).cmp(&column_rank(b)).then_with(|| a.cmp(b)));
    columns
}

fn sort_key(doc: &Node) -> (String, String) {
    let text = |k: &str| {
        doc.as_branch()
            .and_then(|b| b.get(k))
            .map(|n| n.text().trim().to_lowercase())
            .unwrap_or_default()
    };
    (text("kecamatan"), text("namaSekolah"))
}

/// Builds the template of a category, one row per document, sorted by sub-district then
/// name. Without documents, the template holds one empty row.
pub fn generate_template(config: &CategoryConfig, documents: &[Node]) -> SheetTemplate {
    let headers = template_columns(config);
    let empty = build(config);
    let mut sorted: Vec<&Node> = documents.iter().collect();
    sorted.sort_by_key(|d| sort_key(d));
    if sorted.is_empty() {
        sorted.push(&empty);
    }
    let rows: Vec<Vec<JSValue>> = sorted
        .iter()
        .map(|doc| {
            let flat = flatten(doc);
            headers
                .iter()
                .map(|h| flat.get(h).cloned().unwrap_or_else(|| JSValue::String(String::new())))
                .collect()
        })
        .collect();
    info!(
        "generate_template: {}: {} columns, {} rows",
        config.code,
        headers.len(),
        rows.len()
    );
    SheetTemplate { headers, rows }
}

// ********* Parsing ***********

fn is_blank(value: &JSValue) -> bool {
    match value {
        JSValue::Null => true,
        JSValue::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn grid_cell(cell: Option<&JSValue>) -> JSValue {
    match cell {
        Some(JSValue::Null) | None => JSValue::String(String::new()),
        Some(JSValue::Number(n)) => JSValue::Number(integral(n.clone())),
        Some(v) => cell_from_text(v.clone()),
    }
}

/// The headers and the flat records of a sheet.
fn parse_records(grid: &[Vec<JSValue>]) -> Result<(Vec<String>, Vec<FlatRecord>), SheetError> {
    let (header_row, data) = grid.split_first().ok_or(SheetError::MissingHeader)?;
    let headers: Vec<String> = header_row.iter().map(|c| cell_text(c).trim().to_string()).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(SheetError::MissingHeader);
    }
    let mut records: Vec<FlatRecord> = Vec::new();
    for (idx, row) in data.iter().enumerate() {
        if row.iter().all(is_blank) {
            debug!("parse_records: skipping blank row {}", idx + 2);
            continue;
        }
        if row.len() > headers.len() {
            warn!(
                "parse_records: row {} has {} cells beyond the header",
                idx + 2,
                row.len() - headers.len()
            );
        }
        let mut record = FlatRecord::new();
        for (col, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            record.insert(header.clone(), grid_cell(row.get(col)));
        }
        records.push(record);
    }
    if records.is_empty() {
        return Err(SheetError::EmptySheet);
    }
    info!("parse_records: read {} rows", records.len());
    Ok((headers, records))
}

/// Reads the rows of a sheet. The first row is the header; each following row becomes a
/// document holding the columns of the sheet. Missing cells are read as empty strings and
/// fully blank rows are skipped.
pub fn parse_rows(grid: &[Vec<JSValue>]) -> Result<Vec<Node>, SheetError> {
    let (_, records) = parse_records(grid)?;
    Ok(records.iter().map(unflatten).collect())
}

/// Lays a flat record over the canonical-empty document of a category. Keys the category
/// does not have are dropped.
pub fn conform(config: &CategoryConfig, record: &FlatRecord) -> Node {
    let empty = build(config);
    let canonical = flatten(&empty);
    let mut doc = empty;
    for (key, value) in record.iter() {
        match canonical.get(key) {
            Some(default) if !default.is_object() => {
                doc = set(&doc, key, Node::from(coerce(key, value.clone())));
            }
            _ => debug!("conform: {}: dropping {}", config.code, key),
        }
    }
    doc
}

/// Reads the rows of a sheet into documents of a category, as `parse_rows` does. Every
/// document has the canonical shape of the category; columns it does not have are ignored.
pub fn parse_rows_for(
    config: &CategoryConfig,
    grid: &[Vec<JSValue>],
) -> Result<Vec<Node>, SheetError> {
    let (headers, records) = parse_records(grid)?;
    let canonical = flatten(&build(config));
    for h in headers.iter().filter(|h| !h.is_empty()) {
        if canonical.get(h.as_str()).map(|v| v.is_object()).unwrap_or(true) {
            warn!("parse_rows_for: {}: ignoring column {}", config.code, h);
        }
    }
    Ok(records.iter().map(|r| conform(config, r)).collect())
}
