//! Construction of the argument of the create and update remote procedures.
//!
//! The payload carries the structured columns (`location`, `school`, `classes`,
//! `staffSummary`) and the meta tree holding everything else the survey collects. On update
//! the new meta tree is laid over the stored one, key by key, so that anything the current
//! category does not compute survives.

use std::error::Error;
use std::fmt::Display;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

use crate::aggregate::*;
use crate::config::*;
use crate::document::Node;
use crate::form::*;
use crate::normalize::{self, FlagKind};
use crate::path::{get, set};

// ********* Inputs ***********

/// Region names resolved by the caller, taking precedence over the ones typed in the
/// document.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionLabels {
    pub subdistrict: Option<String>,
    pub village: Option<String>,
}

/// Everything the builders need. The document, the configuration and the category code
/// are mandatory; they are optional here only so that a missing one is reported instead of
/// guessed.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct PayloadInput<'a> {
    pub document: Option<&'a Node>,
    pub config: Option<&'a CategoryConfig>,
    pub category_code: Option<&'a str>,
    pub region_labels: RegionLabels,
}

impl<'a> PayloadInput<'a> {
    pub fn new(document: &'a Node, config: &'a CategoryConfig, category_code: &'a str) -> Self {
        PayloadInput {
            document: Some(document),
            config: Some(config),
            category_code: Some(category_code),
            region_labels: RegionLabels::default(),
        }
    }

    pub fn with_region_labels(self, region_labels: RegionLabels) -> Self {
        PayloadInput {
            region_labels,
            ..self
        }
    }
}

/// Missing arguments of the payload builders.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum PayloadError {
    MissingDocument,
    /// The document root is not a branch.
    InvalidDocument,
    MissingConfiguration,
    MissingCategoryCode,
}

impl Error for PayloadError {}

impl Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadError::MissingDocument => write!(f, "no survey document provided"),
            PayloadError::InvalidDocument => write!(f, "the survey document is not an object"),
            PayloadError::MissingConfiguration => write!(f, "no category configuration provided"),
            PayloadError::MissingCategoryCode => write!(f, "no category code provided"),
        }
    }
}

// ********* Outputs ***********

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub subdistrict: String,
    pub village: String,
    pub subdistrict_code: String,
    pub village_code: String,
    pub address: String,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct School {
    pub npsn: String,
    pub name: String,
    pub category: String,
    pub status: String,
    pub address: String,
    pub student_count: u64,
    pub st_male: u64,
    pub st_female: u64,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub meta: JSMap<String, JSValue>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ClassEntry {
    pub grade: String,
    pub count: u64,
    pub extra: Option<JSValue>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StaffEntry {
    pub role: String,
    pub count: u64,
    pub details: Option<JSValue>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Payload {
    pub location: Location,
    pub school: School,
    pub classes: Vec<ClassEntry>,
    #[serde(rename = "staffSummary")]
    pub staff_summary: Vec<StaffEntry>,
}

/// The roles of the staff summary, in order, with the teacher field they read.
/// `None` stands for the derived total.
pub const STAFF_ROLES: &[(&str, Option<&str>)] = &[
    ("PNS", Some("pns")),
    ("PPPK", Some("pppk")),
    ("PPPK_PARUH_WAKTU", Some("pppkParuhWaktu")),
    ("NON_ASN_DAPODIK", Some("nonAsnDapodik")),
    ("NON_ASN_TIDAK_DAPODIK", Some("nonAsnTidakDapodik")),
    ("KEKURANGAN_GURU", Some(SHORTFALL_FIELD)),
    ("JUMLAH_GURU", None),
];

// ********* Helpers ***********

fn text_at(doc: &Node, path: &str) -> String {
    get(doc, path).map(|n| n.text().trim().to_string()).unwrap_or_default()
}

/// Parses a coordinate typed as text. Empty or unreadable input gives `None`.
pub fn parse_coordinate(node: Option<&Node>) -> Option<f64> {
    let x = match node? {
        Node::Leaf(JSValue::Number(n)) => n.as_f64(),
        Node::Leaf(JSValue::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    if x.is_finite() {
        Some(x)
    } else {
        None
    }
}

/// Whether a field was filled in. Zero counts as provided, blanks do not.
pub fn is_provided(node: Option<&Node>) -> bool {
    match node {
        Some(Node::Leaf(JSValue::String(s))) => !s.trim().is_empty(),
        Some(Node::Leaf(JSValue::Null)) => false,
        Some(Node::Leaf(_)) => true,
        _ => false,
    }
}

fn counts_of(doc: &Node, root: &str, fields: &[&str]) -> Node {
    Node::branch(
        fields
            .iter()
            .map(|f| (*f, Node::from(count_at(doc, &format!("{}.{}", root, f))))),
    )
}

fn zeros(fields: &[&str]) -> Node {
    Node::branch(fields.iter().map(|f| (*f, Node::from(0u64))))
}

/// The counts of a per-section domain, one entry per section of the layout.
fn section_breakdown(doc: &Node, root: &str, shape: &ShapeVariant, paired: bool) -> Node {
    let mut tree = Node::empty();
    for section in shape.sections() {
        let source = format!("{}.{}", root, section.path);
        if paired {
            for g in GENDER_FIELDS {
                tree = set(
                    &tree,
                    &format!("{}.{}", section.path, g),
                    Node::from(count_at(doc, &format!("{}.{}", source, g))),
                );
            }
        } else {
            tree = set(&tree, &section.path, Node::from(count_at(doc, &source)));
        }
    }
    tree
}

fn continuation_meta(doc: &Node, config: &CategoryConfig) -> Node {
    Node::branch([
        (
            IN_DISTRICT,
            counts_of(doc, &format!("lanjut.{}", IN_DISTRICT), config.continuation_targets),
        ),
        (
            OUT_OF_DISTRICT,
            counts_of(doc, &format!("lanjut.{}", OUT_OF_DISTRICT), config.continuation_targets),
        ),
        (
            NOT_CONTINUING,
            Node::from(count_at(doc, &format!("lanjut.{}", NOT_CONTINUING))),
        ),
        (WORKING, Node::from(count_at(doc, &format!("lanjut.{}", WORKING)))),
    ])
}

fn institutional_meta(doc: &Node) -> Node {
    Node::branch(INSTITUTIONAL_FIELDS.iter().map(|(field, kind)| {
        (
            *field,
            Node::from(kind.normalize_node(get(doc, &format!("kelembagaan.{}", field)))),
        )
    }))
}

/// The infrastructure tree, with the same fields for every category. Rooms the category
/// does not report are zero-filled.
fn infrastructure_meta(doc: &Node, variant: InfrastructureVariant) -> Node {
    let land = Node::branch(LAND_FIELDS.iter().map(|f| {
        (
            *f,
            Node::from(measure(get(doc, &format!("prasarana.ukuran.{}", f)))),
        )
    }));
    let rooms = Node::branch(ROOMS.iter().map(|room| {
        let counts = if variant.uses_room(room) {
            counts_of(doc, &format!("prasarana.ruangan.{}", room), CONDITION_FIELDS)
        } else {
            zeros(CONDITION_FIELDS)
        };
        (*room, counts)
    }));
    let furniture = Node::branch(FURNITURE.iter().map(|item| {
        (
            *item,
            counts_of(doc, &format!("prasarana.mebeulair.{}", item), FURNITURE_FIELDS),
        )
    }));
    Node::branch([
        ("ukuran", land),
        ("ruangKelas", counts_of(doc, "prasarana.ruangKelas", CLASSROOM_FIELDS)),
        ("ruangan", rooms),
        ("mebeulair", furniture),
        ("komputer", counts_of(doc, "prasarana.komputer", COMPUTING_FIELDS)),
        (
            EQUIPMENT_FIELD,
            Node::from(FlagKind::Equipment.normalize_node(get(
                doc,
                &format!("prasarana.{}", EQUIPMENT_FIELD),
            ))),
        ),
    ])
}

fn teacher_meta(doc: &Node) -> Node {
    let totals = teacher_totals(doc);
    let mut tree = counts_of(doc, "guru", EMPLOYMENT_FIELDS);
    tree = set(
        &tree,
        SHORTFALL_FIELD,
        Node::from(count_at(doc, &format!("guru.{}", SHORTFALL_FIELD))),
    );
    tree = set(&tree, DIRECT_TOTAL_FIELD, Node::from(totals.total));
    set(&tree, "asn", Node::from(totals.asn))
}

/// The planned works, or `None` when none of them was filled in during this session.
fn planned_works_meta(doc: &Node) -> Option<Node> {
    let provided = PLANNED_WORKS
        .iter()
        .any(|f| is_provided(get(doc, &format!("kegiatanFisik.{}", f))));
    if provided {
        Some(counts_of(doc, "kegiatanFisik", PLANNED_WORKS))
    } else {
        None
    }
}

fn subdistrict_label(doc: &Node, labels: &RegionLabels) -> String {
    labels
        .subdistrict
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| text_at(doc, "kecamatan"))
}

fn village_label(doc: &Node, labels: &RegionLabels) -> String {
    labels
        .village
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| text_at(doc, "desa"))
}

// ********* Meta tree ***********

/// The meta fields computed from the current document.
///
/// `kegiatanFisik` is only present when at least one planned work was filled in.
pub fn compute_meta(
    doc: &Node,
    config: &CategoryConfig,
    labels: &RegionLabels,
) -> JSMap<String, JSValue> {
    let keys = config.shape.meta_keys();
    let mut meta: JSMap<String, JSValue> = JSMap::new();
    meta.insert(
        keys.students.to_string(),
        section_breakdown(doc, "siswa", &config.shape, true).to_json(),
    );
    meta.insert(
        keys.special_needs.to_string(),
        section_breakdown(doc, "siswaAbk", &config.shape, true).to_json(),
    );
    meta.insert(
        keys.rombel.to_string(),
        section_breakdown(doc, "rombel", &config.shape, false).to_json(),
    );
    meta.insert("lanjut".to_string(), continuation_meta(doc, config).to_json());
    meta.insert("kelembagaan".to_string(), institutional_meta(doc).to_json());
    meta.insert(
        "prasarana".to_string(),
        infrastructure_meta(doc, config.infrastructure).to_json(),
    );
    meta.insert("guru".to_string(), teacher_meta(doc).to_json());
    if let Some(works) = planned_works_meta(doc) {
        meta.insert("kegiatanFisik".to_string(), works.to_json());
    } else {
        debug!("compute_meta: no planned works provided, leaving stored ones untouched");
    }
    meta.insert("kecamatan".to_string(), json!(subdistrict_label(doc, labels)));
    meta.insert("desa".to_string(), json!(village_label(doc, labels)));
    meta.insert("kodeKecamatan".to_string(), json!(text_at(doc, "kodeKecamatan")));
    meta.insert("kodeDesa".to_string(), json!(text_at(doc, "kodeDesa")));
    meta
}

/// Lays the computed fields over the stored meta tree. Stored keys that are not
/// recomputed are kept as they are.
pub fn merge_meta(
    previous: &JSMap<String, JSValue>,
    computed: JSMap<String, JSValue>,
) -> JSMap<String, JSValue> {
    let mut merged = previous.clone();
    for (k, v) in computed {
        merged.insert(k, v);
    }
    merged
}

// ********* Payload ***********

fn classes(doc: &Node, shape: &ShapeVariant) -> Vec<ClassEntry> {
    let mut res: Vec<ClassEntry> = Vec::new();
    for section in shape.sections() {
        for (field, suffix) in [("l", "L"), ("p", "P")] {
            let n = count_at(doc, &format!("siswa.{}.{}", section.path, field));
            if n > 0 {
                res.push(ClassEntry {
                    grade: format!("{}_{}", section.label(), suffix),
                    count: n,
                    extra: None,
                });
            }
        }
    }
    res
}

fn staff_summary(doc: &Node) -> Vec<StaffEntry> {
    let totals = teacher_totals(doc);
    STAFF_ROLES
        .iter()
        .map(|(role, field)| StaffEntry {
            role: role.to_string(),
            count: match field {
                Some(f) => count_at(doc, &format!("guru.{}", f)),
                None => totals.total,
            },
            details: None,
        })
        .collect()
}

fn checked<'a>(
    input: &'a PayloadInput<'a>,
) -> Result<(&'a Node, &'a CategoryConfig, &'a str), PayloadError> {
    let doc = input.document.ok_or(PayloadError::MissingDocument)?;
    if !doc.is_branch() {
        return Err(PayloadError::InvalidDocument);
    }
    let config = input.config.ok_or(PayloadError::MissingConfiguration)?;
    let code = input
        .category_code
        .filter(|c| !c.trim().is_empty())
        .ok_or(PayloadError::MissingCategoryCode)?;
    Ok((doc, config, code))
}

fn assemble(
    doc: &Node,
    config: &CategoryConfig,
    code: &str,
    labels: &RegionLabels,
    meta: JSMap<String, JSValue>,
) -> Payload {
    let students = student_counts(doc, config);
    let address = text_at(doc, "alamat");
    let location = Location {
        subdistrict: subdistrict_label(doc, labels),
        village: village_label(doc, labels),
        subdistrict_code: text_at(doc, "kodeKecamatan"),
        village_code: text_at(doc, "kodeDesa"),
        address: address.clone(),
    };
    let school = School {
        npsn: text_at(doc, "npsn"),
        name: text_at(doc, "namaSekolah"),
        category: code.trim().to_string(),
        status: normalize::status(&text_at(doc, "status")),
        address,
        student_count: students.total,
        st_male: students.male,
        st_female: students.female,
        lat: parse_coordinate(get(doc, "latitude")),
        lng: parse_coordinate(get(doc, "longitude")),
        meta,
    };
    Payload {
        location,
        school,
        classes: classes(doc, &config.shape),
        staff_summary: staff_summary(doc),
    }
}

/// Builds the argument of the create procedure.
pub fn build_create_payload(input: &PayloadInput) -> Result<Payload, PayloadError> {
    let (doc, config, code) = checked(input)?;
    let meta = compute_meta(doc, config, &input.region_labels);
    let payload = assemble(doc, config, code, &input.region_labels, meta);
    info!(
        "build_create_payload: {} {:?}: {} students, {} class entries",
        code, payload.school.npsn, payload.school.student_count, payload.classes.len()
    );
    Ok(payload)
}

/// Builds the argument of the update procedure, preserving the stored meta fields the
/// current document does not recompute.
pub fn build_update_payload(
    input: &PayloadInput,
    previous_meta: &JSMap<String, JSValue>,
) -> Result<Payload, PayloadError> {
    let (doc, config, code) = checked(input)?;
    let computed = compute_meta(doc, config, &input.region_labels);
    let kept: Vec<&String> = previous_meta
        .keys()
        .filter(|k| !computed.contains_key(*k))
        .collect();
    debug!("build_update_payload: keeping stored meta keys {:?}", kept);
    let meta = merge_meta(previous_meta, computed);
    let payload = assemble(doc, config, code, &input.region_labels, meta);
    info!(
        "build_update_payload: {} {:?}: {} students, {} meta keys",
        code,
        payload.school.npsn,
        payload.school.student_count,
        payload.school.meta.len()
    );
    Ok(payload)
}
