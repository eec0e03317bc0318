//! Mapping of stored backend records into canonical documents.
//!
//! Records have been written by several generations of the application and name the same
//! field in different places. Each canonical field has an ordered list of places to look
//! at; the first one holding a value wins. Whatever is not found keeps its canonical-empty
//! value.

use log::{debug, warn};
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

use crate::config::CategoryConfig;
use crate::document::Node;
use crate::form::{build, DIRECT_TOTAL_FIELD, EMPLOYMENT_FIELDS};
use crate::path::set;
use crate::sheet::{cell_text, flatten};

/// Where identity fields are found, most recent layout first.
pub const IDENTITY_SOURCES: &[(&str, &[&str])] = &[
    (
        "namaSekolah",
        &["namaSekolah", "nama_sekolah", "school.name", "name", "nama"],
    ),
    ("npsn", &["npsn", "school.npsn", "NPSN"]),
    ("status", &["status", "school.status", "status_sekolah"]),
    (
        "kecamatan",
        &[
            "kecamatan",
            "location.subdistrict",
            "meta.kecamatan",
            "school.meta.kecamatan",
            "subdistrict",
        ],
    ),
    (
        "kodeKecamatan",
        &[
            "kodeKecamatan",
            "kode_kecamatan",
            "location.subdistrict_code",
            "meta.kodeKecamatan",
            "school.meta.kodeKecamatan",
        ],
    ),
    (
        "desa",
        &[
            "desa",
            "location.village",
            "meta.desa",
            "school.meta.desa",
            "village",
        ],
    ),
    (
        "kodeDesa",
        &[
            "kodeDesa",
            "kode_desa",
            "location.village_code",
            "meta.kodeDesa",
            "school.meta.kodeDesa",
        ],
    ),
    (
        "alamat",
        &["alamat", "school.address", "location.address", "address"],
    ),
    ("telepon", &["telepon", "school.phone", "phone", "no_telp"]),
    ("latitude", &["latitude", "school.lat", "lat", "location.lat"]),
    (
        "longitude",
        &["longitude", "school.lng", "lng", "location.lng"],
    ),
    (
        "namaOperator",
        &["namaOperator", "meta.namaOperator", "operator.name"],
    ),
    (
        "teleponOperator",
        &["teleponOperator", "meta.teleponOperator", "operator.phone"],
    ),
];

/// Where legacy records kept their teacher total, outside of the meta tree.
const LEGACY_TOTAL_SOURCES: &[&str] = &["guru.jumlahGuru", "jumlahGuru", "jumlah_guru"];

/// The section domains, stored in meta under a key that depends on the layout.
const SECTION_ROOTS: &[&str] = &["siswa", "siswaAbk", "rombel"];

fn lookup_value<'a>(record: &'a JSValue, path: &str) -> Option<&'a JSValue> {
    let mut cur = record;
    for seg in path.split('.') {
        cur = cur.as_object()?.get(seg)?;
    }
    match cur {
        JSValue::Null | JSValue::Object(_) => None,
        v => Some(v),
    }
}

/// The places a canonical leaf may be found in a record, in order.
pub fn candidate_paths(config: &CategoryConfig, canonical: &str) -> Vec<String> {
    if let Some((_, sources)) = IDENTITY_SOURCES.iter().find(|(k, _)| *k == canonical) {
        return sources.iter().map(|s| s.to_string()).collect();
    }
    if canonical == direct_total_key() {
        let mut res: Vec<String> = LEGACY_TOTAL_SOURCES.iter().map(|s| s.to_string()).collect();
        res.push(format!("meta.{}", canonical));
        res.push(format!("school.meta.{}", canonical));
        return res;
    }
    let (root, rest) = canonical.split_once('.').unwrap_or((canonical, ""));
    let meta_path = if SECTION_ROOTS.contains(&root) && !rest.is_empty() {
        let keys = config.shape.meta_keys();
        let meta_root = match root {
            "siswa" => keys.students,
            "siswaAbk" => keys.special_needs,
            _ => keys.rombel,
        };
        format!("{}.{}", meta_root, rest)
    } else {
        canonical.to_string()
    };
    vec![
        canonical.to_string(),
        format!("meta.{}", meta_path),
        format!("school.meta.{}", meta_path),
    ]
}

fn direct_total_key() -> String {
    format!("guru.{}", DIRECT_TOTAL_FIELD)
}

fn holds_value(value: &JSValue) -> bool {
    match value {
        JSValue::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// The teacher total recorded directly by a legacy record.
///
/// The meta tree also holds a total, derived from the employment counts on every save. It
/// only stands for a legacy total when the record has no employment count at all.
fn direct_total<'a>(record: &'a JSValue, config: &CategoryConfig) -> Option<&'a JSValue> {
    let has_breakdown = EMPLOYMENT_FIELDS.iter().any(|f| {
        candidate_paths(config, &format!("guru.{}", f))
            .iter()
            .filter_map(|p| lookup_value(record, p))
            .any(holds_value)
    });
    let sources = candidate_paths(config, &direct_total_key());
    let usable = if has_breakdown {
        LEGACY_TOTAL_SOURCES.len()
    } else {
        sources.len()
    };
    sources[..usable]
        .iter()
        .find_map(|p| lookup_value(record, p))
}

/// Builds the canonical document of a category from a stored record.
///
/// Identity fields are kept as text; survey counts keep the stored value. Records that are
/// not JSON objects give the canonical-empty document.
pub fn document_from_record(record: &JSValue, config: &CategoryConfig) -> Node {
    let empty = build(config);
    if !record.is_object() {
        warn!("document_from_record: record is not an object, starting from an empty form");
        return empty;
    }
    let mut doc = empty.clone();
    let mut found = 0;
    for (key, default) in flatten(&empty) {
        if default.is_object() {
            continue;
        }
        let hit = if key == direct_total_key() {
            direct_total(record, config)
        } else {
            candidate_paths(config, &key)
                .iter()
                .find_map(|p| lookup_value(record, p))
        };
        if let Some(v) = hit {
            let value = if IDENTITY_SOURCES.iter().any(|(k, _)| *k == key) {
                JSValue::String(cell_text(v))
            } else {
                v.clone()
            };
            doc = set(&doc, &key, Node::from(value));
            found += 1;
        }
    }
    debug!(
        "document_from_record: {}: filled {} fields",
        config.code, found
    );
    doc
}

/// The meta tree stored with a record, or an empty one.
pub fn previous_meta(record: &JSValue) -> JSMap<String, JSValue> {
    ["meta", "school.meta"]
        .iter()
        .find_map(|p| {
            let mut cur = record;
            for seg in p.split('.') {
                cur = cur.as_object()?.get(seg)?;
            }
            cur.as_object().cloned()
        })
        .unwrap_or_default()
}

/// The registration number of a record, if it has one.
pub fn record_npsn(record: &JSValue) -> Option<String> {
    IDENTITY_SOURCES
        .iter()
        .find(|(k, _)| *k == "npsn")
        .and_then(|(_, sources)| sources.iter().find_map(|p| lookup_value(record, p)))
        .map(cell_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::lookup;
    use crate::path::get_value;
    use crate::payload::{build_update_payload, PayloadInput};
    use serde_json::json;

    #[test]
    fn canonical_names_are_read_first() {
        let record = json!({
            "namaSekolah": "SD Negeri 1",
            "name": "ignored",
            "npsn": 20212345,
            "siswa": {"kelas1": {"l": 10, "p": 8}},
            "guru": {"pns": 3}
        });
        let doc = document_from_record(&record, lookup("SD"));
        assert_eq!(get_value(&doc, "namaSekolah"), Some(&json!("SD Negeri 1")));
        assert_eq!(get_value(&doc, "npsn"), Some(&json!("20212345")));
        assert_eq!(get_value(&doc, "siswa.kelas1.l"), Some(&json!(10)));
        assert_eq!(get_value(&doc, "guru.pns"), Some(&json!(3)));
        assert_eq!(get_value(&doc, "siswa.kelas2.l"), Some(&json!("")));
    }

    #[test]
    fn legacy_layouts_are_read() {
        let record = json!({
            "school": {
                "name": "TK Pertiwi",
                "npsn": "69912345",
                "status": "swasta",
                "lat": -6.9,
                "meta": {
                    "siswaPaud": {"tka": {"l": 4, "p": 5}},
                    "rombelPaud": {"tkb": 2},
                    "guru": {"nonAsnDapodik": 2},
                    "kecamatan": "Coblong"
                }
            },
            "location": {"village": "Dago", "subdistrict": "ignored"}
        });
        let doc = document_from_record(&record, lookup("TK"));
        assert_eq!(get_value(&doc, "namaSekolah"), Some(&json!("TK Pertiwi")));
        assert_eq!(get_value(&doc, "status"), Some(&json!("swasta")));
        assert_eq!(get_value(&doc, "latitude"), Some(&json!("-6.9")));
        assert_eq!(get_value(&doc, "siswa.tka.p"), Some(&json!(5)));
        assert_eq!(get_value(&doc, "rombel.tkb"), Some(&json!(2)));
        assert_eq!(get_value(&doc, "guru.nonAsnDapodik"), Some(&json!(2)));
        assert_eq!(get_value(&doc, "desa"), Some(&json!("Dago")));
        assert_eq!(get_value(&doc, "kecamatan"), Some(&json!("ignored")));
    }

    #[test]
    fn nulls_and_objects_are_skipped() {
        let record = json!({
            "npsn": null,
            "school": {"npsn": "123"},
            "guru": {"pns": {"nested": 1}},
            "meta": {"guru": {"pns": 4}}
        });
        let doc = document_from_record(&record, lookup("SD"));
        assert_eq!(get_value(&doc, "npsn"), Some(&json!("123")));
        assert_eq!(get_value(&doc, "guru.pns"), Some(&json!(4)));
    }

    #[test]
    fn mapped_documents_keep_the_canonical_shape() {
        let record = json!({"siswa": {"kelas9": {"l": 1}}, "extra": {"x": 1}});
        let doc = document_from_record(&record, lookup("SD"));
        let canonical: Vec<String> = flatten(&build(lookup("SD"))).into_keys().collect();
        let mapped: Vec<String> = flatten(&doc).into_keys().collect();
        assert_eq!(canonical, mapped);
        assert_eq!(document_from_record(&json!([1, 2]), lookup("SD")), build(lookup("SD")));
    }

    #[test]
    fn derived_teacher_total_is_not_read_back() {
        let config = lookup("SD");
        let record = json!({"meta": {"guru": {"pns": 5, "jumlahGuru": 5}}});
        let doc = document_from_record(&record, config);
        assert_eq!(get_value(&doc, "guru.jumlahGuru"), Some(&json!("")));

        let doc = set(&doc, "guru.pns", Node::from(3u64));
        let doc = set(&doc, "npsn", Node::from("20212345"));
        let input = PayloadInput::new(&doc, config, "SD");
        let payload = build_update_payload(&input, &previous_meta(&record)).unwrap();
        assert_eq!(payload.school.meta["guru"]["jumlahGuru"], json!(3));
    }

    #[test]
    fn legacy_teacher_totals_are_read() {
        let config = lookup("SD");
        let total_only = json!({"school": {"meta": {"guru": {"jumlahGuru": 12}}}});
        let doc = document_from_record(&total_only, config);
        assert_eq!(get_value(&doc, "guru.jumlahGuru"), Some(&json!(12)));

        let flat_total = json!({"jumlah_guru": 7, "guru": {"pns": 2}});
        let doc = document_from_record(&flat_total, config);
        assert_eq!(get_value(&doc, "guru.jumlahGuru"), Some(&json!(7)));
        assert_eq!(get_value(&doc, "guru.pns"), Some(&json!(2)));
    }

    #[test]
    fn candidate_paths_follow_the_layout() {
        assert_eq!(
            candidate_paths(lookup("PKBM"), "siswa.paketA.kelas1.l"),
            vec![
                "siswa.paketA.kelas1.l",
                "meta.siswaPaket.paketA.kelas1.l",
                "school.meta.siswaPaket.paketA.kelas1.l"
            ]
        );
        assert_eq!(candidate_paths(lookup("SD"), "npsn")[1], "school.npsn");
    }

    #[test]
    fn stored_meta() {
        let record = json!({"school": {"meta": {"a": 1}}});
        assert_eq!(JSValue::Object(previous_meta(&record)), json!({"a": 1}));
        let record = json!({"meta": {"b": 2}, "school": {"meta": {"a": 1}}});
        assert_eq!(JSValue::Object(previous_meta(&record)), json!({"b": 2}));
        assert!(previous_meta(&json!({"meta": "broken"})).is_empty());
    }

    #[test]
    fn npsn_of_records() {
        assert_eq!(record_npsn(&json!({"npsn": " 123 "})), Some("123".to_string()));
        assert_eq!(record_npsn(&json!({"school": {"npsn": 456}})), Some("456".to_string()));
        assert_eq!(record_npsn(&json!({"npsn": ""})), None);
    }
}
