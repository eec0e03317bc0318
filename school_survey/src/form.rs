//! The canonical-empty document of a category.
//!
//! Every other component relies on the shape produced here: all keys are present, unset
//! values are the empty string. Only the per-section domains depend on the category; the
//! identity, teacher, infrastructure and institutional trees are the same everywhere.

use crate::config::*;
use crate::document::{Branch, Node};
use crate::normalize::FlagKind;

/// Identity fields, excluding `status`.
pub const IDENTITY_FIELDS: &[&str] = &[
    "namaSekolah",
    "npsn",
    "kecamatan",
    "kodeKecamatan",
    "desa",
    "kodeDesa",
    "alamat",
    "telepon",
    "latitude",
    "longitude",
    "namaOperator",
    "teleponOperator",
];

/// Filled in by the operator for follow-up contact, never exported.
pub const OPERATOR_FIELDS: &[&str] = &["namaOperator", "teleponOperator"];

/// The five employment categories that make up the teacher total.
pub const EMPLOYMENT_FIELDS: &[&str] = &[
    "pns",
    "pppk",
    "pppkParuhWaktu",
    "nonAsnDapodik",
    "nonAsnTidakDapodik",
];
/// The civil-servant categories among `EMPLOYMENT_FIELDS`.
pub const CIVIL_SERVANT_FIELDS: &[&str] = &["pns", "pppk"];
pub const SHORTFALL_FIELD: &str = "kekuranganGuru";
/// Legacy documents stored only this total.
pub const DIRECT_TOTAL_FIELD: &str = "jumlahGuru";

pub const GENDER_FIELDS: &[&str] = &["l", "p"];

pub const LAND_FIELDS: &[&str] = &["tanah", "bangunan", "halaman"];
pub const CONDITION_FIELDS: &[&str] = &["baik", "rusakRingan", "rusakSedang", "rusakBerat"];
pub const CLASSROOM_FIELDS: &[&str] = &["jumlah", "baik", "rusakRingan", "rusakSedang", "rusakBerat"];
pub const FURNITURE: &[&str] = &["meja", "kursi", "papanTulis", "lemari"];
pub const FURNITURE_FIELDS: &[&str] = &["jumlah", "baik", "rusak"];
pub const COMPUTING_FIELDS: &[&str] = &["pc", "laptop", "chromebook", "printer", "proyektor"];
pub const EQUIPMENT_FIELD: &str = "peralatanRumahTangga";

pub const PLANNED_WORKS: &[&str] = &[
    "rehabRuangKelas",
    "pembangunanRkb",
    "rehabToilet",
    "pembangunanToilet",
    "rehabRumahDinas",
    "pembangunanPerpustakaan",
];

pub const INSTITUTIONAL_FIELDS: &[(&str, FlagKind)] = &[
    ("izinOperasional", FlagKind::Done),
    ("akreditasi", FlagKind::Text),
    ("pembinaan", FlagKind::YesNo),
    ("asesmen", FlagKind::YesNo),
    ("menyelenggarakanMbs", FlagKind::YesNo),
    ("pengelolaanDanaBos", FlagKind::Done),
    ("kurikulum", FlagKind::Text),
];

pub const IN_DISTRICT: &str = "dalamKabupaten";
pub const OUT_OF_DISTRICT: &str = "luarKabupaten";
pub const NOT_CONTINUING: &str = "tidakLanjut";
pub const WORKING: &str = "bekerja";

fn blank() -> Node {
    Node::from("")
}

fn blank_fields(keys: &[&str]) -> Node {
    Node::branch(keys.iter().map(|k| (*k, blank())))
}

/// One node per section of the layout, nested for packages.
pub(crate) fn sections<F>(shape: &ShapeVariant, leaf: F) -> Node
where
    F: Fn() -> Node,
{
    match shape {
        ShapeVariant::Grades(grades) => Node::branch(grades.iter().map(|g| (grade_key(*g), leaf()))),
        ShapeVariant::RombelTypes(types) => Node::branch(types.iter().map(|t| (t.key, leaf()))),
        ShapeVariant::Packages(packages) => Node::branch(packages.iter().map(|p| {
            (
                p.key,
                Node::branch(p.grades.iter().map(|g| (grade_key(*g), leaf()))),
            )
        })),
    }
}

fn continuation(config: &CategoryConfig) -> Node {
    Node::branch([
        (IN_DISTRICT, blank_fields(config.continuation_targets)),
        (OUT_OF_DISTRICT, blank_fields(config.continuation_targets)),
        (NOT_CONTINUING, blank()),
        (WORKING, blank()),
    ])
}

fn infrastructure() -> Node {
    Node::branch([
        ("ukuran", blank_fields(LAND_FIELDS)),
        ("ruangKelas", blank_fields(CLASSROOM_FIELDS)),
        (
            "ruangan",
            Node::branch(ROOMS.iter().map(|r| (*r, blank_fields(CONDITION_FIELDS)))),
        ),
        (
            "mebeulair",
            Node::branch(FURNITURE.iter().map(|f| (*f, blank_fields(FURNITURE_FIELDS)))),
        ),
        ("komputer", blank_fields(COMPUTING_FIELDS)),
        (EQUIPMENT_FIELD, blank()),
    ])
}

fn teachers() -> Node {
    let mut b: Branch = EMPLOYMENT_FIELDS.iter().map(|k| (k.to_string(), blank())).collect();
    b.insert(SHORTFALL_FIELD.to_string(), blank());
    b.insert(DIRECT_TOTAL_FIELD.to_string(), blank());
    Node::from(b)
}

/// Builds the canonical-empty document of a category.
///
/// Deterministic and pure: two calls with the same configuration give equal documents that
/// share no branch.
pub fn build(config: &CategoryConfig) -> Node {
    let mut root: Branch = IDENTITY_FIELDS.iter().map(|k| (k.to_string(), blank())).collect();
    root.insert("status".to_string(), Node::from(config.default_status));
    root.insert("siswa".to_string(), sections(&config.shape, || blank_fields(GENDER_FIELDS)));
    root.insert("siswaAbk".to_string(), sections(&config.shape, || blank_fields(GENDER_FIELDS)));
    root.insert("rombel".to_string(), sections(&config.shape, blank));
    root.insert("guru".to_string(), teachers());
    root.insert("lanjut".to_string(), continuation(config));
    root.insert("prasarana".to_string(), infrastructure());
    root.insert("kegiatanFisik".to_string(), blank_fields(PLANNED_WORKS));
    root.insert(
        "kelembagaan".to_string(),
        Node::branch(INSTITUTIONAL_FIELDS.iter().map(|(k, _)| (*k, blank()))),
    );
    Node::from(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{get, get_value, set};
    use serde_json::json;

    fn keys(node: &Node) -> Vec<String> {
        node.as_branch().unwrap().keys().cloned().collect()
    }

    #[test]
    fn grade_category_has_grade_sections_only() {
        let doc = build(lookup("SD"));
        assert_eq!(
            keys(get(&doc, "siswa").unwrap()),
            vec!["kelas1", "kelas2", "kelas3", "kelas4", "kelas5", "kelas6"]
        );
        assert_eq!(get_value(&doc, "siswa.kelas3.l"), Some(&json!("")));
        assert_eq!(get_value(&doc, "rombel.kelas6"), Some(&json!("")));
        assert_eq!(get(&doc, "siswa.kelas7"), None);
        assert_eq!(get(&doc, "siswa.tka"), None);
        assert_eq!(get(&doc, "siswa.paketA"), None);
        assert_eq!(get_value(&doc, "status"), Some(&json!("NEGERI")));
    }

    #[test]
    fn rombel_category_has_type_sections_only() {
        let doc = build(lookup("PAUD"));
        assert_eq!(keys(get(&doc, "siswaAbk").unwrap()), vec!["kb", "sps", "tpa"]);
        assert_eq!(keys(get(&doc, "rombel").unwrap()), vec!["kb", "sps", "tpa"]);
        assert_eq!(get(&doc, "siswa.kelas1"), None);
        assert_eq!(get_value(&doc, "status"), Some(&json!("SWASTA")));
    }

    #[test]
    fn package_category_nests_grades() {
        let doc = build(lookup("PKBM"));
        assert_eq!(keys(get(&doc, "siswa").unwrap()), vec!["paketA", "paketB", "paketC"]);
        assert_eq!(keys(get(&doc, "rombel.paketB").unwrap()), vec!["kelas7", "kelas8", "kelas9"]);
        assert_eq!(get_value(&doc, "siswa.paketC.kelas12.p"), Some(&json!("")));
        assert_eq!(get(&doc, "siswa.kelas1"), None);
    }

    #[test]
    fn shared_trees_are_category_independent() {
        let sd = build(lookup("SD"));
        let tk = build(lookup("TK"));
        for p in ["prasarana", "guru", "kegiatanFisik", "kelembagaan"] {
            assert_eq!(get(&sd, p), get(&tk, p), "tree {}", p);
        }
        assert_eq!(get_value(&sd, "prasarana.ruangan.labIpa.baik"), Some(&json!("")));
        assert_eq!(get_value(&sd, "guru.jumlahGuru"), Some(&json!("")));
        assert_eq!(keys(get(&sd, "lanjut.dalamKabupaten").unwrap()), vec!["mts", "pondok", "smp"]);
    }

    #[test]
    fn unknown_category_has_empty_sections() {
        let doc = build(lookup("XYZ"));
        assert!(get(&doc, "siswa").unwrap().as_branch().unwrap().is_empty());
        assert!(get(&doc, "rombel").unwrap().as_branch().unwrap().is_empty());
        assert_eq!(get_value(&doc, "status"), Some(&json!("")));
        assert_eq!(get_value(&doc, "namaSekolah"), Some(&json!("")));
    }

    #[test]
    fn builds_are_equal_and_independent() {
        let config = lookup("SMP");
        let a = build(config);
        let b = build(config);
        assert_eq!(a, b);
        assert!(!get(&a, "siswa").unwrap().same(get(&b, "siswa").unwrap()));
        let edited = set(&a, "siswa.kelas7.l", Node::from(4u64));
        assert_eq!(get_value(&b, "siswa.kelas7.l"), Some(&json!("")));
        assert_eq!(get_value(&edited, "siswa.kelas7.l"), Some(&json!(4)));
    }
}
