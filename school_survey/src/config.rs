// ********* Shape variants ***********

use log::{debug, warn};

/// A class-group type used by early-childhood categories in place of numeric grades.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub struct RombelType {
    pub key: &'static str,
    pub label: &'static str,
}

/// An equivalency track of non-formal education (A, B, C) and the nominal grades it spans.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub struct Package {
    pub key: &'static str,
    pub label: &'static str,
    pub grades: &'static [u32],
}

/// The layout followed by the per-section data of a category.
///
/// Exactly one variant applies to a category. All the per-section domains of a document
/// (students, students with special needs, class groups) follow the same variant.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ShapeVariant {
    /// Sections `kelasN` for every listed grade.
    Grades(&'static [u32]),
    /// Sections keyed by the rombel type key.
    RombelTypes(&'static [RombelType]),
    /// Sections `<package>.kelasN`, two levels deep.
    Packages(&'static [Package]),
}

/// The position of one section inside a per-section domain, such as `kelas1` or `paketB.kelas7`.
#[derive(Eq, PartialEq, Debug, Clone, Hash, PartialOrd, Ord)]
pub struct Section {
    pub path: String,
}

impl Section {
    /// The label used for this section in the class list sent to the backend.
    pub fn label(&self) -> String {
        self.path.replace('.', "_")
    }
}

/// The top-level meta keys under which the per-section breakdowns are stored.
///
/// Every variant writes to its own keys so that a record saved under one layout does not
/// lose the breakdowns of another layout on update.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct MetaKeys {
    pub students: &'static str,
    pub special_needs: &'static str,
    pub rombel: &'static str,
}

pub fn grade_key(grade: u32) -> String {
    format!("kelas{}", grade)
}

impl ShapeVariant {
    /// All the sections of this layout, in configuration order.
    pub fn sections(&self) -> Vec<Section> {
        match self {
            ShapeVariant::Grades(grades) => grades
                .iter()
                .map(|g| Section { path: grade_key(*g) })
                .collect(),
            ShapeVariant::RombelTypes(types) => types
                .iter()
                .map(|t| Section {
                    path: t.key.to_string(),
                })
                .collect(),
            ShapeVariant::Packages(packages) => packages
                .iter()
                .flat_map(|p| {
                    p.grades.iter().map(move |g| Section {
                        path: format!("{}.{}", p.key, grade_key(*g)),
                    })
                })
                .collect(),
        }
    }

    pub fn meta_keys(&self) -> MetaKeys {
        match self {
            ShapeVariant::Grades(_) => MetaKeys {
                students: "siswa",
                special_needs: "siswaAbk",
                rombel: "rombel",
            },
            ShapeVariant::RombelTypes(_) => MetaKeys {
                students: "siswaPaud",
                special_needs: "siswaAbkPaud",
                rombel: "rombelPaud",
            },
            ShapeVariant::Packages(_) => MetaKeys {
                students: "siswaPaket",
                special_needs: "siswaAbkPaket",
                rombel: "rombelPaket",
            },
        }
    }
}

// ********* Infrastructure variants ***********

/// The general laboratory, reported by primary and non-formal schools.
pub const GENERAL_LAB: &str = "laboratorium";
/// Subject laboratories, reported by junior-secondary schools only.
pub const SUBJECT_LABS: &[&str] = &["labIpa", "labBahasa", "labKomputer"];
/// The undifferentiated toilet count.
pub const GENERAL_TOILET: &str = "toilet";
/// Toilets split by user and gender, reported by junior-secondary schools only.
pub const GENDER_TOILETS: &[&str] = &["toiletGuruL", "toiletGuruP", "toiletSiswaL", "toiletSiswaP"];

/// Rooms reported by purpose. The list is the same for every category; the
/// infrastructure variant decides which of them are filled in.
pub const ROOMS: &[&str] = &[
    "perpustakaan",
    "ruangGuru",
    "ruangKepsek",
    "ruangTu",
    "uks",
    GENERAL_LAB,
    "labIpa",
    "labBahasa",
    "labKomputer",
    GENERAL_TOILET,
    "toiletGuruL",
    "toiletGuruP",
    "toiletSiswaL",
    "toiletSiswaP",
    "rumahDinas",
];

/// How the infrastructure section is presented for a category.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum InfrastructureVariant {
    /// General rooms, one laboratory and one toilet count.
    General,
    /// Subject laboratories and gender-split toilets.
    JuniorSecondary,
    /// No laboratory at all and a single toilet count.
    EarlyChildhood,
}

impl InfrastructureVariant {
    /// Whether the given room of `ROOMS` is reported under this variant.
    pub fn uses_room(&self, room: &str) -> bool {
        let is_subject_lab = SUBJECT_LABS.contains(&room);
        let is_gender_toilet = GENDER_TOILETS.contains(&room);
        match self {
            InfrastructureVariant::General => !is_subject_lab && !is_gender_toilet,
            InfrastructureVariant::JuniorSecondary => room != GENERAL_LAB && room != GENERAL_TOILET,
            InfrastructureVariant::EarlyChildhood => {
                room != GENERAL_LAB && !is_subject_lab && !is_gender_toilet
            }
        }
    }
}

// ********* Categories ***********

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct CategoryConfig {
    /// The registered code. Empty for the fallback configuration.
    pub code: &'static str,
    pub label: &'static str,
    pub shape: ShapeVariant,
    pub infrastructure: InfrastructureVariant,
    /// The status a new document starts with.
    pub default_status: &'static str,
    /// The destination school types tracked after graduation.
    pub continuation_targets: &'static [&'static str],
}

impl CategoryConfig {
    /// True for the configuration returned for unknown codes.
    pub fn is_fallback(&self) -> bool {
        self.code.is_empty()
    }
}

const EARLY_CHILDHOOD_TARGETS: &[&str] = &["sd", "mi"];

pub static CATEGORIES: [CategoryConfig; 5] = [
    CategoryConfig {
        code: "SD",
        label: "Sekolah Dasar",
        shape: ShapeVariant::Grades(&[1, 2, 3, 4, 5, 6]),
        infrastructure: InfrastructureVariant::General,
        default_status: "NEGERI",
        continuation_targets: &["smp", "mts", "pondok"],
    },
    CategoryConfig {
        code: "SMP",
        label: "Sekolah Menengah Pertama",
        shape: ShapeVariant::Grades(&[7, 8, 9]),
        infrastructure: InfrastructureVariant::JuniorSecondary,
        default_status: "NEGERI",
        continuation_targets: &["sma", "smk", "ma", "pondok"],
    },
    CategoryConfig {
        code: "TK",
        label: "Taman Kanak-kanak",
        shape: ShapeVariant::RombelTypes(&[
            RombelType {
                key: "tka",
                label: "TK A",
            },
            RombelType {
                key: "tkb",
                label: "TK B",
            },
        ]),
        infrastructure: InfrastructureVariant::EarlyChildhood,
        default_status: "SWASTA",
        continuation_targets: EARLY_CHILDHOOD_TARGETS,
    },
    CategoryConfig {
        code: "PAUD",
        label: "Kelompok Bermain dan Satuan PAUD Sejenis",
        shape: ShapeVariant::RombelTypes(&[
            RombelType {
                key: "kb",
                label: "Kelompok Bermain",
            },
            RombelType {
                key: "sps",
                label: "Satuan PAUD Sejenis",
            },
            RombelType {
                key: "tpa",
                label: "Taman Penitipan Anak",
            },
        ]),
        infrastructure: InfrastructureVariant::EarlyChildhood,
        default_status: "SWASTA",
        continuation_targets: EARLY_CHILDHOOD_TARGETS,
    },
    CategoryConfig {
        code: "PKBM",
        label: "Pusat Kegiatan Belajar Masyarakat",
        shape: ShapeVariant::Packages(&[
            Package {
                key: "paketA",
                label: "Paket A",
                grades: &[1, 2, 3, 4, 5, 6],
            },
            Package {
                key: "paketB",
                label: "Paket B",
                grades: &[7, 8, 9],
            },
            Package {
                key: "paketC",
                label: "Paket C",
                grades: &[10, 11, 12],
            },
        ]),
        infrastructure: InfrastructureVariant::General,
        default_status: "SWASTA",
        continuation_targets: &["paketB", "paketC", "smp", "sma"],
    },
];

/// Deprecated codes still found in stored records, and the code they stand for.
pub const CATEGORY_ALIASES: &[(&str, &str)] = &[("KB", "PAUD"), ("SKB", "PKBM")];

/// Returned for any unrecognized code: no per-section fields at all.
pub static FALLBACK_CATEGORY: CategoryConfig = CategoryConfig {
    code: "",
    label: "",
    shape: ShapeVariant::Grades(&[]),
    infrastructure: InfrastructureVariant::General,
    default_status: "",
    continuation_targets: &[],
};

/// Looks up the configuration of a category code.
///
/// Codes are matched after trimming and regardless of case. Legacy aliases resolve to the
/// current configuration. This never fails: unknown codes get `FALLBACK_CATEGORY`.
pub fn lookup(code: &str) -> &'static CategoryConfig {
    let wanted = code.trim().to_uppercase();
    let resolved = CATEGORY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == wanted)
        .map(|(_, target)| *target)
        .unwrap_or(wanted.as_str());
    match CATEGORIES.iter().find(|c| c.code == resolved) {
        Some(config) => {
            debug!("lookup: {:?} -> {}", code, config.code);
            config
        }
        None => {
            warn!("lookup: unknown category code {:?}, using empty configuration", code);
            &FALLBACK_CATEGORY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_and_aliases() {
        assert_eq!(lookup("SD").code, "SD");
        assert_eq!(lookup(" smp ").code, "SMP");
        assert_eq!(lookup("KB").code, "PAUD");
        assert_eq!(lookup("skb").code, "PKBM");
    }

    #[test]
    fn unknown_code_degrades_to_empty_configuration() {
        let config = lookup("SLB");
        assert!(config.is_fallback());
        assert!(config.shape.sections().is_empty());
        assert!(config.continuation_targets.is_empty());
        assert!(lookup("").is_fallback());
    }

    #[test]
    fn package_sections_are_two_levels() {
        let sections = lookup("PKBM").shape.sections();
        assert_eq!(sections.len(), 12);
        assert_eq!(sections[0].path, "paketA.kelas1");
        assert_eq!(sections[6].label(), "paketB_kelas7");
        assert_eq!(sections[11].path, "paketC.kelas12");
    }

    #[test]
    fn variants_use_distinct_meta_keys() {
        let grade = lookup("SD").shape.meta_keys();
        let rombel = lookup("TK").shape.meta_keys();
        let package = lookup("PKBM").shape.meta_keys();
        assert_ne!(grade.students, rombel.students);
        assert_ne!(grade.students, package.students);
        assert_ne!(rombel.rombel, package.rombel);
    }

    #[test]
    fn room_applicability() {
        let general = InfrastructureVariant::General;
        let junior = InfrastructureVariant::JuniorSecondary;
        let early = InfrastructureVariant::EarlyChildhood;
        assert!(general.uses_room(GENERAL_LAB));
        assert!(!general.uses_room("labIpa"));
        assert!(!general.uses_room("toiletSiswaP"));
        assert!(junior.uses_room("labKomputer"));
        assert!(junior.uses_room("toiletGuruL"));
        assert!(!junior.uses_room(GENERAL_TOILET));
        assert!(!early.uses_room(GENERAL_LAB));
        assert!(!early.uses_room("labBahasa"));
        assert!(early.uses_room(GENERAL_TOILET));
        assert!(early.uses_room("perpustakaan"));
    }
}
