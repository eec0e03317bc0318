//! Totals derived from a document.
//!
//! Documents may come from the backend half-filled or shaped by an older configuration:
//! anything missing or unreadable counts as zero.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

use crate::config::{CategoryConfig, ShapeVariant};
use crate::document::Node;
use crate::form::{CIVIL_SERVANT_FIELDS, DIRECT_TOTAL_FIELD, EMPLOYMENT_FIELDS};
use crate::path::get;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StudentCounts {
    pub male: u64,
    pub female: u64,
    pub total: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TeacherTotals {
    pub total: u64,
    /// Civil servants and contract civil servants.
    pub asn: u64,
}

fn to_count(x: f64) -> u64 {
    if x.is_finite() && x > 0.0 {
        x.trunc() as u64
    } else {
        0
    }
}

/// Reads a count from a leaf. Numbers and numeric strings are accepted; negative,
/// fractional parts and everything else are dropped.
pub fn count(node: Option<&Node>) -> u64 {
    match node {
        Some(Node::Leaf(JSValue::Number(n))) => match n.as_u64() {
            Some(x) => x,
            None => to_count(n.as_f64().unwrap_or(0.0)),
        },
        Some(Node::Leaf(JSValue::String(s))) => to_count(s.trim().parse::<f64>().unwrap_or(0.0)),
        _ => 0,
    }
}

pub fn count_at(doc: &Node, path: &str) -> u64 {
    count(get(doc, path))
}

/// Reads a measurement (area, length) from a leaf, keeping decimals.
pub fn measure(node: Option<&Node>) -> f64 {
    let x = match node {
        Some(Node::Leaf(JSValue::Number(n))) => n.as_f64().unwrap_or(0.0),
        Some(Node::Leaf(JSValue::String(s))) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if x.is_finite() && x > 0.0 {
        x
    } else {
        0.0
    }
}

/// Adds up counts, stopping at `u64::MAX`.
fn saturating_sum<I: IntoIterator<Item = u64>>(counts: I) -> u64 {
    counts.into_iter().fold(0, u64::saturating_add)
}

/// Sums the `{l, p}` pairs under `root` for every section of the layout.
pub fn gender_counts(doc: &Node, root: &str, shape: &ShapeVariant) -> StudentCounts {
    let mut male: u64 = 0;
    let mut female: u64 = 0;
    for section in shape.sections() {
        male = male.saturating_add(count_at(doc, &format!("{}.{}.l", root, section.path)));
        female = female.saturating_add(count_at(doc, &format!("{}.{}.p", root, section.path)));
    }
    StudentCounts {
        male,
        female,
        total: male.saturating_add(female),
    }
}

/// Students by gender over the sections of the category.
pub fn student_counts(doc: &Node, config: &CategoryConfig) -> StudentCounts {
    let res = gender_counts(doc, "siswa", &config.shape);
    debug!("student_counts: {}: {:?}", config.code, res);
    res
}

/// Students with special needs, same layout as `student_counts`.
pub fn special_needs_counts(doc: &Node, config: &CategoryConfig) -> StudentCounts {
    gender_counts(doc, "siswaAbk", &config.shape)
}

pub fn rombel_total(doc: &Node, config: &CategoryConfig) -> u64 {
    saturating_sum(
        config
            .shape
            .sections()
            .iter()
            .map(|s| count_at(doc, &format!("rombel.{}", s.path))),
    )
}

/// The teacher total and the civil-servant subtotal.
///
/// The total is the sum of the five employment categories, but never less than a total
/// recorded directly by a legacy document.
pub fn teacher_totals(doc: &Node) -> TeacherTotals {
    let sum = saturating_sum(
        EMPLOYMENT_FIELDS
            .iter()
            .map(|f| count_at(doc, &format!("guru.{}", f))),
    );
    let direct = count_at(doc, &format!("guru.{}", DIRECT_TOTAL_FIELD));
    let asn = saturating_sum(
        CIVIL_SERVANT_FIELDS
            .iter()
            .map(|f| count_at(doc, &format!("guru.{}", f))),
    );
    if direct > sum {
        debug!("teacher_totals: using recorded total {} over sum {}", direct, sum);
    }
    TeacherTotals {
        total: sum.max(direct),
        asn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::lookup;
    use crate::form::build;
    use crate::path::set;
    use serde_json::json;

    #[test]
    fn grade_counts() {
        let config = lookup("SD");
        let doc = Node::from(json!({
            "siswa": {"kelas1": {"l": 10, "p": 8}, "kelas2": {"l": 5, "p": 0}}
        }));
        assert_eq!(
            student_counts(&doc, config),
            StudentCounts {
                male: 15,
                female: 8,
                total: 23
            }
        );
    }

    #[test]
    fn counts_follow_the_active_variant() {
        let doc = Node::from(json!({
            "siswa": {
                "kelas1": {"l": 1, "p": 1},
                "tka": {"l": "4", "p": "3"},
                "kb": {"l": 100, "p": 100},
                "paketB": {"kelas7": {"l": 2, "p": "6"}}
            }
        }));
        assert_eq!(student_counts(&doc, lookup("TK")).total, 7);
        assert_eq!(student_counts(&doc, lookup("PKBM")).male, 2);
        assert_eq!(student_counts(&doc, lookup("PKBM")).female, 6);
        assert_eq!(student_counts(&doc, lookup("SD")).total, 2);
        assert_eq!(student_counts(&doc, lookup("nope")), StudentCounts::default());
    }

    #[test]
    fn malformed_subtrees_count_as_zero() {
        let doc = Node::from(json!({
            "siswa": {"kelas1": "lots", "kelas2": {"l": "abc", "p": -3}, "kelas3": {"l": 2.7, "p": null}}
        }));
        let counts = student_counts(&doc, lookup("SD"));
        assert_eq!(counts.male, 2);
        assert_eq!(counts.female, 0);
        assert_eq!(counts.total, counts.male + counts.female);
        assert_eq!(student_counts(&Node::from(json!("x")), lookup("SD")).total, 0);
    }

    #[test]
    fn total_is_male_plus_female_for_every_category() {
        for config in crate::config::CATEGORIES.iter() {
            let mut doc = build(config);
            for (i, section) in config.shape.sections().iter().enumerate() {
                doc = set(&doc, &format!("siswa.{}.l", section.path), Node::from(i as u64));
                doc = set(&doc, &format!("siswa.{}.p", section.path), Node::from(2 * i as u64));
            }
            let n = config.shape.sections().len() as u64;
            let expected_male = n * (n.saturating_sub(1)) / 2;
            let counts = student_counts(&doc, config);
            assert_eq!(counts.male, expected_male, "{}", config.code);
            assert_eq!(counts.female, 2 * expected_male, "{}", config.code);
            assert_eq!(counts.total, counts.male + counts.female);
        }
    }

    #[test]
    fn teacher_sum() {
        let doc = Node::from(json!({
            "guru": {"pns": 3, "pppk": 1, "pppkParuhWaktu": 0, "nonAsnDapodik": 2, "nonAsnTidakDapodik": 0}
        }));
        assert_eq!(teacher_totals(&doc), TeacherTotals { total: 6, asn: 4 });
    }

    #[test]
    fn teacher_total_floors_at_recorded_total() {
        let legacy = Node::from(json!({"guru": {"jumlahGuru": 12, "pns": "2"}}));
        assert_eq!(teacher_totals(&legacy), TeacherTotals { total: 12, asn: 2 });
        let newer = Node::from(json!({"guru": {"jumlahGuru": "1", "pns": 2, "nonAsnDapodik": 3}}));
        assert_eq!(teacher_totals(&newer).total, 5);
        assert_eq!(teacher_totals(&Node::empty()), TeacherTotals::default());
    }

    #[test]
    fn rombel_and_special_needs() {
        let config = lookup("PKBM");
        let doc = Node::from(json!({
            "rombel": {"paketA": {"kelas1": 2, "kelas2": "1"}, "paketC": {"kelas12": 3}},
            "siswaAbk": {"paketA": {"kelas3": {"l": 1, "p": 2}}}
        }));
        assert_eq!(rombel_total(&doc, config), 6);
        assert_eq!(special_needs_counts(&doc, config).total, 3);
    }

    #[test]
    fn huge_counts_saturate() {
        let doc = Node::from(json!({
            "siswa": {"kelas1": {"l": "1e30", "p": u64::MAX}, "kelas2": {"l": 1, "p": 1}},
            "rombel": {"kelas1": u64::MAX, "kelas2": 4},
            "guru": {"pns": u64::MAX, "pppk": 1, "nonAsnDapodik": "1e30"}
        }));
        let config = lookup("SD");
        let counts = student_counts(&doc, config);
        assert_eq!(counts.male, u64::MAX);
        assert_eq!(counts.female, u64::MAX);
        assert_eq!(counts.total, u64::MAX);
        assert_eq!(rombel_total(&doc, config), u64::MAX);
        assert_eq!(
            teacher_totals(&doc),
            TeacherTotals {
                total: u64::MAX,
                asn: u64::MAX
            }
        );
    }

    #[test]
    fn measurements_keep_decimals() {
        assert_eq!(measure(Some(&Node::from("1200.5"))), 1200.5);
        assert_eq!(measure(Some(&Node::from(json!(-4)))), 0.0);
        assert_eq!(measure(None), 0.0);
    }
}
