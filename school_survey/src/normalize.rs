//! Coercions of the enumerated survey answers into their canonical tokens.
//!
//! Every function is total and idempotent: normalizing an already normalized value
//! returns it unchanged.

use crate::document::Node;

pub const UNKNOWN_STATUS: &str = "UNKNOWN";

/// `negeri`/`swasta` in any case. Empty input gives `UNKNOWN`.
pub fn status(raw: &str) -> String {
    let s = raw.trim();
    match s.to_lowercase().as_str() {
        "" => UNKNOWN_STATUS.to_string(),
        "negeri" => "NEGERI".to_string(),
        "swasta" => "SWASTA".to_string(),
        _ => s.to_uppercase(),
    }
}

/// `ya`/`tidak` in any case. Empty input stays empty.
pub fn yes_no(raw: &str) -> String {
    let s = raw.trim();
    match s.to_lowercase().as_str() {
        "" => String::new(),
        "ya" => "YA".to_string(),
        "tidak" => "TIDAK".to_string(),
        _ => s.to_uppercase(),
    }
}

/// `sudah`/`belum`, also accepting the yes/no spellings used by older forms.
pub fn done(raw: &str) -> String {
    let s = raw.trim();
    match s.to_lowercase().as_str() {
        "" => String::new(),
        "sudah" | "ya" => "SUDAH".to_string(),
        "belum" | "tidak" => "BELUM".to_string(),
        _ => s.to_uppercase(),
    }
}

/// The condition of a piece of equipment. Matching ignores case, underscores and
/// repeated spaces.
pub fn equipment(raw: &str) -> String {
    let s = raw.trim();
    let key = s
        .to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ");
    match key.as_str() {
        "" => String::new(),
        "baik" => "BAIK".to_string(),
        "tidak memiliki" => "TIDAK_MEMILIKI".to_string(),
        "harus diganti" => "HARUS_DIGANTI".to_string(),
        "perlu rehabilitasi" => "PERLU_REHABILITASI".to_string(),
        _ => s.to_uppercase(),
    }
}

/// Which coercion an enumerated field goes through.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum FlagKind {
    Status,
    YesNo,
    Done,
    Equipment,
    /// Free text, only trimmed.
    Text,
}

impl FlagKind {
    pub fn normalize(&self, raw: &str) -> String {
        match self {
            FlagKind::Status => status(raw),
            FlagKind::YesNo => yes_no(raw),
            FlagKind::Done => done(raw),
            FlagKind::Equipment => equipment(raw),
            FlagKind::Text => raw.trim().to_string(),
        }
    }

    /// Normalizes the text of a document leaf. Missing nodes count as empty input.
    pub fn normalize_node(&self, node: Option<&Node>) -> String {
        self.normalize(&node.map(|n| n.text()).unwrap_or_default())
    }
}
