use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Categories of personally identifiable information the scrubber looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PiiCategory {
    Email,
    Phone,
    NationalId,
    ForeignerId,
    Iban,
    IpAddress,
}

impl PiiCategory {
    pub fn label(&self) -> &'static str {
        match self {
            PiiCategory::Email => "email address",
            PiiCategory::Phone => "phone number",
            PiiCategory::NationalId => "national id (NIF)",
            PiiCategory::ForeignerId => "foreigner id (NIE)",
            PiiCategory::Iban => "bank account (IBAN)",
            PiiCategory::IpAddress => "IPv4 address",
        }
    }
}

impl fmt::Display for PiiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of scanning one payload. `clean` is true only when no string leaf
/// anywhere in the structure matched any pattern. This is the hard gate in
/// front of every outbound AI call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrubReport {
    pub clean: bool,
    pub matched: Vec<PiiCategory>,
}

// Control letters used by Spanish NIF/NIE check digits.
const ID_LETTERS: &str = "TRWAGMYFPDXBNJZSQVHLCKEtrwagmyfpdxbnjzsqvhlcke";

// The IBAN matcher is restricted to a fixed allow-list of country prefixes
// and stays case-sensitive, so a random lowercase hex alias can never trip
// it even when it happens to contain a country-code bigram.
static MATCHERS: Lazy<Vec<(PiiCategory, Regex)>> = Lazy::new(|| {
    vec![
        (
            PiiCategory::Email,
            Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("email pattern"),
        ),
        (
            PiiCategory::Phone,
            Regex::new(r"\+\d{9,14}\b|\b[6789]\d{2}[ .-]?\d{3}[ .-]?\d{3}\b")
                .expect("phone pattern"),
        ),
        (
            PiiCategory::NationalId,
            Regex::new(&format!(r"\b\d{{8}}[{ID_LETTERS}]\b")).expect("nif pattern"),
        ),
        (
            PiiCategory::ForeignerId,
            Regex::new(&format!(r"\b[XYZxyz]\d{{7}}[{ID_LETTERS}]\b")).expect("nie pattern"),
        ),
        (
            PiiCategory::Iban,
            Regex::new(r"\b(?:ES|PT|FR|DE|IT|NL|BE|IE|GB)\d{2}[A-Za-z0-9]{10,30}\b")
                .expect("iban pattern"),
        ),
        (
            PiiCategory::IpAddress,
            Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("ipv4 pattern"),
        ),
    ]
});

/// Recursively inspects every string leaf of an arbitrarily nested structure.
/// The first matching pattern per leaf wins; the report carries each matched
/// category once.
pub fn scan_value(value: &Value) -> ScrubReport {
    let mut matched = Vec::new();
    walk(value, &mut matched);
    ScrubReport {
        clean: matched.is_empty(),
        matched,
    }
}

/// Convenience wrapper for scanning a single document such as a rendered
/// prompt.
pub fn scan_text(text: &str) -> ScrubReport {
    let mut matched = Vec::new();
    inspect_leaf(text, &mut matched);
    ScrubReport {
        clean: matched.is_empty(),
        matched,
    }
}

fn walk(value: &Value, matched: &mut Vec<PiiCategory>) {
    match value {
        Value::String(text) => inspect_leaf(text, matched),
        Value::Array(items) => {
            for item in items {
                walk(item, matched);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                walk(item, matched);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn inspect_leaf(text: &str, matched: &mut Vec<PiiCategory>) {
    for (category, pattern) in MATCHERS.iter() {
        if pattern.is_match(text) {
            if !matched.contains(category) {
                matched.push(*category);
            }
            // first matching pattern per leaf wins
            break;
        }
    }
}
