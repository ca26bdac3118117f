use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Regulatory frameworks covered by the assessment. The set is closed: the
/// question bank, the scoring buckets, and the remediation catalog all key on
/// this enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regulation {
    Gdpr,
    Nis2,
    Dora,
    Iso27001,
}

impl Regulation {
    pub fn ordered() -> [Regulation; 4] {
        [
            Regulation::Gdpr,
            Regulation::Nis2,
            Regulation::Dora,
            Regulation::Iso27001,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Regulation::Gdpr => "GDPR",
            Regulation::Nis2 => "NIS2",
            Regulation::Dora => "DORA",
            Regulation::Iso27001 => "ISO 27001",
        }
    }

    /// Form and bank documents carry regulations as short lowercase slugs.
    pub fn slug(&self) -> &'static str {
        match self {
            Regulation::Gdpr => "gdpr",
            Regulation::Nis2 => "nis2",
            Regulation::Dora => "dora",
            Regulation::Iso27001 => "iso27001",
        }
    }

    pub fn parse(raw: &str) -> Option<Regulation> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "gdpr" | "rgpd" => Some(Regulation::Gdpr),
            "nis2" => Some(Regulation::Nis2),
            "dora" => Some(Regulation::Dora),
            "iso27001" | "iso 27001" | "iso-27001" => Some(Regulation::Iso27001),
            _ => None,
        }
    }
}

impl fmt::Display for Regulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Organization categories offered on the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyType {
    Freelance,
    SmallBusiness,
    MidMarket,
    Enterprise,
    PublicSector,
}

impl CompanyType {
    pub fn ordered() -> [CompanyType; 5] {
        [
            CompanyType::Freelance,
            CompanyType::SmallBusiness,
            CompanyType::MidMarket,
            CompanyType::Enterprise,
            CompanyType::PublicSector,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompanyType::Freelance => "Freelance / sole trader",
            CompanyType::SmallBusiness => "Small business",
            CompanyType::MidMarket => "Mid-market company",
            CompanyType::Enterprise => "Enterprise",
            CompanyType::PublicSector => "Public sector body",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            CompanyType::Freelance => "freelance",
            CompanyType::SmallBusiness => "small_business",
            CompanyType::MidMarket => "mid_market",
            CompanyType::Enterprise => "enterprise",
            CompanyType::PublicSector => "public_sector",
        }
    }

    pub fn parse(raw: &str) -> Option<CompanyType> {
        CompanyType::ordered()
            .into_iter()
            .find(|kind| kind.slug() == raw.trim())
    }
}

/// How a question expects to be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    YesNo,
    Scale0To5,
}

impl AnswerType {
    pub fn parse(raw: &str) -> Option<AnswerType> {
        match raw.trim() {
            "yes_no" => Some(AnswerType::YesNo),
            "scale_0_5" => Some(AnswerType::Scale0To5),
            _ => None,
        }
    }
}

/// Raw answer value as submitted: forms post strings, offline answer files
/// may carry numbers or booleans. Normalization happens in the scoring
/// engine, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

/// Per-session answer map, keyed by question id. Questions without an entry
/// are treated as unanswered, not as zero.
pub type AnswerSet = HashMap<String, AnswerValue>;

/// Random identifier standing in for the real company name and tax id in
/// everything that leaves the process. 32 lowercase hex characters, which the
/// PII scrubber's prefix-restricted IBAN matcher is guaranteed to ignore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyAlias(String);

impl CompanyAlias {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let alias = (0..32)
            .map(|_| {
                let digit = rng.gen_range(0..16u8);
                char::from_digit(digit as u32, 16).unwrap_or('0')
            })
            .collect();
        CompanyAlias(alias)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The anonymized slice of session state that downstream components are
/// allowed to see. The real company name and NIF deliberately have no field
/// here; the prompt builder and provider clients only ever receive this view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentProfile {
    pub alias: CompanyAlias,
    pub company_type: CompanyType,
    pub employee_count: u32,
    pub regulations: Vec<Regulation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regulation_parse_accepts_known_slugs() {
        assert_eq!(Regulation::parse("gdpr"), Some(Regulation::Gdpr));
        assert_eq!(Regulation::parse("RGPD"), Some(Regulation::Gdpr));
        assert_eq!(Regulation::parse(" iso27001 "), Some(Regulation::Iso27001));
        assert_eq!(Regulation::parse("hipaa"), None);
    }

    #[test]
    fn company_type_round_trips_through_slug() {
        for kind in CompanyType::ordered() {
            assert_eq!(CompanyType::parse(kind.slug()), Some(kind));
        }
        assert_eq!(CompanyType::parse("conglomerate"), None);
    }

    #[test]
    fn alias_is_32_lowercase_hex_chars() {
        let alias = CompanyAlias::generate();
        assert_eq!(alias.as_str().len(), 32);
        assert!(alias.as_str().chars().all(|c| c.is_ascii_hexdigit()
            && !c.is_ascii_uppercase()));
    }

    #[test]
    fn aliases_are_not_repeated() {
        let first = CompanyAlias::generate();
        let second = CompanyAlias::generate();
        assert_ne!(first, second);
    }

    #[test]
    fn answer_value_deserializes_untagged() {
        let parsed: AnswerValue = serde_json::from_str("3").expect("number parses");
        assert_eq!(parsed, AnswerValue::Number(3.0));
        let parsed: AnswerValue = serde_json::from_str("true").expect("bool parses");
        assert_eq!(parsed, AnswerValue::Flag(true));
        let parsed: AnswerValue = serde_json::from_str("\"yes\"").expect("string parses");
        assert_eq!(parsed, AnswerValue::Text("yes".to_string()));
    }
}
