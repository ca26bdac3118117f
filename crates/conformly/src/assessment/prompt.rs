use super::domain::AssessmentProfile;
use super::scoring::ScoreResult;
use std::collections::BTreeMap;

/// Fixed closing instructions appended to every analysis prompt. The
/// downstream model is asked for prose, not bullet lists, so the narrative
/// can be shown verbatim on the report page.
const CLOSING_INSTRUCTIONS: &str = "\
Write a compliance analysis of the assessment above as flowing prose.
Do not use numbered lists or bullet points.
Explain the likely causes of the weakest areas, the risks they expose, and
the remediation steps to take first, ordered by impact.
Refer to the organization only by its alias.";

/// Renders the anonymized analysis document sent to the AI provider. Input is
/// strictly the anonymized profile view, the computed percentages, and the
/// normalized answers; the caller runs the PII gate before transmission.
pub fn build_prompt(
    profile: &AssessmentProfile,
    scores: &ScoreResult,
    normalized: &BTreeMap<String, f64>,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!(
        "Compliance self-assessment for organization {}.",
        profile.alias
    ));
    lines.push(format!(
        "Organization type: {}. Employees: {}.",
        profile.company_type.label(),
        profile.employee_count
    ));
    let regulations = profile
        .regulations
        .iter()
        .map(|regulation| regulation.label())
        .collect::<Vec<_>>()
        .join(", ");
    lines.push(format!("Regulations under assessment: {regulations}."));
    lines.push(String::new());

    lines.push("Compliance percentages by regulation:".to_string());
    for (regulation, percentage) in &scores.regulations {
        lines.push(format!("- {}: {:.2}%", regulation.label(), percentage));
        if let Some(blocks) = scores.blocks.get(regulation) {
            for (block, block_percentage) in blocks {
                lines.push(format!("  - {block}: {block_percentage:.2}%"));
            }
        }
    }
    lines.push(String::new());

    lines.push("Answered controls (normalized 0-1):".to_string());
    for (id, score) in normalized {
        lines.push(format!("- {id}: {score:.2}"));
    }
    lines.push(String::new());

    lines.push(CLOSING_INSTRUCTIONS.to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::domain::{CompanyAlias, CompanyType, Regulation};
    use serde_json::from_str;

    fn profile() -> AssessmentProfile {
        AssessmentProfile {
            alias: from_str::<CompanyAlias>("\"a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6\"")
                .expect("alias deserializes"),
            company_type: CompanyType::SmallBusiness,
            employee_count: 24,
            regulations: vec![Regulation::Gdpr, Regulation::Nis2],
        }
    }

    fn scores() -> ScoreResult {
        let mut regulations = BTreeMap::new();
        regulations.insert(Regulation::Gdpr, 80.0);
        regulations.insert(Regulation::Nis2, 40.0);
        let mut gdpr_blocks = BTreeMap::new();
        gdpr_blocks.insert("Data governance".to_string(), 100.0);
        gdpr_blocks.insert("Security measures".to_string(), 40.0);
        let mut blocks = BTreeMap::new();
        blocks.insert(Regulation::Gdpr, gdpr_blocks);
        ScoreResult {
            regulations,
            blocks,
        }
    }

    fn normalized() -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        map.insert("gdpr-01".to_string(), 1.0);
        map.insert("gdpr-02".to_string(), 0.4);
        map
    }

    #[test]
    fn prompt_carries_alias_and_scores() {
        let prompt = build_prompt(&profile(), &scores(), &normalized());
        assert!(prompt.contains("a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6"));
        assert!(prompt.contains("- GDPR: 80.00%"));
        assert!(prompt.contains("  - Security measures: 40.00%"));
        assert!(prompt.contains("- gdpr-02: 0.40"));
        assert!(prompt.contains("Regulations under assessment: GDPR, NIS2."));
    }

    #[test]
    fn prompt_ends_with_closing_instructions() {
        let prompt = build_prompt(&profile(), &scores(), &normalized());
        assert!(prompt.ends_with(CLOSING_INSTRUCTIONS));
        assert!(prompt.contains("flowing prose"));
        assert!(prompt.contains("Do not use numbered lists"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let first = build_prompt(&profile(), &scores(), &normalized());
        let second = build_prompt(&profile(), &scores(), &normalized());
        assert_eq!(first, second);
    }

    #[test]
    fn rendered_prompt_passes_the_scrubber() {
        let prompt = build_prompt(&profile(), &scores(), &normalized());
        let report = crate::assessment::privacy::scan_text(&prompt);
        assert!(report.clean, "matched: {:?}", report.matched);
    }
}
