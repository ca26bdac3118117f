use super::domain::{AnswerType, Regulation};
use crate::config::AssessmentConfig;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

/// One questionnaire entry. Built once at bank-load time and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: String,
    pub normative: Regulation,
    pub block: String,
    pub text: String,
    pub weight: u32,
    pub answer_type: AnswerType,
}

/// Counters describing what the loader kept and what it dropped. Surfaced by
/// the `bank check` CLI command and otherwise only logged.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BankLoadReport {
    pub accepted: usize,
    pub skipped_invalid: usize,
    pub skipped_unknown_normative: usize,
    pub skipped_duplicate_id: usize,
}

/// Ordered collection of questions. A malformed or missing source document
/// degrades to an empty bank; callers never see a load error.
#[derive(Debug, Default, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    pub fn from_json(raw: &str, config: &AssessmentConfig) -> (Self, BankLoadReport) {
        let mut report = BankLoadReport::default();

        let document: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, "question bank is not valid JSON, using empty bank");
                return (Self::default(), report);
            }
        };

        let entries = match document.get("questions").and_then(Value::as_array) {
            Some(entries) => entries,
            None => {
                warn!("question bank has no 'questions' array, using empty bank");
                return (Self::default(), report);
            }
        };

        let mut questions = Vec::with_capacity(entries.len());
        let mut seen_ids: HashSet<String> = HashSet::new();

        for entry in entries {
            let Some(question) = parse_entry(entry, config, &mut report) else {
                continue;
            };
            if !seen_ids.insert(question.id.clone()) {
                warn!(id = %question.id, "duplicate question id, keeping first occurrence");
                report.skipped_duplicate_id += 1;
                continue;
            }
            questions.push(question);
        }

        report.accepted = questions.len();
        (Self { questions }, report)
    }

    pub fn from_path(path: &Path, config: &AssessmentConfig) -> (Self, BankLoadReport) {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_json(&raw, config),
            Err(err) => {
                warn!(path = %path.display(), %err, "question bank unreadable, using empty bank");
                (Self::default(), BankLoadReport::default())
            }
        }
    }

    /// Immutable view of the loaded questions, in document order.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

fn parse_entry(
    entry: &Value,
    config: &AssessmentConfig,
    report: &mut BankLoadReport,
) -> Option<Question> {
    let id = required_string(entry, "id");
    let normative_raw = required_string(entry, "normative");
    let block = required_string(entry, "block");
    let text = required_string(entry, "text");

    let (Some(id), Some(normative_raw), Some(block), Some(text)) =
        (id, normative_raw, block, text)
    else {
        report.skipped_invalid += 1;
        return None;
    };

    let Some(normative) = Regulation::parse(&normative_raw).filter(|r| config.allows(*r)) else {
        warn!(id = %id, normative = %normative_raw, "unknown normative, skipping question");
        report.skipped_unknown_normative += 1;
        return None;
    };

    let weight = entry
        .get("weight")
        .and_then(Value::as_u64)
        .map(|w| w as u32)
        .unwrap_or(1)
        .max(1);

    let answer_type = entry
        .get("answerType")
        .and_then(Value::as_str)
        .and_then(AnswerType::parse)
        .unwrap_or(AnswerType::YesNo);

    Some(Question {
        id,
        normative,
        block,
        text,
        weight,
        answer_type,
    })
}

fn required_string(entry: &Value, field: &str) -> Option<String> {
    entry
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AssessmentConfig {
        AssessmentConfig::standard()
    }

    #[test]
    fn malformed_document_yields_empty_bank() {
        let (bank, report) = QuestionBank::from_json("not json at all", &config());
        assert!(bank.is_empty());
        assert_eq!(report.accepted, 0);
    }

    #[test]
    fn non_array_questions_field_yields_empty_bank() {
        let (bank, _) = QuestionBank::from_json(r#"{"questions": "oops"}"#, &config());
        assert!(bank.is_empty());
        let (bank, _) = QuestionBank::from_json(r#"[1, 2, 3]"#, &config());
        assert!(bank.is_empty());
    }

    #[test]
    fn loads_well_formed_entries() {
        let raw = r#"{"questions": [
            {"id": "gdpr-01", "normative": "gdpr", "block": "Data governance",
             "text": "Is a record of processing activities maintained?",
             "weight": 4, "answerType": "yes_no"},
            {"id": "nis2-01", "normative": "nis2", "block": "Risk management",
             "text": "Are cybersecurity risks assessed periodically?",
             "weight": 3, "answerType": "scale_0_5"}
        ]}"#;
        let (bank, report) = QuestionBank::from_json(raw, &config());
        assert_eq!(bank.len(), 2);
        assert_eq!(report.accepted, 2);
        assert_eq!(bank.questions()[0].normative, Regulation::Gdpr);
        assert_eq!(bank.questions()[1].answer_type, AnswerType::Scale0To5);
    }

    #[test]
    fn skips_entries_missing_required_fields() {
        let raw = r#"{"questions": [
            {"id": "", "normative": "gdpr", "block": "b", "text": "t"},
            {"normative": "gdpr", "block": "b", "text": "t"},
            {"id": "gdpr-02", "normative": "gdpr", "block": "b", "text": "t"}
        ]}"#;
        let (bank, report) = QuestionBank::from_json(raw, &config());
        assert_eq!(bank.len(), 1);
        assert_eq!(report.skipped_invalid, 2);
    }

    #[test]
    fn weight_defaults_to_one_and_floors_at_one() {
        let raw = r#"{"questions": [
            {"id": "a", "normative": "gdpr", "block": "b", "text": "t"},
            {"id": "b", "normative": "gdpr", "block": "b", "text": "t", "weight": 0}
        ]}"#;
        let (bank, _) = QuestionBank::from_json(raw, &config());
        assert_eq!(bank.questions()[0].weight, 1);
        assert_eq!(bank.questions()[1].weight, 1);
    }

    #[test]
    fn unknown_answer_type_defaults_to_yes_no() {
        let raw = r#"{"questions": [
            {"id": "a", "normative": "dora", "block": "b", "text": "t",
             "answerType": "essay"}
        ]}"#;
        let (bank, _) = QuestionBank::from_json(raw, &config());
        assert_eq!(bank.questions()[0].answer_type, AnswerType::YesNo);
    }

    #[test]
    fn unknown_normative_is_skipped() {
        let raw = r#"{"questions": [
            {"id": "x-01", "normative": "hipaa", "block": "b", "text": "t"},
            {"id": "gdpr-01", "normative": "gdpr", "block": "b", "text": "t"}
        ]}"#;
        let (bank, report) = QuestionBank::from_json(raw, &config());
        assert_eq!(bank.len(), 1);
        assert_eq!(report.skipped_unknown_normative, 1);
    }

    #[test]
    fn duplicate_id_keeps_first_occurrence() {
        let raw = r#"{"questions": [
            {"id": "gdpr-01", "normative": "gdpr", "block": "first", "text": "t", "weight": 5},
            {"id": "gdpr-01", "normative": "gdpr", "block": "second", "text": "t", "weight": 1}
        ]}"#;
        let (bank, report) = QuestionBank::from_json(raw, &config());
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.questions()[0].block, "first");
        assert_eq!(report.skipped_duplicate_id, 1);
    }

    #[test]
    fn missing_file_yields_empty_bank() {
        let (bank, report) =
            QuestionBank::from_path(Path::new("/nonexistent/questions.json"), &config());
        assert!(bank.is_empty());
        assert_eq!(report.accepted, 0);
    }
}
