use super::bank::{Question, QuestionBank};
use super::domain::{AnswerSet, AnswerType, AnswerValue, Regulation};
use std::collections::BTreeMap;

/// Weighted compliance percentages, per regulation and per (regulation,
/// block). Ordered maps keep rendering and prompt output deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub regulations: BTreeMap<Regulation, f64>,
    pub blocks: BTreeMap<Regulation, BTreeMap<String, f64>>,
}

/// Picks the questions one session will show: filter to the requested
/// regulations, prefer higher weights, break ties on ascending id, truncate
/// to the display limit.
pub fn select_questions<'a>(
    bank: &'a QuestionBank,
    regulations: &[Regulation],
    limit: usize,
) -> Vec<&'a Question> {
    let mut selected: Vec<&Question> = bank
        .questions()
        .iter()
        .filter(|question| regulations.contains(&question.normative))
        .collect();

    selected.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.id.cmp(&b.id)));
    selected.truncate(limit);
    selected
}

/// Maps a raw answer into [0, 1]. `None` means the question was not answered
/// and must stay out of both the numerator and the denominator.
pub fn normalize_answer(answer_type: AnswerType, value: Option<&AnswerValue>) -> Option<f64> {
    let value = value?;
    let normalized = match answer_type {
        AnswerType::Scale0To5 => numeric_value(value).map_or(0.0, |n| (n / 5.0).clamp(0.0, 1.0)),
        AnswerType::YesNo => {
            if is_affirmative(value) {
                1.0
            } else {
                0.0
            }
        }
    };
    Some(normalized)
}

fn numeric_value(value: &AnswerValue) -> Option<f64> {
    match value {
        AnswerValue::Number(n) => Some(*n),
        AnswerValue::Flag(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        AnswerValue::Text(text) => text.trim().parse::<f64>().ok(),
    }
}

fn is_affirmative(value: &AnswerValue) -> bool {
    match value {
        AnswerValue::Number(n) => *n == 1.0,
        AnswerValue::Flag(flag) => *flag,
        AnswerValue::Text(text) => {
            let text = text.trim();
            if text.parse::<f64>().map_or(false, |n| n == 1.0) {
                return true;
            }
            matches!(
                text.to_ascii_lowercase().as_str(),
                "yes" | "true" | "si" | "on"
            )
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct WeightedTally {
    achieved: f64,
    max: f64,
}

impl WeightedTally {
    fn add(&mut self, score: f64, weight: u32) {
        self.achieved += score * f64::from(weight);
        self.max += f64::from(weight);
    }

    fn percentage(&self) -> f64 {
        if self.max > 0.0 {
            round2(self.achieved / self.max * 100.0)
        } else {
            0.0
        }
    }
}

/// Aggregates answered questions into weighted percentages. Buckets exist for
/// every regulation and block present in the selected questions, so a
/// regulation nobody answered reports 0 rather than disappearing.
pub fn score_answers(questions: &[&Question], answers: &AnswerSet) -> ScoreResult {
    let mut per_regulation: BTreeMap<Regulation, WeightedTally> = BTreeMap::new();
    let mut per_block: BTreeMap<Regulation, BTreeMap<String, WeightedTally>> = BTreeMap::new();

    for question in questions {
        let regulation_tally = per_regulation.entry(question.normative).or_default();
        let block_tally = per_block
            .entry(question.normative)
            .or_default()
            .entry(question.block.clone())
            .or_default();

        if let Some(score) = normalize_answer(question.answer_type, answers.get(&question.id)) {
            regulation_tally.add(score, question.weight);
            block_tally.add(score, question.weight);
        }
    }

    ScoreResult {
        regulations: per_regulation
            .into_iter()
            .map(|(regulation, tally)| (regulation, tally.percentage()))
            .collect(),
        blocks: per_block
            .into_iter()
            .map(|(regulation, blocks)| {
                let blocks = blocks
                    .into_iter()
                    .map(|(block, tally)| (block, tally.percentage()))
                    .collect();
                (regulation, blocks)
            })
            .collect(),
    }
}

/// Normalized score per answered question id, in id order. Feeds the prompt
/// builder; unanswered questions are absent.
pub fn normalized_answers(questions: &[&Question], answers: &AnswerSet) -> BTreeMap<String, f64> {
    questions
        .iter()
        .filter_map(|question| {
            normalize_answer(question.answer_type, answers.get(&question.id))
                .map(|score| (question.id.clone(), score))
        })
        .collect()
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssessmentConfig;

    fn question(id: &str, normative: Regulation, block: &str, weight: u32, answer_type: AnswerType) -> Question {
        Question {
            id: id.to_string(),
            normative,
            block: block.to_string(),
            text: format!("question {id}"),
            weight,
            answer_type,
        }
    }

    fn bank_of(questions: Vec<Question>) -> QuestionBank {
        let entries: Vec<serde_json::Value> = questions
            .iter()
            .map(|q| {
                serde_json::json!({
                    "id": q.id,
                    "normative": q.normative.slug(),
                    "block": q.block,
                    "text": q.text,
                    "weight": q.weight,
                    "answerType": match q.answer_type {
                        AnswerType::YesNo => "yes_no",
                        AnswerType::Scale0To5 => "scale_0_5",
                    },
                })
            })
            .collect();
        let raw = serde_json::json!({ "questions": entries }).to_string();
        let (bank, _) = QuestionBank::from_json(&raw, &AssessmentConfig::standard());
        bank
    }

    #[test]
    fn selection_prefers_weight_then_ascending_id() {
        let bank = bank_of(vec![
            question("gdpr-03", Regulation::Gdpr, "b", 2, AnswerType::YesNo),
            question("gdpr-01", Regulation::Gdpr, "b", 5, AnswerType::YesNo),
            question("gdpr-02", Regulation::Gdpr, "b", 5, AnswerType::YesNo),
            question("nis2-01", Regulation::Nis2, "b", 4, AnswerType::YesNo),
        ]);

        let selected = select_questions(&bank, &[Regulation::Gdpr], 2);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].id, "gdpr-01");
        assert_eq!(selected[1].id, "gdpr-02");
    }

    #[test]
    fn selection_filters_out_other_regulations() {
        let bank = bank_of(vec![
            question("gdpr-01", Regulation::Gdpr, "b", 1, AnswerType::YesNo),
            question("dora-01", Regulation::Dora, "b", 5, AnswerType::YesNo),
        ]);
        let selected = select_questions(&bank, &[Regulation::Dora], 10);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "dora-01");
    }

    #[test]
    fn scale_answers_divide_by_five_and_clamp() {
        let three = AnswerValue::Number(3.0);
        assert_eq!(
            normalize_answer(AnswerType::Scale0To5, Some(&three)),
            Some(0.6)
        );
        let high = AnswerValue::Number(9.0);
        assert_eq!(
            normalize_answer(AnswerType::Scale0To5, Some(&high)),
            Some(1.0)
        );
        let junk = AnswerValue::Text("maybe".to_string());
        assert_eq!(
            normalize_answer(AnswerType::Scale0To5, Some(&junk)),
            Some(0.0)
        );
    }

    #[test]
    fn yes_no_accepts_numeric_one_and_truthy_strings() {
        for raw in ["1", "yes", "TRUE", "si", "on"] {
            let value = AnswerValue::Text(raw.to_string());
            assert_eq!(
                normalize_answer(AnswerType::YesNo, Some(&value)),
                Some(1.0),
                "'{raw}' should count as full credit"
            );
        }
        for raw in ["0", "no", "2", "off", ""] {
            let value = AnswerValue::Text(raw.to_string());
            assert_eq!(
                normalize_answer(AnswerType::YesNo, Some(&value)),
                Some(0.0),
                "'{raw}' should count as zero"
            );
        }
        assert_eq!(
            normalize_answer(AnswerType::YesNo, Some(&AnswerValue::Flag(true))),
            Some(1.0)
        );
    }

    #[test]
    fn missing_answers_are_absent_not_zero() {
        assert_eq!(normalize_answer(AnswerType::YesNo, None), None);

        let q1 = question("gdpr-01", Regulation::Gdpr, "b", 4, AnswerType::YesNo);
        let q2 = question("gdpr-02", Regulation::Gdpr, "b", 4, AnswerType::YesNo);
        let questions = vec![&q1, &q2];
        let mut answers = AnswerSet::new();
        answers.insert("gdpr-01".to_string(), AnswerValue::Text("1".to_string()));

        // Unanswered gdpr-02 does not drag the percentage down.
        let result = score_answers(&questions, &answers);
        assert_eq!(result.regulations[&Regulation::Gdpr], 100.0);
    }

    #[test]
    fn single_question_percentage_is_rounded_score() {
        let q = question("nis2-01", Regulation::Nis2, "b", 3, AnswerType::Scale0To5);
        let questions = vec![&q];
        let mut answers = AnswerSet::new();
        answers.insert("nis2-01".to_string(), AnswerValue::Number(2.0));

        let result = score_answers(&questions, &answers);
        assert_eq!(result.regulations[&Regulation::Nis2], 40.0);
        assert_eq!(result.blocks[&Regulation::Nis2]["b"], 40.0);
    }

    #[test]
    fn weighted_mix_scenario_scores_eighty_percent() {
        let q1 = question("gdpr-01", Regulation::Gdpr, "governance", 4, AnswerType::YesNo);
        let q2 = question("gdpr-02", Regulation::Gdpr, "security", 2, AnswerType::Scale0To5);
        let questions = vec![&q1, &q2];
        let mut answers = AnswerSet::new();
        answers.insert("gdpr-01".to_string(), AnswerValue::Number(1.0));
        answers.insert("gdpr-02".to_string(), AnswerValue::Number(2.0));

        // (4*1 + 2*0.4) / (4+2) * 100 = 80.00
        let result = score_answers(&questions, &answers);
        assert_eq!(result.regulations[&Regulation::Gdpr], 80.0);
        assert_eq!(result.blocks[&Regulation::Gdpr]["governance"], 100.0);
        assert_eq!(result.blocks[&Regulation::Gdpr]["security"], 40.0);
    }

    #[test]
    fn unanswered_regulation_reports_zero_without_fault() {
        let q = question("dora-01", Regulation::Dora, "ict", 5, AnswerType::YesNo);
        let questions = vec![&q];
        let answers = AnswerSet::new();

        let result = score_answers(&questions, &answers);
        assert_eq!(result.regulations[&Regulation::Dora], 0.0);
        assert_eq!(result.blocks[&Regulation::Dora]["ict"], 0.0);
    }

    #[test]
    fn scoring_is_deterministic_across_runs() {
        let q1 = question("gdpr-01", Regulation::Gdpr, "a", 4, AnswerType::YesNo);
        let q2 = question("nis2-01", Regulation::Nis2, "b", 2, AnswerType::Scale0To5);
        let questions = vec![&q1, &q2];
        let mut answers = AnswerSet::new();
        answers.insert("gdpr-01".to_string(), AnswerValue::Text("yes".to_string()));
        answers.insert("nis2-01".to_string(), AnswerValue::Text("4".to_string()));

        let first = score_answers(&questions, &answers);
        let second = score_answers(&questions, &answers);
        assert_eq!(first, second);
    }

    #[test]
    fn normalized_answers_skip_missing_entries() {
        let q1 = question("gdpr-01", Regulation::Gdpr, "a", 1, AnswerType::Scale0To5);
        let q2 = question("gdpr-02", Regulation::Gdpr, "a", 1, AnswerType::YesNo);
        let questions = vec![&q1, &q2];
        let mut answers = AnswerSet::new();
        answers.insert("gdpr-01".to_string(), AnswerValue::Number(4.0));

        let normalized = normalized_answers(&questions, &answers);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized["gdpr-01"], 0.8);
    }

    #[test]
    fn round2_keeps_two_decimals() {
        assert_eq!(round2(66.666_666), 66.67);
        assert_eq!(round2(33.333_333), 33.33);
        assert_eq!(round2(100.0), 100.0);
    }
}
