use super::bank::Question;
use super::domain::{AnswerSet, Regulation};
use super::scoring::normalize_answer;
use serde::Serialize;

/// Gaps smaller than this are treated as fully compliant and produce no
/// remediation entry.
const GAP_EPSILON: f64 = 0.01;

/// One prioritized remediation entry derived from an answered question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodoItem {
    pub normative: Regulation,
    pub block: String,
    pub priority: u8,
    pub question: String,
    pub action: String,
}

/// Per-regulation action templates. `{block}` and `{question}` are
/// interpolated with the concrete gap; regulations without a template use the
/// generic fallback.
#[derive(Debug, Clone)]
pub struct ActionCatalog {
    templates: Vec<(Regulation, String)>,
    fallback: String,
}

impl ActionCatalog {
    pub fn standard() -> Self {
        Self {
            templates: vec![
                (
                    Regulation::Gdpr,
                    "Review the '{block}' controls against GDPR accountability duties \
                     and document the measure covering: {question}"
                        .to_string(),
                ),
                (
                    Regulation::Nis2,
                    "Strengthen the '{block}' cybersecurity practice required by NIS2, \
                     addressing: {question}"
                        .to_string(),
                ),
                (
                    Regulation::Dora,
                    "Align the '{block}' ICT resilience process with DORA, closing the \
                     gap on: {question}"
                        .to_string(),
                ),
                (
                    Regulation::Iso27001,
                    "Update the ISMS '{block}' control set per ISO 27001 and evidence: \
                     {question}"
                        .to_string(),
                ),
            ],
            fallback: "Remediate the '{block}' control gap: {question}".to_string(),
        }
    }

    fn template(&self, regulation: Regulation) -> &str {
        self.templates
            .iter()
            .find(|(candidate, _)| *candidate == regulation)
            .map(|(_, template)| template.as_str())
            .unwrap_or(&self.fallback)
    }

    fn render(&self, question: &Question) -> String {
        self.template(question.normative)
            .replace("{block}", &question.block)
            .replace("{question}", &question.text)
    }
}

/// Derives the prioritized remediation list. Only answered questions with a
/// gap above the epsilon contribute; priority is round(gap x weight) clamped
/// into [1, 5]. Ordering: priority descending, then regulation label, then
/// block, with a stable sort so equal keys keep bank order.
pub fn remediation_plan(
    questions: &[&Question],
    answers: &AnswerSet,
    catalog: &ActionCatalog,
) -> Vec<TodoItem> {
    let mut items: Vec<TodoItem> = questions
        .iter()
        .filter_map(|question| {
            let score = normalize_answer(question.answer_type, answers.get(&question.id))?;
            let gap = 1.0 - score;
            if gap <= GAP_EPSILON {
                return None;
            }
            let priority = (gap * f64::from(question.weight)).round().clamp(1.0, 5.0) as u8;
            Some(TodoItem {
                normative: question.normative,
                block: question.block.clone(),
                priority,
                question: question.text.clone(),
                action: catalog.render(question),
            })
        })
        .collect();

    items.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.normative.label().cmp(b.normative.label()))
            .then_with(|| a.block.cmp(&b.block))
    });
    items
}
