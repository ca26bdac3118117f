//! Compliance self-assessment domain: question bank, scoring, remediation,
//! anonymization, and the outbound AI provider clients.

pub mod bank;
pub mod domain;
pub mod privacy;
pub mod prompt;
pub mod providers;
pub mod remediation;
pub mod scoring;

pub use bank::{BankLoadReport, Question, QuestionBank};
pub use domain::{
    AnswerSet, AnswerType, AnswerValue, AssessmentProfile, CompanyAlias, CompanyType, Regulation,
};
pub use privacy::{scan_text, scan_value, PiiCategory, ScrubReport};
pub use prompt::build_prompt;
pub use providers::{AnalysisOptions, ProviderError, ProviderKind};
pub use remediation::{remediation_plan, ActionCatalog, TodoItem};
pub use scoring::{normalized_answers, score_answers, select_questions, ScoreResult};
