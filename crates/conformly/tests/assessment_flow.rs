use conformly::assessment::{
    build_prompt, remediation_plan, scan_text, score_answers, select_questions, ActionCatalog,
    AnswerSet, AnswerValue, AssessmentProfile, CompanyAlias, CompanyType, PiiCategory,
    QuestionBank, Regulation,
};
use conformly::config::AssessmentConfig;

const BANK: &str = r#"{
    "questions": [
        {"id": "gdpr-01", "normative": "gdpr", "block": "Data governance",
         "text": "Is a record of processing activities maintained?",
         "weight": 4, "answerType": "yes_no"},
        {"id": "gdpr-02", "normative": "gdpr", "block": "Security measures",
         "text": "How mature is breach notification?",
         "weight": 2, "answerType": "scale_0_5"},
        {"id": "nis2-01", "normative": "nis2", "block": "Incident response",
         "text": "Can incidents be reported within 24 hours?",
         "weight": 5, "answerType": "yes_no"},
        {"id": "dora-01", "normative": "dora", "block": "ICT risk",
         "text": "Is an ICT risk framework approved?",
         "weight": 5, "answerType": "yes_no"}
    ]
}"#;

fn alias() -> CompanyAlias {
    serde_json::from_str("\"a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6\"").expect("alias deserializes")
}

#[test]
fn full_assessment_produces_scores_plan_and_clean_prompt() {
    let config = AssessmentConfig::standard();
    let (bank, report) = QuestionBank::from_json(BANK, &config);
    assert_eq!(report.accepted, 4);

    let regulations = vec![Regulation::Gdpr, Regulation::Nis2];
    let selected = select_questions(&bank, &regulations, 10);
    assert_eq!(selected.len(), 3);
    // weight 5 first, then 4, then 2
    assert_eq!(selected[0].id, "nis2-01");

    let mut answers = AnswerSet::new();
    answers.insert("gdpr-01".to_string(), AnswerValue::Text("1".to_string()));
    answers.insert("gdpr-02".to_string(), AnswerValue::Text("2".to_string()));
    answers.insert("nis2-01".to_string(), AnswerValue::Text("no".to_string()));

    let scores = score_answers(&selected, &answers);
    assert_eq!(scores.regulations[&Regulation::Gdpr], 80.0);
    assert_eq!(scores.regulations[&Regulation::Nis2], 0.0);

    let plan = remediation_plan(&selected, &answers, &ActionCatalog::standard());
    // nis2 full miss on weight 5 leads, gdpr partial gap follows
    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0].normative, Regulation::Nis2);
    assert_eq!(plan[0].priority, 5);
    assert_eq!(plan[1].normative, Regulation::Gdpr);
    assert_eq!(plan[1].priority, 1);

    let profile = AssessmentProfile {
        alias: alias(),
        company_type: CompanyType::SmallBusiness,
        employee_count: 12,
        regulations,
    };
    let normalized = conformly::assessment::normalized_answers(&selected, &answers);
    let prompt = build_prompt(&profile, &scores, &normalized);

    assert!(prompt.contains(profile.alias.as_str()));
    assert!(prompt.contains("- NIS2: 0.00%"));
    assert!(scan_text(&prompt).clean);
}

#[test]
fn scrubber_gates_a_contaminated_prompt() {
    // a company name leaking an email address must block the outbound call
    let contaminated = format!(
        "Compliance self-assessment for organization {}.\nContact: dpo@acme.example",
        alias()
    );
    let report = scan_text(&contaminated);
    assert!(!report.clean);
    assert_eq!(report.matched, vec![PiiCategory::Email]);
}

#[test]
fn selection_caps_at_limit_across_regulations() {
    let config = AssessmentConfig::standard();
    let (bank, _) = QuestionBank::from_json(BANK, &config);
    let all = Regulation::ordered().to_vec();
    let selected = select_questions(&bank, &all, 2);
    assert_eq!(selected.len(), 2);
    assert!(selected.iter().all(|question| question.weight == 5));
}
