use clap::Args;
use conformly::assessment::domain::{AnswerSet, Regulation};
use conformly::assessment::{
    remediation_plan, score_answers, select_questions, ActionCatalog, QuestionBank,
};
use conformly::config::AssessmentConfig;
use conformly::error::AppError;
use std::io::{Error as IoError, ErrorKind};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct BankCheckArgs {
    /// Path to the question bank JSON document
    pub(crate) path: PathBuf,
}

/// Loads the bank the same way the web flow does and reports what the loader
/// kept and dropped.
pub(crate) fn run_bank_check(args: BankCheckArgs) -> Result<(), AppError> {
    let config = AssessmentConfig::standard();
    let (bank, report) = QuestionBank::from_path(&args.path, &config);

    println!("question bank: {}", args.path.display());
    println!("  accepted:                  {}", report.accepted);
    println!("  skipped (invalid fields):  {}", report.skipped_invalid);
    println!(
        "  skipped (unknown normative): {}",
        report.skipped_unknown_normative
    );
    println!(
        "  skipped (duplicate id):    {}",
        report.skipped_duplicate_id
    );

    for regulation in Regulation::ordered() {
        let count = bank
            .questions()
            .iter()
            .filter(|question| question.normative == regulation)
            .count();
        println!("  {}: {count} question(s)", regulation.label());
    }
    Ok(())
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Path to the question bank JSON document
    #[arg(long)]
    pub(crate) bank: PathBuf,
    /// Path to a JSON object mapping question id to raw answer
    #[arg(long)]
    pub(crate) answers: PathBuf,
    /// Regulation to include (repeatable; defaults to all four)
    #[arg(long = "regulation")]
    pub(crate) regulations: Vec<String>,
    /// Maximum number of questions to select
    #[arg(long, default_value_t = 40)]
    pub(crate) limit: usize,
}

/// Offline scoring pass over a bank and an answer file, printing the same
/// percentages and remediation plan the report page shows.
pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let config = AssessmentConfig::standard();
    let (bank, _) = QuestionBank::from_path(&args.bank, &config);

    let regulations: Vec<Regulation> = if args.regulations.is_empty() {
        Regulation::ordered().to_vec()
    } else {
        args.regulations
            .iter()
            .filter_map(|raw| Regulation::parse(raw))
            .collect()
    };
    if regulations.is_empty() {
        return Err(AppError::Io(IoError::new(
            ErrorKind::InvalidInput,
            "no recognized regulations among the --regulation values",
        )));
    }

    let raw = std::fs::read_to_string(&args.answers)?;
    let answers: AnswerSet = serde_json::from_str(&raw).map_err(|err| {
        AppError::Io(IoError::new(
            ErrorKind::InvalidData,
            format!("answers file is not a JSON object of answers: {err}"),
        ))
    })?;

    let questions = select_questions(&bank, &regulations, args.limit);
    let scores = score_answers(&questions, &answers);
    let plan = remediation_plan(&questions, &answers, &ActionCatalog::standard());

    println!("compliance by regulation:");
    for (regulation, percentage) in &scores.regulations {
        println!("  {}: {percentage:.2}%", regulation.label());
        if let Some(blocks) = scores.blocks.get(regulation) {
            for (block, block_percentage) in blocks {
                println!("    {block}: {block_percentage:.2}%");
            }
        }
    }

    println!("remediation plan ({} item(s)):", plan.len());
    for item in &plan {
        println!(
            "  [P{}] {} / {}: {}",
            item.priority,
            item.normative.label(),
            item.block,
            item.action
        );
    }
    Ok(())
}
