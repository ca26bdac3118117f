use crate::offline::{run_bank_check, run_score, BankCheckArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use conformly::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Conformly",
    about = "Run the compliance self-assessment service or score a questionnaire offline",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect a question bank document
    Bank {
        #[command(subcommand)]
        command: BankCommand,
    },
    /// Score an answer file against a bank without starting the server
    Score(ScoreArgs),
}

#[derive(Subcommand, Debug)]
enum BankCommand {
    /// Load a bank file and report accepted and skipped entries
    Check(BankCheckArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Bank {
            command: BankCommand::Check(args),
        } => run_bank_check(args),
        Command::Score(args) => run_score(args),
    }
}
