mod commands;
mod helpers;

use challenger_core::domain::ChallengerError;
use clap::Parser;

pub fn run_from_env() -> i32 {
    helpers::init_tracing();
    let args: Vec<String> = std::env::args().collect();

    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let challenger_error = error.as_challenger_error();
            eprintln!("{}", challenger_error.diagnostic_line());
            eprintln!("{}", challenger_error.fatal_exit_line());
            challenger_error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "challenger",
    version,
    about = "Candidate identification benchmark over MS/MS challenges"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Run every challenge of the corpus, positive group first
    Run(commands::RunArgs),
    /// Run a single challenge and print its ranked result as JSON
    Challenge(commands::ChallengeArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Run(args) => commands::run_benchmark_command(args),
        CliCommand::Challenge(args) => commands::run_challenge_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(ChallengerError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_challenger_error(&self) -> ChallengerError {
        match self {
            Self::Usage(message) => {
                ChallengerError::input_validation("INPUT.CLI_USAGE", message.trim_end().to_string())
            }
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => ChallengerError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
