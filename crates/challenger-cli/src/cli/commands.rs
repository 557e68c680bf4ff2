use super::CliError;
use super::helpers::{build_toolkit, current_working_dir, resolve_config};
use anyhow::Context;
use challenger_core::common::constants::REACTION_DATABASE_FILE_NAME;
use challenger_core::common::{FailurePolicy, RunConfig};
use challenger_core::domain::ExecutionMode;
use challenger_core::modules::corpus::ensure_data_root;
use challenger_core::modules::serialization::write_json_artifact;
use challenger_core::modules::{render_human_summary, run_benchmark, run_named_challenge};
use std::path::PathBuf;
use tracing::info;

#[derive(clap::Args)]
pub(super) struct CorpusArgs {
    /// Corpus root holding candidates, peaklists and solutions
    #[arg(long, default_value = "data")]
    data_root: PathBuf,

    /// Archive unpacked next to the data root when it is missing
    #[arg(long, default_value = "data.zip")]
    data_archive: PathBuf,

    /// Reaction database handed to the fragmentation program
    #[arg(long, default_value = REACTION_DATABASE_FILE_NAME)]
    reaction_database: PathBuf,

    /// Fragmentation program (reads rules on stdin, prints m/z values)
    #[arg(long)]
    fragmenter: PathBuf,

    /// Extra argument passed to the fragmentation program (repeatable)
    #[arg(long = "fragmenter-arg", value_name = "ARG", allow_hyphen_values = true)]
    fragmenter_args: Vec<String>,

    /// At most two challenges per group and five candidates per challenge;
    /// nothing is written
    #[arg(long)]
    reduced: bool,
}

impl CorpusArgs {
    fn base_config(&self) -> RunConfig {
        RunConfig {
            data_root: self.data_root.clone(),
            reaction_database_path: self.reaction_database.clone(),
            data_archive: Some(self.data_archive.clone()),
            execution_mode: if self.reduced {
                ExecutionMode::Reduced
            } else {
                ExecutionMode::Normal
            },
            ..RunConfig::default()
        }
    }
}

#[derive(clap::Args)]
pub(super) struct RunArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// Root for per-challenge JSON results and summaries
    #[arg(long, default_value = "results")]
    results_root: PathBuf,

    /// Concurrent challenges (default: half the available cores)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Record failing challenges and keep going instead of aborting
    #[arg(long)]
    isolate_failures: bool,
}

impl RunArgs {
    fn into_config(self) -> RunConfig {
        RunConfig {
            results_root: self.results_root,
            concurrency: self.concurrency,
            failure_policy: if self.isolate_failures {
                FailurePolicy::Isolate
            } else {
                FailurePolicy::Abort
            },
            ..self.corpus.base_config()
        }
    }
}

#[derive(clap::Args)]
pub(super) struct ChallengeArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// Challenge name, e.g. Challenge-082
    #[arg(long)]
    name: String,

    /// Write the JSON result here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(super) fn run_benchmark_command(args: RunArgs) -> Result<i32, CliError> {
    let working_dir = current_working_dir()?;
    let toolkit = build_toolkit(&args.corpus.fragmenter, &args.corpus.fragmenter_args);
    let config = resolve_config(args.into_config(), &working_dir);
    info!(
        data_root = %config.data_root.display(),
        results_root = %config.results_root.display(),
        mode = ?config.execution_mode,
        policy = ?config.failure_policy,
        "starting benchmark"
    );

    let report = run_benchmark(&config, &toolkit).map_err(CliError::Compute)?;
    println!("{}", render_human_summary(&report));
    if config.execution_mode.allows_writes() {
        println!("Results: {}", config.results_root.display());
    }

    let failed = report.positive.failures.len() + report.negative.failures.len();
    if failed == 0 { Ok(0) } else { Ok(1) }
}

pub(super) fn run_challenge_command(args: ChallengeArgs) -> Result<i32, CliError> {
    let working_dir = current_working_dir()?;
    let toolkit = build_toolkit(&args.corpus.fragmenter, &args.corpus.fragmenter_args);
    let config = resolve_config(args.corpus.base_config(), &working_dir);
    ensure_data_root(&config).map_err(CliError::Compute)?;

    let result = run_named_challenge(&config, &args.name, &toolkit).map_err(CliError::Compute)?;
    match args.output {
        Some(path) => {
            let path = working_dir.join(path);
            write_json_artifact(&path, &result).map_err(CliError::Compute)?;
            println!("JSON result: {}", path.display());
        }
        None => {
            let json = serde_json::to_string_pretty(&result)
                .with_context(|| format!("failed to serialize result for '{}'", args.name))?;
            println!("{json}");
        }
    }
    Ok(0)
}
