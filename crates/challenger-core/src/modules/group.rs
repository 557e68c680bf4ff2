//! Group processing and the full benchmark run.

use super::challenge::{ChallengeInput, run_challenge};
use super::corpus::{discover_challenges, ensure_data_root, partition_by_mode};
use super::metrics::{Summary, summarize};
use super::pool::{PoolControl, PoolEvent, WorkerPool};
use super::serialization::{ArtifactWriteError, write_json_artifact};
use super::traits::Toolkit;
use crate::common::{FailurePolicy, RunConfig};
use crate::domain::{
    Challenge, ChallengeFailure, ChallengeResult, ChallengerError, IonMode, PipelineResult,
};
use serde::Serialize;
use std::fs;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupReport {
    pub ion_mode: IonMode,
    /// Completed challenges in discovery order.
    pub results: Vec<ChallengeResult>,
    pub failures: Vec<ChallengeFailure>,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub positive: GroupReport,
    pub negative: GroupReport,
}

pub fn run_benchmark(config: &RunConfig, toolkit: &Toolkit) -> PipelineResult<BenchmarkReport> {
    let started = Instant::now();
    ensure_data_root(config)?;

    let writes = config.execution_mode.allows_writes();
    if writes {
        for mode in IonMode::ALL {
            let path = config.results_dir(mode);
            fs::create_dir_all(&path)
                .map_err(|source| ArtifactWriteError::Directory { path, source })?;
        }
    }

    let groups = partition_by_mode(discover_challenges(config)?, config.execution_mode);
    info!(
        positive = groups.positive.len(),
        negative = groups.negative.len(),
        concurrency = config.effective_concurrency(),
        "discovered challenges"
    );

    let positive = process_group(
        config,
        IonMode::Positive,
        groups.group(IonMode::Positive),
        toolkit,
        started,
    )?;
    let negative = process_group(
        config,
        IonMode::Negative,
        groups.group(IonMode::Negative),
        toolkit,
        started,
    )?;

    for group in [&positive, &negative] {
        if writes {
            write_json_artifact(&config.summary_path(group.ion_mode), &group.summary)?;
        }
        info!(
            mode = %group.ion_mode,
            total = group.summary.total_challenges,
            top1 = group.summary.top1_hits,
            top5 = group.summary.top5_hits,
            top10 = group.summary.top10_hits,
            failed = group.failures.len(),
            "summary: top1={:.2}% top5={:.2}% top10={:.2}%",
            group.summary.top1_accuracy_pct,
            group.summary.top5_accuracy_pct,
            group.summary.top10_accuracy_pct
        );
    }

    Ok(BenchmarkReport { positive, negative })
}

/// Runs one group on the worker pool. `started` is the benchmark start, used
/// for the elapsed time in progress lines.
pub fn process_group(
    config: &RunConfig,
    mode: IonMode,
    challenges: &[Challenge],
    toolkit: &Toolkit,
    started: Instant,
) -> PipelineResult<GroupReport> {
    let total = challenges.len();
    let writes = config.execution_mode.allows_writes();
    let mut completed: Vec<(usize, ChallengeResult)> = Vec::with_capacity(total);
    let mut failures: Vec<(usize, ChallengeFailure)> = Vec::new();
    let mut fatal: Option<ChallengerError> = None;

    let job = |_: usize, challenge: &Challenge| {
        run_challenge(&ChallengeInput::new(challenge, config), toolkit)
    };
    let handler = |event: PoolEvent<ChallengeResult>| match event {
        PoolEvent::Started { index } => {
            info!(
                "{} | mode={} | {}/{} | elapsed={}",
                challenges[index].name,
                mode,
                index + 1,
                total,
                format_elapsed(started.elapsed())
            );
            PoolControl::Continue
        }
        PoolEvent::Finished {
            index,
            outcome: Ok(result),
        } => {
            if writes {
                let path = config.result_path(mode, &result.challenge_name);
                if let Err(error) = write_json_artifact(&path, &result) {
                    fatal = Some(error);
                    return PoolControl::Stop;
                }
            }
            info!(
                "Finished {}: rank={}/{}, top1={}, top5={}, top10={} | elapsed={}",
                result.challenge_name,
                result.correct_rank,
                result.total_candidates,
                result.in_top1,
                result.in_top5,
                result.in_top10,
                format_elapsed(started.elapsed())
            );
            completed.push((index, result));
            PoolControl::Continue
        }
        PoolEvent::Finished {
            index,
            outcome: Err(error),
        } => {
            let challenge = &challenges[index];
            match config.failure_policy {
                FailurePolicy::Abort => {
                    fatal = Some(error);
                    PoolControl::Stop
                }
                FailurePolicy::Isolate => {
                    warn!(
                        challenge = %challenge.name,
                        mode = %mode,
                        placeholder = error.placeholder(),
                        "challenge failed: {}",
                        error.message()
                    );
                    failures.push((index, ChallengeFailure::new(challenge, &error)));
                    PoolControl::Continue
                }
            }
        }
    };

    info!(mode = %mode, challenges = total, "processing group");
    WorkerPool::new(config.effective_concurrency())
        .stop_on_error(matches!(config.failure_policy, FailurePolicy::Abort))
        .run(challenges, job, handler);

    if let Some(error) = fatal {
        return Err(error);
    }

    completed.sort_by_key(|(index, _)| *index);
    failures.sort_by_key(|(index, _)| *index);
    let results: Vec<ChallengeResult> = completed.into_iter().map(|(_, result)| result).collect();
    let summary = summarize(&results);

    Ok(GroupReport {
        ion_mode: mode,
        results,
        failures: failures.into_iter().map(|(_, failure)| failure).collect(),
        summary,
    })
}

/// `Hh Mm`, truncated to whole minutes.
pub fn format_elapsed(elapsed: Duration) -> String {
    let minutes = elapsed.as_secs() / 60;
    format!("{}h {}m", minutes / 60, minutes % 60)
}
