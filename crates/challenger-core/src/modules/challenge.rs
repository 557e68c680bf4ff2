//! One challenge end to end: load inputs, score every candidate under every
//! adduct, rank.

use super::adducts::{AdductView, ReactionDatabase, resolve_adducts};
use super::corpus::{read_candidates, read_solutions, read_spectrum, read_text, resolve_peaklist};
use super::scoring::{CandidateScore, score_candidate};
use super::traits::Toolkit;
use crate::common::RunConfig;
use crate::domain::{
    Candidate, CandidateResult, Challenge, ChallengeResult, ChallengerError, ChallengerResult,
    ExecutionMode, IonMode, PipelineResult, SolutionRef, Spectrum,
};
use std::cmp::Ordering;
use std::path::PathBuf;
use tracing::warn;

/// Everything [`run_challenge`] reads, resolved up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeInput {
    pub name: String,
    pub ion_mode: IonMode,
    pub spectrum_path: PathBuf,
    pub candidates_path: PathBuf,
    pub solutions_path: PathBuf,
    pub reaction_database_path: PathBuf,
    pub execution_mode: ExecutionMode,
}

impl ChallengeInput {
    pub fn new(challenge: &Challenge, config: &RunConfig) -> Self {
        Self {
            name: challenge.name.clone(),
            ion_mode: challenge.ion_mode,
            spectrum_path: challenge.spectrum_path.clone(),
            candidates_path: challenge.candidates_path.clone(),
            solutions_path: config.solutions_path(),
            reaction_database_path: config.reaction_database_path.clone(),
            execution_mode: config.execution_mode,
        }
    }
}

pub fn run_challenge(input: &ChallengeInput, toolkit: &Toolkit) -> PipelineResult<ChallengeResult> {
    let spectrum = read_spectrum(&input.spectrum_path)?;
    let mut candidates = read_candidates(&input.candidates_path)?;
    let solutions = read_solutions(&input.solutions_path)?;
    let solution = solutions
        .iter()
        .find(|solution| solution.challenge_name == input.name)
        .map(SolutionRef::from)
        .ok_or_else(|| {
            ChallengerError::input_validation(
                "INPUT.SOLUTION_NOT_FOUND",
                format!(
                    "no solution record for challenge '{}' in '{}'",
                    input.name,
                    input.solutions_path.display()
                ),
            )
        })?;

    let database = ReactionDatabase::parse(&read_text(&input.reaction_database_path)?)?;
    let views = resolve_adducts(&database, input.ion_mode);

    if let Some(limit) = input.execution_mode.candidate_limit() {
        candidates.truncate(limit);
    }
    let total_candidates = candidates.len();

    let mut results: Vec<CandidateResult> = candidates
        .into_iter()
        .map(|candidate| match score_one(&candidate, &views, &spectrum, input.ion_mode, toolkit) {
            Ok(score) => score.into_result(candidate),
            Err(error) => {
                warn!(
                    challenge = %input.name,
                    candidate = %candidate.identifier,
                    placeholder = error.placeholder(),
                    "candidate failed: {}",
                    error.message()
                );
                CandidateResult::failed(candidate, error.message())
            }
        })
        .collect();

    rank_results(&mut results);
    let correct_rank = correct_rank(&results, &solution.inchi_key);

    Ok(ChallengeResult {
        challenge_name: input.name.clone(),
        solution,
        total_candidates,
        correct_rank,
        in_top1: in_top(correct_rank, 1),
        in_top5: in_top(correct_rank, 5),
        in_top10: in_top(correct_rank, 10),
        adduct_labels: views.into_iter().map(|view| view.label).collect(),
        results,
    })
}

/// Runs the challenge named `name` without discovering the rest of the
/// corpus.
pub fn run_named_challenge(
    config: &RunConfig,
    name: &str,
    toolkit: &Toolkit,
) -> PipelineResult<ChallengeResult> {
    let candidates_path = config.candidates_dir().join(format!("{name}.csv"));
    if !candidates_path.is_file() {
        return Err(ChallengerError::input_validation(
            "INPUT.UNKNOWN_CHALLENGE",
            format!(
                "no candidate file for challenge '{name}' at '{}'",
                candidates_path.display()
            ),
        ));
    }

    let (spectrum_path, ion_mode) = resolve_peaklist(config, name)?;
    let challenge = Challenge {
        name: name.to_string(),
        ion_mode,
        spectrum_path,
        candidates_path,
    };
    run_challenge(&ChallengeInput::new(&challenge, config), toolkit)
}

fn score_one(
    candidate: &Candidate,
    views: &[AdductView],
    spectrum: &Spectrum,
    mode: IonMode,
    toolkit: &Toolkit,
) -> ChallengerResult<CandidateScore> {
    let structure = toolkit.parser.parse(&candidate.smiles)?;
    let masses_by_adduct = views
        .iter()
        .map(|view| {
            let mut masses = toolkit.fragmenter.fragment(&structure, &view.database, mode)?;
            masses.sort_by(f64::total_cmp);
            Ok((view.label.clone(), masses))
        })
        .collect::<ChallengerResult<Vec<_>>>()?;

    Ok(score_candidate(
        &masses_by_adduct,
        spectrum,
        toolkit.comparator.as_ref(),
    ))
}

/// Descending best cosine, NaN last, ties kept in input order.
pub fn rank_results(results: &mut [CandidateResult]) {
    fn key(result: &CandidateResult) -> f64 {
        if result.cosine_similarity.is_nan() {
            f64::NEG_INFINITY
        } else {
            result.cosine_similarity
        }
    }
    results.sort_by(|left, right| key(right).partial_cmp(&key(left)).unwrap_or(Ordering::Equal));
}

/// 1-based position of the first result carrying `inchi_key`, 0 if none.
pub fn correct_rank(results: &[CandidateResult], inchi_key: &str) -> usize {
    results
        .iter()
        .position(|result| result.candidate.inchi_key == inchi_key)
        .map_or(0, |index| index + 1)
}

const fn in_top(rank: usize, k: usize) -> bool {
    rank >= 1 && rank <= k
}
