use challenger_core::common::{FailurePolicy, RunConfig};
use challenger_core::domain::{ChallengerError, ChallengerResult, ExecutionMode, IonMode};
use challenger_core::modules::{
    ChallengeInput, Fragmenter, MassComparator, SmilesScreen, Structure, Toolkit,
    discover_challenges, process_group, run_benchmark, run_challenge, run_named_challenge,
};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tempfile::TempDir;

const REACTION_DATABASE: &str = "<datawarrior-fileinfo>\n\
<version=\"3.3\">\n\
<rowcount=\"6\">\n\
</datawarrior-fileinfo>\n\
<column properties>\n\
</column properties>\n\
label\tkind\tmode\treaction\n\
Ionization-H\tionization\tpositive\t[H+]\n\
Ionization-Na\tionization\tpositive\t[Na+]\n\
Ionization-K\tionization\tpositive\t[K+]\n\
Deprotonation\tionization\tnegative\t[-H+]\n\
Water loss\treaction\tpositive negative\t-H2O\n\
CO loss\treaction\tpositive\t-CO\n\
<datawarrior properties>\n\
</datawarrior properties>\n";

const CANDIDATE_HEADER: &str =
    "Identifier,CompoundName,MonoisotopicMass,MolecularFormula,SMILES,InChI,InChIKey\n";
const SOLUTION_HEADER: &str =
    "File,ChallengeName,PRECURSOR_MZ,ION_MODE,RT,nPeaks,NAME,SMILES,INCHI,INCHIKEY,CSID,PC_CID\n";

/// Looks SMILES up in a fixed table. Sodium adduct views shift every mass so
/// they never match; unknown SMILES fail.
struct TableFragmenter {
    masses: HashMap<&'static str, Vec<f64>>,
    calls: Arc<AtomicUsize>,
}

impl TableFragmenter {
    fn new(calls: Arc<AtomicUsize>) -> Self {
        let masses = HashMap::from([
            ("CCO", vec![200.0, 100.0, 150.0]),
            ("CCN", vec![100.0]),
            ("CCC", vec![300.0, 350.0, 400.0]),
            ("CCCl", vec![300.0, 350.0]),
            ("CCS", vec![999.0]),
        ]);
        Self { masses, calls }
    }
}

impl Fragmenter for TableFragmenter {
    fn fragment(
        &self,
        structure: &Structure,
        database: &str,
        _mode: IonMode,
    ) -> ChallengerResult<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let masses = self.masses.get(structure.smiles.as_str()).ok_or_else(|| {
            ChallengerError::computation(
                "RUN.FRAGMENTATION",
                format!("no fragments for '{}'", structure.smiles),
            )
        })?;
        let shift = if database.contains("Ionization-Na") {
            22.0
        } else {
            0.0
        };
        Ok(masses.iter().map(|mz| mz + shift).collect())
    }
}

fn toolkit(calls: Arc<AtomicUsize>) -> Toolkit {
    Toolkit::new(
        SmilesScreen,
        TableFragmenter::new(calls),
        MassComparator::default(),
    )
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent dir should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn candidate_row(identifier: &str, smiles: &str, inchi_key: &str) -> String {
    format!("{identifier},Compound {identifier},100.0,C2H6O,{smiles},InChI=1S/x,{inchi_key}\n")
}

fn solution_row(challenge: &str, inchi_key: &str) -> String {
    format!("{challenge}.mgf,{challenge},101.0,POSITIVE,1.5,3,Answer,C,InChI=1S/x,{inchi_key},1,2\n")
}

/// Challenge-001: the answer (KEY-A) matches exactly. Challenge-002: a decoy
/// matches exactly and the answer (KEY-B) comes second.
fn write_corpus(root: &Path, solutions: &[(&str, &str)]) -> RunConfig {
    let config = RunConfig {
        data_root: root.join("data"),
        results_root: root.join("results"),
        reaction_database_path: root.join("ReactionMassFragmentation.dwar"),
        concurrency: Some(2),
        ..RunConfig::default()
    };
    write_file(&config.reaction_database_path, REACTION_DATABASE);

    let candidates = config.candidates_dir();
    write_file(
        &candidates.join("Challenge-001.csv"),
        &format!(
            "{CANDIDATE_HEADER}{}{}",
            candidate_row("1", "CCN", "KEY-X"),
            candidate_row("2", "CCO", "KEY-A")
        ),
    );
    write_file(
        &candidates.join("Challenge-002.csv"),
        &format!(
            "{CANDIDATE_HEADER}{}{}{}",
            candidate_row("3", "CCCl", "KEY-B"),
            candidate_row("4", "CCC", "KEY-Y"),
            candidate_row("5", "CCS", "KEY-Z")
        ),
    );

    let positive = config.peaklist_dir(IonMode::Positive);
    write_file(
        &positive.join("Challenge-001.txt"),
        "# mz intensity\n100.0 50\n150.0 80\n200.0 100\n",
    );
    write_file(&positive.join("Challenge-002.txt"), "300.0 10\n350.0 40\n400.0 90\n");

    let rows: String = solutions
        .iter()
        .map(|(challenge, key)| solution_row(challenge, key))
        .collect();
    write_file(&config.solutions_path(), &format!("{SOLUTION_HEADER}{rows}"));
    config
}

fn input_for(config: &RunConfig, name: &str) -> ChallengeInput {
    let challenge = discover_challenges(config)
        .expect("discovery should succeed")
        .into_iter()
        .find(|challenge| challenge.name == name)
        .expect("challenge should be discovered");
    ChallengeInput::new(&challenge, config)
}

#[test]
fn benchmark_ranks_summarizes_and_persists() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = write_corpus(
        temp.path(),
        &[("Challenge-001", "KEY-A"), ("Challenge-002", "KEY-B")],
    );

    let report = run_benchmark(&config, &toolkit(Arc::default())).expect("benchmark should succeed");

    let positive = &report.positive;
    assert_eq!(positive.results.len(), 2);
    assert_eq!(positive.results[0].challenge_name, "Challenge-001");
    assert_eq!(positive.results[0].correct_rank, 1);
    assert!(positive.results[0].in_top1);
    assert_eq!(positive.results[1].correct_rank, 2);
    assert!(!positive.results[1].in_top1 && positive.results[1].in_top5);
    assert_eq!(
        positive.results[0].adduct_labels,
        vec!["Ionization-H".to_string(), "Ionization-Na".to_string()]
    );
    assert_eq!(positive.results[0].results[0].best_adduct, "Ionization-H");

    assert_eq!(positive.summary.total_challenges, 2);
    assert_eq!(positive.summary.top1_accuracy_pct, 50.0);
    assert_eq!(positive.summary.top5_accuracy_pct, 100.0);
    assert_eq!(positive.summary.top10_accuracy_pct, 100.0);
    assert_eq!(report.negative.summary.total_challenges, 0);
    assert_eq!(report.negative.summary.top1_accuracy_pct, 0.0);

    let artifact: Value = serde_json::from_str(
        &fs::read_to_string(config.result_path(IonMode::Positive, "Challenge-002"))
            .expect("challenge artifact should exist"),
    )
    .expect("challenge artifact should be json");
    assert_eq!(artifact["challengeName"], "Challenge-002");
    assert_eq!(artifact["correctRank"], 2);
    assert_eq!(artifact["totalCandidates"], 3);
    assert_eq!(artifact["solution"]["inchiKey"], "KEY-B");
    assert_eq!(artifact["results"][0]["candidate"]["inchiKey"], "KEY-Y");
    assert!(artifact["results"][0]["adductScores"]["Ionization-Na"].is_object());

    let summary: Value = serde_json::from_str(
        &fs::read_to_string(config.summary_path(IonMode::Positive))
            .expect("summary artifact should exist"),
    )
    .expect("summary should be json");
    assert_eq!(summary["top1Hits"], 1);
    assert_eq!(summary["top5AccuracyPct"], 100.0);
    assert!(config.summary_path(IonMode::Negative).is_file());
}

#[test]
fn results_are_sorted_by_descending_cosine() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = write_corpus(temp.path(), &[("Challenge-002", "KEY-B")]);

    let result = run_challenge(&input_for(&config, "Challenge-002"), &toolkit(Arc::default()))
        .expect("challenge should succeed");

    let cosines: Vec<f64> = result
        .results
        .iter()
        .map(|candidate| candidate.cosine_similarity)
        .collect();
    assert!(cosines.windows(2).all(|pair| pair[0] >= pair[1]), "{cosines:?}");
    assert_eq!(result.results[2].candidate.inchi_key, "KEY-Z");
    assert_eq!(result.results[2].cosine_similarity, 0.0);
    assert_eq!(result.results[2].best_adduct, "");
}

#[test]
fn unparsable_candidate_scores_zero_and_challenge_continues() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = write_corpus(temp.path(), &[("Challenge-001", "KEY-A")]);
    write_file(
        &config.candidates_dir().join("Challenge-001.csv"),
        &format!(
            "{CANDIDATE_HEADER}{}{}{}",
            candidate_row("1", "C(C", "KEY-BROKEN"),
            candidate_row("2", "CCO", "KEY-A"),
            candidate_row("3", "CCBr", "KEY-UNKNOWN")
        ),
    );

    let result = run_challenge(&input_for(&config, "Challenge-001"), &toolkit(Arc::default()))
        .expect("challenge should succeed");

    assert_eq!(result.total_candidates, 3);
    assert_eq!(result.correct_rank, 1);
    let broken = result
        .results
        .iter()
        .find(|candidate| candidate.candidate.inchi_key == "KEY-BROKEN")
        .expect("broken candidate should be kept");
    assert_eq!(broken.cosine_similarity, 0.0);
    assert_eq!(broken.best_adduct, "");
    assert!(broken.similarity.is_none());
    assert!(
        broken
            .error
            .as_deref()
            .is_some_and(|message| message.contains("C(C"))
    );

    let unknown = result
        .results
        .iter()
        .find(|candidate| candidate.candidate.inchi_key == "KEY-UNKNOWN")
        .expect("unfragmentable candidate should be kept");
    assert!(unknown.error.is_some());
}

#[test]
fn missing_solution_fails_before_any_scoring() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = write_corpus(temp.path(), &[("Challenge-002", "KEY-B")]);
    let calls = Arc::new(AtomicUsize::new(0));

    let error = run_challenge(&input_for(&config, "Challenge-001"), &toolkit(calls.clone()))
        .expect_err("missing solution should be fatal");

    assert_eq!(error.placeholder(), "INPUT.SOLUTION_NOT_FOUND");
    assert_eq!(error.exit_code(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn abort_policy_fails_the_run_on_first_challenge_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = write_corpus(temp.path(), &[("Challenge-002", "KEY-B")]);

    let error = run_benchmark(&config, &toolkit(Arc::default()))
        .expect_err("missing solution should abort the run");
    assert_eq!(error.placeholder(), "INPUT.SOLUTION_NOT_FOUND");
    assert!(!config.summary_path(IonMode::Positive).exists());
}

#[test]
fn abort_policy_launches_nothing_after_the_failing_challenge() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = RunConfig {
        concurrency: Some(1),
        ..write_corpus(
            temp.path(),
            &[("Challenge-002", "KEY-B"), ("Challenge-003", "KEY-A")],
        )
    };
    write_file(
        &config.candidates_dir().join("Challenge-003.csv"),
        &format!("{CANDIDATE_HEADER}{}", candidate_row("6", "CCO", "KEY-A")),
    );
    write_file(
        &config.peaklist_dir(IonMode::Positive).join("Challenge-003.txt"),
        "100.0 50\n150.0 80\n200.0 100\n",
    );
    let challenges = discover_challenges(&config).expect("discovery should succeed");
    assert_eq!(challenges[0].name, "Challenge-001");

    for _ in 0..20 {
        let calls = Arc::new(AtomicUsize::new(0));
        let error = process_group(
            &config,
            IonMode::Positive,
            &challenges,
            &toolkit(calls.clone()),
            Instant::now(),
        )
        .expect_err("missing solution should fail the group");

        assert_eq!(error.placeholder(), "INPUT.SOLUTION_NOT_FOUND");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

#[test]
fn isolate_policy_records_failures_and_counts_completed_only() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = RunConfig {
        failure_policy: FailurePolicy::Isolate,
        ..write_corpus(temp.path(), &[("Challenge-002", "KEY-B")])
    };

    let report = run_benchmark(&config, &toolkit(Arc::default())).expect("benchmark should succeed");

    assert_eq!(report.positive.results.len(), 1);
    assert_eq!(report.positive.failures.len(), 1);
    assert_eq!(report.positive.failures[0].challenge_name, "Challenge-001");
    assert_eq!(
        report.positive.failures[0].placeholder,
        "INPUT.SOLUTION_NOT_FOUND"
    );
    assert_eq!(report.positive.summary.total_challenges, 1);
    assert_eq!(report.positive.summary.top5_hits, 1);
}

#[test]
fn reduced_mode_truncates_and_writes_nothing() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = RunConfig {
        execution_mode: ExecutionMode::Reduced,
        ..write_corpus(
            temp.path(),
            &[("Challenge-001", "KEY-A"), ("Challenge-002", "KEY-B")],
        )
    };
    let rows: String = (0..8)
        .map(|index| candidate_row(&format!("9{index}"), "CCN", &format!("KEY-N{index}")))
        .collect();
    write_file(
        &config.candidates_dir().join("Challenge-001.csv"),
        &format!("{CANDIDATE_HEADER}{rows}{}", candidate_row("2", "CCO", "KEY-A")),
    );

    let report = run_benchmark(&config, &toolkit(Arc::default())).expect("benchmark should succeed");

    let first = &report.positive.results[0];
    assert_eq!(first.total_candidates, 5);
    assert_eq!(first.results.len(), 5);
    assert_eq!(first.correct_rank, 0);
    assert!(!first.in_top10);
    assert!(!config.results_root.exists());
}

#[test]
fn named_challenge_runs_without_full_discovery() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = write_corpus(temp.path(), &[("Challenge-001", "KEY-A")]);

    let result = run_named_challenge(&config, "Challenge-001", &toolkit(Arc::default()))
        .expect("named challenge should run");
    assert_eq!(result.correct_rank, 1);

    let error = run_named_challenge(&config, "Challenge-404", &toolkit(Arc::default()))
        .expect_err("unknown challenge should fail");
    assert_eq!(error.placeholder(), "INPUT.UNKNOWN_CHALLENGE");
}

#[test]
fn missing_data_root_is_fatal_at_startup() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = RunConfig {
        data_root: temp.path().join("absent"),
        results_root: temp.path().join("results"),
        ..RunConfig::default()
    };

    let error = run_benchmark(&config, &toolkit(Arc::default()))
        .expect_err("missing data root should fail");
    assert_eq!(error.placeholder(), "IO.DATA_ROOT_MISSING");
    assert!(!config.results_root.exists());
}
