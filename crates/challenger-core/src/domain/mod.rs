pub mod errors;

pub use errors::{
    ChallengerError, ChallengerResult, ErrorCategory, ParserResult, PipelineResult,
};

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type AdductLabel = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IonMode {
    Positive,
    Negative,
}

impl IonMode {
    pub const ALL: [IonMode; 2] = [IonMode::Positive, IonMode::Negative];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "positive" | "pos" => Some(Self::Positive),
            "negative" | "neg" => Some(Self::Negative),
            _ => None,
        }
    }
}

impl Display for IonMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecutionMode {
    #[default]
    Normal,
    /// At most two challenges per group and five candidates per challenge,
    /// nothing written to disk.
    Reduced,
}

impl ExecutionMode {
    pub const fn allows_writes(self) -> bool {
        matches!(self, Self::Normal)
    }

    pub const fn challenge_limit(self) -> Option<usize> {
        match self {
            Self::Normal => None,
            Self::Reduced => Some(2),
        }
    }

    pub const fn candidate_limit(self) -> Option<usize> {
        match self {
            Self::Normal => None,
            Self::Reduced => Some(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub name: String,
    pub ion_mode: IonMode,
    pub spectrum_path: PathBuf,
    pub candidates_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub identifier: String,
    pub compound_name: String,
    pub monoisotopic_mass: Option<f64>,
    pub molecular_formula: String,
    pub smiles: String,
    pub inchi: String,
    pub inchi_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub source_file: String,
    pub challenge_name: String,
    pub precursor_mz: Option<f64>,
    pub ion_mode: String,
    pub retention_time: Option<f64>,
    pub peak_count: Option<u32>,
    pub name: String,
    pub smiles: String,
    pub inchi: String,
    pub inchi_key: String,
    pub chemspider_id: String,
    pub pubchem_cid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionRef {
    pub name: String,
    pub inchi_key: String,
}

impl From<&Solution> for SolutionRef {
    fn from(solution: &Solution) -> Self {
        Self {
            name: solution.name.clone(),
            inchi_key: solution.inchi_key.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Spectrum {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Spectrum {
    /// Builds a spectrum from `(mz, intensity)` pairs, ordering them by m/z.
    pub fn from_peaks(mut peaks: Vec<(f64, f64)>) -> Self {
        peaks.sort_by(|left, right| left.0.total_cmp(&right.0));
        let (x, y) = peaks.into_iter().unzip();
        Self { x, y }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityScore {
    pub cosine: f64,
    pub tanimoto: f64,
    pub nb_common_peaks: usize,
    pub nb_peaks1: usize,
    pub nb_peaks2: usize,
}

impl SimilarityScore {
    pub const ZERO: SimilarityScore = SimilarityScore {
        cosine: 0.0,
        tanimoto: 0.0,
        nb_common_peaks: 0,
        nb_peaks1: 0,
        nb_peaks2: 0,
    };
}

/// Per-adduct scores in adduct discovery order. Serialized as a JSON object
/// whose keys keep that order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdductScores(Vec<(AdductLabel, SimilarityScore)>);

impl AdductScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the score of a label already present, otherwise appends.
    pub fn insert(&mut self, label: AdductLabel, score: SimilarityScore) {
        match self.0.iter_mut().find(|(known, _)| *known == label) {
            Some((_, existing)) => *existing = score,
            None => self.0.push((label, score)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&SimilarityScore> {
        self.0
            .iter()
            .find(|(known, _)| known == label)
            .map(|(_, score)| score)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(label, _)| label.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for AdductScores {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self.0.iter().map(|(label, score)| (label, score)))
    }
}

impl<'de> Deserialize<'de> for AdductScores {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ScoresVisitor;

        impl<'de> Visitor<'de> for ScoresVisitor {
            type Value = AdductScores;

            fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map from adduct label to similarity score")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut scores = AdductScores::new();
                while let Some((label, score)) =
                    map.next_entry::<AdductLabel, SimilarityScore>()?
                {
                    scores.insert(label, score);
                }
                Ok(scores)
            }
        }

        deserializer.deserialize_map(ScoresVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    pub candidate: Candidate,
    pub similarity: Option<SimilarityScore>,
    pub cosine_similarity: f64,
    pub best_adduct: AdductLabel,
    pub adduct_scores: AdductScores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CandidateResult {
    pub fn failed(candidate: Candidate, error: impl Into<String>) -> Self {
        Self {
            candidate,
            similarity: None,
            cosine_similarity: 0.0,
            best_adduct: String::new(),
            adduct_scores: AdductScores::new(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResult {
    pub challenge_name: String,
    pub solution: SolutionRef,
    pub total_candidates: usize,
    pub correct_rank: usize,
    pub in_top1: bool,
    pub in_top5: bool,
    pub in_top10: bool,
    pub adduct_labels: Vec<AdductLabel>,
    pub results: Vec<CandidateResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeFailure {
    pub challenge_name: String,
    pub ion_mode: IonMode,
    pub placeholder: String,
    pub message: String,
}

impl ChallengeFailure {
    pub fn new(challenge: &Challenge, error: &ChallengerError) -> Self {
        Self {
            challenge_name: challenge.name.clone(),
            ion_mode: challenge.ion_mode,
            placeholder: error.placeholder().to_string(),
            message: error.message().to_string(),
        }
    }
}
