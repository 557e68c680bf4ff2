use super::traits::SpectrumComparator;
use crate::common::constants::{INTENSITY_POWER, MASS_POWER, PRECISION_PPM};
use crate::domain::{
    AdductLabel, AdductScores, Candidate, CandidateResult, SimilarityScore, Spectrum,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub best: SimilarityScore,
    pub best_adduct: AdductLabel,
    pub adduct_scores: AdductScores,
}

impl CandidateScore {
    pub fn into_result(self, candidate: Candidate) -> CandidateResult {
        CandidateResult {
            candidate,
            similarity: Some(self.best),
            cosine_similarity: self.best.cosine,
            best_adduct: self.best_adduct,
            adduct_scores: self.adduct_scores,
            error: None,
        }
    }
}

/// Scores every adduct and keeps the first one with the strictly highest
/// cosine. The fold starts at the zero score with no label, so a candidate
/// whose adducts all score zero ends up without a best adduct.
pub fn score_candidate(
    masses_by_adduct: &[(AdductLabel, Vec<f64>)],
    spectrum: &Spectrum,
    comparator: &dyn SpectrumComparator,
) -> CandidateScore {
    let initial = CandidateScore {
        best: SimilarityScore::ZERO,
        best_adduct: AdductLabel::new(),
        adduct_scores: AdductScores::new(),
    };

    masses_by_adduct
        .iter()
        .fold(initial, |mut state, (label, masses)| {
            let score = comparator.compare(spectrum, masses);
            state.adduct_scores.insert(label.clone(), score);
            if score.cosine > state.best.cosine {
                state.best = score;
                state.best_adduct = label.clone();
            }
            state
        })
}

/// Cosine and Tanimoto similarity of an experimental spectrum against a list
/// of predicted masses (unit intensity), matching peaks within a ppm window.
/// Peaks are weighted by `mz^mass_power * intensity^intensity_power`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassComparator {
    pub mass_power: f64,
    pub intensity_power: f64,
    pub precision_ppm: f64,
}

impl Default for MassComparator {
    fn default() -> Self {
        Self {
            mass_power: MASS_POWER,
            intensity_power: INTENSITY_POWER,
            precision_ppm: PRECISION_PPM,
        }
    }
}

impl MassComparator {
    fn tolerance(&self, mz: f64) -> f64 {
        mz * 1e-6 * self.precision_ppm
    }

    fn experimental_weight(&self, mz: f64, intensity: f64) -> f64 {
        mz.powf(self.mass_power) * intensity.max(0.0).powf(self.intensity_power)
    }

    fn predicted_weight(&self, mz: f64) -> f64 {
        mz.powf(self.mass_power)
    }
}

impl SpectrumComparator for MassComparator {
    fn compare(&self, spectrum: &Spectrum, masses: &[f64]) -> SimilarityScore {
        let mut predicted: Vec<f64> = masses.iter().copied().filter(|mz| mz.is_finite()).collect();
        predicted.sort_by(f64::total_cmp);
        predicted.dedup();

        let peaks: Vec<(f64, f64)> = spectrum
            .x
            .iter()
            .copied()
            .zip(spectrum.y.iter().copied())
            .collect();

        let mut dot = 0.0;
        let mut common = 0;
        let (mut left, mut right) = (0, 0);
        while left < peaks.len() && right < predicted.len() {
            let (mz, intensity) = peaks[left];
            let candidate_mz = predicted[right];
            if (mz - candidate_mz).abs() <= self.tolerance(mz) {
                dot += self.experimental_weight(mz, intensity) * self.predicted_weight(candidate_mz);
                common += 1;
                left += 1;
                right += 1;
            } else if mz < candidate_mz {
                left += 1;
            } else {
                right += 1;
            }
        }

        let norm_experimental: f64 = peaks
            .iter()
            .map(|&(mz, intensity)| self.experimental_weight(mz, intensity).powi(2))
            .sum();
        let norm_predicted: f64 = predicted
            .iter()
            .map(|&mz| self.predicted_weight(mz).powi(2))
            .sum();

        let cosine = if norm_experimental > 0.0 && norm_predicted > 0.0 {
            dot / (norm_experimental.sqrt() * norm_predicted.sqrt())
        } else {
            0.0
        };
        let union = peaks.len() + predicted.len() - common;
        let tanimoto = if union == 0 {
            0.0
        } else {
            common as f64 / union as f64
        };

        SimilarityScore {
            cosine,
            tanimoto,
            nb_common_peaks: common,
            nb_peaks1: peaks.len(),
            nb_peaks2: predicted.len(),
        }
    }
}
