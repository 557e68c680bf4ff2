//! Corpus layout and scoring constants shared by the pipeline stages.

pub const CANDIDATES_DIR_NAME: &str = "CASMI2016_Cat2and3_Challenge_Candidates";
pub const POSITIVE_PEAKLIST_DIR_NAME: &str = "CASMI2016_Cat2and3_Challenge_positive_peaklist";
pub const NEGATIVE_PEAKLIST_DIR_NAME: &str = "CASMI2016_Cat2and3_Challenge_negative_peaklist";
pub const SOLUTIONS_FILE_NAME: &str = "solutions_casmi2016_cat2and3.csv";
pub const REACTION_DATABASE_FILE_NAME: &str = "ReactionMassFragmentation.dwar";
pub const SUMMARY_FILE_NAME: &str = "summary.json";

pub const CANDIDATE_FILE_GLOB: &str = "*.csv";
pub const PEAKLIST_EXTENSION: &str = "txt";

/// Adduct labels never surfaced to the scorer.
pub const EXCLUDED_ADDUCT_LABELS: [&str; 1] = ["Ionization-K"];

pub const IONIZATION_KIND: &str = "ionization";

pub const MASS_POWER: f64 = 3.0;
pub const INTENSITY_POWER: f64 = 0.6;
pub const PRECISION_PPM: f64 = 20.0;
